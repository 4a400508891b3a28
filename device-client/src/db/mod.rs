pub mod device_data_queries;
pub mod device_settings_queries;
