pub mod shift;
pub mod status;

pub use shift::{
    classify_shift, parse_clock_time, parse_reading_date, render_reading_date, ReadingDate, ShiftLabels, ShiftMode,
    ShiftWindow,
};
pub use status::classify_status;

/// A date, time or shift-window string that could not be interpreted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("malformed time '{0}'")]
    MalformedTime(String),
    #[error("malformed date '{0}'")]
    MalformedDate(String),
    #[error("missing shift window field '{0}'")]
    MissingWindow(&'static str),
}
