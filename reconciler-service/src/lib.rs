pub mod classify;
pub mod config;
pub mod metrics_server;
pub mod observability;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use runner::{PassReport, ReconcileError, Reconciler, ScanStrategy, ShiftPolicy};
pub use scheduler::{Scheduler, Trigger};
