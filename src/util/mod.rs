//! Logging setup and the cancellable wait primitive

pub mod logging;
pub mod wait;

pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
pub use wait::{TimedWait, WaitOutcome};
