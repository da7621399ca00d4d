//! Stem separation
//!
//! - `engine`: the swappable separation backend
//! - `invoker`: input validation, output layout and error reporting
//! - `error_log`: persistent record of full failure texts

pub mod engine;
pub mod error_log;
pub mod invoker;

pub use engine::{SpleeterCliEngine, StemEngine, ENGINE_SAMPLE_RATE};
pub use error_log::{ErrorLog, ERROR_LOG_NAME};
pub use invoker::{create_output_dir, validate_input, SeparationInvoker};
