//! stemsplit - acquire a track and split it into stems
//!
//! Obtains an audio file either by copying it from local disk or by scripting
//! a web conversion service in a headless browser, then hands it to an
//! external separation engine that writes one WAV per stem.
//!
//! # Architecture
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `acquire`: audio sources (local copy, remote conversion) and the browser seam
//! - `audio`: decoding with symphonia, WAV output with hound
//! - `separation`: input validation, the engine seam and output layout
//! - `status`: progress text channel from workers to the front end
//! - `workspace`: directory layout, current-file slot, worker threads
//! - `logging`: console and per-run debug log setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stemsplit::acquire::WebDriverBackend;
//! use stemsplit::config::Settings;
//! use stemsplit::separation::SpleeterCliEngine;
//! use stemsplit::status::LogSink;
//! use stemsplit::types::{AcquisitionRequest, StemCount};
//! use stemsplit::workspace::Workspace;
//!
//! let settings = Settings::default();
//! let backend = Arc::new(WebDriverBackend::new(settings.webdriver_url.clone()));
//! let engine = Arc::new(SpleeterCliEngine::new(settings.engine_command.clone()));
//! let ws = Workspace::new(settings, backend, engine).expect("workspace");
//!
//! let request = AcquisitionRequest::parse("https://youtu.be/dQw4w9WgXcQ");
//! ws.acquire(&request, &LogSink).expect("download failed");
//! let report = ws.separate(StemCount::Four, &LogSink).expect("separation failed");
//! println!("Wrote {} stems", report.files.len());
//! ```

pub mod acquire;
pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod sanitize;
pub mod separation;
pub mod status;
pub mod types;
pub mod workspace;

// Re-export key types at crate root
pub use error::{Result, SplitError};
pub use types::{AcquiredFile, AcquisitionRequest, SeparationReport, StemCount};
