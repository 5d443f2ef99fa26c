//! `cardiodesk` - Patient intake and cardiac signal analysis
//!
//! This library provides the patient store, the driver for the external
//! QRS/RR/QT analysis program and the web interface that ties them together.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod patient;
pub mod storage;
pub mod web;

pub use analysis::{Analyzer, ResultFormat};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use patient::{Patient, PatientForm};
pub use storage::{Storage, StorageStats};
pub use web::AppState;
