//! CourseLoom Core — shared error taxonomy and configuration.

pub mod config;
pub mod error;

pub use config::{CourseLoomConfig, DataPaths};
pub use error::{Error, Result};
