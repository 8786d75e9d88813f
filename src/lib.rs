//! Filelog - categorized, file-backed logging
//!
//! This library buffers log messages by severity category for a unit of work
//! and appends them to dated or single log files with size-based rotation.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;

pub use error::{LogError, Result};
