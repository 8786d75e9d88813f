//! File-backed logging for Filelog
//!
//! Provides per-unit-of-work buffering with severity filtering, a file sink
//! with dated or single-file layout and size-based rotation, and retention of
//! rotated backups.

mod category;
mod entry;
mod format;
mod logger;
mod retention;
mod sink;

pub use category::Category;
pub use entry::{Context, LogBuffer, Message};
pub use format::BANNER;
pub use logger::Logger;
pub use retention::{is_live_name, prune_rotated, rotated_backup};
pub use sink::{rotated_path, FileSink};
