//! Per-unit-of-work logger
//!
//! Buffers messages by category for one request or run and flushes them to a
//! [`FileSink`] in one batch. In streaming mode every message is written as
//! soon as it is recorded and nothing is buffered.

use std::sync::Arc;

use crate::config::{ExecutionMode, LogConfig};
use crate::error::Result;

use super::category::Category;
use super::entry::{Context, LogBuffer, Message};
use super::sink::FileSink;

/// Buffers categorized messages and flushes them to a shared sink
///
/// Create one per unit of work; the sink behind it can be shared.
#[derive(Debug)]
pub struct Logger {
    sink: Arc<FileSink>,
    buffer: LogBuffer,
}

macro_rules! severity_methods {
    ($($name:ident => $category:ident),* $(,)?) => {
        $(
            #[doc = concat!("Record a message under `", stringify!($name), "`")]
            pub fn $name(&mut self, message: impl Into<Message>, context: &Context) -> &mut Self {
                self.log(Category::$category, message, context)
            }
        )*
    };
}

impl Logger {
    /// Create a logger with its own sink
    pub fn new(config: LogConfig, mode: ExecutionMode) -> Result<Self> {
        Ok(Self::with_sink(Arc::new(FileSink::new(config, mode)?)))
    }

    /// Create a logger writing to an existing sink
    pub fn with_sink(sink: Arc<FileSink>) -> Self {
        Self {
            sink,
            buffer: LogBuffer::new(),
        }
    }

    pub fn sink(&self) -> &Arc<FileSink> {
        &self.sink
    }

    fn config(&self) -> &LogConfig {
        self.sink.config()
    }

    /// Record a message, substituting `{key}` placeholders from `context`
    ///
    /// Placeholders only apply to text messages. In streaming mode the
    /// message is written immediately, bypassing the allow-list; a failed
    /// write is reported through tracing and the message is dropped.
    pub fn record(
        &mut self,
        message: impl Into<Message>,
        category: impl Into<Category>,
        context: &Context,
    ) -> &mut Self {
        let category = category.into();
        let message = match message.into() {
            Message::Text(text) if !context.is_empty() => Message::Text(context.interpolate(&text)),
            other => other,
        };

        if self.sink.mode().is_streaming() {
            match self.write(message, category.clone(), true) {
                Ok(true) => {}
                Ok(false) => tracing::warn!(%category, "Dropped streaming log message"),
                Err(e) => tracing::warn!(%category, error = %e, "Dropped streaming log message"),
            }
        } else {
            self.buffer.push(category, message);
        }

        self
    }

    /// Record under `category`; the per-severity methods delegate here
    pub fn log(
        &mut self,
        category: impl Into<Category>,
        message: impl Into<Message>,
        context: &Context,
    ) -> &mut Self {
        self.record(message, category, context)
    }

    severity_methods! {
        emergency => Emergency,
        alert => Alert,
        critical => Critical,
        error => Error,
        warning => Warning,
        notice => Notice,
        info => Info,
        debug => Debug,
        sql => Sql,
    }

    /// Write one message straight to the sink, bypassing the buffer
    ///
    /// Returns `Ok(false)` without writing when `category` is not in the
    /// allow-list and `force` is false. An empty allow-list admits everything.
    pub fn write(
        &self,
        message: impl Into<Message>,
        category: impl Into<Category>,
        force: bool,
    ) -> Result<bool> {
        let category = category.into();
        let force = force || self.config().level.is_empty();

        if !force && !self.config().level.contains(&category) {
            return Ok(false);
        }

        self.sink
            .save(&LogBuffer::single(category, message.into()), false)
    }

    /// Flush the buffer to the sink
    ///
    /// `debug` messages are always dropped and the rest are filtered by the
    /// allow-list. The buffer is cleared only when every write succeeded, so a
    /// failed save can be retried.
    pub fn save(&mut self) -> Result<bool> {
        if self.buffer.is_empty() {
            return Ok(true);
        }

        let config = self.sink.config();
        let mut batch = self.buffer.clone();
        batch.retain(|category| !category.is_debug() && config.allows(category));

        let saved = self.sink.save(&batch, true)?;
        if saved {
            self.buffer.clear();
        }

        Ok(saved)
    }

    /// Discard everything buffered so far
    pub fn clear(&mut self) -> &mut Self {
        self.buffer.clear();
        self
    }

    /// Get the full buffer
    pub fn get_log(&self) -> &LogBuffer {
        &self.buffer
    }

    /// Get the buffered messages for one category
    pub fn get_category(&self, category: &Category) -> &[Message] {
        self.buffer.get(category)
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
