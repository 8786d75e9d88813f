//! Log messages and the per-category buffer
//!
//! A [`LogBuffer`] keeps messages grouped by category, in the order the
//! categories were first recorded.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::category::Category;

/// A recorded message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Plain text, written as-is
    Text(String),
    /// A structured value, rendered as pretty-printed JSON when written
    Structured(Value),
}

impl Message {
    /// Render the message into the text that ends up in the log file
    pub fn render(&self) -> String {
        match self {
            Message::Text(text) => text.clone(),
            Message::Structured(value) => format!("{:#}", value),
        }
    }

    /// Get the text if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            Message::Structured(_) => None,
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Message::Text(text),
            other => Message::Structured(other),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Text(text) => f.write_str(text),
            Message::Structured(value) => write!(f, "{:#}", value),
        }
    }
}

/// Placeholder values substituted into text messages
///
/// Each key `k` replaces the literal `{k}` in the message.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: BTreeMap<String, String>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a placeholder value, replacing any earlier value for the same key
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a placeholder value
    pub fn insert(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.values.insert(key.into(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every `{key}` in `text` with its value
    ///
    /// Single left-to-right pass: substituted values are never rescanned, and
    /// where two placeholders match at the same position the longer one wins.
    pub fn interpolate(&self, text: &str) -> String {
        let mut placeholders: Vec<(String, &str)> = self
            .values
            .iter()
            .map(|(key, value)| (format!("{{{}}}", key), value.as_str()))
            .collect();
        placeholders.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        'scan: while let Some(ch) = rest.chars().next() {
            if ch == '{' {
                for (placeholder, value) in &placeholders {
                    if rest.starts_with(placeholder.as_str()) {
                        out.push_str(value);
                        rest = &rest[placeholder.len()..];
                        continue 'scan;
                    }
                }
            }
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }

        out
    }
}

impl<K: Into<String>, V: fmt::Display> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Context::new();
        for (key, value) in iter {
            context.insert(key, value);
        }
        context
    }
}

/// Messages grouped by category, insertion order preserved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogBuffer {
    entries: Vec<(Category, Vec<Message>)>,
}

impl LogBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding exactly one message
    pub fn single(category: Category, message: Message) -> Self {
        Self {
            entries: vec![(category, vec![message])],
        }
    }

    /// Append a message under `category`
    pub fn push(&mut self, category: Category, message: Message) {
        match self.entries.iter_mut().find(|(c, _)| *c == category) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((category, vec![message])),
        }
    }

    /// Append several messages under `category`
    pub fn extend(&mut self, category: Category, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.push(category.clone(), message);
        }
    }

    /// Get the messages recorded under `category`
    pub fn get(&self, category: &Category) -> &[Message] {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, messages)| messages.as_slice())
            .unwrap_or(&[])
    }

    /// Remove and return the messages recorded under `category`
    pub fn remove(&mut self, category: &Category) -> Option<Vec<Message>> {
        let index = self.entries.iter().position(|(c, _)| c == category)?;
        Some(self.entries.remove(index).1)
    }

    /// Iterate categories with their messages, in first-recorded order
    pub fn iter(&self) -> impl Iterator<Item = (&Category, &[Message])> {
        self.entries
            .iter()
            .map(|(category, messages)| (category, messages.as_slice()))
    }

    /// Get the categories present in the buffer
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.entries.iter().map(|(category, _)| category)
    }

    /// Keep only the categories for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&Category) -> bool) {
        self.entries.retain(|(category, _)| keep(category));
    }

    /// Number of categories with at least one message
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of messages across all categories
    pub fn message_count(&self) -> usize {
        self.entries.iter().map(|(_, messages)| messages.len()).sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl IntoIterator for LogBuffer {
    type Item = (Category, Vec<Message>);
    type IntoIter = std::vec::IntoIter<(Category, Vec<Message>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
