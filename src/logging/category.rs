//! Severity categories
//!
//! The nine built-in severities plus caller-defined categories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity category a message is recorded under
///
/// Serialized as its lowercase name, so configuration files can list
/// categories as plain strings (`level = ["error", "warning"]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    #[default]
    Info,
    Debug,
    Sql,
    /// Any category name outside the built-in set
    Custom(String),
}

impl Category {
    /// All built-in categories, most severe first
    pub const BUILTIN: [Category; 9] = [
        Category::Emergency,
        Category::Alert,
        Category::Critical,
        Category::Error,
        Category::Warning,
        Category::Notice,
        Category::Info,
        Category::Debug,
        Category::Sql,
    ];

    /// Get the name used in file names and formatted output
    pub fn as_str(&self) -> &str {
        match self {
            Category::Emergency => "emergency",
            Category::Alert => "alert",
            Category::Critical => "critical",
            Category::Error => "error",
            Category::Warning => "warning",
            Category::Notice => "notice",
            Category::Info => "info",
            Category::Debug => "debug",
            Category::Sql => "sql",
            Category::Custom(name) => name,
        }
    }

    /// Debug entries are never persisted by a batch save
    pub fn is_debug(&self) -> bool {
        matches!(self, Category::Debug)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        match name {
            "emergency" => Category::Emergency,
            "alert" => Category::Alert,
            "critical" => Category::Critical,
            "error" => Category::Error,
            "warning" => Category::Warning,
            "notice" => Category::Notice,
            "info" => Category::Info,
            "debug" => Category::Debug,
            "sql" => Category::Sql,
            other => Category::Custom(other.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(name: String) -> Self {
        match Category::from(name.as_str()) {
            Category::Custom(_) => Category::Custom(name),
            builtin => builtin,
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Custom(name) => name,
            builtin => builtin.as_str().to_string(),
        }
    }
}
