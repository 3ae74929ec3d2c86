//! Ordered accumulator of validation messages keyed by property path

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Message key (see [`keys`](super::keys))
    pub key: String,

    /// Substitution arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl ErrorMessage {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(key: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{} [{}]", self.key, self.args.join(", "))
        }
    }
}

/// Validation messages grouped by property path, in insertion order
///
/// Paths are relative to the document (`members[0].activeToDate`). When a
/// prefix is configured every recorded path is stored under it
/// (`document.members[0].activeToDate`).
///
/// The map is passed explicitly into every check; there is no shared or
/// thread-local error state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    errors: IndexMap<String, Vec<ErrorMessage>>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store every path under `prefix`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: (!prefix.is_empty()).then_some(prefix),
            errors: IndexMap::new(),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn full_path(&self, path: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}.{}", prefix, path),
            None => path.to_string(),
        }
    }

    pub fn put(&mut self, path: &str, message: ErrorMessage) {
        let path = self.full_path(path);
        self.errors.entry(path).or_default().push(message);
    }

    /// Record `key` without arguments
    pub fn put_error(&mut self, path: &str, key: &str) {
        self.put(path, ErrorMessage::new(key));
    }

    pub fn put_error_with_args<I, S>(&mut self, path: &str, key: &str, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.put(path, ErrorMessage::with_args(key, args));
    }

    /// Messages at a document-relative path
    pub fn get(&self, path: &str) -> &[ErrorMessage] {
        self.errors
            .get(&self.full_path(path))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.errors.contains_key(&self.full_path(path))
    }

    /// Recorded paths, prefix included, in insertion order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ErrorMessage)> {
        self.errors
            .iter()
            .flat_map(|(path, messages)| messages.iter().map(move |m| (path.as_str(), m)))
    }

    /// Total number of messages
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Append every message of `other`, keeping its stored paths
    pub fn merge(&mut self, other: ErrorMap) {
        for (path, messages) in other.errors {
            self.errors.entry(path).or_default().extend(messages);
        }
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Object of stored path to `[{ "key", "args" }]`, as returned to clients
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.errors
                .iter()
                .map(|(path, messages)| {
                    let list = messages
                        .iter()
                        .map(|m| serde_json::json!({ "key": m.key, "args": m.args }))
                        .collect();
                    (path.clone(), serde_json::Value::Array(list))
                })
                .collect(),
        )
    }
}

impl fmt::Display for ErrorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, message)) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", path, message)?;
        }
        Ok(())
    }
}
