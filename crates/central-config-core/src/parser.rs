// crates/central-config-core/src/parser.rs
// ============================================================================
// Module: Configuration Field Parser
// Description: Typed extraction of values from the configuration document.
// Purpose: Resolve nested field paths into strings, lists, maps, and ints.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ConfigParser`] wraps the parsed JSON root of a configuration document and
//! extracts typed leaves by field path. A path is a sequence of member names:
//! every segment but the last selects a nested object, and the last segment
//! selects the leaf inside the innermost object.
//!
//! Invariants:
//! - A missing path segment fails with [`ParseError::FieldNotFound`].
//! - A value of the wrong shape fails with [`ParseError::TypeMismatch`].
//! - There are no partial results: a list or map with one bad entry fails
//!   as a whole.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while extracting configuration fields.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `path` values are dot-joined field paths and never contain field values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The document is not a JSON object.
    #[error("invalid configuration json: {0}")]
    InvalidJson(String),
    /// A path segment does not exist.
    #[error("configuration field not found: {path}")]
    FieldNotFound {
        /// Dot-joined path of the missing field.
        path: String,
    },
    /// The located value cannot be coerced to the requested shape.
    #[error("configuration field {path} is not a {expected}")]
    TypeMismatch {
        /// Dot-joined path of the field.
        path: String,
        /// Requested shape label.
        expected: &'static str,
    },
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Field extractor over a configuration document.
#[derive(Debug, Clone)]
pub struct ConfigParser {
    /// Top-level JSON object of the document.
    root: Map<String, Value>,
}

impl ConfigParser {
    /// Parses JSON text into a parser.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidJson`] when the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| ParseError::InvalidJson(err.to_string()))?;
        match value {
            Value::Object(root) => Ok(Self {
                root,
            }),
            _ => Err(ParseError::InvalidJson("top-level value must be an object".to_string())),
        }
    }

    /// Extracts a string leaf. Numbers and booleans are rendered as text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the field is missing or not scalar.
    pub fn parse_string(&self, path: &[&str]) -> Result<String, ParseError> {
        match self.locate(path)? {
            Value::String(value) => Ok(value.clone()),
            Value::Number(value) => Ok(value.to_string()),
            Value::Bool(value) => Ok(value.to_string()),
            _ => Err(mismatch(path, "string")),
        }
    }

    /// Extracts an ordered list of strings.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the field is missing, not an array, or holds
    /// a non-string entry.
    pub fn parse_string_list(&self, path: &[&str]) -> Result<Vec<String>, ParseError> {
        let Value::Array(items) = self.locate(path)? else {
            return Err(mismatch(path, "string list"));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(value) => Ok(value.clone()),
                _ => Err(mismatch(path, "string list")),
            })
            .collect()
    }

    /// Extracts a string-to-string map.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the field is missing, not an object, or holds
    /// a non-string value.
    pub fn parse_string_map(&self, path: &[&str]) -> Result<BTreeMap<String, String>, ParseError> {
        let Value::Object(entries) = self.locate(path)? else {
            return Err(mismatch(path, "string map"));
        };
        entries
            .iter()
            .map(|(key, value)| match value {
                Value::String(text) => Ok((key.clone(), text.clone())),
                _ => Err(mismatch(path, "string map")),
            })
            .collect()
    }

    /// Extracts an integer. Integral numbers and base-10 numeric strings are
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the field is missing or not an integer.
    pub fn parse_int(&self, path: &[&str]) -> Result<i64, ParseError> {
        match self.locate(path)? {
            Value::Number(number) => number.as_i64().ok_or_else(|| mismatch(path, "integer")),
            Value::String(text) => text.trim().parse::<i64>().map_err(|_| mismatch(path, "integer")),
            _ => Err(mismatch(path, "integer")),
        }
    }

    /// Walks the path and returns the leaf value.
    fn locate(&self, path: &[&str]) -> Result<&Value, ParseError> {
        let Some((leaf, parents)) = path.split_last() else {
            return Err(ParseError::FieldNotFound {
                path: String::new(),
            });
        };
        let mut object = &self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let prefix = &path[..=depth];
            match object.get(*segment) {
                Some(Value::Object(inner)) => object = inner,
                Some(_) => return Err(mismatch(prefix, "object")),
                None => return Err(not_found(prefix)),
            }
        }
        object.get(*leaf).ok_or_else(|| not_found(path))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Joins a field path for error reporting.
fn join(path: &[&str]) -> String {
    path.join(".")
}

/// Builds a missing-field error.
fn not_found(path: &[&str]) -> ParseError {
    ParseError::FieldNotFound {
        path: join(path),
    }
}

/// Builds a type mismatch error.
fn mismatch(path: &[&str], expected: &'static str) -> ParseError {
    ParseError::TypeMismatch {
        path: join(path),
        expected,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
