//! Error types for configuration, decoding and file storage.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The configuration file could not be parsed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A scene or module document could not be encoded or decoded.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The text is not valid JSON, or a required key is missing or mistyped.
    #[error("Invalid document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document decoded but violates a structural rule.
    #[error("Invalid {what}: {reason}")]
    Invalid { what: &'static str, reason: String },
}

/// Errors from diagram files and module stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A module template could not be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("Select at least one node to create a module")]
    EmptySelection,

    #[error("Module name cannot be empty")]
    EmptyName,
}
