//! Error types for protomon-json.

use std::io;
use std::path::PathBuf;

use crate::json::EncodeError;
use crate::text::ParseError;

/// Errors that stop a batch run before any document is processed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The schema failed validation.
    #[error("invalid schema")]
    Schema(#[from] protomon_reflect::Error),
    /// A descriptor set file could not be read.
    #[error("failed to read descriptor set {}", path.display())]
    DescriptorSet {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The configured top-level message type is not in the schema.
    #[error("message type '{0}' is not in the schema")]
    UnknownMessageType(String),
    /// The input root could not be listed.
    #[error("failed to list input root {}", path.display())]
    InputRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The output directory could not be created.
    #[error("failed to create output directory {}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why a single document produced no output.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Output names must be plain file stems.
    #[error("'{0}' is not a usable output name")]
    InvalidName(String),
    /// Another document in this run already wrote `name`.
    #[error("output name '{name}' was already written by {}", first.display())]
    DuplicateName { name: String, first: PathBuf },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
