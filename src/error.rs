// src/error.rs

//! Error types for the validator pack conversion pipeline
//!
//! Every variant here is fatal to the single archive being processed, never
//! to the batch: the driver in `convert` catches, logs, and moves on.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read archive: {0}")]
    ArchiveRead(String),

    #[error("failed to write package archive: {0}")]
    ArchiveWrite(String),

    #[error("malformed version.info: {0}")]
    MalformedVersionInfo(String),

    #[error("unsupported schema revision: {0}")]
    UnsupportedRevision(String),

    #[error("expected exactly one ImplementationGuide-* entry, found {0}")]
    AmbiguousDescriptor(usize),

    #[error("no /ImplementationGuide/ marker in descriptor url: {0}")]
    MalformedUrl(String),

    #[error("package id mismatch: {canonical}={declared} but cache has {cached}")]
    PackageIdentityConflict {
        canonical: String,
        declared: String,
        cached: String,
    },

    #[error("FHIR version mismatch: {detected} vs {declared}")]
    VersionMismatch { detected: String, declared: String },

    #[error("incompatible spec.internals: {0}")]
    IncompatibleInternals(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}
