// src/lib.rs

//! igpack2npm
//!
//! Converter from legacy FHIR validator packs to normalized, npm-style
//! implementation guide packages.
//!
//! # Architecture
//!
//! - Revision-aware: detects which historical schema revision authored a
//!   pack and upgrades its descriptor to the latest schema
//! - Cache-backed identity: canonical URL -> package id mappings persist in
//!   SQLite across runs, with an interactive prompt as the last resort
//! - Batch-tolerant: a malformed pack is logged and skipped, never fatal
//!   to the run

pub mod archive;
pub mod convert;
pub mod descriptor;
pub mod emitter;
mod error;
pub mod internals;
pub mod manifest;
pub mod prompt;
pub mod resolve;
pub mod revision;
pub mod store;

pub use convert::Convertor;
pub use error::{Error, Result};
pub use prompt::{PromptSource, StdinPrompt};
pub use revision::{DetectedRevision, SchemaRevision};
pub use store::{IdentityCache, MemoryStore, SqliteStore, VersionStore};
