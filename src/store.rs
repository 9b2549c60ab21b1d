// src/store.rs

//! Persistent identity cache and version store
//!
//! Two key-value mappings shared across every conversion in a run: canonical
//! URL -> package id, and descriptor URL -> declared version. Both live in
//! one SQLite database opened once at startup. Writes are append-only for
//! the duration of a run; nothing here deletes.
//!
//! The traits keep the resolver testable with an in-memory fake.

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Canonical URL -> package identifier mapping.
pub trait IdentityCache {
    fn package_id(&self, canonical: &str) -> Result<Option<String>>;
    fn record(&mut self, canonical: &str, package_id: &str) -> Result<()>;
}

/// Descriptor URL -> declared version mapping.
pub trait VersionStore {
    fn version(&self, url: &str) -> Result<Option<String>>;
    fn record_version(&mut self, url: &str, version: &str) -> Result<()>;
}

/// SQLite-backed store implementing both mappings.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        debug!("opened identity store at {}", path.display());
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS package_ids (
                canonical_url TEXT PRIMARY KEY,
                package_id TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS ig_versions (
                url TEXT PRIMARY KEY,
                version TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl IdentityCache for SqliteStore {
    fn package_id(&self, canonical: &str) -> Result<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT package_id FROM package_ids WHERE canonical_url = ?1",
                [canonical],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn record(&mut self, canonical: &str, package_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO package_ids (canonical_url, package_id) VALUES (?1, ?2)",
            [canonical, package_id],
        )?;
        debug!("recorded package id {} for {}", package_id, canonical);
        Ok(())
    }
}

impl VersionStore for SqliteStore {
    fn version(&self, url: &str) -> Result<Option<String>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM ig_versions WHERE url = ?1",
                [url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }

    fn record_version(&mut self, url: &str, version: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO ig_versions (url, version) VALUES (?1, ?2)",
            [url, version],
        )?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    package_ids: BTreeMap<String, String>,
    versions: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package_id(mut self, canonical: &str, package_id: &str) -> Self {
        self.package_ids
            .insert(canonical.to_string(), package_id.to_string());
        self
    }

    pub fn with_version(mut self, url: &str, version: &str) -> Self {
        self.versions.insert(url.to_string(), version.to_string());
        self
    }
}

impl IdentityCache for MemoryStore {
    fn package_id(&self, canonical: &str) -> Result<Option<String>> {
        Ok(self.package_ids.get(canonical).cloned())
    }

    fn record(&mut self, canonical: &str, package_id: &str) -> Result<()> {
        self.package_ids
            .insert(canonical.to_string(), package_id.to_string());
        Ok(())
    }
}

impl VersionStore for MemoryStore {
    fn version(&self, url: &str) -> Result<Option<String>> {
        Ok(self.versions.get(url).cloned())
    }

    fn record_version(&mut self, url: &str, version: &str) -> Result<()> {
        self.versions.insert(url.to_string(), version.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_store_round_trips_package_ids() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.package_id("http://example.org/fhir").unwrap(), None);
        store
            .record("http://example.org/fhir", "example.core")
            .unwrap();
        assert_eq!(
            store.package_id("http://example.org/fhir").unwrap().as_deref(),
            Some("example.core")
        );
    }

    #[test]
    fn sqlite_store_round_trips_versions() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .record_version("http://example.org/fhir/ImplementationGuide/test", "1.2.0")
            .unwrap();
        assert_eq!(
            store
                .version("http://example.org/fhir/ImplementationGuide/test")
                .unwrap()
                .as_deref(),
            Some("1.2.0")
        );
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.record("http://example.org/fhir", "example.core").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.package_id("http://example.org/fhir").unwrap().as_deref(),
            Some("example.core")
        );
    }
}
