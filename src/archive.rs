// src/archive.rs

//! Zip reading for validator packs
//!
//! A validator pack is a flat zip: every entry is decompressed fully into
//! memory and keyed by its verbatim name. The read is reentrant — the
//! nested `schematron.zip` entry is fed back through `read_zip` as a byte
//! slice during emission.
//!
//! Iteration order downstream is the map's sorted order, which keeps the
//! emitted package deterministic.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

/// All entries of a validator pack, entry name -> raw bytes.
pub type EntrySet = BTreeMap<String, Vec<u8>>;

/// Read every entry of a zip archive into memory.
pub fn read_zip(bytes: &[u8]) -> Result<EntrySet> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::ArchiveRead(e.to_string()))?;

    let mut entries = EntrySet::new();
    for i in 0..zip.len() {
        let mut file = zip
            .by_index(i)
            .map_err(|e| Error::ArchiveRead(e.to_string()))?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)
            .map_err(|e| Error::ArchiveRead(format!("{}: {}", name, e)))?;
        entries.insert(name, content);
    }
    Ok(entries)
}

/// Test helper: build a zip archive in memory.
#[cfg(test)]
pub(crate) fn make_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        for (name, content) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }
    buf.into_inner()
}
