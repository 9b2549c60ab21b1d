// src/convert.rs

//! Batch conversion driver
//!
//! Walks the input roots, converts every `validator.pack` it finds, and
//! keeps the pipeline alive across bad inputs: any error is fatal to the
//! one archive that raised it, logged, and the batch moves on.

use crate::archive;
use crate::descriptor;
use crate::error::{Error, Result};
use crate::internals::SpecInternals;
use crate::manifest;
use crate::prompt::PromptSource;
use crate::resolve;
use crate::revision::{self, DetectedRevision, SchemaRevision};
use crate::store::{IdentityCache, VersionStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// The converter: injected stores and prompt source, plus the list of
/// packages produced so far in this run.
pub struct Convertor<S, P> {
    store: S,
    prompt: P,
    paths: Vec<PathBuf>,
}

impl<S, P> Convertor<S, P>
where
    S: IdentityCache + VersionStore,
    P: PromptSource,
{
    pub fn new(store: S, prompt: P) -> Self {
        Self {
            store,
            prompt,
            paths: Vec::new(),
        }
    }

    /// Paths of every package emitted so far.
    pub fn package_paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Process every `validator.pack` under the given roots, depth-first
    /// and strictly one at a time. Never fails the batch.
    pub fn run(&mut self, roots: &[PathBuf]) {
        for root in roots {
            for entry in WalkDir::new(root) {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        warn!("skipping unreadable path: {}", e);
                        continue;
                    }
                };
                if entry.file_type().is_file()
                    && entry.file_name() == std::ffi::OsStr::new("validator.pack")
                {
                    if let Err(e) = self.process_pack(entry.path()) {
                        warn!("  error: {}", e);
                        warn!("  detail: {:?}", e);
                    }
                }
            }
        }
        info!("Finished");
        info!("Paths:");
        for path in &self.paths {
            info!("{}", path.display());
        }
    }

    /// Convert a single validator pack into an npm-style package.
    ///
    /// Returns the emitted package path, or `None` for the soft skip of a
    /// pack whose revision is recognized but not convertible.
    pub fn process_pack(&mut self, path: &Path) -> Result<Option<PathBuf>> {
        info!("Processing {}", path.display());
        let bytes = fs::read(path)?;
        let entries = archive::read_zip(&bytes)?;

        let label = match revision::detect(&entries)? {
            DetectedRevision::NotApplicable => {
                info!("  version not supported");
                return Ok(None);
            }
            DetectedRevision::Unsupported(label) => {
                info!("  version {} not supported", label);
                return Ok(None);
            }
            DetectedRevision::Candidate(label) => label,
        };
        let rev = SchemaRevision::from_label(&label)
            .ok_or_else(|| Error::UnsupportedRevision(label.clone()))?;

        let mut ig = descriptor::load(&entries, rev)?;
        let canonical = manifest::canonical_url(&ig)?;
        let source_label = path.display().to_string();

        resolve::resolve_package_id(
            &mut self.store,
            &canonical,
            &mut ig,
            &source_label,
            &mut self.prompt,
        )?;
        resolve::check_revision(&mut ig, rev.label())?;
        resolve::resolve_version(&mut self.store, &mut ig, &mut self.prompt)?;
        resolve::resolve_dependencies(&mut self.store, &mut ig, &source_label, &mut self.prompt)?;
        manifest::apply_license_default(&mut ig);

        info!(
            "  url = {}, version = {}, fhir-version = {}, id = {}",
            canonical,
            ig.version.as_deref().unwrap_or("?"),
            ig.fhir_version.as_deref().unwrap_or("?"),
            ig.package_id.as_deref().unwrap_or("?"),
        );

        manifest::seed_from_json_entries(&entries, &mut ig);
        manifest::merge_definitions(&mut ig);
        if let Some(bytes) = entries.get("spec.internals") {
            let internals = SpecInternals::parse(bytes)?;
            manifest::merge_internals(&mut ig, &internals, &canonical)?;
        }

        let output = crate::emitter::emit(path, &canonical, &ig, rev, &entries)?;
        info!("  saved to {}", output.display());
        self.paths.push(output.clone());
        Ok(Some(output))
    }
}
