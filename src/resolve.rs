// src/resolve.rs

//! Identity resolution against the persistent cache
//!
//! Reconciles the descriptor's canonical URL and declared identifiers with
//! the identity cache, falling back to the interactive prompt only when
//! neither the descriptor nor the cache knows the answer. The prompt loop
//! re-asks until it gets a non-empty line; that retry contract lives here,
//! not in the prompt source.

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::prompt::PromptSource;
use crate::store::{IdentityCache, VersionStore};
use tracing::debug;

/// The one dependency URI with a hardcoded version default.
const US_CORE_URI: &str = "http://hl7.org/fhir/us/core";
const US_CORE_DEFAULT_VERSION: &str = "1.0.1";

/// Resolve the descriptor's own package id against the cache.
///
/// A declared id fills a cold cache; a declared id that disagrees with a
/// warm cache is a hard conflict. An undeclared id comes from the cache or,
/// as a last resort, from the prompt.
pub fn resolve_package_id(
    cache: &mut dyn IdentityCache,
    canonical: &str,
    descriptor: &mut Descriptor,
    source_label: &str,
    prompt: &mut dyn PromptSource,
) -> Result<()> {
    let cached = cache.package_id(canonical)?;
    if let Some(declared) = descriptor.package_id.clone() {
        return match cached {
            None => cache.record(canonical, &declared),
            Some(cached) if cached != declared => Err(Error::PackageIdentityConflict {
                canonical: canonical.to_string(),
                declared,
                cached,
            }),
            Some(_) => Ok(()),
        };
    }

    let id = match cached {
        Some(id) => id,
        None => ask_non_empty(
            prompt,
            &format!("Enter package-id for {} from {}", canonical, source_label),
        )?,
    };
    cache.record(canonical, &id)?;
    descriptor.package_id = Some(id);
    Ok(())
}

/// Fill the descriptor's declared version from the per-URL store, asking a
/// human when the store is cold and persisting the answer.
pub fn resolve_version(
    versions: &mut dyn VersionStore,
    descriptor: &mut Descriptor,
    prompt: &mut dyn PromptSource,
) -> Result<()> {
    if descriptor.version.is_some() {
        return Ok(());
    }
    let version = match versions.version(&descriptor.url)? {
        Some(v) => v,
        None => {
            let v = ask_non_empty(prompt, &format!("Enter version for {}", descriptor.url))?;
            versions.record_version(&descriptor.url, &v)?;
            v
        }
    };
    descriptor.version = Some(version);
    Ok(())
}

/// Reconcile the descriptor's declared schema version with the detected
/// archive revision. The legacy `STU3` label is normalized first.
pub fn check_revision(descriptor: &mut Descriptor, revision_label: &str) -> Result<()> {
    if descriptor.fhir_version.as_deref() == Some("STU3") {
        descriptor.fhir_version = Some("3.0.1".to_string());
    }
    match &descriptor.fhir_version {
        None => {
            descriptor.fhir_version = Some(revision_label.to_string());
            Ok(())
        }
        Some(declared) if declared == revision_label => Ok(()),
        Some(declared) => Err(Error::VersionMismatch {
            detected: revision_label.to_string(),
            declared: declared.clone(),
        }),
    }
}

/// Resolve version defaults and package ids for every declared dependency.
///
/// Newly prompted ids are recorded into the cache only when the cache had no
/// prior entry for that URI.
pub fn resolve_dependencies(
    cache: &mut dyn IdentityCache,
    descriptor: &mut Descriptor,
    source_label: &str,
    prompt: &mut dyn PromptSource,
) -> Result<()> {
    for dep in &mut descriptor.depends_on {
        if dep.version.is_none() && dep.uri == US_CORE_URI {
            dep.version = Some(US_CORE_DEFAULT_VERSION.to_string());
            debug!("defaulted {} to version {}", dep.uri, US_CORE_DEFAULT_VERSION);
        }
        if dep.package_id.is_none() {
            let cached = cache.package_id(&dep.uri)?;
            let cache_miss = cached.is_none();
            let id = match cached {
                Some(id) => id,
                None => ask_non_empty(
                    prompt,
                    &format!("Enter package-id for {} from {}", dep.uri, source_label),
                )?,
            };
            if cache_miss {
                cache.record(&dep.uri, &id)?;
            }
            dep.package_id = Some(id);
        }
    }
    Ok(())
}

/// Re-ask until the human supplies a non-empty line.
fn ask_non_empty(prompt: &mut dyn PromptSource, question: &str) -> Result<String> {
    loop {
        let answer = prompt.ask(question)?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompt;
    use crate::store::MemoryStore;

    const CANONICAL: &str = "http://example.org/fhir";

    fn descriptor() -> Descriptor {
        Descriptor {
            url: "http://example.org/fhir/ImplementationGuide/test".to_string(),
            ..Descriptor::default()
        }
    }

    #[test]
    fn declared_id_fills_cold_cache() {
        let mut cache = MemoryStore::new();
        let mut d = descriptor();
        d.package_id = Some("example.core".to_string());
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        resolve_package_id(&mut cache, CANONICAL, &mut d, "pack", &mut prompt).unwrap();
        assert_eq!(
            cache.package_id(CANONICAL).unwrap().as_deref(),
            Some("example.core")
        );
    }

    #[test]
    fn declared_id_conflicting_with_cache_fails() {
        let mut cache = MemoryStore::new().with_package_id(CANONICAL, "hl7.fhir.us.core");
        let mut d = descriptor();
        d.package_id = Some("hl7.fhir.us.other".to_string());
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        let err =
            resolve_package_id(&mut cache, CANONICAL, &mut d, "pack", &mut prompt).unwrap_err();
        assert!(matches!(err, Error::PackageIdentityConflict { .. }));
    }

    #[test]
    fn undeclared_id_comes_from_cache_without_prompting() {
        let mut cache = MemoryStore::new().with_package_id(CANONICAL, "example.core");
        let mut d = descriptor();
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        resolve_package_id(&mut cache, CANONICAL, &mut d, "pack", &mut prompt).unwrap();
        assert_eq!(d.package_id.as_deref(), Some("example.core"));
    }

    #[test]
    fn prompt_retries_until_non_empty() {
        let mut cache = MemoryStore::new();
        let mut d = descriptor();
        let mut prompt = ScriptedPrompt::new(["", "   ", " example.core \n"]);
        resolve_package_id(&mut cache, CANONICAL, &mut d, "pack", &mut prompt).unwrap();
        assert_eq!(d.package_id.as_deref(), Some("example.core"));
        assert_eq!(
            cache.package_id(CANONICAL).unwrap().as_deref(),
            Some("example.core")
        );
        assert!(prompt.exhausted());
    }

    #[test]
    fn version_resolves_from_store_then_prompt() {
        let mut versions = MemoryStore::new();
        let mut d = descriptor();
        let mut prompt = ScriptedPrompt::new(["2.1.0"]);
        resolve_version(&mut versions, &mut d, &mut prompt).unwrap();
        assert_eq!(d.version.as_deref(), Some("2.1.0"));
        assert_eq!(
            versions.version(&d.url).unwrap().as_deref(),
            Some("2.1.0")
        );

        // A second descriptor for the same URL hits the store.
        let mut d2 = descriptor();
        let mut no_prompt = ScriptedPrompt::new(Vec::<String>::new());
        resolve_version(&mut versions, &mut d2, &mut no_prompt).unwrap();
        assert_eq!(d2.version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn check_revision_normalizes_stu3_label() {
        let mut d = descriptor();
        d.fhir_version = Some("STU3".to_string());
        check_revision(&mut d, "3.0.1").unwrap();
        assert_eq!(d.fhir_version.as_deref(), Some("3.0.1"));
    }

    #[test]
    fn check_revision_sets_missing_and_rejects_mismatch() {
        let mut d = descriptor();
        check_revision(&mut d, "3.0.1").unwrap();
        assert_eq!(d.fhir_version.as_deref(), Some("3.0.1"));

        d.fhir_version = Some("1.4.0".to_string());
        assert!(matches!(
            check_revision(&mut d, "3.0.1").unwrap_err(),
            Error::VersionMismatch { .. }
        ));
    }

    #[test]
    fn dependency_defaults_and_cache_recording() {
        let mut cache = MemoryStore::new().with_package_id(
            "http://example.org/fhir/other",
            "example.other",
        );
        let mut d = descriptor();
        d.depends_on = vec![
            crate::descriptor::Dependency {
                uri: US_CORE_URI.to_string(),
                ..Default::default()
            },
            crate::descriptor::Dependency {
                uri: "http://example.org/fhir/other".to_string(),
                ..Default::default()
            },
        ];
        let mut prompt = ScriptedPrompt::new(["hl7.fhir.us.core"]);
        resolve_dependencies(&mut cache, &mut d, "pack", &mut prompt).unwrap();

        assert_eq!(d.depends_on[0].version.as_deref(), Some("1.0.1"));
        assert_eq!(d.depends_on[0].package_id.as_deref(), Some("hl7.fhir.us.core"));
        assert_eq!(
            cache.package_id(US_CORE_URI).unwrap().as_deref(),
            Some("hl7.fhir.us.core")
        );
        // Cache hit: resolved without prompting, no re-record needed.
        assert_eq!(d.depends_on[1].package_id.as_deref(), Some("example.other"));
        assert!(prompt.exhausted());
    }
}
