// src/revision.rs

//! Schema revision detection for validator packs
//!
//! The pack's `version.info` entry is a tiny INI file whose `[FHIR]`
//! section names the schema revision the pack was authored against. A
//! missing entry is a soft "not applicable" outcome; a present but
//! unparseable one is a hard error — old publishers always wrote the file
//! correctly or not at all.

use crate::archive::EntrySet;
use crate::error::{Error, Result};

/// Revision labels that are recognized but never convertible.
const SKIP_LIST: &[&str] = &["n/a", "3.1.0", "1.8.0"];

/// The closed set of schema revisions the converter can load and re-emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRevision {
    V102,
    V140,
    V301,
    V320,
    V330,
    V400,
}

/// Which revision codec handles a given revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFamily {
    Dstu2,
    Dstu2016May,
    Stu3,
    Latest,
}

impl SchemaRevision {
    /// Parse a revision label, normalizing the `3.0.0` historical alias.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "1.0.2" => Some(Self::V102),
            "1.4.0" => Some(Self::V140),
            "3.0.0" | "3.0.1" => Some(Self::V301),
            "3.2.0" => Some(Self::V320),
            "3.3.0" => Some(Self::V330),
            "4.0.0" => Some(Self::V400),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::V102 => "1.0.2",
            Self::V140 => "1.4.0",
            Self::V301 => "3.0.1",
            Self::V320 => "3.2.0",
            Self::V330 => "3.3.0",
            Self::V400 => "4.0.0",
        }
    }

    pub fn family(&self) -> CodecFamily {
        match self {
            Self::V102 => CodecFamily::Dstu2,
            Self::V140 => CodecFamily::Dstu2016May,
            Self::V301 => CodecFamily::Stu3,
            Self::V320 | Self::V330 | Self::V400 => CodecFamily::Latest,
        }
    }
}

/// Outcome of inspecting a pack's `version.info` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedRevision {
    /// No `version.info` entry; the pack predates revision stamping.
    NotApplicable,
    /// A label in the fixed never-convertible set; caller skips without error.
    Unsupported(String),
    /// A label worth attempting; unknown labels fail later at load time.
    Candidate(String),
}

/// Determine which schema revision produced the pack.
pub fn detect(entries: &EntrySet) -> Result<DetectedRevision> {
    let bytes = match entries.get("version.info") {
        Some(b) => b,
        None => return Ok(DetectedRevision::NotApplicable),
    };

    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}').trim();
    // Some publishers prepended noise before the first section header.
    let start = text.find('[').ok_or_else(|| {
        Error::MalformedVersionInfo(format!("no section header in {:?}", text))
    })?;
    let label = ini_value(&text[start..], "FHIR", "version").ok_or_else(|| {
        Error::MalformedVersionInfo(format!("no [FHIR] version key in {:?}", text))
    })?;

    let label = if label == "3.0.0" {
        "3.0.1".to_string()
    } else {
        label
    };

    if SKIP_LIST.contains(&label.as_str()) {
        Ok(DetectedRevision::Unsupported(label))
    } else {
        Ok(DetectedRevision::Candidate(label))
    }
}

/// Minimal INI lookup: value of `key` inside `[section]`.
fn ini_value(text: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = name.trim().eq_ignore_ascii_case(section);
            continue;
        }
        if in_section {
            if let Some((k, v)) = line.split_once('=') {
                if k.trim() == key {
                    return Some(v.trim().to_string());
                }
            }
        }
    }
    None
}
