// src/internals.rs

//! Auxiliary internals index (`spec.internals`)
//!
//! A side-file written by old publishers next to the resources: the base
//! web URL, a URL -> relative-path table, the image set, and the target
//! (page) names. Parsed once per pack, consumed by the manifest builder,
//! then discarded.

use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpecInternals {
    /// Base URL the published pages were rendered under.
    #[serde(default)]
    pub web_url: String,
    /// Absolute resource URL -> relative web path.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub targets: Vec<String>,
    /// Legacy field; any content here means the pack predates the format
    /// this pipeline understands.
    #[serde(default)]
    pub pages: BTreeMap<String, String>,
}

impl SpecInternals {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
