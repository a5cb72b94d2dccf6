//! Build Manifest
//!
//! Record of one build run: which assets were built, where their output
//! belongs and a hash of each output. Enough to reproduce or audit a deploy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset::Asset;
use crate::filter::BuildKind;
use crate::group::AssetGroup;
use crate::hashing::{compute_manifest_hash, sha256_hex};
use crate::ENGINE_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub relative_path: String,
    pub usable_path: String,
    pub fingerprinted_path: String,
    pub group: AssetGroup,
    pub order: u32,
    pub content_hash: String,
}

impl ManifestEntry {
    /// Entry for a built asset. Unbuilt assets hash as empty content.
    pub fn from_asset(asset: &Asset) -> Self {
        Self {
            relative_path: asset.relative_path().to_string(),
            usable_path: asset.usable_path(),
            fingerprinted_path: asset.fingerprinted_path(),
            group: asset.effective_group(),
            order: asset.order(),
            content_hash: sha256_hex(asset.content().unwrap_or("").as_bytes()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub environment: String,
    pub build_kind: BuildKind,
    pub assets: Vec<ManifestEntry>,
    pub manifest_hash: String,
}

impl BuildManifest {
    pub fn new(environment: impl Into<String>, build_kind: BuildKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            environment: environment.into(),
            build_kind,
            assets: vec![],
            manifest_hash: String::new(),
        }
    }

    pub fn push(&mut self, asset: &Asset) {
        self.assets.push(ManifestEntry::from_asset(asset));
    }

    /// Hash over the reproducible parts of the manifest. Run id and timestamp
    /// are left out so identical builds hash identically.
    pub fn seal(&mut self) -> Result<(), serde_json::Error> {
        let hashed = serde_json::json!({
            "engineVersion": self.engine_version,
            "environment": self.environment,
            "buildKind": self.build_kind,
            "assets": self.assets,
        });
        self.manifest_hash = compute_manifest_hash(&hashed)?;
        Ok(())
    }
}
