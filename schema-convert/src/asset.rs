//! Canonical documents wrapped in asset-inventory records.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;

use crate::identity::{IdentityResolver, SelfLinkResolver};

/// One asset record as exported by an inventory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub asset_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<AssetResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetResource {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub discovery_document_uri: String,
    #[serde(default)]
    pub discovery_name: String,
    #[serde(default)]
    pub parent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// The canonical document.
    #[serde(default)]
    pub data: Json,
}

impl Asset {
    /// The canonical document carried by this asset.
    pub fn document(&self) -> Result<&Json, AssetLoadError> {
        self.resource
            .as_ref()
            .map(|resource| &resource.data)
            .ok_or_else(|| AssetLoadError::MissingResource {
                name: self.name.clone(),
            })
    }
}

/// Errors returned when reading or looking up assets.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("failed to read assets file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse assets file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("no asset matches {address}")]
    NotFound { address: String },
    #[error("asset {name} carries no resource data")]
    MissingResource { name: String },
}

/// Supplies canonical documents keyed by resource address.
pub trait DocumentSource: Send + Sync {
    fn fetch(&self, address: &str) -> Result<Asset, AssetLoadError>;
}

/// Assets read from a JSON array on disk.
#[derive(Debug, Clone, Default)]
pub struct FileDocumentSource {
    assets: Vec<Asset>,
}

impl FileDocumentSource {
    pub fn open(path: &Path) -> Result<Self, AssetLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| AssetLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw, &path.display().to_string())
    }

    /// Parse a JSON array of assets. A single asset object is accepted too.
    pub fn parse(raw: &str, origin: &str) -> Result<Self, AssetLoadError> {
        let parse_error = |source: serde_json::Error| AssetLoadError::Parse {
            path: origin.to_string(),
            source,
        };
        let json: Json = serde_json::from_str(raw).map_err(parse_error)?;
        let assets = match json {
            Json::Array(_) => serde_json::from_value(json).map_err(parse_error)?,
            other => vec![serde_json::from_value(other).map_err(parse_error)?],
        };
        Ok(Self { assets })
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }
}

impl DocumentSource for FileDocumentSource {
    /// Match by exact asset name first, then by resource identity so a short
    /// name or relative name finds the full asset name.
    fn fetch(&self, address: &str) -> Result<Asset, AssetLoadError> {
        let resolver = SelfLinkResolver;
        self.assets
            .iter()
            .find(|asset| asset.name == address)
            .or_else(|| {
                self.assets
                    .iter()
                    .find(|asset| resolver.same_resource(&asset.name, address))
            })
            .cloned()
            .ok_or_else(|| AssetLoadError::NotFound {
                address: address.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AssetLoadError, DocumentSource, FileDocumentSource};

    const ASSETS: &str = r#"[
      {
        "name": "//container.googleapis.com/projects/p1/locations/us-central1/clusters/alpha",
        "asset_type": "container.googleapis.com/Cluster",
        "ancestors": ["projects/1234"],
        "resource": {
          "version": "v1",
          "discovery_document_uri": "https://container.googleapis.com/$discovery/rest",
          "discovery_name": "Cluster",
          "parent": "//cloudresourcemanager.googleapis.com/projects/1234",
          "location": "us-central1",
          "data": {"name": "alpha", "location": "us-central1"}
        }
      },
      {
        "name": "//container.googleapis.com/projects/p1/locations/us-central1/clusters/beta",
        "asset_type": "container.googleapis.com/Cluster"
      }
    ]"#;

    #[test]
    fn fetch_matches_full_and_short_names() {
        let source = FileDocumentSource::parse(ASSETS, "inline").expect("assets parse");
        assert_eq!(source.assets().len(), 2);

        let alpha = source.fetch("alpha").expect("short name");
        assert_eq!(
            alpha.document().expect("data"),
            &json!({"name": "alpha", "location": "us-central1"})
        );
        assert_eq!(alpha.ancestors, vec!["projects/1234".to_string()]);

        let by_relative = source
            .fetch("projects/p1/locations/us-central1/clusters/alpha")
            .expect("relative name");
        assert_eq!(by_relative.name, alpha.name);
    }

    #[test]
    fn missing_assets_and_data_are_errors() {
        let source = FileDocumentSource::parse(ASSETS, "inline").expect("assets parse");
        assert!(matches!(source.fetch("gamma"), Err(AssetLoadError::NotFound { .. })));

        let beta = source.fetch("beta").expect("beta");
        assert!(matches!(beta.document(), Err(AssetLoadError::MissingResource { .. })));
    }

    #[test]
    fn malformed_files_report_their_origin() {
        let err = FileDocumentSource::parse("{", "assets.json").expect_err("bad json");
        assert!(err.to_string().starts_with("failed to parse assets file assets.json"));
    }
}
