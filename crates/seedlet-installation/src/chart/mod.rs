//! Chart rendering
//!
//! A chart arrives as a gzip-compressed tar archive inside the provider
//! config of a ControllerDeployment. Rendering turns it into a set of
//! manifests keyed by their path inside the chart.
//!
//! ```text
//! providerConfig ──decode──▶ PackageDescriptor { chart, values }
//!                                   │
//!           values + injected ──────┤
//!                                   ▼
//!                         ChartRenderer::render_archive
//!                                   │
//!                                   ▼
//!                 RenderedRelease ──as_secret_data──▶ Secret.data
//! ```

mod archive;
mod engine;
mod filters;

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer};

#[cfg(test)]
use mockall::automock;

use seedlet_common::Error;

pub use engine::ArchiveRenderer;

/// Renders chart archives into manifests
#[cfg_attr(test, automock)]
pub trait ChartRenderer: Send + Sync {
    /// Render `archive` as release `release` into `namespace` with `values`
    fn render_archive(
        &self,
        archive: &[u8],
        release: &str,
        namespace: &str,
        values: &serde_json::Value,
    ) -> Result<RenderedRelease, Error>;
}

/// Output of a chart render
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedRelease {
    /// Release name
    pub name: String,
    /// Namespace the release was rendered for
    pub namespace: String,
    /// Rendered manifests keyed by `<chart>/<path>`
    pub manifests: BTreeMap<String, String>,
}

impl RenderedRelease {
    /// Manifests as secret data. Secret keys cannot contain `/`, so path
    /// separators become `_`.
    pub fn as_secret_data(&self) -> BTreeMap<String, Vec<u8>> {
        self.manifests
            .iter()
            .map(|(path, content)| (path.replace('/', "_"), content.clone().into_bytes()))
            .collect()
    }
}

/// Provider config of a chart-type ControllerDeployment
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PackageDescriptor {
    /// Chart archive, base64-encoded on the wire
    #[serde(deserialize_with = "decode_base64")]
    pub chart: Vec<u8>,

    /// Values supplied by the extension author
    #[serde(default)]
    pub values: Option<serde_json::Map<String, serde_json::Value>>,
}

impl PackageDescriptor {
    /// Decode the descriptor from a ControllerDeployment's provider config
    pub fn from_provider_config(config: &serde_json::Value) -> Result<Self, Error> {
        Self::deserialize(config)
            .map_err(|e| Error::serialization_for_kind("ControllerDeployment", e.to_string()))
    }

    /// Supplied values as a JSON object, empty if none were given
    pub fn values(&self) -> serde_json::Value {
        serde_json::Value::Object(self.values.clone().unwrap_or_default())
    }
}

fn decode_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| serde::de::Error::custom(format!("chart is not valid base64: {e}")))
}
