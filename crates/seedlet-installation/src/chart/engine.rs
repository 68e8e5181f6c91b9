//! Template engine for chart archives
//!
//! Templates use MiniJinja syntax. The render context exposes:
//! - `Values`: chart defaults merged with the supplied values
//! - `Release`: `Name`, `Namespace`, `Service`
//! - `Chart`: `Name`, `Version`
//!
//! Files under `templates/` whose name starts with `_` are partials: they can
//! be included or imported but are not emitted. `NOTES.txt` is never emitted.

use std::collections::BTreeMap;
use std::path::Path;

use minijinja::{context, AutoEscape, Environment, UndefinedBehavior, Value};
use tracing::debug;

use seedlet_common::Error;

use super::archive::{self, ChartFiles};
use super::{filters, ChartRenderer, RenderedRelease};
use crate::values::merge_values;

const NOTES_FILE: &str = "NOTES.txt";
const RELEASE_SERVICE: &str = "Seedlet";

/// Renders gzip-compressed chart archives in-process
#[derive(Clone, Debug, Default)]
pub struct ArchiveRenderer;

impl ArchiveRenderer {
    /// Create a new renderer
    pub fn new() -> Self {
        Self
    }

    fn render_chart(
        chart: &ChartFiles,
        release: &str,
        namespace: &str,
        values: &serde_json::Value,
    ) -> Result<BTreeMap<String, String>, minijinja::Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        filters::register(&mut env);

        for (path, source) in &chart.templates {
            env.add_template(path.as_str(), source.as_str())?;
        }

        let ctx = context! {
            Values => Value::from_serialize(values),
            Release => context! {
                Name => release,
                Namespace => namespace,
                Service => RELEASE_SERVICE,
            },
            Chart => context! {
                Name => &chart.metadata.name,
                Version => &chart.metadata.version,
            },
        };

        let mut manifests = BTreeMap::new();
        for path in chart.templates.keys() {
            if !is_emitted(path) {
                continue;
            }
            let rendered = env.get_template(path)?.render(&ctx)?;
            if rendered.trim().is_empty() {
                debug!(template = %path, "template rendered empty, skipping");
                continue;
            }
            manifests.insert(format!("{}/{}", chart.metadata.name, path), rendered);
        }
        Ok(manifests)
    }
}

impl ChartRenderer for ArchiveRenderer {
    fn render_archive(
        &self,
        archive: &[u8],
        release: &str,
        namespace: &str,
        values: &serde_json::Value,
    ) -> Result<RenderedRelease, Error> {
        let chart = archive::unpack(archive, release)?;

        let mut merged = chart.defaults.clone();
        merge_values(&mut merged, values.clone());

        let manifests = Self::render_chart(&chart, release, namespace, &merged)
            .map_err(|e| Error::render(release, e.to_string()))?;

        debug!(
            release = %release,
            chart = %chart.metadata.name,
            manifests = manifests.len(),
            "rendered chart"
        );

        Ok(RenderedRelease {
            name: release.to_string(),
            namespace: namespace.to_string(),
            manifests,
        })
    }
}

fn is_emitted(path: &str) -> bool {
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    !file_name.starts_with('_') && file_name != NOTES_FILE
}
