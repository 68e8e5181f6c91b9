//! Chart archive unpacking

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use serde::Deserialize;
use tar::Archive;

use seedlet_common::Error;

const CHART_FILE: &str = "Chart.yaml";
const VALUES_FILE: &str = "values.yaml";
const TEMPLATES_DIR: &str = "templates/";

/// Largest single file accepted from a chart archive
const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;
/// Largest total unpacked size accepted from a chart archive
const MAX_UNPACKED_SIZE: u64 = 20 * 1024 * 1024;

/// Size caps applied while decompressing a chart archive
#[derive(Clone, Copy, Debug)]
struct UnpackLimits {
    file: u64,
    total: u64,
}

const DEFAULT_LIMITS: UnpackLimits = UnpackLimits {
    file: MAX_FILE_SIZE,
    total: MAX_UNPACKED_SIZE,
};

/// Required fields of `Chart.yaml`
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct ChartMetadata {
    pub name: String,
    pub version: String,
}

/// An unpacked chart
#[derive(Debug)]
pub(crate) struct ChartFiles {
    pub metadata: ChartMetadata,
    /// Default values from `values.yaml`, an empty object if absent
    pub defaults: serde_json::Value,
    /// Template sources keyed by path relative to the chart root
    pub templates: BTreeMap<String, String>,
}

/// Unpack a gzip-compressed chart archive.
///
/// Paths are taken relative to the archive's top-level directory, which
/// conventionally carries the chart name.
pub(crate) fn unpack(archive: &[u8], release: &str) -> Result<ChartFiles, Error> {
    unpack_within(archive, release, DEFAULT_LIMITS)
}

fn unpack_within(archive: &[u8], release: &str, limits: UnpackLimits) -> Result<ChartFiles, Error> {
    let files = read_entries(archive, limits)
        .map_err(|e| Error::render(release, format!("failed to read chart archive: {e}")))?;

    let chart_yaml = files
        .get(CHART_FILE)
        .ok_or_else(|| Error::render(release, "chart archive has no Chart.yaml"))?;
    let metadata: ChartMetadata = serde_yaml::from_slice(chart_yaml)
        .map_err(|e| Error::render(release, format!("invalid Chart.yaml: {e}")))?;

    let defaults = match files.get(VALUES_FILE) {
        Some(raw) => match serde_yaml::from_slice::<serde_json::Value>(raw)
            .map_err(|e| Error::render(release, format!("invalid values.yaml: {e}")))?
        {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            v @ serde_json::Value::Object(_) => v,
            _ => return Err(Error::render(release, "values.yaml must be a mapping")),
        },
        None => serde_json::Value::Object(Default::default()),
    };

    let mut templates = BTreeMap::new();
    for (path, raw) in &files {
        if !path.starts_with(TEMPLATES_DIR) {
            continue;
        }
        let source = String::from_utf8(raw.clone())
            .map_err(|_| Error::render(release, format!("template {path} is not valid UTF-8")))?;
        templates.insert(path.clone(), source);
    }

    Ok(ChartFiles {
        metadata,
        defaults,
        templates,
    })
}

fn read_entries(
    archive: &[u8],
    limits: UnpackLimits,
) -> std::io::Result<BTreeMap<String, Vec<u8>>> {
    let mut files = BTreeMap::new();
    let mut total = 0u64;
    let mut tar = Archive::new(GzDecoder::new(archive));

    for entry in tar.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let Some(path) = chart_relative_path(&entry.path()?) else {
            continue;
        };
        // Header sizes can lie, so cap what is actually decompressed
        let mut content = Vec::new();
        (&mut entry)
            .take(limits.file + 1)
            .read_to_end(&mut content)?;
        let size = content.len() as u64;
        if size > limits.file {
            return Err(std::io::Error::other(format!(
                "{path} exceeds the {} byte file limit",
                limits.file
            )));
        }
        total += size;
        if total > limits.total {
            return Err(std::io::Error::other(format!(
                "unpacked chart exceeds the {} byte limit",
                limits.total
            )));
        }
        files.insert(path, content);
    }

    Ok(files)
}

/// Strip the top-level directory; skip anything that would escape the chart
fn chart_relative_path(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components().skip(1) {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}


#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = "name: calico\nversion: 1.2.3\n";

    #[test]
    fn unpack_reads_metadata_defaults_and_templates() {
        let archive = test_archive::build(
            "calico",
            &[
                ("Chart.yaml", CHART),
                ("values.yaml", "replicas: 1\nimage:\n  tag: v1\n"),
                ("templates/deployment.yaml", "kind: Deployment"),
                ("templates/_helpers.tpl", "{% macro x() %}{% endmacro %}"),
                ("README.md", "docs"),
            ],
        );

        let chart = unpack(&archive, "calico").expect("unpack");
        assert_eq!(chart.metadata.name, "calico");
        assert_eq!(chart.metadata.version, "1.2.3");
        assert_eq!(chart.defaults["image"]["tag"], "v1");
        assert_eq!(
            chart.templates.keys().collect::<Vec<_>>(),
            vec!["templates/_helpers.tpl", "templates/deployment.yaml"]
        );
    }

    #[test]
    fn missing_values_file_means_empty_defaults() {
        let archive = test_archive::build("calico", &[("Chart.yaml", CHART)]);
        let chart = unpack(&archive, "calico").expect("unpack");
        assert_eq!(chart.defaults, serde_json::json!({}));
        assert!(chart.templates.is_empty());
    }

    #[test]
    fn chart_yaml_is_required() {
        let archive = test_archive::build("calico", &[("templates/a.yaml", "a: b")]);
        let err = unpack(&archive, "calico").unwrap_err();
        assert!(err.to_string().contains("Chart.yaml"));

        let archive = test_archive::build("calico", &[("Chart.yaml", "name: calico\n")]);
        let err = unpack(&archive, "calico").unwrap_err();
        assert!(err.to_string().contains("invalid Chart.yaml"));
    }

    #[test]
    fn garbage_is_not_an_archive() {
        let err = unpack(b"definitely not gzip", "calico").unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
    }

    /// Story: A chart that decompresses into something huge is rejected
    /// before it is held in memory
    #[test]
    fn story_oversized_archives_are_rejected() {
        let limits = UnpackLimits {
            file: 64,
            total: 100,
        };
        let big = "x".repeat(65);
        let archive = test_archive::build(
            "calico",
            &[("Chart.yaml", CHART), ("templates/big.yaml", &big)],
        );
        let err = unpack_within(&archive, "calico", limits).unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
        assert!(err.to_string().contains("templates/big.yaml exceeds the 64 byte file limit"));

        let medium = "y".repeat(60);
        let archive = test_archive::build(
            "calico",
            &[
                ("Chart.yaml", CHART),
                ("templates/a.yaml", &medium),
                ("templates/b.yaml", &medium),
            ],
        );
        let err = unpack_within(&archive, "calico", limits).unwrap_err();
        assert!(err.to_string().contains("unpacked chart exceeds the 100 byte limit"));

        let archive = test_archive::build(
            "calico",
            &[("Chart.yaml", CHART), ("templates/a.yaml", &medium)],
        );
        assert!(unpack_within(&archive, "calico", limits).is_ok());
    }

    #[test]
    fn relative_paths_drop_the_root_directory() {
        assert_eq!(
            chart_relative_path(Path::new("calico/templates/a.yaml")).as_deref(),
            Some("templates/a.yaml")
        );
        assert_eq!(chart_relative_path(Path::new("calico")), None);
        assert_eq!(chart_relative_path(Path::new("calico/../etc/passwd")), None);
    }
}
