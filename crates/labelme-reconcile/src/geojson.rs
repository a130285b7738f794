// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Merging of GeoJSON FeatureCollections.
//!
//! Georeferenced exports of tiled detections end up as one FeatureCollection
//! per tile or per run. Features are opaque here: they are concatenated in
//! input order without inspection.

use crate::Error;
use serde_json::{Map, Value, json};
use std::{fs::File, io::BufReader, path::Path};

/// Inputs that contributed to or were left out of a merge.
#[derive(Debug, Default)]
pub struct GeoJsonMergeReport {
    /// Inputs merged, with the number of features taken from each.
    pub merged: Vec<(String, usize)>,
    /// Inputs skipped, with the reason.
    pub skipped: Vec<(String, Error)>,
}

impl GeoJsonMergeReport {
    pub fn feature_count(&self) -> usize {
        self.merged.iter().map(|(_, n)| n).sum()
    }
}

/// Concatenate the features of several FeatureCollection files.
///
/// The `crs` member of the first input is carried over when that input is a
/// valid FeatureCollection. Files that cannot be read, are not JSON, or are
/// not a FeatureCollection are logged and skipped.
pub fn merge_feature_collections<P: AsRef<Path>>(
    inputs: &[P],
) -> Result<(Value, GeoJsonMergeReport), Error> {
    if inputs.is_empty() {
        return Err(Error::InvalidParameters(
            "at least one GeoJSON input is required".to_owned(),
        ));
    }

    let mut report = GeoJsonMergeReport::default();
    let mut features = Vec::new();
    let mut crs = None;

    for (index, path) in inputs.iter().enumerate() {
        let path = path.as_ref();
        let name = path.display().to_string();

        match read_feature_collection(path) {
            Ok(mut collection) => {
                if index == 0 {
                    crs = collection.remove("crs");
                }
                let taken = match collection.remove("features") {
                    Some(Value::Array(items)) => {
                        let n = items.len();
                        features.extend(items);
                        n
                    }
                    _ => 0,
                };
                log::info!("Loaded {} features from '{}'", taken, name);
                report.merged.push((name, taken));
            }
            Err(err) => {
                log::warn!("Skipping '{}': {}", name, err);
                report.skipped.push((name, err));
            }
        }
    }

    let mut output = Map::new();
    output.insert("type".to_owned(), json!("FeatureCollection"));
    if let Some(crs) = crs {
        output.insert("crs".to_owned(), crs);
    }
    output.insert("features".to_owned(), Value::Array(features));

    Ok((Value::Object(output), report))
}

fn read_feature_collection(path: &Path) -> Result<Map<String, Value>, Error> {
    let file = File::open(path)?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::DocumentParseError(path.display().to_string(), e))?;

    match value {
        Value::Object(map)
            if map.get("type").and_then(Value::as_str) == Some("FeatureCollection") =>
        {
            Ok(map)
        }
        _ => Err(Error::InvalidParameters(format!(
            "{} is not a FeatureCollection",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, value: Value) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_merge_feature_collections() {
        let dir = TempDir::new().unwrap();
        let crs = json!({"type": "name", "properties": {"name": "EPSG:25832"}});
        let a = write(
            &dir,
            "a.geojson",
            json!({"type": "FeatureCollection", "crs": crs, "features": [{"id": 1}, {"id": 2}]}),
        );
        let b = write(
            &dir,
            "b.geojson",
            json!({"type": "FeatureCollection", "features": [{"id": 3}]}),
        );
        let point = write(&dir, "c.geojson", json!({"type": "Point", "coordinates": [0, 0]}));
        let broken = dir.path().join("d.geojson");
        std::fs::write(&broken, "{").unwrap();

        let (merged, report) = merge_feature_collections(&[a, b, point, broken]).unwrap();

        assert_eq!(merged["type"], "FeatureCollection");
        assert_eq!(merged["crs"], crs);
        let ids: Vec<_> = merged["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(report.feature_count(), 3);
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn test_crs_only_from_first_input() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.geojson", json!({"type": "FeatureCollection", "features": []}));
        let b = write(
            &dir,
            "b.geojson",
            json!({"type": "FeatureCollection", "crs": {"type": "name"}, "features": []}),
        );

        let (merged, _) = merge_feature_collections(&[a, b]).unwrap();
        assert!(merged.get("crs").is_none());
    }

    #[test]
    fn test_no_inputs() {
        let inputs: [&Path; 0] = [];
        assert!(merge_feature_collections(&inputs).is_err());
    }
}
