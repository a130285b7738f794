// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Reassembly of per-tile annotation documents into one full-image document.
//!
//! Every shape of every tile is shifted by the tile's offset and appended to a
//! single list. Shapes detected twice in the overlap between neighbouring
//! tiles are kept twice: merging never drops or coalesces shapes, so the
//! merged shape count is always the sum of the tile shape counts. Use the
//! differencing pass to find such duplicates.

use super::{
    file_stem,
    image_size::image_dimensions,
    reader::LabelmeReader,
    tiles::{is_tile_of, parse_offset},
    types::AnnotationDocument,
    writer::LabelmeWriter,
};
use crate::Error;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Merge tile documents into a document for the full image.
///
/// `tiles` pairs each tile identifier (its file name) with its document.
/// Tiles are processed in lexicographic identifier order so repeated runs
/// produce identical output. The first tile in that order provides the
/// document metadata (version, flags, extra keys); its shapes are replaced by
/// the merged list, `imagePath`/`imageWidth`/`imageHeight` describe the full
/// image and `imageData` is cleared.
///
/// # Errors
/// - `NoMatchingTiles` if `tiles` is empty.
/// - `MalformedOffset` if an identifier carries no `_x_<n>_y_<n>` offset.
///
/// # Example
/// ```
/// use labelme_reconcile::labelme::{AnnotationDocument, Shape, merge};
///
/// let mut tile = AnnotationDocument::new("img_x_100_y_0.png", 100, 100);
/// tile.shapes.push(Shape::rectangle("car", [10.0, 10.0], [20.0, 20.0]));
///
/// let merged = merge(vec![("img_x_100_y_0.json".to_string(), tile)], "img.png", 200, 100)?;
/// assert_eq!(merged.shapes[0].points[0], [110.0, 10.0]);
/// # Ok::<(), labelme_reconcile::Error>(())
/// ```
pub fn merge(
    mut tiles: Vec<(String, AnnotationDocument)>,
    image_path: &str,
    full_width: u32,
    full_height: u32,
) -> Result<AnnotationDocument, Error> {
    tiles.sort_by(|a, b| a.0.cmp(&b.0));

    let mut shapes = Vec::new();
    let mut template: Option<AnnotationDocument> = None;

    for (identifier, mut document) in tiles {
        let offset = parse_offset(&identifier)?;
        let (dx, dy) = (f64::from(offset.x), f64::from(offset.y));

        let tile_shapes = std::mem::take(&mut document.shapes);
        log::debug!(
            "{}: {} shapes at offset ({}, {})",
            identifier,
            tile_shapes.len(),
            offset.x,
            offset.y
        );
        shapes.extend(tile_shapes.iter().map(|s| s.translated(dx, dy)));

        if template.is_none() {
            template = Some(document);
        }
    }

    let template = template.ok_or_else(|| Error::NoMatchingTiles(image_path.to_owned()))?;

    Ok(AnnotationDocument {
        shapes,
        image_path: image_path.to_owned(),
        image_data: None,
        image_width: full_width,
        image_height: full_height,
        ..template
    })
}

/// Result of merging one full image from a tile folder.
#[derive(Debug)]
pub struct MergeReport {
    /// The merged full-image document.
    pub document: AnnotationDocument,
    /// Identifiers of the tiles that were merged, in merge order.
    pub tiles: Vec<String>,
    /// Tiles that matched the image but could not be read.
    pub skipped: Vec<(String, Error)>,
}

/// Merge every tile document in `tile_dir` that belongs to `image`.
///
/// Tiles are the `.json` files named `<image stem>_x_<n>_y_<n>...`. The full
/// image's size is read from its header. A tile whose offset does not fit or
/// whose document cannot be read is logged and listed in
/// [`MergeReport::skipped`]; the remaining tiles are still merged.
///
/// # Errors
/// `NoMatchingTiles` if no readable tile exists, plus I/O and image size
/// errors for the full image itself.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn merge_folder(
    reader: &LabelmeReader,
    tile_dir: &Path,
    image: &Path,
) -> Result<MergeReport, Error> {
    let base_name = file_stem(image);
    let (width, height) = image_dimensions(image)?;

    let mut tiles = Vec::new();
    let mut skipped = Vec::new();

    for path in reader.list_documents(tile_dir)? {
        let identifier = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if !is_tile_of(&identifier, &base_name) {
            continue;
        }

        match parse_offset(&identifier).and_then(|_| reader.read_json(&path)) {
            Ok(document) => tiles.push((identifier, document)),
            Err(err) => {
                log_skip!(&identifier, &err);
                skipped.push((identifier, err));
            }
        }
    }

    if tiles.is_empty() {
        return Err(Error::NoMatchingTiles(base_name));
    }

    let mut identifiers: Vec<String> = tiles.iter().map(|(id, _)| id.clone()).collect();
    identifiers.sort();

    let document = merge(tiles, &image.display().to_string(), width, height)?;
    log::info!(
        "Merged {} shapes from {} tiles into {} ({}x{})",
        document.shapes.len(),
        identifiers.len(),
        image.display(),
        width,
        height
    );

    Ok(MergeReport {
        document,
        tiles: identifiers,
        skipped,
    })
}

/// What happened to one full image of a batch merge.
#[derive(Debug)]
pub enum MergeStatus {
    /// The merged document was written.
    Written {
        document: PathBuf,
        tiles: usize,
        shapes: usize,
        skipped_tiles: usize,
    },
    /// The image could not be merged or written.
    Failed(Error),
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub image: PathBuf,
    pub status: MergeStatus,
}

/// Merge several full images from one tile folder, writing
/// `output_dir/<image stem>.json` for each.
///
/// Images are merged in parallel and independently: a failure is logged and
/// recorded in that image's outcome. Outcomes are returned in `images` order.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn merge_images<F>(
    reader: &LabelmeReader,
    writer: &LabelmeWriter,
    tile_dir: &Path,
    images: &[PathBuf],
    output_dir: &Path,
    on_outcome: F,
) -> Result<Vec<MergeOutcome>, Error>
where
    F: Fn(&MergeOutcome) + Sync,
{
    if !tile_dir.is_dir() {
        return Err(Error::InvalidParameters(format!(
            "{} is not a directory",
            tile_dir.display()
        )));
    }
    std::fs::create_dir_all(output_dir)?;

    Ok(images
        .par_iter()
        .map(|image| {
            let destination = output_dir.join(format!("{}.json", file_stem(image)));
            let status = match merge_to_file(reader, writer, tile_dir, image, &destination) {
                Ok(status) => status,
                Err(err) => {
                    log_skip!(&image.display().to_string(), &err);
                    MergeStatus::Failed(err)
                }
            };
            let outcome = MergeOutcome {
                image: image.clone(),
                status,
            };
            on_outcome(&outcome);
            outcome
        })
        .collect())
}

/// Merge one full image and write the document to `destination`.
pub fn merge_to_file(
    reader: &LabelmeReader,
    writer: &LabelmeWriter,
    tile_dir: &Path,
    image: &Path,
    destination: &Path,
) -> Result<MergeStatus, Error> {
    let report = merge_folder(reader, tile_dir, image)?;
    writer.write_json(&report.document, destination)?;

    Ok(MergeStatus::Written {
        document: destination.to_path_buf(),
        tiles: report.tiles.len(),
        shapes: report.document.shapes.len(),
        skipped_tiles: report.skipped.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labelme::Shape;
    use serde_json::Value;

    fn tile(name: &str, shapes: Vec<Shape>) -> (String, AnnotationDocument) {
        let mut doc = AnnotationDocument::new(name.replace(".json", ".png"), 100, 100);
        doc.image_data = Some("iVBORw0KGgo=".to_string());
        doc.shapes = shapes;
        (name.to_string(), doc)
    }

    #[test]
    fn test_merge_applies_offsets() {
        let tiles = vec![
            tile(
                "img_x_0_y_0.json",
                vec![Shape::rectangle("a", [10.0, 10.0], [20.0, 20.0])],
            ),
            tile(
                "img_x_100_y_0.json",
                vec![Shape::rectangle("b", [10.0, 10.0], [20.0, 20.0])],
            ),
        ];

        let merged = merge(tiles, "/data/img.png", 200, 100).unwrap();
        assert_eq!(merged.shapes.len(), 2);
        assert_eq!(merged.shapes[0].points[0], [10.0, 10.0]);
        assert_eq!(merged.shapes[1].points[0], [110.0, 10.0]);
        assert_eq!(merged.shapes[1].points[1], [120.0, 20.0]);
        assert_eq!(merged.image_path, "/data/img.png");
        assert_eq!(merged.image_width, 200);
        assert_eq!(merged.image_height, 100);
        assert!(merged.image_data.is_none());
    }

    #[test]
    fn test_merge_empty() {
        assert!(matches!(
            merge(vec![], "img.png", 10, 10),
            Err(Error::NoMatchingTiles(_))
        ));
    }

    #[test]
    fn test_merge_malformed_identifier() {
        let tiles = vec![tile("img_tile_3.json", vec![])];
        assert!(matches!(
            merge(tiles, "img.png", 10, 10),
            Err(Error::MalformedOffset(_))
        ));
    }

    #[test]
    fn test_merge_order_is_deterministic() {
        let a = tile(
            "img_x_0_y_100.json",
            vec![Shape::rectangle("a", [0.0, 0.0], [1.0, 1.0])],
        );
        let b = tile(
            "img_x_0_y_0.json",
            vec![Shape::rectangle("b", [0.0, 0.0], [1.0, 1.0])],
        );

        let forward = merge(vec![a.clone(), b.clone()], "img.png", 100, 200).unwrap();
        let backward = merge(vec![b, a], "img.png", 100, 200).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward.shapes[0].label, "b");
        assert_eq!(forward.shapes[1].points[0], [0.0, 100.0]);
    }

    #[test]
    fn test_merge_template_from_first_tile() {
        let (id_a, mut doc_a) = tile("img_x_0_y_0.json", vec![]);
        doc_a.version = "4.6.0".to_string();
        doc_a.flags.insert("checked".to_string(), Value::Bool(true));
        doc_a
            .extra
            .insert("source".to_string(), Value::String("drone".to_string()));

        let (id_b, mut doc_b) = tile("img_x_50_y_0.json", vec![]);
        doc_b.version = "5.4.1".to_string();

        let merged = merge(vec![(id_b, doc_b), (id_a, doc_a)], "img.png", 150, 100).unwrap();
        assert_eq!(merged.version, "4.6.0");
        assert_eq!(merged.flags["checked"], Value::Bool(true));
        assert_eq!(merged.extra["source"], "drone");
    }

    #[test]
    fn test_merge_preserves_shape_count_and_metadata() {
        let mut polygon = Shape::polygon("roof", vec![[0.0, 0.0], [5.0, 0.0], [5.0, 5.0]]);
        polygon.group_id = Some(7);
        polygon
            .flags
            .insert("occluded".to_string(), Value::Bool(true));

        // The same object seen by two overlapping tiles stays duplicated.
        let tiles = vec![
            tile(
                "img_x_0_y_0.json",
                vec![polygon.clone(), Shape::rectangle("car", [90.0, 0.0], [99.0, 9.0])],
            ),
            tile(
                "img_x_80_y_0.json",
                vec![Shape::rectangle("car", [10.0, 0.0], [19.0, 9.0])],
            ),
        ];

        let merged = merge(tiles, "img.png", 180, 100).unwrap();
        assert_eq!(merged.shapes.len(), 3);
        assert_eq!(merged.shapes[0], polygon);
        assert_eq!(merged.shapes[1].points, merged.shapes[2].points);
    }
}
