// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Boundary to an external object detector.
//!
//! The detector itself (model loading, inference) lives outside this crate.
//! Implement [`Detector`] over it to turn its boxes into initial LabelMe
//! documents that the differencing and merge passes can consume.

use super::{
    file_stem,
    geometry::BoundingBox,
    image_size::image_dimensions,
    reader::list_files_with_extension,
    types::{AnnotationDocument, Shape},
    writer::LabelmeWriter,
};
use crate::Error;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// A single detection in pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: String,
}

/// An object detector producing labeled boxes for an image file.
pub trait Detector {
    fn detect(&self, image: &Path) -> Result<Vec<Detection>, Error>;
}

/// Run `detector` on `image` and build a LabelMe document from the result.
///
/// Every detection becomes a rectangle with top-left/bottom-right corners.
/// `imagePath` is the image file name; the size comes from the image header.
pub fn annotate_image<D: Detector + ?Sized>(
    detector: &D,
    image: &Path,
) -> Result<AnnotationDocument, Error> {
    let (width, height) = image_dimensions(image)?;
    let image_name = image
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut document = AnnotationDocument::new(image_name, width, height);
    document.shapes = detector
        .detect(image)?
        .into_iter()
        .map(|d| {
            let [top_left, bottom_right] = d.bbox.corners();
            Shape::rectangle(d.label, top_left, bottom_right)
        })
        .collect();

    Ok(document)
}

/// Annotate every `*.<extension>` image in `dir`, writing `<stem>.json` next
/// to each image. Returns the written document paths; images that fail are
/// logged and left without a document.
pub fn annotate_folder<D: Detector + Sync + ?Sized>(
    detector: &D,
    writer: &LabelmeWriter,
    dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, Error> {
    let images = list_files_with_extension(dir, extension)?;

    let written = images
        .par_iter()
        .filter_map(|image| {
            let destination = dir.join(format!("{}.json", file_stem(image)));
            let result = annotate_image(detector, image)
                .and_then(|document| writer.write_json(&document, &destination));
            match result {
                Ok(()) => Some(destination),
                Err(err) => {
                    log_skip!(&image.display().to_string(), &err);
                    None
                }
            }
        })
        .collect();

    Ok(written)
}
