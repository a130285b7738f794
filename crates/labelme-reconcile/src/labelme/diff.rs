// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! IoU-based differencing of two annotation sets for the same image.
//!
//! A rectangle is "different" when its IoU against *every* rectangle on the
//! other side is at or below the threshold, i.e. nothing on the other side
//! covers it well enough. Non-rectangle shapes take no part in the comparison
//! and are never emitted.
//!
//! [`diff_folders`] applies this to two folders of LabelMe documents, pairing
//! documents by file stem, and writes every image that has differences to an
//! output folder together with a document holding only the differing shapes.

use super::{
    file_stem,
    geometry::{BoundingBox, iou},
    reader::LabelmeReader,
    types::{AnnotationDocument, Shape},
    writer::{LabelmeWriteOptions, LabelmeWriter},
};
use crate::Error;
use rayon::prelude::*;
use std::{
    collections::HashSet,
    fmt, fs, io,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// Which side's unmatched shapes are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffMode {
    /// Unmatched shapes of A followed by unmatched shapes of B.
    #[default]
    Symmetric,
    /// Only unmatched shapes of A.
    OnlyFirst,
}

/// Return the rectangles of each side that have no counterpart on the other
/// side with IoU above `threshold`.
///
/// Survivors of A come first in their original order; in
/// [`DiffMode::Symmetric`] the survivors of B follow, also in order. An empty
/// side leaves every rectangle of the other side unmatched.
///
/// # Errors
/// - `InvalidParameters` if `threshold` is not within `[0, 1]`.
/// - `InvalidGeometry` if a rectangle has fewer than two points.
///
/// # Example
/// ```
/// use labelme_reconcile::labelme::{DiffMode, Shape, diff};
///
/// let a = vec![Shape::rectangle("car", [0.0, 0.0], [10.0, 10.0])];
/// let b = vec![Shape::rectangle("car", [1.0, 1.0], [10.0, 10.0])];
/// assert!(diff(&a, &b, 0.5, DiffMode::Symmetric).unwrap().is_empty());
/// assert_eq!(diff(&a, &[], 0.5, DiffMode::OnlyFirst).unwrap().len(), 1);
/// ```
pub fn diff(
    shapes_a: &[Shape],
    shapes_b: &[Shape],
    threshold: f64,
    mode: DiffMode,
) -> Result<Vec<Shape>, Error> {
    validate_threshold(threshold)?;

    let boxes_a = rectangle_boxes(shapes_a)?;
    let boxes_b = rectangle_boxes(shapes_b)?;

    let mut result: Vec<Shape> = unmatched(&boxes_a, &boxes_b, threshold)
        .cloned()
        .collect();

    if mode == DiffMode::Symmetric {
        result.extend(unmatched(&boxes_b, &boxes_a, threshold).cloned());
    }

    Ok(result)
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<(), Error> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(Error::InvalidParameters(format!(
            "overlap threshold must be within [0, 1], got {}",
            threshold
        )))
    }
}

fn rectangle_boxes(shapes: &[Shape]) -> Result<Vec<(&Shape, BoundingBox)>, Error> {
    shapes
        .iter()
        .filter(|s| s.is_rectangle())
        .map(|s| s.bbox().map(|b| (s, b)))
        .collect()
}

fn unmatched<'a>(
    side: &'a [(&'a Shape, BoundingBox)],
    other: &'a [(&'a Shape, BoundingBox)],
    threshold: f64,
) -> impl Iterator<Item = &'a Shape> {
    side.iter()
        .filter(move |(_, b1)| other.iter().all(|(_, b2)| iou(b1, b2) <= threshold))
        .map(|(s, _)| *s)
}

/// Options for [`diff_folders`].
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// IoU at or below which two boxes are considered not overlapping.
    pub threshold: f64,
    pub mode: DiffMode,
    pub write: LabelmeWriteOptions,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            mode: DiffMode::Symmetric,
            write: LabelmeWriteOptions::default(),
        }
    }
}

/// What happened to one image of a folder comparison.
#[derive(Debug)]
pub enum DiffStatus {
    /// Differences found; the image and a reduced document were written.
    Written {
        shapes: usize,
        image: PathBuf,
        document: PathBuf,
    },
    /// Both documents agree; nothing was written.
    NoDifferences,
    /// The image could not be compared or written.
    Skipped(Error),
}

/// Outcome for one logical image, identified by its document stem.
#[derive(Debug)]
pub struct ImageOutcome {
    pub name: String,
    pub status: DiffStatus,
}

/// Per-image outcomes of a folder comparison, in document name order.
#[derive(Debug, Default)]
pub struct DiffReport {
    pub outcomes: Vec<ImageOutcome>,
}

impl DiffReport {
    /// Number of images written to the output folder.
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DiffStatus::Written { .. }))
            .count()
    }

    /// Number of images whose documents agree.
    pub fn unchanged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DiffStatus::NoDifferences))
            .count()
    }

    /// Skipped images with the reason for each.
    pub fn skipped(&self) -> Vec<(&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                DiffStatus::Skipped(e) => Some((o.name.as_str(), e)),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} images compared: {} with differences, {} unchanged, {} skipped",
            self.outcomes.len(),
            self.written(),
            self.unchanged(),
            self.skipped().len()
        )
    }
}

/// Compare every document in `folder_a` with its namesake in `folder_b`.
///
/// For each `folder_a/<name>.json` the image `folder_a/<name>.<ext>` (the
/// extension comes from the document's `imagePath`) and `folder_b/<name>.json`
/// must exist, otherwise the image is skipped with `MissingCounterpart`. When
/// [`diff`] yields shapes, the image is copied to `output` and
/// `output/<name>.json` is written with those shapes and `imagePath` pointing
/// at the copy. If the document cannot be written the copied image is removed
/// again.
///
/// Images are processed in parallel. A failure on one image is logged and
/// recorded in the report without affecting the others. `on_outcome` is called
/// once per image as soon as it completes, from a worker thread.
///
/// Document names match `.json` case-insensitively, so `a.json` and `a.JSON`
/// share the name `a`. Only the first in file name order is compared; later
/// ones are skipped with `InvalidParameters`.
///
/// # Errors
/// Only setup problems are returned: an invalid threshold, a missing input
/// folder, an output folder that cannot be created, or an output folder that
/// is one of the input folders.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn diff_folders<F>(
    folder_a: &Path,
    folder_b: &Path,
    output: &Path,
    options: &DiffOptions,
    on_outcome: F,
) -> Result<DiffReport, Error>
where
    F: Fn(&ImageOutcome) + Sync,
{
    validate_threshold(options.threshold)?;
    if !folder_b.is_dir() {
        return Err(Error::InvalidParameters(format!(
            "{} is not a directory",
            folder_b.display()
        )));
    }

    let reader = LabelmeReader::new();
    let documents = reader.list_documents(folder_a)?;
    fs::create_dir_all(output)?;

    let output_real = fs::canonicalize(output)?;
    for input in [folder_a, folder_b] {
        if fs::canonicalize(input)? == output_real {
            return Err(Error::InvalidParameters(format!(
                "output folder {} is also an input folder",
                output.display()
            )));
        }
    }

    let mut seen = HashSet::new();
    let documents: Vec<(&PathBuf, String, bool)> = documents
        .iter()
        .map(|path| {
            let name = file_stem(path);
            let first = seen.insert(name.clone());
            (path, name, first)
        })
        .collect();

    log::info!(
        "Found {} JSON files in {}",
        documents.len(),
        folder_a.display()
    );

    let writer = LabelmeWriter::with_options(options.write.clone());
    let outcomes = documents
        .par_iter()
        .map(|(json_a, name, first)| {
            let result = if *first {
                diff_image(
                    &reader, &writer, json_a, name, folder_a, folder_b, output, options,
                )
            } else {
                Err(Error::InvalidParameters(format!(
                    "{} has the same name as an earlier document",
                    json_a.display()
                )))
            };
            let status = match result {
                Ok(Some(written)) => written,
                Ok(None) => DiffStatus::NoDifferences,
                Err(err) => {
                    log_skip!(name, &err);
                    DiffStatus::Skipped(err)
                }
            };
            let outcome = ImageOutcome {
                name: name.clone(),
                status,
            };
            on_outcome(&outcome);
            outcome
        })
        .collect();

    let report = DiffReport { outcomes };
    log::info!("{}", report);
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn diff_image(
    reader: &LabelmeReader,
    writer: &LabelmeWriter,
    json_a: &Path,
    name: &str,
    folder_a: &Path,
    folder_b: &Path,
    output: &Path,
    options: &DiffOptions,
) -> Result<Option<DiffStatus>, Error> {
    let document_a = reader.read_json(json_a)?;
    if document_a.image_path.is_empty() {
        return Err(Error::InvalidParameters(format!(
            "imagePath missing in {}",
            json_a.display()
        )));
    }

    let image_a = match Path::new(&document_a.image_path).extension() {
        Some(ext) => folder_a.join(format!("{}.{}", name, ext.to_string_lossy())),
        None => folder_a.join(name),
    };

    let json_b = folder_b.join(format!("{}.json", name));
    if !json_b.is_file() {
        return Err(Error::MissingCounterpart(json_b.display().to_string()));
    }
    if !image_a.is_file() {
        return Err(Error::MissingCounterpart(image_a.display().to_string()));
    }

    let document_b = reader.read_json(&json_b)?;
    let shapes = diff(
        &document_a.shapes,
        &document_b.shapes,
        options.threshold,
        options.mode,
    )?;

    if shapes.is_empty() {
        log::debug!("{}: no differing shapes", name);
        return Ok(None);
    }

    let image_name = image_a
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_owned());
    let image_out = output.join(&image_name);
    let document_out = output.join(format!("{}.json", name));
    let count = shapes.len();

    let document = AnnotationDocument {
        shapes,
        image_path: image_name,
        ..document_a
    };
    persist_with_image(writer, &document, &document_out, &image_a, &image_out)?;

    log::debug!("{}: wrote {} differing shapes", name, count);
    Ok(Some(DiffStatus::Written {
        shapes: count,
        image: image_out,
        document: document_out,
    }))
}

/// Copy `image_src` to `image_dst` and write `document` to `document_path`.
///
/// The pair is all-or-nothing. The image is staged in a temporary file next
/// to `image_dst` and only renamed into place after the document is written,
/// so a failed copy or write never leaves a partial image or an image without
/// its document. Copying an image onto itself leaves it intact.
pub fn persist_with_image(
    writer: &LabelmeWriter,
    document: &AnnotationDocument,
    document_path: &Path,
    image_src: &Path,
    image_dst: &Path,
) -> Result<(), Error> {
    let parent = match image_dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut source = fs::File::open(image_src)?;
    let mut staged = NamedTempFile::new_in(parent)?;
    io::copy(&mut source, staged.as_file_mut())?;
    staged
        .as_file()
        .set_permissions(source.metadata()?.permissions())?;

    writer.write_json(document, document_path)?;

    if let Err(err) = staged.persist(image_dst) {
        match fs::remove_file(document_path) {
            Ok(()) => log::warn!(
                "Removed {} after failing to place {}",
                document_path.display(),
                image_dst.display()
            ),
            Err(rm) => log::error!(
                "Failed to remove {} after failing to place {}: {}",
                document_path.display(),
                image_dst.display(),
                rm
            ),
        }
        return Err(err.error.into());
    }

    Ok(())
}
