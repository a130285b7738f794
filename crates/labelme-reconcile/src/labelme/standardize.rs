// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Folder maintenance for LabelMe datasets.
//!
//! - [`standardize_folder`] rewrites documents in place so they reference
//!   their sibling image by name, carry no embedded pixels, and drop shapes
//!   with unwanted labels.
//! - [`copy_unannotated_images`] collects the images that still need labels.

use super::{
    file_stem,
    reader::{LabelmeReader, list_files_with_extension},
    types::AnnotationDocument,
    writer::LabelmeWriter,
};
use crate::Error;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

/// Options for [`standardize_document`].
#[derive(Debug, Clone)]
pub struct StandardizeOptions {
    /// Extension of the image each document describes, without the dot.
    pub image_extension: String,
    /// Shapes with one of these labels are removed.
    pub remove_labels: Vec<String>,
}

impl Default for StandardizeOptions {
    fn default() -> Self {
        Self {
            image_extension: "tif".to_owned(),
            remove_labels: Vec::new(),
        }
    }
}

/// Standardize one document that was read from `json_path`.
///
/// Clears `imageData`, sets `imagePath` to `<json stem>.<image_extension>`
/// and removes shapes whose label is listed in `remove_labels`. Returns the
/// number of removed shapes.
pub fn standardize_document(
    document: &mut AnnotationDocument,
    json_path: &Path,
    options: &StandardizeOptions,
) -> usize {
    document.image_data = None;
    document.image_path = format!("{}.{}", file_stem(json_path), options.image_extension);

    let remove: HashSet<&str> = options.remove_labels.iter().map(String::as_str).collect();
    let before = document.shapes.len();
    document
        .shapes
        .retain(|shape| !remove.contains(shape.label.as_str()));
    before - document.shapes.len()
}

/// Per-folder result of [`standardize_folder`].
#[derive(Debug, Default)]
pub struct StandardizeReport {
    /// Rewritten documents with the number of shapes removed from each.
    pub updated: Vec<(PathBuf, usize)>,
    /// Documents that could not be read or written.
    pub failed: Vec<(PathBuf, Error)>,
}

impl StandardizeReport {
    pub fn removed_shapes(&self) -> usize {
        self.updated.iter().map(|(_, n)| n).sum()
    }
}

/// Standardize every `.json` document directly inside `dir`, in place.
///
/// Each document is handled on its own; failures are logged and collected in
/// the report.
pub fn standardize_folder(
    reader: &LabelmeReader,
    writer: &LabelmeWriter,
    dir: &Path,
    options: &StandardizeOptions,
) -> Result<StandardizeReport, Error> {
    let mut report = StandardizeReport::default();

    for path in reader.list_documents(dir)? {
        let result = reader.read_json(&path).and_then(|mut document| {
            let removed = standardize_document(&mut document, &path, options);
            writer.write_json(&document, &path)?;
            Ok(removed)
        });

        match result {
            Ok(removed) => {
                log::info!(
                    "{}: removed {} shape(s) with labels {:?}",
                    path.display(),
                    removed,
                    options.remove_labels
                );
                report.updated.push((path, removed));
            }
            Err(err) => {
                log_skip!(&path.display().to_string(), &err);
                report.failed.push((path, err));
            }
        }
    }

    Ok(report)
}

/// Result of [`copy_unannotated_images`].
#[derive(Debug, Default)]
pub struct CopyReport {
    /// Destination paths of the copied images, sorted.
    pub copied: Vec<PathBuf>,
    /// Source images that could not be copied.
    pub failed: Vec<(PathBuf, Error)>,
}

/// Copy every `*.<extension>` image in `src` without a sibling `.json`
/// document into `dst`.
///
/// A failed copy is logged and recorded in [`CopyReport::failed`]; the
/// remaining images are still copied.
///
/// # Errors
/// Only setup errors: `dst` cannot be created or `src` cannot be listed.
pub fn copy_unannotated_images(
    src: &Path,
    dst: &Path,
    extension: &str,
) -> Result<CopyReport, Error> {
    fs::create_dir_all(dst)?;
    let mut report = CopyReport::default();

    for image in list_files_with_extension(src, extension)? {
        if image.with_extension("json").exists() {
            log::debug!("Skipped (has .json): {}", image.display());
            continue;
        }

        let Some(file_name) = image.file_name() else {
            continue;
        };
        let destination = dst.join(file_name);
        match fs::copy(&image, &destination) {
            Ok(_) => {
                log::info!("Copied: {}", image.display());
                report.copied.push(destination);
            }
            Err(err) => {
                let err = Error::from(err);
                log_skip!(&image.display().to_string(), &err);
                report.failed.push((image, err));
            }
        }
    }

    Ok(report)
}
