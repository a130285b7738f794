// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # LabelMe Annotation Reconciliation
//!
//! This module reconciles LabelMe annotation documents produced over tiled or
//! duplicated images.
//!
//! ## Supported Workflows
//!
//! 1. **Differencing**: compare two annotation sets for the same images and
//!    keep only the boxes that have no overlapping counterpart
//! 2. **Tile merge**: rebuild a full-image document from per-tile documents
//!    named `<image>_x_<col>_y_<row>.json`
//! 3. **Maintenance**: standardize documents in place and collect images that
//!    still lack annotations
//! 4. **Detector boundary**: build initial documents from an external detector
//!
//! ## Example
//!
//! ```rust,no_run
//! use labelme_reconcile::labelme::{DiffMode, LabelmeReader, diff};
//!
//! let reader = LabelmeReader::new();
//! let ours = reader.read_json("model_a/area_01.json")?;
//! let theirs = reader.read_json("model_b/area_01.json")?;
//!
//! let different = diff(&ours.shapes, &theirs.shapes, 0.5, DiffMode::Symmetric)?;
//! println!("{} boxes differ", different.len());
//! # Ok::<(), labelme_reconcile::Error>(())
//! ```

use std::path::Path;

/// Log a per-item skip with its error kind under the calling module's target.
/// Missing counterparts are expected in partial datasets and logged at info.
macro_rules! log_skip {
    ($name:expr, $err:expr) => {{
        let err: &$crate::Error = $err;
        match err {
            $crate::Error::MissingCounterpart(_) => {
                log::info!("Skipping {} ({}): {}", $name, err.kind(), err)
            }
            _ => log::warn!("Skipping {} ({}): {}", $name, err.kind(), err),
        }
    }};
}

mod detect;
mod diff;
mod geometry;
mod image_size;
mod merge;
mod reader;
mod standardize;
mod tiles;
mod types;
mod writer;

// Re-export types
pub use types::{AnnotationDocument, LABELME_VERSION, Point, Shape, ShapeKind};

// Re-export geometry
pub use geometry::{BoundingBox, bbox_from_points, iou};

// Re-export readers/writers
pub use image_size::image_dimensions;
pub use reader::{LabelmeReadOptions, LabelmeReader, list_files_with_extension};
pub use writer::{LabelmeWriteOptions, LabelmeWriter};

// Re-export reconciliation
pub use diff::{
    DiffMode, DiffOptions, DiffReport, DiffStatus, ImageOutcome, diff, diff_folders,
    persist_with_image,
};
pub use merge::{
    MergeOutcome, MergeReport, MergeStatus, merge, merge_folder, merge_images, merge_to_file,
};
pub use tiles::{TileOffset, is_tile_of, parse_offset};

// Re-export maintenance and detector boundary
pub use detect::{Detection, Detector, annotate_folder, annotate_image};
pub use standardize::{
    CopyReport, StandardizeOptions, StandardizeReport, copy_unannotated_images,
    standardize_document, standardize_folder,
};

/// File stem of `path` as an owned string, empty when there is none.
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
