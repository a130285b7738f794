// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! LabelMe JSON writers.

use crate::Error;
use serde::Serialize;
use std::{
    io::{BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// Options for LabelMe writing.
#[derive(Debug, Clone)]
pub struct LabelmeWriteOptions {
    /// Pretty-print JSON with two-space indentation.
    pub pretty: bool,
}

impl Default for LabelmeWriteOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Writer for LabelMe documents and other JSON outputs.
///
/// # Example
///
/// ```rust,no_run
/// use labelme_reconcile::labelme::{AnnotationDocument, LabelmeWriter};
///
/// let writer = LabelmeWriter::new();
/// let document = AnnotationDocument::new("area_01.tif", 1024, 768);
/// writer.write_json(&document, "area_01.json")?;
/// # Ok::<(), labelme_reconcile::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LabelmeWriter {
    options: LabelmeWriteOptions,
}

impl LabelmeWriter {
    /// Create a new writer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new writer with custom options.
    pub fn with_options(options: LabelmeWriteOptions) -> Self {
        Self { options }
    }

    /// Serialize `value` to `path`, creating the parent directory if needed.
    ///
    /// The JSON is staged in a temporary file next to `path` and renamed into
    /// place once complete. On failure `path` is left as it was: absent, or
    /// holding its previous content.
    pub fn write_json<T: Serialize, P: AsRef<Path>>(
        &self,
        value: &T,
        path: P,
    ) -> Result<(), Error> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let staged = NamedTempFile::new_in(parent)?;
        let mut writer = BufWriter::with_capacity(64 * 1024, staged);

        if self.options.pretty {
            serde_json::to_writer_pretty(&mut writer, value)?;
        } else {
            serde_json::to_writer(&mut writer, value)?;
        }

        let staged = writer.into_inner().map_err(|e| e.into_error())?;
        staged.persist(path).map_err(|e| e.error)?;

        Ok(())
    }
}
