// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! LabelMe JSON readers.

use super::types::AnnotationDocument;
use crate::Error;
use itertools::Itertools;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

/// Options for LabelMe reading.
#[derive(Debug, Clone, Default)]
pub struct LabelmeReadOptions {
    /// If true, validate image size and every shape after parsing.
    pub validate: bool,
}

/// Reader for LabelMe annotation documents.
///
/// # Example
///
/// ```rust,no_run
/// use labelme_reconcile::labelme::LabelmeReader;
///
/// let reader = LabelmeReader::new();
/// let document = reader.read_json("annotations/area_01.json")?;
/// println!("Loaded {} shapes", document.shapes.len());
/// # Ok::<(), labelme_reconcile::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LabelmeReader {
    options: LabelmeReadOptions,
}

impl LabelmeReader {
    /// Create a new reader with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new reader with custom options.
    pub fn with_options(options: LabelmeReadOptions) -> Self {
        Self { options }
    }

    /// Read one annotation document.
    ///
    /// Malformed JSON, or JSON that is not a LabelMe document, is reported as
    /// `DocumentParseError` carrying the offending path.
    pub fn read_json<P: AsRef<Path>>(&self, path: P) -> Result<AnnotationDocument, Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(64 * 1024, file);
        let document: AnnotationDocument = serde_json::from_reader(reader)
            .map_err(|e| Error::DocumentParseError(path.display().to_string(), e))?;

        if self.options.validate {
            document.validate()?;
        }

        Ok(document)
    }

    /// List the `.json` documents directly inside `dir`, sorted by file name.
    pub fn list_documents<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>, Error> {
        list_files_with_extension(dir.as_ref(), "json")
    }
}

/// List regular files directly inside `dir` whose extension matches
/// `extension` (case-insensitive), sorted by file name.
pub fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, Error> {
    if !dir.is_dir() {
        return Err(Error::InvalidParameters(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        {
            files.push(entry.into_path());
        }
    }

    Ok(files
        .into_iter()
        .sorted_by(|a, b| a.file_name().cmp(&b.file_name()))
        .collect())
}
