// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

/// Error type for annotation reconciliation.
///
/// Data errors (`InvalidGeometry`, `MalformedOffset`, `DocumentParseError`,
/// `MissingCounterpart`) are scoped to a single image or tile. Batch
/// operations report them per image and keep going; only setup errors such as
/// a missing input folder are returned from the batch call itself.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// Directory traversal error.
    WalkDirError(walkdir::Error),
    /// Image header could not be read to determine its size.
    ImageSizeError(imagesize::ImageError),
    /// Worker thread pool could not be created.
    ThreadPoolError(rayon::ThreadPoolBuildError),
    /// A shape's point list cannot form a bounding box.
    InvalidGeometry(String),
    /// A tile identifier does not carry the `_x_<n>_y_<n>` offset pattern.
    MalformedOffset(String),
    /// A merge was requested for an image with no tiles.
    NoMatchingTiles(String),
    /// An annotation document could not be parsed.
    DocumentParseError(String, serde_json::Error),
    /// The sibling file required for a comparison does not exist.
    MissingCounterpart(String),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err)
    }
}

impl From<imagesize::ImageError> for Error {
    fn from(err: imagesize::ImageError) -> Self {
        Error::ImageSizeError(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Error::ThreadPoolError(err)
    }
}

impl Error {
    /// Short machine-friendly name of the error kind, used in skip logs and
    /// batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::IoError(_) => "IoError",
            Error::JsonError(_) => "JsonError",
            Error::ConfigError(_) => "ConfigError",
            Error::WalkDirError(_) => "WalkDirError",
            Error::ImageSizeError(_) => "ImageSizeError",
            Error::ThreadPoolError(_) => "ThreadPoolError",
            Error::InvalidGeometry(_) => "InvalidGeometry",
            Error::MalformedOffset(_) => "MalformedOffset",
            Error::NoMatchingTiles(_) => "NoMatchingTiles",
            Error::DocumentParseError(..) => "DocumentParseError",
            Error::MissingCounterpart(_) => "MissingCounterpart",
            Error::InvalidParameters(_) => "InvalidParameters",
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::WalkDirError(e) => write!(f, "Directory walk error: {}", e),
            Error::ImageSizeError(e) => write!(f, "Image size error: {}", e),
            Error::ThreadPoolError(e) => write!(f, "Thread pool error: {}", e),
            Error::InvalidGeometry(s) => write!(f, "Invalid geometry: {}", s),
            Error::MalformedOffset(s) => write!(f, "Malformed tile offset: {}", s),
            Error::NoMatchingTiles(s) => write!(f, "No matching tiles for {}", s),
            Error::DocumentParseError(path, e) => {
                write!(f, "Failed to parse document {}: {}", path, e)
            }
            Error::MissingCounterpart(s) => write!(f, "Missing counterpart: {}", s),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::WalkDirError(e) => Some(e),
            Error::ImageSizeError(e) => Some(e),
            Error::ThreadPoolError(e) => Some(e),
            Error::DocumentParseError(_, e) => Some(e),
            _ => None,
        }
    }
}
