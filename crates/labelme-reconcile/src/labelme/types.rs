// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! LabelMe JSON data structures for serde serialization/deserialization.
//!
//! Keys this crate does not interpret are kept in `extra` maps so a document
//! can be read, rewritten and written back without losing information.

use super::geometry::{BoundingBox, bbox_from_points};
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema version written into documents created by this crate.
pub const LABELME_VERSION: &str = "5.0.1";

/// A 2D point `[x, y]` in pixel coordinates.
pub type Point = [f64; 2];

/// Geometric kind of a shape.
///
/// Serialized as the LabelMe `shape_type` string. Kinds other than rectangle
/// and polygon (circle, line, point, ...) are carried through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShapeKind {
    Rectangle,
    #[default]
    Polygon,
    Other(String),
}

impl From<String> for ShapeKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "rectangle" => ShapeKind::Rectangle,
            "polygon" => ShapeKind::Polygon,
            _ => ShapeKind::Other(s),
        }
    }
}

impl From<ShapeKind> for String {
    fn from(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Rectangle => "rectangle".to_owned(),
            ShapeKind::Polygon => "polygon".to_owned(),
            ShapeKind::Other(s) => s,
        }
    }
}

/// A single labeled annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Object class name.
    pub label: String,
    /// Raw points. Two opposite corners for rectangles, in any order.
    pub points: Vec<Point>,
    /// Optional grouping identifier.
    #[serde(default)]
    pub group_id: Option<i64>,
    /// Geometric kind.
    #[serde(default)]
    pub shape_type: ShapeKind,
    /// Per-shape flags, passed through unmodified.
    #[serde(default)]
    pub flags: Map<String, Value>,
    /// Any other keys (`description`, `mask`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shape {
    /// Create a rectangle shape from two corner points.
    pub fn rectangle(label: impl Into<String>, p1: Point, p2: Point) -> Self {
        Self {
            label: label.into(),
            points: vec![p1, p2],
            shape_type: ShapeKind::Rectangle,
            ..Default::default()
        }
    }

    /// Create a polygon shape.
    pub fn polygon(label: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            label: label.into(),
            points,
            shape_type: ShapeKind::Polygon,
            ..Default::default()
        }
    }

    pub fn is_rectangle(&self) -> bool {
        self.shape_type == ShapeKind::Rectangle
    }

    /// Bounding box recomputed from the raw point list.
    pub fn bbox(&self) -> Result<BoundingBox, Error> {
        bbox_from_points(&self.points)
    }

    /// Return a copy with every point shifted by `(dx, dy)`.
    ///
    /// Label, kind, group id, flags and extra keys are unchanged.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            points: self.points.iter().map(|[x, y]| [x + dx, y + dy]).collect(),
            ..self.clone()
        }
    }

    /// Check label and point count against the shape kind.
    pub fn validate(&self) -> Result<(), Error> {
        if self.label.is_empty() {
            return Err(Error::InvalidGeometry("shape has an empty label".to_owned()));
        }

        match self.shape_type {
            ShapeKind::Rectangle if self.points.len() != 2 => Err(Error::InvalidGeometry(format!(
                "rectangle '{}' has {} points, expected 2",
                self.label,
                self.points.len()
            ))),
            ShapeKind::Polygon if self.points.len() < 3 => Err(Error::InvalidGeometry(format!(
                "polygon '{}' has {} points, expected at least 3",
                self.label,
                self.points.len()
            ))),
            _ => Ok(()),
        }
    }
}

/// A LabelMe annotation document for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    /// LabelMe schema version.
    #[serde(default)]
    pub version: String,
    /// Document-level flags, passed through unmodified.
    #[serde(default)]
    pub flags: Map<String, Value>,
    /// Shapes in source order.
    #[serde(default)]
    pub shapes: Vec<Shape>,
    /// Image file name or path the document describes.
    #[serde(rename = "imagePath", default)]
    pub image_path: String,
    /// Base64 image payload. Always `None` in documents produced here.
    #[serde(rename = "imageData", default)]
    pub image_data: Option<String>,
    /// Image height in pixels.
    #[serde(rename = "imageHeight")]
    pub image_height: u32,
    /// Image width in pixels.
    #[serde(rename = "imageWidth")]
    pub image_width: u32,
    /// Any other top-level keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnnotationDocument {
    /// Create an empty document for an image of the given size.
    pub fn new(image_path: impl Into<String>, image_width: u32, image_height: u32) -> Self {
        Self {
            version: LABELME_VERSION.to_owned(),
            flags: Map::new(),
            shapes: Vec::new(),
            image_path: image_path.into(),
            image_data: None,
            image_height,
            image_width,
            extra: Map::new(),
        }
    }

    /// Rectangle shapes in document order.
    pub fn rectangles(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter().filter(|s| s.is_rectangle())
    }

    /// Check image dimensions and every shape.
    pub fn validate(&self) -> Result<(), Error> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(Error::InvalidParameters(format!(
                "{} has non-positive size {}x{}",
                self.image_path, self.image_width, self.image_height
            )));
        }
        self.shapes.iter().try_for_each(Shape::validate)
    }
}
