// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Axis-aligned bounding boxes and Intersection over Union.
//!
//! Boxes are always derived from a shape's raw points and never stored in a
//! document, so a rectangle drawn bottom-right to top-left compares the same as
//! one drawn top-left to bottom-right.

use super::types::Point;
use crate::Error;

/// Axis-aligned bounding box in pixel coordinates.
///
/// Invariant: `xmin <= xmax` and `ymin <= ymax`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl BoundingBox {
    /// Create a box from two opposite corners given in any order.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            xmin: x1.min(x2),
            ymin: y1.min(y2),
            xmax: x1.max(x2),
            ymax: y1.max(y2),
        }
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Top-left and bottom-right corners.
    pub fn corners(&self) -> [Point; 2] {
        [[self.xmin, self.ymin], [self.xmax, self.ymax]]
    }
}

/// Build a normalized bounding box from a shape's point list.
///
/// Two points are treated as opposite corners. Longer lists yield the
/// envelope of all points.
///
/// # Errors
/// `InvalidGeometry` when fewer than two points are given.
///
/// # Example
/// ```
/// use labelme_reconcile::labelme::bbox_from_points;
///
/// let bbox = bbox_from_points(&[[50.0, 10.0], [20.0, 40.0]]).unwrap();
/// assert_eq!((bbox.xmin(), bbox.ymin(), bbox.xmax(), bbox.ymax()), (20.0, 10.0, 50.0, 40.0));
/// ```
pub fn bbox_from_points(points: &[Point]) -> Result<BoundingBox, Error> {
    let [first, second, rest @ ..] = points else {
        return Err(Error::InvalidGeometry(format!(
            "bounding box needs two points, got {}",
            points.len()
        )));
    };

    let bbox = BoundingBox::from_corners(first[0], first[1], second[0], second[1]);
    Ok(rest.iter().fold(bbox, |b, [x, y]| BoundingBox {
        xmin: b.xmin.min(*x),
        ymin: b.ymin.min(*y),
        xmax: b.xmax.max(*x),
        ymax: b.ymax.max(*y),
    }))
}

/// Intersection over Union of two boxes, in `[0, 1]`.
///
/// Overlap extents are clamped to zero before multiplying, so disjoint boxes
/// yield 0. When both boxes are degenerate the union is empty and the result
/// is 0.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let inter_w = (a.xmax.min(b.xmax) - a.xmin.max(b.xmin)).max(0.0);
    let inter_h = (a.ymax.min(b.ymax) - a.ymin.max(b.ymin)).max(0.0);
    let inter_area = inter_w * inter_h;

    let union_area = a.area() + b.area() - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}
