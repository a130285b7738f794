// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Tile offsets encoded in file names.
//!
//! A tiler writes each crop as `<base-name>_x_<col>_y_<row>.<ext>`, where
//! `col`/`row` are the pixel position of the crop's top-left corner inside the
//! full image.

use crate::Error;
use regex::Regex;
use std::sync::LazyLock;

static OFFSET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_x_(\d+)_y_(\d+)").expect("valid offset pattern"));

static TILE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^_x_\d+_y_\d+").expect("valid tile suffix pattern"));

/// Pixel offset of a tile's top-left corner within its parent image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileOffset {
    pub x: u32,
    pub y: u32,
}

impl TileOffset {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Extract the tile offset from a tile identifier such as
/// `area_x_1024_y_512.json`.
///
/// The last `_x_<n>_y_<n>` occurrence is used, so a base name that itself
/// contains the pattern still resolves to the tiler's suffix.
///
/// # Errors
/// `MalformedOffset` if the pattern is absent or a coordinate does not fit a
/// `u32`.
///
/// # Example
/// ```
/// use labelme_reconcile::labelme::{TileOffset, parse_offset};
///
/// assert_eq!(parse_offset("area_x_100_y_0.json").unwrap(), TileOffset::new(100, 0));
/// assert!(parse_offset("area.json").is_err());
/// ```
pub fn parse_offset(identifier: &str) -> Result<TileOffset, Error> {
    let captures = OFFSET_PATTERN
        .captures_iter(identifier)
        .last()
        .ok_or_else(|| Error::MalformedOffset(identifier.to_owned()))?;

    let coordinate = |idx: usize| -> Result<u32, Error> {
        captures[idx]
            .parse()
            .map_err(|_| Error::MalformedOffset(identifier.to_owned()))
    };

    Ok(TileOffset::new(coordinate(1)?, coordinate(2)?))
}

/// Returns true if `identifier` names a tile of the image `base_name`, i.e. it
/// starts with `<base_name>_x_<n>_y_<n>`.
pub fn is_tile_of(identifier: &str, base_name: &str) -> bool {
    identifier
        .strip_prefix(base_name)
        .is_some_and(|rest| TILE_SUFFIX.is_match(rest))
}
