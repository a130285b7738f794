// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use crate::Error;
use std::path::Path;

/// Read `(width, height)` of an image from its header without decoding pixel
/// data. Works for very large GeoTIFF orthophotos as well as PNG/JPEG.
pub fn image_dimensions<P: AsRef<Path>>(path: P) -> Result<(u32, u32), Error> {
    let path = path.as_ref();
    let size = imagesize::size(path)?;

    let width = u32::try_from(size.width).map_err(|_| {
        Error::InvalidParameters(format!("{} width exceeds u32", path.display()))
    })?;
    let height = u32::try_from(size.height).map_err(|_| {
        Error::InvalidParameters(format!("{} height exceeds u32", path.display()))
    })?;

    Ok((width, height))
}
