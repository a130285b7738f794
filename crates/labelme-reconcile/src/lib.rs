// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # LabelMe Reconcile
//!
//! Reconciliation of LabelMe object annotations produced by repeated or tiled
//! detection runs over large images.
//!
//! ## Features
//!
//! - **IoU Differencing**: keep only the rectangles of two annotation sets that
//!   have no overlapping counterpart, per image and per folder
//! - **Tile Merging**: translate per-tile documents named
//!   `<image>_x_<col>_y_<row>.json` into one full-image document
//! - **Dataset Maintenance**: standardize documents in place, collect images
//!   without annotations
//! - **GeoJSON**: concatenate FeatureCollections
//! - **Settings**: layered configuration from defaults, a settings file and
//!   the environment
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use labelme_reconcile::{
//!     Error, Settings,
//!     labelme::{DiffMode, diff_folders},
//! };
//! use std::path::Path;
//!
//! fn main() -> Result<(), Error> {
//!     let settings = Settings::load(None)?;
//!     let report = diff_folders(
//!         Path::new("model_a"),
//!         Path::new("model_b"),
//!         Path::new("review"),
//!         &settings.diff_options(DiffMode::Symmetric),
//!         |_| {},
//!     )?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: emits `tracing` spans around batch operations

mod config;
mod error;
pub mod geojson;
pub mod labelme;

pub use crate::{
    config::{ENV_PREFIX, Settings},
    error::Error,
};
