// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    Error,
    labelme::{DiffMode, DiffOptions, LabelmeWriteOptions, StandardizeOptions},
};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Prefix of environment variables overriding settings, for example
/// `LABELME_RECONCILE_OVERLAP=0.3`.
pub const ENV_PREFIX: &str = "LABELME_RECONCILE";

/// Layered settings shared by all commands.
///
/// Sources, lowest precedence first:
/// 1. built-in defaults
/// 2. the settings file: an explicit path, or `settings.toml` in the user
///    config directory when present
/// 3. `LABELME_RECONCILE_*` environment variables (`remove_labels` is a
///    comma separated list)
///
/// Command line flags are applied on top by the caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// IoU threshold at or below which two boxes do not overlap.
    pub overlap: f64,
    /// Image extension used by standardize and copy-unannotated.
    pub image_extension: String,
    /// Labels removed by standardize.
    pub remove_labels: Vec<String>,
    /// Pretty-print written JSON.
    pub pretty: bool,
    /// Worker threads; rayon's default when unset.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Settings {
    /// Load settings from defaults, the settings file and the environment.
    ///
    /// An explicit `config_path` must exist; the default settings file is
    /// optional.
    pub fn load(config_path: Option<&Path>) -> Result<Settings, Error> {
        Self::load_with_env(config_path, None)
    }

    /// [`Settings::load`] reading variables from `env` instead of the process
    /// environment when given.
    fn load_with_env(
        config_path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Settings, Error> {
        let mut builder = Config::builder()
            .set_default("overlap", 0.5)?
            .set_default("image_extension", "tif")?
            .set_default(
                "remove_labels",
                vec![
                    "Skorsten".to_string(),
                    "ignore".to_string(),
                    "unknown".to_string(),
                ],
            )?
            .set_default("pretty", true)?;

        builder = match config_path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => match Self::default_path() {
                Some(path) => builder.add_source(File::from(path).required(false)),
                None => builder,
            },
        };

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("remove_labels")
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        log::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Location of the default settings file, if the platform has a user
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("ai", "EdgeFirst", "LabelMe Reconcile")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    pub fn write_options(&self) -> LabelmeWriteOptions {
        LabelmeWriteOptions {
            pretty: self.pretty,
        }
    }

    pub fn diff_options(&self, mode: DiffMode) -> DiffOptions {
        DiffOptions {
            threshold: self.overlap,
            mode,
            write: self.write_options(),
        }
    }

    pub fn standardize_options(&self) -> StandardizeOptions {
        StandardizeOptions {
            image_extension: self.image_extension.clone(),
            remove_labels: self.remove_labels.clone(),
        }
    }
}
