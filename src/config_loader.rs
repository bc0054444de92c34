// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! TOML file and environment-variable loading for [`TimelineConfig`].
//!
//! Gated behind the `config-loader` feature (which requires `std`). Two
//! entry points: [`load_config`] reads a TOML file; [`load_config_from_env`]
//! reads `TIMELINE_`-prefixed environment variables. Both produce a
//! [`TimelineConfig`], falling back to its defaults for any field left
//! unset.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::TimelineConfig;

/// Flat, all-optional mirror of [`TimelineConfig`] as it appears on disk or
/// in the environment — every field is optional so a partial file or
/// partial environment still produces a valid config by falling back to
/// defaults field-by-field.
#[derive(Debug, Default, Deserialize)]
struct RawTimelineConfig {
    dedupe_triplets: Option<bool>,
}

impl RawTimelineConfig {
    fn into_config(self) -> TimelineConfig {
        let defaults = TimelineConfig::default();
        TimelineConfig {
            dedupe_triplets: self.dedupe_triplets.unwrap_or(defaults.dedupe_triplets),
        }
    }
}

/// Errors raised while loading a [`TimelineConfig`] from an external source.
#[derive(Debug)]
pub enum ConfigError {
    /// The file at the given path could not be read.
    FileRead { path: std::path::PathBuf, source: std::io::Error },
    /// The file's contents were not valid TOML.
    TomlParse { source: toml::de::Error },
    /// An environment variable's value could not be parsed as the expected
    /// type.
    ParseField { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileRead { path, source } => write!(f, "failed to read config file {}: {source}", path.display()),
            ConfigError::TomlParse { source } => write!(f, "failed to parse TOML config: {source}"),
            ConfigError::ParseField { variable, value } => write!(f, "failed to parse {variable}=\"{value}\""),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileRead { source, .. } => Some(source),
            ConfigError::TomlParse { source } => Some(source),
            ConfigError::ParseField { .. } => None,
        }
    }
}

/// Load a [`TimelineConfig`] from a TOML file at `path`. Missing fields fall
/// back to [`TimelineConfig::default`].
///
/// # Examples
///
/// ```rust
/// use overlay_timeline::config_loader::load_config;
///
/// let path = std::env::temp_dir().join("overlay-timeline-doctest-config.toml");
/// std::fs::write(&path, "dedupe_triplets = false\n")?;
///
/// let config = load_config(&path)?;
/// assert!(!config.dedupe_triplets);
///
/// std::fs::remove_file(&path).ok();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TimelineConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::FileRead { path: path.to_path_buf(), source })?;
    let raw: RawTimelineConfig = toml::from_str(&contents).map_err(|source| ConfigError::TomlParse { source })?;
    Ok(raw.into_config())
}

/// Load a [`TimelineConfig`] by reading `TIMELINE_DEDUPE_TRIPLETS` from the
/// environment (`"true"`/`"1"` or `"false"`/`"0"`). Unset falls back to
/// [`TimelineConfig::default`].
///
/// # Examples
///
/// ```rust
/// use overlay_timeline::config_loader::load_config_from_env;
///
/// std::env::set_var("TIMELINE_DEDUPE_TRIPLETS", "false");
/// let config = load_config_from_env().unwrap();
/// assert!(!config.dedupe_triplets);
/// std::env::remove_var("TIMELINE_DEDUPE_TRIPLETS");
/// ```
pub fn load_config_from_env() -> Result<TimelineConfig, ConfigError> {
    let mut raw = RawTimelineConfig::default();

    if let Ok(value) = env::var("TIMELINE_DEDUPE_TRIPLETS") {
        raw.dedupe_triplets = Some(parse_bool("TIMELINE_DEDUPE_TRIPLETS", &value)?);
    }

    Ok(raw.into_config())
}

fn parse_bool(variable: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::ParseField { variable, value: value.into() }),
    }
}
