//! Run configuration.
//!
//! Handles loading, validating, and merging `maquette.toml`. Stock defaults
//! are overridden by an optional `maquette.toml` in the source root, so a
//! maquette only needs to say what differs from the conventional layout.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! descriptor = "Data.json"        # Descriptor document, relative to the source root
//!
//! [destination]
//! media_dir = "Media"             # Media root folder (also the path prefix in the output)
//! models_dir = "Models"           # 3D model subfolder inside the media root
//! config_file = "config.json"     # Output document, relative to the destination root
//! keep_extensions = ["meta"]      # Sidecar files kept when the media root is cleared
//!
//! [mirror]
//! enabled = false                 # Mirror a whole source folder before transforming
//! source_dir = "Assets/Media"     # Folder to mirror, relative to the source root
//! exclude = ["Video", "Videos"]   # Folder names skipped at every level
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the optional config file in the source root.
pub const CONFIG_FILENAME: &str = "maquette.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Run configuration loaded from `maquette.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrepConfig {
    /// Descriptor document path, relative to the source root.
    pub descriptor: String,
    /// Destination layout.
    pub destination: DestinationConfig,
    /// Optional whole-folder mirror.
    pub mirror: MirrorConfig,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            descriptor: "Data.json".to_string(),
            destination: DestinationConfig::default(),
            mirror: MirrorConfig::default(),
        }
    }
}

impl PrepConfig {
    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.descriptor.trim().is_empty() {
            return Err(ConfigError::Validation(
                "descriptor must not be empty".into(),
            ));
        }
        for (key, value) in [
            ("destination.media_dir", &self.destination.media_dir),
            ("destination.models_dir", &self.destination.models_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
            if value.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a single folder name, got {value:?}"
                )));
            }
        }
        if self.destination.config_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "destination.config_file must not be empty".into(),
            ));
        }
        if self.mirror.enabled && self.mirror.source_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "mirror.source_dir must not be empty when mirroring is enabled".into(),
            ));
        }
        Ok(())
    }

    pub fn descriptor_path(&self, source_root: &Path) -> PathBuf {
        source_root.join(&self.descriptor)
    }
}

/// Destination layout. The folder names are read by the client runtime and
/// must only change together with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DestinationConfig {
    /// Media root folder name under the destination root.
    pub media_dir: String,
    /// 3D model subfolder inside the media root.
    pub models_dir: String,
    /// Output document path, relative to the destination root.
    pub config_file: String,
    /// Extensions (without dot, case-insensitive) of sidecar files that
    /// survive a media root reset.
    pub keep_extensions: Vec<String>,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            media_dir: "Media".to_string(),
            models_dir: "Models".to_string(),
            config_file: "config.json".to_string(),
            keep_extensions: vec!["meta".to_string()],
        }
    }
}

impl DestinationConfig {
    pub fn media_root(&self, dest_root: &Path) -> PathBuf {
        dest_root.join(&self.media_dir)
    }

    pub fn config_path(&self, dest_root: &Path) -> PathBuf {
        dest_root.join(&self.config_file)
    }
}

/// Whole-folder mirror settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    pub enabled: bool,
    /// Folder to mirror into the media root, relative to the source root.
    pub source_dir: String,
    /// Folder names (case-insensitive) skipped at every recursion level.
    pub exclude: Vec<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source_dir: "Assets/Media".to_string(),
            exclude: vec!["Video".to_string(), "Videos".to_string()],
        }
    }
}

// =============================================================================
// Loading: stock defaults overlaid by the maquette's own file
// =============================================================================

/// Stock defaults as a TOML table: the base every `maquette.toml` overlays.
fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(PrepConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Lay `overlay` over `base`.
///
/// Sections such as `[destination]` merge key by key, so a file naming only
/// `models_dir` keeps the stock `media_dir`. Any other value replaces the
/// base one whole: `exclude = []` drops the stock exclusions.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut table), toml::Value::Table(section)) => {
            for (key, value) in section {
                let merged = match table.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                table.insert(key, merged);
            }
            toml::Value::Table(table)
        }
        (_, value) => value,
    }
}

/// Parse `maquette.toml` at the top of the source folder.
///
/// A maquette has at most one such file. Copies in subfolders (asset packs
/// dropped in with their own config) are never consulted.
fn read_maquette_toml(source_root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let path = source_root.join(CONFIG_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    tracing::debug!("Using {}", path.display());
    Ok(Some(toml::from_str(&content)?))
}

/// Run configuration for the maquette at `source_root`.
///
/// Stock defaults, overlaid by the maquette's `maquette.toml` when it has
/// one, then deserialized (unknown keys rejected) and validated.
pub fn load_config(source_root: &Path) -> Result<PrepConfig, ConfigError> {
    let mut merged = stock_defaults_value()?;
    if let Some(overlay) = read_maquette_toml(source_root)? {
        merged = merge_toml(merged, overlay);
    }
    let config: PrepConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `maquette.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Maquette Prep Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as maquette.toml in the maquette source folder.
# Unknown keys will cause an error.

# Descriptor document, relative to the source folder.
descriptor = "Data.json"

# ---------------------------------------------------------------------------
# Destination layout
# ---------------------------------------------------------------------------
[destination]
# Media root folder under the destination. Every path written to the output
# document starts with this name.
media_dir = "Media"

# Subfolder of the media root receiving the 3D model file.
models_dir = "Models"

# Output document, relative to the destination folder.
config_file = "config.json"

# Sidecar files with these extensions are kept when the media root is cleared.
keep_extensions = ["meta"]

# ---------------------------------------------------------------------------
# Whole-folder mirror
# ---------------------------------------------------------------------------
[mirror]
# Copy an entire source folder into the media root before transforming.
enabled = false

# Folder to mirror, relative to the source folder.
source_dir = "Assets/Media"

# Folder names skipped (case-insensitive) at every level of the mirror.
exclude = ["Video", "Videos"]
"##
}
