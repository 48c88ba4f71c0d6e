//! Run configuration.
//!
//! Looked up in this order, first hit wins:
//!
//! 1. an explicit `--config` path (must exist)
//! 2. `./salvage.toml`
//! 3. `<config dir>/salvage/config.toml` (`$XDG_CONFIG_HOME` on Linux)
//! 4. built-in defaults
//!
//! Every field has a default, so a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SalvageError;

pub const LOCAL_CONFIG_FILE: &str = "salvage.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// When false the run loads nothing and reports zero profiles.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub reset_durability: bool,
    /// How long the receiving server holds the gift, in days. At least 1.
    #[serde(default = "default_expiration_days")]
    pub mail_item_expiration_days: u32,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub gift: GiftConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            reset_durability: false,
            mail_item_expiration_days: default_expiration_days(),
            paths: PathsConfig::default(),
            gift: GiftConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(default = "default_profiles_dir")]
    pub profiles: PathBuf,
    #[serde(default = "default_residual_dir")]
    pub residual: PathBuf,
    #[serde(default = "default_templates_path")]
    pub templates: PathBuf,
    #[serde(default = "default_outbox_path")]
    pub outbox: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            profiles: default_profiles_dir(),
            residual: default_residual_dir(),
            templates: default_templates_path(),
            outbox: default_outbox_path(),
        }
    }
}

impl PathsConfig {
    /// Resolve relative paths against `base` (the config file's directory).
    #[must_use]
    pub fn relative_to(&self, base: &Path) -> Self {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base.join(p)
            }
        };
        Self {
            profiles: join(&self.profiles),
            residual: join(&self.residual),
            templates: join(&self.templates),
            outbox: join(&self.outbox),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GiftConfig {
    #[serde(default = "default_gift_prefix")]
    pub id_prefix: String,
    /// Template ids that are never migrated, on top of the catalog rules.
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl Default for GiftConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_gift_prefix(),
            blacklist: Vec::new(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_expiration_days() -> u32 {
    7
}

fn default_profiles_dir() -> PathBuf {
    PathBuf::from("oldProfile")
}

fn default_residual_dir() -> PathBuf {
    PathBuf::from("newProfileWithLeftoverItems")
}

fn default_templates_path() -> PathBuf {
    PathBuf::from("items.json")
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("gifts.json")
}

fn default_gift_prefix() -> String {
    "ProfileSalvage".to_string()
}

/// Parse and validate one config file.
///
/// # Errors
///
/// Returns [`SalvageError::ConfigLoad`] if the file cannot be read, is not
/// valid TOML for [`RunConfig`], or sets `mail_item_expiration_days = 0`.
pub fn load_config_file(path: &Path) -> Result<RunConfig, SalvageError> {
    let load_err = |reason: String| SalvageError::ConfigLoad {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
    let config: RunConfig = toml::from_str(&content).map_err(|e| load_err(e.to_string()))?;

    if config.mail_item_expiration_days == 0 {
        return Err(load_err(
            "mail_item_expiration_days must be at least 1".to_string(),
        ));
    }
    Ok(config)
}

/// Find and load the run configuration.
///
/// Returns the config together with the file it came from, or `None` when
/// the defaults were used. Relative paths inside a file are resolved
/// against that file's directory.
///
/// # Errors
///
/// Returns [`SalvageError::ConfigLoad`] if `explicit` is given but missing,
/// or if the file that was found is malformed.
pub fn load_config(explicit: Option<&Path>) -> Result<(RunConfig, Option<PathBuf>), SalvageError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(SalvageError::ConfigLoad {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }
        return load_found(path);
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return load_found(&local);
    }

    if let Some(user) = dirs::config_dir()
        .map(|dir| dir.join("salvage/config.toml"))
        .filter(|path| path.is_file())
    {
        return load_found(&user);
    }

    tracing::debug!("no config file found, using defaults");
    Ok((RunConfig::default(), None))
}

fn load_found(path: &Path) -> Result<(RunConfig, Option<PathBuf>), SalvageError> {
    let mut config = load_config_file(path)?;
    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        config.paths = config.paths.relative_to(base);
    }
    tracing::debug!(path = %path.display(), "loaded config");
    Ok((config, Some(path.to_path_buf())))
}
