//! Profile snapshots on disk: reading the old profiles, writing what is left.
//!
//! # Directory Layout
//!
//! ```text
//! oldProfile/
//!   alice.json                     # one exported profile per file
//!   bob.json
//! newProfileWithLeftoverItems/
//!   alice.json                     # residual snapshot, same key
//! ```
//!
//! The file stem is the profile key used in logs, gift ids, and residual
//! file names. Files are processed in key order.

use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::SalvageError;
use crate::model::profile::Profile;

/// Where profile snapshots come from.
pub trait ProfileSource {
    /// Keys of every available profile, in processing order.
    ///
    /// # Errors
    ///
    /// Returns [`SalvageError::SourceUnavailable`] if the source cannot be
    /// enumerated at all.
    fn keys(&self) -> Result<Vec<String>, SalvageError>;

    /// Load one profile.
    ///
    /// # Errors
    ///
    /// Returns [`SalvageError::ProfileParse`] if the profile cannot be read
    /// or deserialized.
    fn load(&self, key: &str) -> Result<Profile, SalvageError>;
}

/// Where residual profiles go.
pub trait ResidualWriter {
    /// Persist `profile` under `key`, replacing any earlier snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SalvageError::Write`] or [`SalvageError::Json`] if the
    /// snapshot cannot be recorded.
    fn write(&mut self, key: &str, profile: &Profile) -> Result<(), SalvageError>;
}

/// Every `*.json` file directly inside one directory.
#[derive(Debug, Clone)]
pub struct DirectoryProfileSource {
    dir: PathBuf,
}

impl DirectoryProfileSource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl ProfileSource for DirectoryProfileSource {
    fn keys(&self) -> Result<Vec<String>, SalvageError> {
        let unavailable = |source: io::Error| SalvageError::SourceUnavailable {
            path: self.dir.clone(),
            source,
        };

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(unavailable)? {
            let path = entry.map_err(unavailable)?.path();
            if !path.is_file() || path.extension().and_then(OsStr::to_str) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(OsStr::to_str) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn load(&self, key: &str) -> Result<Profile, SalvageError> {
        read_profile(&self.path_for(key))
    }
}

/// Read one exported profile document.
///
/// # Errors
///
/// Returns [`SalvageError::ProfileParse`] if the file cannot be read or is
/// not a profile.
pub fn read_profile(path: &Path) -> Result<Profile, SalvageError> {
    let parse_err = |reason: String| SalvageError::ProfileParse {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| parse_err(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))
}

/// Writes `<dir>/<key>.json`, creating `dir` on first use.
#[derive(Debug, Clone)]
pub struct DirectoryResidualWriter {
    dir: PathBuf,
}

impl DirectoryResidualWriter {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl ResidualWriter for DirectoryResidualWriter {
    fn write(&mut self, key: &str, profile: &Profile) -> Result<(), SalvageError> {
        let path = self.path_for(key);
        write_json_atomic(&path, profile, &format!("residual profile {key}"))
    }
}

/// Pretty-print `value` to `path` via a sibling temp file and a rename, so a
/// failed write never leaves a truncated document behind.
///
/// # Errors
///
/// Returns [`SalvageError::Json`] if `value` cannot be serialized, or
/// [`SalvageError::Write`] for any filesystem failure.
pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    what: &str,
) -> Result<(), SalvageError> {
    let write_err = |source: io::Error| SalvageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut body = serde_json::to_string_pretty(value).map_err(|source| SalvageError::Json {
        what: what.to_string(),
        source,
    })?;
    body.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, body).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        write_err(source)
    })
}
