//! Profile persistence: load, validated atomic save, backup rotation.
//!
//! Concurrency safety for the profile file relies entirely on atomic
//! rename-replace; a concurrent reader observes either the old or the
//! fully written new file, never a mix.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use super::schema::{self, ProfileCollection};
use crate::error::{KbError, PersistError, Result};

/// File name of the persisted profile collection.
pub const PROFILE_FILE_NAME: &str = "keyboard_config.json";

const BACKUP_DIR: &str = "backups";
const BACKUP_PREFIX: &str = "keyboard_config_";
const MAX_BACKUPS: usize = 5;

/// Owns the persisted profile collection file.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Create a store backed by the given file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default profile file location under the user config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kbswitch")
            .join(PROFILE_FILE_NAME)
    }

    /// Path of the live profile file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted collection.
    ///
    /// Returns an empty collection if no file exists yet. Malformed JSON
    /// is an error for this call only; nothing is mutated.
    pub fn load(&self) -> Result<ProfileCollection> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No profile file yet, starting empty");
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&self.path)?;
        serde_json::from_str(&text).map_err(|e| KbError::ProfileParse {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Validate and persist a candidate collection.
    ///
    /// On success the previous file has been backed up and the live file
    /// atomically replaced with the canonicalized candidate. On any
    /// failure the temporary file is removed and the live file is left
    /// untouched.
    pub fn save(&self, candidate: &[schema::KeyboardProfile]) -> Result<()> {
        schema::validate(candidate)?;

        let mut canonical = candidate.to_vec();
        schema::canonicalize(&mut canonical);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PersistError::TempWrite {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
        }

        self.create_backup();

        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(&canonical).map_err(PersistError::Serialize)?;
        fs::write(&tmp, &body).map_err(|e| PersistError::TempWrite {
            path: tmp.display().to_string(),
            source: e,
        })?;

        // The temporary file must round-trip through the same parser
        // before it may replace the live file.
        if let Err(e) = verify_round_trip(&tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            KbError::from(PersistError::Replace(e))
        })?;

        info!(path = %self.path.display(), profiles = canonical.len(), "Profile collection saved");
        Ok(())
    }

    /// Copy the current live file into the backups directory, then prune
    /// old backups. Failures here are logged and never abort a save.
    fn create_backup(&self) {
        if !self.path.exists() {
            return;
        }

        let dir = self
            .path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(BACKUP_DIR);
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "Failed to create backups directory");
            return;
        }

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut backup = dir.join(format!("{BACKUP_PREFIX}{stamp}.json"));
        let mut n = 1;
        while backup.exists() {
            backup = dir.join(format!("{BACKUP_PREFIX}{stamp}_{n}.json"));
            n += 1;
        }

        match fs::copy(&self.path, &backup) {
            Ok(_) => {
                debug!(backup = %backup.display(), "Created profile backup");
                rotate_backups(&dir);
            }
            Err(e) => warn!(backup = %backup.display(), error = %e, "Failed to create backup"),
        }
    }
}

/// Keep only the `MAX_BACKUPS` most recent timestamped backups.
fn rotate_backups(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(".json"))
        .collect();
    names.sort();

    if names.len() <= MAX_BACKUPS {
        return;
    }
    let excess = names.len() - MAX_BACKUPS;
    for name in &names[..excess] {
        let path = dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => debug!(backup = %path.display(), "Pruned old backup"),
            Err(e) => warn!(backup = %path.display(), error = %e, "Failed to prune backup"),
        }
    }
}

fn verify_round_trip(tmp: &Path) -> std::result::Result<(), PersistError> {
    let text = fs::read_to_string(tmp).map_err(|e| PersistError::Verify(e.to_string()))?;
    serde_json::from_str::<ProfileCollection>(&text)
        .map(|_| ())
        .map_err(|e| PersistError::Verify(e.to_string()))
}
