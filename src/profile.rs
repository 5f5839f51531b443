//! Profile storage
//!
//! Each profile is a TOML file `profiles/<name>.toml` under the config
//! directory holding one complete [`Settings`] record. The profile picked
//! last time is remembered in `selected_profile.toml`, separately from the
//! profiles themselves.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use wheelmode_engine::Settings;

/// Profile used when nothing has been selected yet
pub const DEFAULT_PROFILE: &str = "default";

const PROFILES_DIR: &str = "profiles";
const SELECTION_FILE: &str = "selected_profile.toml";
const EXTENSION: &str = "toml";

/// Errors from profile storage
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize profile: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid profile name \"{0}\" (use letters, digits, spaces, '-' or '_')")]
    InvalidName(String),
    #[error("The profile \"{0}\" already exists")]
    AlreadyExists(String),
    #[error("The profile \"{0}\" does not exist")]
    NotFound(String),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ProfileError + '_ {
    move |source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Selection {
    selected_profile: String,
}

/// Check a profile name is usable as a file stem
pub fn validate_name(name: &str) -> Result<(), ProfileError> {
    let ok = !name.trim().is_empty()
        && name.trim() == name
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '));
    if ok {
        Ok(())
    } else {
        Err(ProfileError::InvalidName(name.to_string()))
    }
}

/// Directory-backed profile store
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the default config directory
    pub fn default_root() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wheelmode")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profiles_dir(&self) -> PathBuf {
        self.root.join(PROFILES_DIR)
    }

    /// Path of a profile file
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.profiles_dir().join(format!("{name}.{EXTENSION}"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    /// Names of all stored profiles, sorted
    pub fn list(&self) -> Result<Vec<String>, ProfileError> {
        let dir = self.profiles_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&dir)(e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(io_err(&dir))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load a profile, or defaults if it has never been saved
    pub fn load(&self, name: &str) -> Result<Settings, ProfileError> {
        validate_name(name)?;
        let path = self.path_of(name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(io_err(&path)(e)),
        };
        toml::from_str(&content).map_err(|source| ProfileError::Parse { path, source })
    }

    /// Write a profile, replacing any previous content
    pub fn save(&self, name: &str, settings: &Settings) -> Result<(), ProfileError> {
        validate_name(name)?;
        let dir = self.profiles_dir();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        let content = toml::to_string_pretty(settings)?;
        let path = self.path_of(name);
        fs::write(&path, content).map_err(io_err(&path))
    }

    /// Save `settings` under a new name; fails if the name is taken
    pub fn create(&self, name: &str, settings: &Settings) -> Result<(), ProfileError> {
        validate_name(name)?;
        if self.exists(name) {
            return Err(ProfileError::AlreadyExists(name.to_string()));
        }
        self.save(name, settings)?;
        info!("Created profile \"{}\"", name);
        Ok(())
    }

    /// Rename a profile; the selection follows it
    pub fn rename(&self, from: &str, to: &str) -> Result<(), ProfileError> {
        validate_name(from)?;
        validate_name(to)?;
        if self.exists(to) {
            return Err(ProfileError::AlreadyExists(to.to_string()));
        }
        if !self.exists(from) {
            return Err(ProfileError::NotFound(from.to_string()));
        }

        // An unreadable pointer counts as not selected
        let was_selected = match self.selected() {
            Ok(selected) => selected == from,
            Err(e) => {
                warn!("Ignoring selection while renaming: {}", e);
                false
            }
        };

        let src = self.path_of(from);
        fs::rename(&src, self.path_of(to)).map_err(io_err(&src))?;

        if was_selected {
            self.select(to)?;
        }
        info!("Renamed profile \"{}\" to \"{}\"", from, to);
        Ok(())
    }

    /// Name of the remembered profile, `"default"` if none
    pub fn selected(&self) -> Result<String, ProfileError> {
        let path = self.root.join(SELECTION_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(DEFAULT_PROFILE.to_string())
            }
            Err(e) => return Err(io_err(&path)(e)),
        };
        let selection: Selection =
            toml::from_str(&content).map_err(|source| ProfileError::Parse { path, source })?;
        Ok(selection.selected_profile)
    }

    /// Remember `name` as the selected profile
    pub fn select(&self, name: &str) -> Result<(), ProfileError> {
        validate_name(name)?;
        fs::create_dir_all(&self.root).map_err(io_err(&self.root))?;
        let content = toml::to_string_pretty(&Selection {
            selected_profile: name.to_string(),
        })?;
        let path = self.root.join(SELECTION_FILE);
        fs::write(&path, content).map_err(io_err(&path))
    }

    /// Modification time of a profile file, for change polling
    pub fn modified(&self, name: &str) -> Option<std::time::SystemTime> {
        fs::metadata(self.path_of(name)).ok()?.modified().ok()
    }
}
