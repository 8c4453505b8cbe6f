//! Platform-specific state directory management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Environment variable that relocates all CLI state
pub const STATE_DIR_ENV: &str = "PORTAL_STATE_DIR";

/// Manages platform-specific application directories
pub struct StateDir {
    /// Project directories from the directories crate
    project_dirs: Option<ProjectDirs>,
    /// Override directory for testing or custom installations
    override_dir: Option<PathBuf>,
}

impl StateDir {
    /// Create a new StateDir instance
    pub fn new() -> Self {
        let project_dirs = ProjectDirs::from("dev", "Portal", "Portal");
        if project_dirs.is_none() {
            warn!("Failed to determine platform-specific directories, will use fallback");
        }
        Self {
            project_dirs,
            override_dir: None,
        }
    }

    /// Create a new StateDir with an override directory
    pub fn with_override(path: impl Into<PathBuf>) -> Self {
        Self {
            project_dirs: None,
            override_dir: Some(path.into()),
        }
    }

    /// `--data-dir` wins, then `PORTAL_STATE_DIR`, then the platform default
    pub fn resolve(data_dir: Option<PathBuf>) -> Self {
        data_dir
            .or_else(|| std::env::var_os(STATE_DIR_ENV).map(PathBuf::from))
            .map_or_else(Self::new, Self::with_override)
    }

    /// Get the configuration directory
    pub fn config_dir(&self) -> PathBuf {
        if let Some(override_dir) = &self.override_dir {
            return override_dir.join("config");
        }

        if let Some(project_dirs) = &self.project_dirs {
            project_dirs.config_dir().to_path_buf()
        } else {
            // Fallback to current directory
            PathBuf::from("./config")
        }
    }

    /// Get the data directory for persistent storage
    pub fn data_dir(&self) -> PathBuf {
        if let Some(override_dir) = &self.override_dir {
            return override_dir.join("data");
        }

        if let Some(project_dirs) = &self.project_dirs {
            project_dirs.data_dir().to_path_buf()
        } else {
            // Fallback to current directory
            PathBuf::from("./data")
        }
    }

    /// Optional TOML configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("portal.toml")
    }

    /// Tokens, client identity and preferences
    pub fn session_file(&self) -> PathBuf {
        self.data_dir().join("session.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir().join("portal.log")
    }

    /// Create all necessary directories
    pub fn create_directories(&self) -> Result<()> {
        for dir in [self.config_dir(), self.data_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
            debug!("Ensured directory exists: {}", dir.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_layout() {
        let temp = tempfile::tempdir().unwrap();
        let state = StateDir::with_override(temp.path());

        assert_eq!(state.config_file(), temp.path().join("config/portal.toml"));
        assert_eq!(state.session_file(), temp.path().join("data/session.json"));

        state.create_directories().unwrap();
        assert!(temp.path().join("config").is_dir());
        assert!(temp.path().join("data").is_dir());
    }

    #[test]
    fn test_flag_beats_environment() {
        let temp = tempfile::tempdir().unwrap();
        let state = StateDir::resolve(Some(temp.path().to_path_buf()));
        assert_eq!(state.data_dir(), temp.path().join("data"));
    }
}
