//! Where Warden looks for configuration files.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Git-tracked project configuration.
pub const PROJECT_FILE: &str = "warden.toml";

/// Untracked per-checkout overrides.
pub const LOCAL_FILE: &str = "warden.local.toml";

/// The configuration files of one project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub project: PathBuf,
    pub local: PathBuf,
}

impl Paths {
    pub fn for_project(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            project: dir.join(PROJECT_FILE),
            local: dir.join(LOCAL_FILE),
        }
    }

    /// A project counts as initialized once `warden.toml` exists.
    pub fn is_initialized(&self) -> bool {
        self.project.exists()
    }

    /// `config.toml` in the XDG config directory (`~/.config/warden/` on
    /// Linux); `None` when there is no home directory.
    pub fn user_config_file() -> Option<PathBuf> {
        ProjectDirs::from("com", "Warden", "warden").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Every file the loader reads, lowest precedence first.
    pub fn layered(&self, with_user_config: bool) -> Vec<PathBuf> {
        with_user_config
            .then(Self::user_config_file)
            .flatten()
            .into_iter()
            .chain([self.project.clone(), self.local.clone()])
            .collect()
    }
}
