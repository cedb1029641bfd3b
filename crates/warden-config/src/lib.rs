//! Configuration management for Warden
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (WARDEN_* prefix, highest precedence)
//! 2. warden.local.toml (gitignored, local overrides)
//! 3. warden.toml (git-tracked, project config)
//! 4. ~/.config/warden/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use warden_rbac::{AccessPolicy, Capability, CapabilitySet, Role, StandardPolicies};
use warden_types::{CollectionName, PrincipalId};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Warden configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub realm: RealmConfig,
    pub policy: PolicyConfig,
    pub bootstrap: BootstrapConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmConfig {
    pub name: String,
    /// Collection the shell opens at startup.
    pub default_collection: String,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            name: "warden".to_string(),
            default_collection: "accounts".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub model: PolicyModel,
    /// Per-role capability sets. Each entry replaces the role's set from
    /// `model` or adds a custom role.
    pub roles: BTreeMap<Role, Vec<Capability>>,
}

/// Starting point for the role → capability table.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyModel {
    /// admin ⊇ manager ⊇ staff ⊇ guest
    #[default]
    Hierarchical,
    /// admin only
    Flat,
}

/// Initial administrator, provisioned when a realm starts empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub admin_id: String,
    pub admin_name: String,
    pub admin_credential: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_id: "admin".to_string(),
            admin_name: "System Admin".to_string(),
            admin_credential: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl WardenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Checks everything the realm needs at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.access_policy()?;
        self.bootstrap_admin_id()?;
        self.default_collection()?;
        if self.bootstrap.admin_credential.is_empty() {
            return Err(ConfigError::ValidationError(
                "bootstrap.admin_credential must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the access policy: the `model` baseline with `roles` overrides applied.
    pub fn access_policy(&self) -> Result<AccessPolicy, ConfigError> {
        let mut policy = match self.policy.model {
            PolicyModel::Hierarchical => StandardPolicies::hierarchical(),
            PolicyModel::Flat => StandardPolicies::flat(),
        };
        for (role, capabilities) in &self.policy.roles {
            policy.set_role(
                role.clone(),
                capabilities.iter().cloned().collect::<CapabilitySet>(),
            );
        }
        policy.validate()?;
        Ok(policy)
    }

    pub fn bootstrap_admin_id(&self) -> Result<PrincipalId, ConfigError> {
        PrincipalId::parse(&self.bootstrap.admin_id)
            .map_err(|e| ConfigError::ValidationError(format!("bootstrap.admin_id: {e}")))
    }

    pub fn default_collection(&self) -> Result<CollectionName, ConfigError> {
        CollectionName::parse(&self.realm.default_collection)
            .map_err(|e| ConfigError::ValidationError(format!("realm.default_collection: {e}")))
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes a default `warden.toml` into `project_dir`, refusing to
    /// overwrite an existing one.
    pub fn init_project(project_dir: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
        let path = Paths::for_project(project_dir).project;
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path));
        }
        let contents = Self::default().to_toml()?;
        fs::write(&path, contents).map_err(|source| ConfigError::WriteError {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
