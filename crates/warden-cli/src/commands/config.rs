//! Configuration management commands.

use std::path::Path;

use anyhow::{Context, Result, bail};
use warden_config::{Paths, WardenConfig};

use crate::style::{print_hint, print_info_table, print_success};

const REDACTED: &str = "<redacted>";

/// Shows the effective configuration with secrets redacted.
pub fn show(project: &str, format: &str) -> Result<()> {
    let mut config = WardenConfig::load_from_dir(Path::new(project))
        .context("Failed to load configuration")?;
    config.bootstrap.admin_credential = REDACTED.to_string();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&config)?),
        "toml" => println!("{}", config.to_toml()?),
        other => bail!("Unknown format '{other}' (expected toml or json)"),
    }
    Ok(())
}

/// Writes a default `warden.toml` into `path`.
pub fn init(path: &str) -> Result<()> {
    let written = WardenConfig::init_project(Path::new(path))?;
    print_success(&format!("Created {}", written.display()));
    print_hint("Change bootstrap.admin_credential before sharing this realm.");
    Ok(())
}

/// Loads and validates the layered configuration.
pub fn validate(project: &str) -> Result<()> {
    let project_path = Path::new(project);
    if !Paths::for_project(project_path).is_initialized() {
        bail!(
            "Project not initialized. Run 'warden config init' in {} first.",
            project_path.display()
        );
    }

    let config =
        WardenConfig::load_from_dir(project_path).context("Failed to load configuration")?;
    config.validate()?;
    let policy = config.access_policy()?;

    print_success("Configuration is valid");
    print_info_table(&[
        ("Realm", config.realm.name.clone()),
        ("Collection", config.realm.default_collection.clone()),
        ("Roles", policy.roles().count().to_string()),
        ("Admin", config.bootstrap.admin_id.clone()),
    ]);
    Ok(())
}
