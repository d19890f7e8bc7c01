use super::load_config;
use crate::output::print_json;
use accurev_core::config::{Config, IssueTrackingConfig, WarnLevel};
use anyhow::Context;
use clap::Subcommand;
use std::path::{Path, PathBuf};

const REDACTED: &str = "********";

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write a starter config file
    Init {
        /// Path to the accurev executable
        #[arg(long, default_value = "accurev")]
        executable: PathBuf,
        /// accurev user name
        #[arg(long)]
        username: Option<String>,
        /// Depot holding the AccuWork issue database (enables issue commands)
        #[arg(long)]
        depot: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective config (password hidden)
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config_path: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Init {
            executable,
            username,
            depot,
            force,
        } => init(config_path, executable, username, depot, force, json),
        ConfigSubcommand::Show => show(config_path, json),
        ConfigSubcommand::Validate => validate(config_path, json),
    }
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(
    config_path: &Path,
    executable: PathBuf,
    username: Option<String>,
    depot: Option<String>,
    force: bool,
    json: bool,
) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let mut config = Config::new(executable);
    config.username = username.unwrap_or_default();
    config.issue_tracking = depot.map(IssueTrackingConfig::new);
    config
        .save(config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    if json {
        print_json(&serde_json::json!({ "created": config_path }))?;
    } else {
        println!("Created {}", config_path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if !config.password.is_empty() {
        config.password = REDACTED.to_string();
    }

    if json {
        print_json(&config)?;
    } else {
        let yaml = serde_yaml::to_string(&config).context("failed to render config")?;
        print!("{yaml}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
