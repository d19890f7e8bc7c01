use super::{block_on, load_config};
use crate::output::print_json;
use accurev_core::issues::IssueTracker;
use accurev_core::source_control::SourceControl;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CheckReport {
    executable: String,
    source_control: &'static str,
    issue_tracking: &'static str,
}

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let source_control = SourceControl::new(&config);
    if !source_control.is_available() {
        anyhow::bail!(
            "accurev executable not found: {}",
            config.executable.display()
        );
    }

    block_on(source_control.validate_connection())?
        .context("source control connection failed")?;

    let issue_tracking = match &config.issue_tracking {
        Some(_) => {
            let tracker = IssueTracker::new(&config)?;
            block_on(tracker.validate_connection())?
                .context("issue tracking connection failed")?;
            "ok"
        }
        None => "not configured",
    };

    let report = CheckReport {
        executable: config.executable.display().to_string(),
        source_control: "ok",
        issue_tracking,
    };

    if json {
        print_json(&report)?;
    } else {
        println!("executable:     {}", report.executable);
        println!("source control: {}", report.source_control);
        println!("issue tracking: {}", report.issue_tracking);
    }
    Ok(())
}
