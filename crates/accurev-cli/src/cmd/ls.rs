use super::{block_on, load_config};
use crate::output::{print_json, print_table};
use accurev_core::source_control::SourceControl;
use anyhow::Context;
use chrono::SecondsFormat;
use std::path::Path;

pub fn run(config_path: &Path, path: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let provider = SourceControl::new(&config);
    let path = path.unwrap_or_default();

    let listing = block_on(provider.materialize_directory(path))?
        .with_context(|| format!("failed to list '{path}'"))?
        .with_context(|| format!("'{path}' not found"))?;

    if json {
        return print_json(&listing);
    }

    if listing.directories.is_empty() && listing.files.is_empty() {
        println!("(empty)");
        return Ok(());
    }

    let mut rows: Vec<Vec<String>> = listing
        .directories
        .iter()
        .map(|d| vec![format!("{d}/"), "dir".to_string(), String::new(), String::new()])
        .collect();
    rows.extend(listing.files.iter().map(|f| {
        vec![
            f.name.clone(),
            "file".to_string(),
            f.size.to_string(),
            f.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        ]
    }));
    print_table(&["NAME", "TYPE", "SIZE", "MODIFIED"], rows);
    Ok(())
}
