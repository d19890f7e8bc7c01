use super::{block_on, load_config};
use crate::output::print_json;
use accurev_core::source_control::SourceControl;
use anyhow::Context;
use std::path::Path;

pub fn run(config_path: &Path, source: &str, target: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let provider = SourceControl::new(&config);

    let copied = block_on(provider.get_latest(source, target))?
        .with_context(|| format!("failed to get '{source}'"))?;

    if json {
        print_json(&serde_json::json!({
            "source": source,
            "target": target,
            "files": copied,
        }))?;
    } else {
        println!("Copied {copied} file(s) from '{source}' to {}", target.display());
    }
    Ok(())
}
