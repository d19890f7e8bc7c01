use super::{block_on, load_config};
use crate::output::{print_json, print_tree};
use accurev_core::source_control::SourceControl;
use anyhow::Context;
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let provider = SourceControl::new(&config);
    let streams = block_on(async {
        provider.client().login().await?;
        provider.list_streams().await
    })?
    .context("failed to list streams")?;

    if json {
        print_json(&streams)?;
    } else {
        print_tree(&streams);
    }
    Ok(())
}
