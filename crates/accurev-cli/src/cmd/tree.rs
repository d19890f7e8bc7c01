use super::{block_on, load_config};
use crate::output::{print_json, print_tree};
use accurev_core::path::ParsedPath;
use accurev_core::source_control::SourceControl;
use accurev_core::tree::TreeNode;
use anyhow::Context;
use std::path::Path;

pub fn run(config_path: &Path, path: &str, json: bool) -> anyhow::Result<()> {
    let parsed = ParsedPath::resolve(path)?;
    let config = load_config(config_path)?;
    let provider = SourceControl::new(&config);

    let node = block_on(subtree(&provider, &parsed))?
        .with_context(|| format!("failed to read '{path}'"))?
        .with_context(|| format!("stream '{}' not found", parsed.stream_name()))?;

    if json {
        print_json(&node)?;
    } else {
        print_tree(&node);
    }
    Ok(())
}

/// The stream or directory `parsed` points at, expanded recursively.
async fn subtree(
    provider: &SourceControl,
    parsed: &ParsedPath,
) -> accurev_core::Result<Option<TreeNode>> {
    provider.client().login().await?;
    let streams = provider.list_streams().await?;
    let Some(stream) = streams.find(parsed.marker_segment()) else {
        return Ok(None);
    };

    let depot_path = parsed.depot_path();
    let mut node = match parsed.remainder().last() {
        None => stream.clone(),
        Some(name) => TreeNode::directory(name.clone(), depot_path.clone()),
    };
    provider
        .list_files(&mut node, parsed.stream_name(), &depot_path, true)
        .await?;
    Ok(Some(node))
}
