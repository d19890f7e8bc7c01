pub mod categories;
pub mod check;
pub mod config;
pub mod get;
pub mod issues;
pub mod ls;
pub mod streams;
pub mod tree;

use accurev_core::config::Config;
use anyhow::Context;
use std::future::Future;
use std::path::Path;

/// Load the config file, pointing at `config init` when it is missing.
pub(crate) fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load(path).with_context(|| {
        format!(
            "failed to load config (run `accurev-bridge config init` to create {})",
            path.display()
        )
    })
}

/// Drive one async operation to completion on a fresh runtime.
pub(crate) fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    Ok(rt.block_on(future))
}
