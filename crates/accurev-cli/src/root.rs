use accurev_core::config::DEFAULT_CONFIG_FILE;
use std::path::{Path, PathBuf};

/// Resolve the config file to use.
///
/// Priority:
/// 1. `--config` flag / `ACCUREV_BRIDGE_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `accurev-bridge.yaml`
/// 3. Fall back to `accurev-bridge.yaml` in `cwd`
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd).unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_FILE))
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}
