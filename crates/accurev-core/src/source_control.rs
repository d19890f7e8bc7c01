//! Stream and directory browsing on top of `accurev show streams`,
//! `accurev files` and `accurev pop`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use accurev_process::Invocation;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::client::AccuRev;
use crate::config::Config;
use crate::error::{AccuRevError, Result};
use crate::path::{last_segment, ParsedPath, ROOT_PATH_PREFIX};
use crate::tree::{DirectoryListing, NodeKind, TreeNode};
use crate::xml::Document;

/// Directory name prefix of the scratch directory `accurev pop` writes into.
pub const STAGING_PREFIX: &str = "accurev-pop-";

// ---------------------------------------------------------------------------
// SourceControl
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SourceControl {
    client: AccuRev,
    epoch_mod_times: bool,
}

impl SourceControl {
    pub fn new(config: &Config) -> Self {
        Self {
            client: AccuRev::new(config),
            epoch_mod_times: config.source_control.epoch_mod_times,
        }
    }

    pub fn client(&self) -> &AccuRev {
        &self.client
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    /// Log in and list streams; any failure means the configuration is
    /// unusable.
    pub async fn validate_connection(&self) -> Result<()> {
        self.client.login().await?;
        let streams = self.list_streams().await?;
        info!(
            root = %streams.name,
            streams = streams.node_count(),
            "accurev connection ok"
        );
        Ok(())
    }

    /// The full basis/derived stream hierarchy.
    pub async fn list_streams(&self) -> Result<TreeNode> {
        let doc = self
            .client
            .run_xml(&Invocation::new("show").args(["-fx", "streams"]))
            .await?;
        build_stream_tree(&doc)
    }

    /// Log in, then add the elements under `path` in `stream` as children of
    /// `node`, descending into every directory when `recurse` is set.
    pub async fn list_files(
        &self,
        node: &mut TreeNode,
        stream: &str,
        path: &str,
        recurse: bool,
    ) -> Result<()> {
        self.client.login().await?;
        self.read_files(node, stream, path, recurse).await
    }

    async fn read_files(
        &self,
        node: &mut TreeNode,
        stream: &str,
        path: &str,
        recurse: bool,
    ) -> Result<()> {
        let doc = self
            .client
            .run_xml(&Invocation::new("files").args(["-fx", "-s", stream, path]))
            .await?;
        let directories = populate_from_files(node, &doc, path, self.epoch_mod_times);
        debug!(stream, path, directories = directories.len(), "read accurev files");

        if recurse {
            for (name, location) in directories {
                if let Some(child) = node.child_mut(&name) {
                    Box::pin(self.read_files(child, stream, &location, true)).await?;
                }
            }
        }
        Ok(())
    }

    /// One level of the namespace at `path`, fetched on demand.
    ///
    /// An empty path lists the root stream. Otherwise the marker segment is
    /// located in the stream tree and each remainder segment is expanded with
    /// one `files` call. `Ok(None)` when the stream or a segment is missing.
    pub async fn materialize_directory(&self, path: &str) -> Result<Option<DirectoryListing>> {
        if path.trim().is_empty() {
            self.client.login().await?;
            let streams = self.list_streams().await?;
            return Ok(Some(DirectoryListing {
                path: String::new(),
                directories: vec![streams.name],
                files: Vec::new(),
            }));
        }

        let parsed = ParsedPath::resolve(path)?;
        self.client.login().await?;
        let mut root = self.list_streams().await?;

        let Some(mut node) = root.find_mut(parsed.marker_segment()) else {
            debug!(stream = parsed.stream_name(), "stream not found");
            return Ok(None);
        };
        let stream = parsed.stream_name();
        self.read_files(node, stream, ROOT_PATH_PREFIX, false).await?;

        for segment in parsed.remainder() {
            node = match node.child_mut(segment) {
                Some(child) if child.kind == NodeKind::Directory => child,
                _ => {
                    debug!(stream, segment = %segment, "path segment not found");
                    return Ok(None);
                }
            };
            let location = node.location.clone().unwrap_or_default();
            self.read_files(node, stream, &location, false).await?;
        }

        Ok(Some(node.to_listing(path)))
    }

    /// Populate the element at `source` into a scratch directory and copy it
    /// into `target`. Returns the number of files copied.
    ///
    /// The scratch directory is removed on every path, including failures.
    pub async fn get_latest(&self, source: &str, target: &Path) -> Result<usize> {
        if source.trim().is_empty() {
            return Err(AccuRevError::invalid_path(source, "stream not specified"));
        }
        let parsed = ParsedPath::resolve(source)?;
        self.client.login().await?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(self.client.scratch_dir())?;
        let pop = Invocation::new("pop")
            .args(["-fx", "-O", "-R", "-v", parsed.stream_name(), "-L"])
            .arg(staging.path())
            .arg(parsed.depot_path());
        self.client.run(&pop).await?;

        let populated: PathBuf = parsed
            .remainder()
            .iter()
            .fold(staging.path().to_path_buf(), |dir, segment| dir.join(segment));
        let copied = crate::io::copy_tree(&populated, target)?;
        info!(
            source,
            target = %target.display(),
            files = copied,
            "copied latest from accurev"
        );
        Ok(copied)
    }
}

// ---------------------------------------------------------------------------
// Reply → tree
// ---------------------------------------------------------------------------

/// Rebuild the stream hierarchy from a `show -fx streams` reply.
///
/// Exactly one stream may lack a `basis`; it becomes the root. Streams whose
/// basis chain never reaches the root are dropped with a warning.
pub fn build_stream_tree(doc: &Document) -> Result<TreeNode> {
    let streams = doc.select_all("stream");

    let mut roots = Vec::new();
    let mut derived: HashMap<&str, Vec<&str>> = HashMap::new();
    for stream in &streams {
        let name = stream.attr("name").unwrap_or_default();
        match stream.attr("basis") {
            Some(basis) => derived.entry(basis).or_default().push(name),
            None => roots.push(name),
        }
    }

    let root_name = match roots.as_slice() {
        [only] => *only,
        _ => return Err(AccuRevError::NoRootStream { found: roots.len() }),
    };

    let mut root = TreeNode::stream(root_name);
    let mut seen = HashSet::from([root_name]);
    attach_derived(&mut root, root_name, &derived, &mut seen);

    let attached = root.node_count();
    if attached < streams.len() {
        warn!(
            dropped = streams.len() - attached,
            "streams not connected to the root stream were ignored"
        );
    }
    Ok(root)
}

fn attach_derived<'a>(
    node: &mut TreeNode,
    name: &str,
    derived: &HashMap<&'a str, Vec<&'a str>>,
    seen: &mut HashSet<&'a str>,
) {
    let Some(children) = derived.get(name) else {
        return;
    };
    for &child in children {
        if !seen.insert(child) {
            continue;
        }
        let child_node = node.add_child(TreeNode::stream(child));
        attach_derived(child_node, child, derived, seen);
    }
}

/// Add every `<element>` of a `files -fx` reply to `node`.
///
/// Returns `(name, location)` of each directory added, in reply order. The
/// element for `listed_path` itself is skipped.
pub fn populate_from_files(
    node: &mut TreeNode,
    doc: &Document,
    listed_path: &str,
    epoch_mod_times: bool,
) -> Vec<(String, String)> {
    let mut directories = Vec::new();
    for element in doc.select_all("element") {
        let location = element.attr("location").unwrap_or_default();
        let name = last_segment(location);
        if name.is_empty() || name == "." || location == listed_path {
            continue;
        }

        let is_dir = element
            .attr("dir")
            .is_some_and(|d| d.eq_ignore_ascii_case("yes"));
        if is_dir {
            node.add_child(TreeNode::directory(name, location));
            directories.push((name.to_string(), location.to_string()));
        } else {
            let size = element
                .attr("size")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0);
            let modified = if epoch_mod_times {
                DateTime::<Utc>::UNIX_EPOCH
            } else {
                parse_mod_time(element.attr("modTime"))
            };
            node.add_child(TreeNode::file(name, size, modified));
        }
    }
    directories
}

/// Unix seconds to UTC; missing or unparseable values give the epoch.
pub fn parse_mod_time(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
