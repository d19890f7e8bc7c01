use super::{block_on, load_config};
use crate::output::{print_json, print_table};
use accurev_core::issues::{Issue, IssueTracker};
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct IssueRow<'a> {
    #[serde(flatten)]
    issue: &'a Issue,
    closed: bool,
}

pub fn run(
    config_path: &Path,
    release: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let tracker = IssueTracker::new(&config)?;

    let issues = block_on(tracker.query_issues(release, category))?
        .context("failed to query issues")?;

    if json {
        let rows: Vec<IssueRow> = issues
            .iter()
            .map(|issue| IssueRow {
                issue,
                closed: tracker.is_issue_closed(issue),
            })
            .collect();
        return print_json(&rows);
    }

    if issues.is_empty() {
        println!("No issues.");
        return Ok(());
    }

    let rows = issues
        .iter()
        .map(|i| {
            vec![
                i.id.clone(),
                i.status.clone(),
                if tracker.is_issue_closed(i) { "yes" } else { "" }.to_string(),
                i.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "CLOSED", "TITLE"], rows);
    Ok(())
}
