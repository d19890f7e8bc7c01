use super::{block_on, load_config};
use crate::output::print_json;
use accurev_core::issues::IssueTracker;
use anyhow::Context;
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let tracker = IssueTracker::new(&config)?;

    let (types, categories) = block_on(async {
        let types = tracker.category_type_names().await?;
        let categories = tracker.categories().await?;
        Ok::<_, accurev_core::AccuRevError>((types, categories))
    })?
    .context("failed to read categories")?;

    if json {
        return print_json(&serde_json::json!({
            "types": types,
            "categories": categories,
        }));
    }

    match types.first() {
        Some(name) => println!("{name}:"),
        None => {
            println!("No category field configured.");
            return Ok(());
        }
    }
    for category in &categories {
        println!("  {}", category.name);
    }
    Ok(())
}
