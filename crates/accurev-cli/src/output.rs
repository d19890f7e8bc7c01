use accurev_core::tree::{NodeKind, TreeNode};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Indented rendering of a namespace subtree. Containers end in `/`, files
/// show their size.
pub fn print_tree(node: &TreeNode) {
    let mut lines = Vec::new();
    render_tree(node, 0, &mut lines);
    for line in lines {
        println!("{line}");
    }
}

fn render_tree(node: &TreeNode, depth: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match node.kind {
        NodeKind::File => out.push(format!("{indent}{} ({} bytes)", node.name, node.size)),
        NodeKind::Stream | NodeKind::Directory => {
            out.push(format!("{indent}{}/", node.name));
            for child in &node.children {
                render_tree(child, depth + 1, out);
            }
        }
    }
}
