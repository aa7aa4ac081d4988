use std::path::Path;

use clap::Args;

use notionsync_core::PullReport;

use super::{open_workspace, render_problems, CommandError};
use crate::config::Config;

/// Fetch the Notion pages into the workspace
#[derive(Args)]
pub struct PullCommand {}

impl PullCommand {
    pub fn run(&self, dir: &Path, config: &Config) -> Result<(), CommandError> {
        let workspace = open_workspace(dir, config)?;
        let client = config.notion_client()?;

        println!("Pulling from Notion...");
        let report = workspace.pull(&client)?;
        for line in render(&report) {
            println!("{}", line);
        }
        CommandError::from_failures("pull", &report.failures)
    }
}

fn render(report: &PullReport) -> Vec<String> {
    let mut lines = Vec::new();
    for file in &report.written {
        lines.push(format!("  ✓ wrote   {}", file));
    }
    for file in &report.removed {
        lines.push(format!("  ✓ removed {}", file));
    }
    lines.extend(render_problems(&report.warnings, &report.failures));

    let conflicts = report.conflicts();
    if !conflicts.is_empty() {
        lines.push(String::new());
        lines.push("Commit or discard local changes to these files, then pull again:".to_string());
        for file in conflicts {
            lines.push(format!("  {}", file));
        }
    }

    lines.push(String::new());
    match &report.commit {
        Some(commit) => lines.push(format!(
            "[{}] {} ({} written, {} removed, {} unchanged)",
            commit.short_id(),
            commit.message,
            report.written.len(),
            report.removed.len(),
            report.unchanged
        )),
        None => lines.push("Already up to date.".to_string()),
    }
    lines
}
