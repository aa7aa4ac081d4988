use std::path::Path;

use clap::Args;

use notionsync_core::PushReport;

use super::{open_workspace, render_problems, CommandError};
use crate::config::Config;

/// Send the last commit to Notion
#[derive(Args)]
pub struct PushCommand {}

impl PushCommand {
    pub fn run(&self, dir: &Path, config: &Config) -> Result<(), CommandError> {
        let workspace = open_workspace(dir, config)?;
        let client = config.notion_client()?;

        println!("Pushing to Notion...");
        let report = workspace.push(&client)?;
        for line in render(&report) {
            println!("{}", line);
        }
        CommandError::from_failures("push", &report.failures)
    }
}

fn render(report: &PushReport) -> Vec<String> {
    let mut lines = Vec::new();
    for file in &report.created {
        lines.push(format!("  ✓ created  {}", file));
    }
    for file in &report.updated {
        lines.push(format!("  ✓ updated  {}", file));
    }
    for file in &report.archived {
        lines.push(format!("  ✓ archived {}", file));
    }
    lines.extend(render_problems(&report.warnings, &report.failures));

    let changed = report.created.len() + report.updated.len() + report.archived.len();
    lines.push(String::new());
    if changed == 0 && report.failures.is_empty() {
        lines.push("Already up to date.".to_string());
    } else {
        lines.push(format!(
            "{} changed, {} unchanged, {} failed",
            changed,
            report.unchanged,
            report.failures.len()
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_up_to_date() {
        let report = PushReport {
            unchanged: 3,
            ..Default::default()
        };
        assert_eq!(render(&report).last().unwrap(), "Already up to date.");
    }

    #[test]
    fn test_render_summary() {
        let report = PushReport {
            created: vec!["A.md".to_string()],
            updated: vec!["index.md".to_string()],
            unchanged: 2,
            ..Default::default()
        };
        let lines = render(&report);
        assert_eq!(lines[0], "  ✓ created  A.md");
        assert_eq!(lines[1], "  ✓ updated  index.md");
        assert_eq!(lines.last().unwrap(), "2 changed, 2 unchanged, 0 failed");
    }
}
