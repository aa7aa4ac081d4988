use std::path::Path;

use clap::Args;

use notionsync_core::{RemoteClient, StatusReport};

use super::{open_workspace, CommandError};
use crate::config::{Config, ConfigError};

/// Show local changes and remote edits since the last sync
#[derive(Args)]
pub struct StatusCommand {
    /// Skip the remote check
    #[arg(long)]
    offline: bool,
}

impl StatusCommand {
    pub fn run(&self, dir: &Path, config: &Config) -> Result<(), CommandError> {
        let workspace = open_workspace(dir, config)?;

        let client = if self.offline || config.target()?.is_none() {
            None
        } else {
            match config.notion_client() {
                Ok(client) => Some(client),
                Err(ConfigError::MissingApiKey) => {
                    println!("No API key configured; skipping the remote check.\n");
                    None
                }
                Err(e) => return Err(e.into()),
            }
        };

        let report = workspace.status(client.as_ref().map(|c| c as &dyn RemoteClient))?;
        for line in render(&report) {
            println!("{}", line);
        }
        Ok(())
    }
}

fn render(report: &StatusReport) -> Vec<String> {
    let mut lines = Vec::new();
    let local = &report.local;

    if local.is_clean() {
        lines.push("Nothing to commit, working tree clean".to_string());
    } else {
        lines.push("Changes not committed:".to_string());
        for file in &local.added {
            lines.push(format!("  added:    {}", file));
        }
        for file in &local.modified {
            lines.push(format!("  modified: {}", file));
        }
        for file in &local.deleted {
            lines.push(format!("  deleted:  {}", file));
        }
    }

    if !report.unpushed.is_empty() {
        lines.push(String::new());
        lines.push("Committed but not pushed:".to_string());
        for file in &report.unpushed {
            lines.push(format!("  {}", file));
        }
    }

    if let Some(remote) = &report.remote {
        lines.push(String::new());
        if remote.is_clean() {
            lines.push("Remote unchanged since last sync".to_string());
        } else {
            lines.push("Remote changes since last sync:".to_string());
            for file in &remote.changed {
                lines.push(format!("  changed: {}", file));
            }
            for file in &remote.missing {
                lines.push(format!("  missing: {}", file));
            }
            for (file, reason) in &remote.unreachable {
                lines.push(format!("  unreachable: {} ({})", file, reason));
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use notionsync_core::{RemoteDivergence, Status};

    #[test]
    fn test_render_clean() {
        let lines = render(&StatusReport::default());
        assert_eq!(lines, vec!["Nothing to commit, working tree clean"]);
    }

    #[test]
    fn test_render_changes() {
        let report = StatusReport {
            local: Status {
                added: vec!["C.md".to_string()],
                modified: vec!["A.md".to_string()],
                deleted: vec!["B.md".to_string()],
            },
            remote: Some(RemoteDivergence {
                changed: vec!["D.md".to_string()],
                missing: vec![],
                unreachable: vec![("E.md".to_string(), "timeout".to_string())],
            }),
            unpushed: vec!["A.md".to_string()],
        };
        let lines = render(&report);
        assert!(lines.contains(&"  added:    C.md".to_string()));
        assert!(lines.contains(&"  modified: A.md".to_string()));
        assert!(lines.contains(&"  deleted:  B.md".to_string()));
        assert!(lines.contains(&"Committed but not pushed:".to_string()));
        assert!(lines.contains(&"  changed: D.md".to_string()));
        assert!(lines.contains(&"  unreachable: E.md (timeout)".to_string()));
    }
}
