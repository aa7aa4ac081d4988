use std::path::Path;

use clap::Args;

use notionsync_core::CommitRecord;

use super::{open_workspace, CommandError};
use crate::config::Config;

/// List commits, newest first
#[derive(Args)]
pub struct LogCommand {
    /// Show at most this many commits
    #[arg(long, short = 'n')]
    limit: Option<usize>,
}

impl LogCommand {
    pub fn run(&self, dir: &Path, config: &Config) -> Result<(), CommandError> {
        let workspace = open_workspace(dir, config)?;
        let commits = workspace.log()?;
        if commits.is_empty() {
            println!("No commits yet.");
            return Ok(());
        }

        let limit = self.limit.unwrap_or(commits.len());
        for commit in commits.iter().take(limit) {
            println!("{}", render(commit));
        }
        Ok(())
    }
}

fn render(commit: &CommitRecord) -> String {
    format!(
        "commit {}\nDate:  {}\nFiles: {}\n\n    {}\n",
        commit.id,
        commit.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        commit.files.len(),
        commit.message
    )
}
