use std::path::Path;

use clap::Args;

use super::{open_workspace, CommandError};
use crate::config::Config;

/// Record the current Markdown files as a commit
#[derive(Args)]
pub struct CommitCommand {
    /// Commit message
    #[arg(long, short)]
    message: String,
}

impl CommitCommand {
    pub fn run(&self, dir: &Path, config: &Config) -> Result<(), CommandError> {
        let workspace = open_workspace(dir, config)?;
        match workspace.commit(&self.message)? {
            Some(commit) => {
                let count = commit.files.len();
                println!(
                    "[{}] {} ({} file{})",
                    commit.short_id(),
                    commit.message,
                    count,
                    if count == 1 { "" } else { "s" }
                );
            }
            None => println!("Nothing to commit, working tree clean"),
        }
        Ok(())
    }
}
