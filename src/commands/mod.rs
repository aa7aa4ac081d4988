mod commit;
mod config_cmd;
mod init;
mod log;
mod pull;
mod push;
mod status;

pub use commit::CommitCommand;
pub use config_cmd::ConfigCommand;
pub use init::InitCommand;
pub use log::LogCommand;
pub use pull::PullCommand;
pub use push::PushCommand;
pub use status::StatusCommand;

use std::path::Path;

use notionsync_core::{PageFailure, SyncError, Warning, Workspace};

use crate::config::{Config, ConfigError};

/// Error returned by any command.
#[derive(Debug)]
pub enum CommandError {
    Config(ConfigError),
    Sync(SyncError),
    Io(std::io::Error),
    /// The operation finished but some pages failed.
    Incomplete {
        operation: &'static str,
        failed: usize,
        category: &'static str,
    },
    Output(serde_json::Error),
}

impl CommandError {
    /// Short category name printed with the error.
    pub fn category(&self) -> &'static str {
        match self {
            CommandError::Config(_) => "config",
            CommandError::Sync(e) => e.category(),
            CommandError::Io(_) => "io",
            CommandError::Incomplete { category, .. } => category,
            CommandError::Output(_) => "io",
        }
    }

    /// Turns a non-empty failure list into an error.
    fn from_failures(operation: &'static str, failures: &[PageFailure]) -> Result<(), Self> {
        match failures.first() {
            None => Ok(()),
            Some(first) => Err(CommandError::Incomplete {
                operation,
                failed: failures.len(),
                category: first.error.category(),
            }),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Config(e) => write!(f, "{}", e),
            CommandError::Sync(e) => write!(f, "{}", e),
            CommandError::Io(e) => write!(f, "IO error: {}", e),
            CommandError::Incomplete {
                operation, failed, ..
            } => write!(
                f,
                "{} finished with {} failed page{}",
                operation,
                failed,
                if *failed == 1 { "" } else { "s" }
            ),
            CommandError::Output(e) => write!(f, "Failed to format output: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Config(e) => Some(e),
            CommandError::Sync(e) => Some(e),
            CommandError::Io(e) => Some(e),
            CommandError::Incomplete { .. } => None,
            CommandError::Output(e) => Some(e),
        }
    }
}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        CommandError::Config(e)
    }
}

impl From<SyncError> for CommandError {
    fn from(e: SyncError) -> Self {
        CommandError::Sync(e)
    }
}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError::Io(e)
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        CommandError::Output(e)
    }
}

fn open_workspace(dir: &Path, config: &Config) -> Result<Workspace, CommandError> {
    Ok(Workspace::open(dir, config.sync_options()?)?)
}

/// Lines for a report's warnings and failures.
fn render_problems(warnings: &[Warning], failures: &[PageFailure]) -> Vec<String> {
    let mut lines = Vec::new();
    for warning in warnings {
        lines.push(format!("  warning: {}", warning));
    }
    for failure in failures {
        lines.push(format!("  ✗ {}", failure));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_takes_first_category() {
        let failures = vec![
            PageFailure {
                file: "A.md".to_string(),
                error: SyncError::Conflict {
                    file: "A.md".to_string(),
                },
            },
            PageFailure {
                file: "B.md".to_string(),
                error: SyncError::NoCommits,
            },
        ];
        let err = CommandError::from_failures("pull", &failures).unwrap_err();
        assert_eq!(err.category(), "conflict");
        assert_eq!(err.to_string(), "pull finished with 2 failed pages");

        assert!(CommandError::from_failures("push", &[]).is_ok());
    }

    #[test]
    fn test_problem_lines() {
        let warnings = vec![Warning::UnsupportedBlock {
            block_type: "bookmark".to_string(),
        }];
        let failures = vec![PageFailure {
            file: "A.md".to_string(),
            error: SyncError::Conflict {
                file: "A.md".to_string(),
            },
        }];
        let lines = render_problems(&warnings, &failures);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  warning: "));
        assert!(lines[1].starts_with("  ✗ A.md: [conflict]"));
    }
}
