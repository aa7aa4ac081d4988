//! Initialize a workspace directory.

use std::fs;
use std::path::Path;

use clap::Args;

use notionsync_core::{parse_page_ref, SyncOptions, Workspace};

use super::CommandError;
use crate::config::{Config, ConfigError};

/// Initialize a workspace for syncing with Notion
#[derive(Args)]
pub struct InitCommand {
    /// URL or id of the root Notion page
    #[arg(long, conflicts_with = "database")]
    page: Option<String>,

    /// Sync the entries of a database instead of a page tree
    #[arg(long, value_name = "DATABASE_ID")]
    database: Option<String>,
}

impl InitCommand {
    pub fn run(&self, dir: &Path, config: &Config) -> Result<(), CommandError> {
        for reference in self.page.iter().chain(&self.database) {
            parse_page_ref(reference).map_err(ConfigError::InvalidTarget)?;
        }

        let options = config.sync_options().unwrap_or_else(|e| {
            tracing::debug!("ignoring unusable config during init: {}", e);
            SyncOptions::default()
        });
        let workspace = Workspace::init(dir, options)?;
        println!("Initialized workspace in {}", workspace.store().root().display());

        let config_path = Config::workspace_config_path(dir);
        if config_path.exists() {
            println!("Config file already exists: {}", config_path.display());
        } else {
            fs::write(&config_path, self.config_template())?;
            println!("Created config file: {}", config_path.display());
        }

        if self.page.is_none() && self.database.is_none() && config.target().ok().flatten().is_none()
        {
            println!("\nSet page_url or database_id in the config file before pushing.");
        }
        Ok(())
    }

    fn config_template(&self) -> String {
        let target = match (&self.page, &self.database) {
            (Some(page), _) => format!("page_url: {}\n", page),
            (None, Some(database)) => format!("database_id: {}\n", database),
            (None, None) => "# page_url: https://www.notion.so/...\n".to_string(),
        };
        format!(
            "# notionsync configuration\n\
             \n\
             # Integration token (or set NOTION_API_KEY)\n\
             # api_key: secret_...\n\
             \n\
             # Root page to sync, or database_id for a database\n\
             {}\
             \n\
             # Top-level blocks per append request\n\
             # batch_limit: 100\n\
             \n\
             # Deepest page nesting below the root\n\
             # max_depth: 5\n",
            target
        )
    }
}
