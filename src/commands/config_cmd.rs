use clap::{Args, Subcommand, ValueEnum};

use super::CommandError;
use crate::config::{mask, Config};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), CommandError> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", render_text(config));
                    }
                }
                Ok(())
            }
        }
    }
}

fn render_text(config: &Config) -> String {
    let mut out = String::from("Configuration\n=============\n\n");

    match &config.config_file {
        Some(path) => out.push_str(&format!("Config file: {}\n\n", path.display())),
        None => out.push_str(&format!(
            "Config file: {} (not found)\n\n",
            Config::default_config_path().display()
        )),
    }

    let unset = || "(not set)".to_string();
    let entries = [
        (
            "api_key",
            config.api_key.value.as_deref().map(mask).unwrap_or_else(unset),
            &config.api_key.source,
        ),
        (
            "page_url",
            config.page_url.value.clone().unwrap_or_else(unset),
            &config.page_url.source,
        ),
        (
            "database_id",
            config.database_id.value.clone().unwrap_or_else(unset),
            &config.database_id.source,
        ),
        (
            "batch_limit",
            config.batch_limit.value.to_string(),
            &config.batch_limit.source,
        ),
        (
            "max_depth",
            config.max_depth.value.to_string(),
            &config.max_depth.source,
        ),
    ];
    for (name, value, source) in entries {
        out.push_str(&format!("{}: {}\n  source: {}\n\n", name, value, source));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_masks_api_key() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::load_with_env(
            Some(temp.path().join("none.yaml")),
            temp.path(),
            |key| (key == "NOTION_API_KEY").then(|| "secret_abcdef".to_string()),
        )
        .unwrap();

        let text = render_text(&config);
        assert!(text.contains("api_key: ****cdef\n  source: environment"));
        assert!(text.contains("page_url: (not set)\n  source: default"));
        assert!(!text.contains("secret_abcdef"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("****cdef"));
        assert!(!json.contains("secret_abcdef"));
    }
}
