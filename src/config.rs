use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use notionsync_core::hierarchy::DEFAULT_MAX_DEPTH;
use notionsync_core::mapper::{DEFAULT_BATCH_LIMIT, MAX_BLOCKS_PER_REQUEST};
use notionsync_core::store::STATE_DIR;
use notionsync_core::{parse_page_ref, NotionClient, PageRefError, RemoteTarget, SyncOptions};

/// File name of the configuration file.
pub const CONFIG_FILE: &str = "config.yaml";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Notion integration token
    #[serde(serialize_with = "serialize_secret")]
    pub api_key: ConfigValue<Option<String>>,
    /// URL or id of the root page
    pub page_url: ConfigValue<Option<String>>,
    /// Database to sync instead of a page tree
    pub database_id: ConfigValue<Option<String>>,
    /// Top-level blocks per append request
    pub batch_limit: ConfigValue<usize>,
    /// Deepest page nesting below the root
    pub max_depth: ConfigValue<usize>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    api_key: Option<String>,
    page_url: Option<String>,
    database_id: Option<String>,
    batch_limit: Option<usize>,
    max_depth: Option<usize>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>, workspace: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, workspace, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], reading environment variables through `env`.
    pub fn load_with_env(
        config_path: Option<PathBuf>,
        workspace: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut api_key = ConfigValue::new(None, ConfigSource::Default);
        let mut page_url = ConfigValue::new(None, ConfigSource::Default);
        let mut database_id = ConfigValue::new(None, ConfigSource::Default);
        let mut batch_limit = ConfigValue::new(DEFAULT_BATCH_LIMIT, ConfigSource::Default);
        let mut max_depth = ConfigValue::new(DEFAULT_MAX_DEPTH, ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(|| Self::find_config(workspace));
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(key) = file_config.api_key {
                api_key = ConfigValue::new(Some(key), ConfigSource::File);
            }
            if let Some(url) = file_config.page_url {
                page_url = ConfigValue::new(Some(url), ConfigSource::File);
            }
            if let Some(id) = file_config.database_id {
                database_id = ConfigValue::new(Some(id), ConfigSource::File);
            }
            if let Some(limit) = file_config.batch_limit {
                batch_limit = ConfigValue::new(limit, ConfigSource::File);
            }
            if let Some(depth) = file_config.max_depth {
                max_depth = ConfigValue::new(depth, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Some(key) = env("NOTION_API_KEY") {
            api_key = ConfigValue::new(Some(key), ConfigSource::Environment);
        }
        if let Some(url) = env("NOTION_PAGE_URL") {
            page_url = ConfigValue::new(Some(url), ConfigSource::Environment);
        }
        if let Some(id) = env("NOTION_DATABASE_ID") {
            database_id = ConfigValue::new(Some(id), ConfigSource::Environment);
        }
        if let Some(limit) = env("NOTIONSYNC_BATCH_LIMIT") {
            let limit = parse_number("NOTIONSYNC_BATCH_LIMIT", &limit)?;
            batch_limit = ConfigValue::new(limit, ConfigSource::Environment);
        }
        if let Some(depth) = env("NOTIONSYNC_MAX_DEPTH") {
            let depth = parse_number("NOTIONSYNC_MAX_DEPTH", &depth)?;
            max_depth = ConfigValue::new(depth, ConfigSource::Environment);
        }

        if batch_limit.value == 0 || batch_limit.value > MAX_BLOCKS_PER_REQUEST {
            return Err(ConfigError::InvalidValue(
                "batch_limit".to_string(),
                format!("must be between 1 and {}", MAX_BLOCKS_PER_REQUEST),
            ));
        }
        if max_depth.value == 0 {
            return Err(ConfigError::InvalidValue(
                "max_depth".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            page_url,
            database_id,
            batch_limit,
            max_depth,
            config_file,
        })
    }

    /// The workspace config if present, else the user config.
    fn find_config(workspace: &Path) -> PathBuf {
        let local = Self::workspace_config_path(workspace);
        if local.exists() {
            local
        } else {
            Self::default_config_path()
        }
    }

    /// Config file inside a workspace's state directory.
    pub fn workspace_config_path(workspace: &Path) -> PathBuf {
        workspace.join(STATE_DIR).join(CONFIG_FILE)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/notionsync/
    /// - macOS: ~/Library/Application Support/notionsync/
    /// - Windows: %APPDATA%/notionsync/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notionsync")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(CONFIG_FILE)
    }

    /// The remote to sync against. A database id takes precedence over a
    /// page URL.
    pub fn target(&self) -> Result<Option<RemoteTarget>, ConfigError> {
        if let Some(id) = &self.database_id.value {
            let id = parse_page_ref(id).map_err(ConfigError::InvalidTarget)?;
            return Ok(Some(RemoteTarget::Database(id)));
        }
        match &self.page_url.value {
            Some(url) => {
                let id = parse_page_ref(url).map_err(ConfigError::InvalidTarget)?;
                Ok(Some(RemoteTarget::Page(id)))
            }
            None => Ok(None),
        }
    }

    pub fn sync_options(&self) -> Result<SyncOptions, ConfigError> {
        Ok(SyncOptions {
            target: self.target()?,
            batch_limit: self.batch_limit.value,
            max_depth: self.max_depth.value,
        })
    }

    /// A Notion client authenticated with the configured key.
    pub fn notion_client(&self) -> Result<NotionClient, ConfigError> {
        let key = self
            .api_key
            .value
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        NotionClient::new(key).map_err(|e| ConfigError::Client(e.to_string()))
    }
}

fn parse_number(name: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string(), format!("'{}' is not a number", value)))
}

fn serialize_secret<S: serde::Serializer>(
    value: &ConfigValue<Option<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let masked = ConfigValue::new(value.value.as_deref().map(mask), value.source.clone());
    masked.serialize(serializer)
}

/// Hides all but the last four characters of a secret.
pub fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
    InvalidTarget(PageRefError),
    MissingApiKey,
    Client(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, reason) => {
                write!(f, "Invalid value for {}: {}", name, reason)
            }
            ConfigError::InvalidTarget(e) => write!(f, "Invalid page URL or database id: {}", e),
            ConfigError::MissingApiKey => write!(
                f,
                "No Notion API key configured. Set api_key in the config file or NOTION_API_KEY."
            ),
            ConfigError::Client(e) => write!(f, "Failed to create Notion client: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::tempdir;

    const PAGE_ID: &str = "0123456789abcdef0123456789abcdef";

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load_with_env(Some(config_path), temp_dir.path(), no_env).unwrap();
        assert_eq!(config.batch_limit.value, DEFAULT_BATCH_LIMIT);
        assert_eq!(config.batch_limit.source, ConfigSource::Default);
        assert_eq!(config.max_depth.value, DEFAULT_MAX_DEPTH);
        assert!(config.api_key.value.is_none());
        assert!(config.config_file.is_none());
        assert_eq!(config.target().unwrap(), None);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "api_key: secret_abcdef").unwrap();
        writeln!(file, "page_url: https://www.notion.so/acme/Docs-{}", PAGE_ID).unwrap();
        writeln!(file, "batch_limit: 50").unwrap();

        let config =
            Config::load_with_env(Some(config_path.clone()), temp_dir.path(), no_env).unwrap();
        assert_eq!(config.api_key.source, ConfigSource::File);
        assert_eq!(config.batch_limit.value, 50);
        assert_eq!(config.batch_limit.source, ConfigSource::File);
        assert_eq!(config.max_depth.source, ConfigSource::Default);
        assert_eq!(config.config_file, Some(config_path));
        assert_eq!(
            config.target().unwrap(),
            Some(RemoteTarget::Page(
                "01234567-89ab-cdef-0123-456789abcdef".to_string()
            ))
        );
    }

    #[test]
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "api_key: fromfile").unwrap();
        writeln!(file, "max_depth: 3").unwrap();

        let env = env_from(&[("NOTION_API_KEY", "fromenv"), ("NOTIONSYNC_BATCH_LIMIT", "20")]);
        let config = Config::load_with_env(Some(config_path), temp_dir.path(), env).unwrap();
        assert_eq!(config.api_key.value.as_deref(), Some("fromenv"));
        assert_eq!(config.api_key.source, ConfigSource::Environment);
        assert_eq!(config.batch_limit.value, 20);
        assert_eq!(config.batch_limit.source, ConfigSource::Environment);
        assert_eq!(config.max_depth.value, 3);
        assert_eq!(config.max_depth.source, ConfigSource::File);
    }

    #[test]
    fn test_workspace_config_is_found() {
        let temp_dir = tempdir().unwrap();
        let path = Config::workspace_config_path(temp_dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("database_id: {}\n", PAGE_ID)).unwrap();

        let config = Config::load_with_env(None, temp_dir.path(), no_env).unwrap();
        assert_eq!(config.config_file, Some(path));
        assert!(matches!(
            config.target().unwrap(),
            Some(RemoteTarget::Database(_))
        ));
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load_with_env(Some(config_path), temp_dir.path(), no_env);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("none.yaml");
        let env = env_from(&[("NOTIONSYNC_MAX_DEPTH", "deep")]);
        assert!(matches!(
            Config::load_with_env(Some(missing.clone()), temp_dir.path(), env),
            Err(ConfigError::InvalidValue(_, _))
        ));
        let env = env_from(&[("NOTIONSYNC_BATCH_LIMIT", "0")]);
        assert!(matches!(
            Config::load_with_env(Some(missing), temp_dir.path(), env),
            Err(ConfigError::InvalidValue(_, _))
        ));
    }

    #[test]
    fn test_bad_page_url() {
        let temp_dir = tempdir().unwrap();
        let env = env_from(&[("NOTION_PAGE_URL", "https://www.notion.so/acme/Docs")]);
        let config =
            Config::load_with_env(Some(temp_dir.path().join("none.yaml")), temp_dir.path(), env)
                .unwrap();
        assert!(matches!(
            config.target(),
            Err(ConfigError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_missing_api_key() {
        let temp_dir = tempdir().unwrap();
        let config = Config::load_with_env(
            Some(temp_dir.path().join("none.yaml")),
            temp_dir.path(),
            no_env,
        )
        .unwrap();
        assert!(matches!(
            config.notion_client(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("secret_abcdef"), "****cdef");
        assert_eq!(mask("abc"), "****");
    }
}
