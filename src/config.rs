use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::{BlockingKey, BlockingKeyError, CandidateStrategy, NormalizationConfig};
use crate::models::StrategyKind;
use crate::services::ReportLayout;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub upload: UploadSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_download_file_name")]
    pub download_file_name: String,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            allowed_extensions: default_allowed_extensions(),
            download_file_name: default_download_file_name(),
        }
    }
}

impl UploadSettings {
    /// Case-insensitive extension check against the allowed list
    pub fn accepts_file_name(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.allowed_extensions.iter().any(|ext| {
            let ext = ext.trim_start_matches('.').to_lowercase();
            !ext.is_empty() && lower.ends_with(&format!(".{}", ext))
        })
    }
}

fn default_max_upload_bytes() -> usize { 20 * 1024 * 1024 }
fn default_allowed_extensions() -> Vec<String> { vec!["xlsx".to_string()] }
fn default_download_file_name() -> String { "matches.xlsx".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_strategy")]
    pub strategy: StrategyKind,
    /// Blocking keys for the bucketed strategy, e.g. `last_name` or `zip_code+address`
    #[serde(default = "default_block_keys")]
    pub block_keys: Vec<String>,
    #[serde(default)]
    pub email_plus_addressing: bool,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            block_keys: default_block_keys(),
            email_plus_addressing: false,
        }
    }
}

fn default_strategy() -> StrategyKind { StrategyKind::Exhaustive }
fn default_block_keys() -> Vec<String> { vec!["last_name".to_string()] }

impl MatchingSettings {
    pub fn blocking_keys(&self) -> Result<Vec<BlockingKey>, BlockingKeyError> {
        self.block_keys.iter().map(|key| key.parse()).collect()
    }

    /// Strategy for `kind`, with blocking keys taken from these settings
    pub fn strategy_for(&self, kind: StrategyKind) -> Result<CandidateStrategy, BlockingKeyError> {
        match kind {
            StrategyKind::Exhaustive => Ok(CandidateStrategy::Exhaustive),
            StrategyKind::Bucketed => {
                let keys = self.blocking_keys()?;
                if keys.is_empty() {
                    return Err(BlockingKeyError::Empty);
                }
                Ok(CandidateStrategy::Bucketed(keys))
            }
        }
    }

    pub fn candidate_strategy(&self) -> Result<CandidateStrategy, BlockingKeyError> {
        self.strategy_for(self.strategy)
    }

    pub fn normalization(&self) -> NormalizationConfig {
        NormalizationConfig {
            email_plus_addressing: self.email_plus_addressing,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default = "default_matched_label")]
    pub matched_label: String,
    #[serde(default = "default_not_matched_label")]
    pub not_matched_label: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            sheet_name: default_sheet_name(),
            matched_label: default_matched_label(),
            not_matched_label: default_not_matched_label(),
        }
    }
}

impl ReportSettings {
    pub fn layout(&self) -> ReportLayout {
        ReportLayout {
            sheet_name: self.sheet_name.clone(),
            matched_label: self.matched_label.clone(),
            not_matched_label: self.not_matched_label.clone(),
        }
    }
}

fn default_sheet_name() -> String { "matches".to_string() }
fn default_matched_label() -> String { "SI".to_string() }
fn default_not_matched_label() -> String { "NO".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_VAR: &str = "CONTACT_DEDUP_CONFIG";

fn environment() -> Environment {
    // e.g., DEDUP__SERVER__PORT -> server.port
    Environment::with_prefix("DEDUP")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("upload.allowed_extensions")
        .with_list_parse_key("matching.block_keys")
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with DEDUP__)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Load from the file named by `CONTACT_DEDUP_CONFIG`, else the default sources
    pub fn load_from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load_from(path.trim()),
            _ => Self::load(),
        }
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.upload.allowed_extensions, vec!["xlsx"]);
        assert_eq!(settings.matching.strategy, StrategyKind::Exhaustive);
        assert!(!settings.matching.email_plus_addressing);
        assert_eq!(settings.report.matched_label, "SI");
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_accepts_file_name() {
        let upload = UploadSettings::default();
        assert!(upload.accepts_file_name("contacts.xlsx"));
        assert!(upload.accepts_file_name("CONTACTS.XLSX"));
        assert!(!upload.accepts_file_name("contacts.csv"));
        assert!(!upload.accepts_file_name("xlsx"));
    }

    #[test]
    fn test_strategy_from_settings() {
        let matching = MatchingSettings::default();
        assert_eq!(matching.candidate_strategy().unwrap(), CandidateStrategy::Exhaustive);

        let bucketed = matching.strategy_for(StrategyKind::Bucketed).unwrap();
        assert!(matches!(bucketed, CandidateStrategy::Bucketed(ref keys) if keys.len() == 1));

        let broken = MatchingSettings {
            strategy: StrategyKind::Bucketed,
            block_keys: vec!["phone".to_string()],
            email_plus_addressing: false,
        };
        assert!(broken.candidate_strategy().is_err());
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let toml = r#"
            [server]
            port = 9000

            [matching]
            strategy = "bucketed"
            block_keys = ["last_name", "zip_code+address"]
        "#;

        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.matching.strategy, StrategyKind::Bucketed);
        assert_eq!(settings.matching.blocking_keys().unwrap().len(), 2);
        assert_eq!(settings.report.sheet_name, "matches");
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("contact-dedup-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[upload]\nallowed_extensions = [\"xlsx\", \"xls\"]\n\n[report]\nmatched_label = \"yes\"\n",
        )
        .unwrap();

        let loaded = Settings::load_from(&path);
        std::fs::remove_file(&path).unwrap();

        let settings = loaded.unwrap();
        assert_eq!(settings.upload.allowed_extensions, vec!["xlsx", "xls"]);
        assert_eq!(settings.report.matched_label, "yes");
        assert_eq!(settings.report.not_matched_label, "NO");
    }

    #[test]
    fn test_load_from_missing_file() {
        assert!(Settings::load_from("config/does-not-exist.toml").is_err());
    }
}
