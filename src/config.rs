//! Configuration for feedcast.
//!
//! Values come from an optional TOML file, then environment variables, which
//! take precedence. `main` loads `config.env` into the environment first, if
//! present. The file may set any subset of keys; missing keys fall back to
//! `Config::default()`.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::content::DEFAULT_MODEL;
use crate::cycle::CycleSettings;
use crate::util::validate_feed_url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Missing required credential: {0}")]
    MissingCredential(&'static str),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// Credentials are kept as plain strings only until [`Config::validate`]
/// moves them into [`Credentials`]; the `Debug` impl masks them.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord channel (snowflake) that receives posts.
    pub discord_channel_id: Option<String>,

    /// Feeds to poll, in the order they are processed each cycle.
    pub feed_urls: Vec<String>,

    /// Minimum minutes between two checks of the same feed; also the timer period.
    pub check_interval_minutes: u64,

    /// Steady-state cap on posts per feed per cycle.
    pub max_posts_per_feed: usize,

    /// Ask the model whether an entry is worth posting before rewriting it.
    pub enable_content_validation: bool,

    /// Pause after each published post.
    pub post_delay_secs: u64,

    /// Where the seen-set is persisted.
    pub state_file: PathBuf,

    /// Anthropic model used for rewriting and validation.
    pub model: String,

    pub anthropic_base_url: Option<String>,
    pub discord_base_url: Option<String>,

    pub discord_bot_token: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_channel_id: None,
            feed_urls: Vec::new(),
            check_interval_minutes: 60,
            max_posts_per_feed: 2,
            enable_content_validation: true,
            post_delay_secs: 2,
            state_file: PathBuf::from("processed_posts.json"),
            model: DEFAULT_MODEL.to_string(),
            anthropic_base_url: None,
            discord_base_url: None,
            discord_bot_token: None,
            anthropic_api_key: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_channel_id", &self.discord_channel_id)
            .field("feed_urls", &self.feed_urls)
            .field("check_interval_minutes", &self.check_interval_minutes)
            .field("max_posts_per_feed", &self.max_posts_per_feed)
            .field("enable_content_validation", &self.enable_content_validation)
            .field("post_delay_secs", &self.post_delay_secs)
            .field("state_file", &self.state_file)
            .field("model", &self.model)
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("discord_base_url", &self.discord_base_url)
            .field(
                "discord_bot_token",
                &self.discord_bot_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Secrets needed to talk to Discord and Anthropic.
pub struct Credentials {
    pub discord_bot_token: SecretString,
    pub anthropic_api_key: SecretString,
}

const KNOWN_KEYS: &[&str] = &[
    "discord_channel_id",
    "feed_urls",
    "check_interval_minutes",
    "max_posts_per_feed",
    "enable_content_validation",
    "post_delay_secs",
    "state_file",
    "model",
    "anthropic_base_url",
    "discord_base_url",
    "discord_bot_token",
    "anthropic_api_key",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), feeds = config.feed_urls.len(), "Loaded configuration");
        Ok(config)
    }

    /// Overlays environment variables. `lookup` is `std::env::var` in
    /// production; tests pass a closure over a fixed map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DISCORD_CHANNEL_ID") {
            self.discord_channel_id = Some(v.trim().to_string());
        }
        if let Some(v) = lookup("RSS_FEED_URL") {
            self.feed_urls = split_feed_list(&v);
        }
        if let Some(v) = lookup("CHECK_INTERVAL_MINUTES") {
            self.check_interval_minutes = parse_number("CHECK_INTERVAL_MINUTES", &v)?;
        }
        if let Some(v) = lookup("MAX_POSTS_PER_FEED") {
            self.max_posts_per_feed = parse_number("MAX_POSTS_PER_FEED", &v)?;
        }
        if let Some(v) = lookup("ENABLE_CONTENT_VALIDATION") {
            self.enable_content_validation = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("FEEDCAST_STATE_FILE") {
            self.state_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("DISCORD_BOT_TOKEN") {
            self.discord_bot_token = Some(v);
        }
        if let Some(v) = lookup("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = Some(v);
        }
        Ok(())
    }

    /// Checks required settings, drops unusable feed URLs and hands back the
    /// credentials. A missing credential is fatal.
    pub fn validate(&mut self) -> Result<Credentials, ConfigError> {
        let channel = self
            .discord_channel_id
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(ConfigError::Missing("DISCORD_CHANNEL_ID"))?;
        if !channel.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue {
                key: "DISCORD_CHANNEL_ID",
                value: channel.to_string(),
            });
        }

        if self.check_interval_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CHECK_INTERVAL_MINUTES",
                value: "0".into(),
            });
        }
        if self.max_posts_per_feed == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_POSTS_PER_FEED",
                value: "0".into(),
            });
        }

        self.feed_urls.retain(|url| match validate_feed_url(url) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(feed = %url, error = %e, "Ignoring invalid feed URL");
                false
            }
        });
        if self.feed_urls.is_empty() {
            tracing::warn!("No feed URLs configured, cycles will do nothing");
        }

        let discord_bot_token = secret(&self.discord_bot_token)
            .ok_or(ConfigError::MissingCredential("DISCORD_BOT_TOKEN"))?;
        let anthropic_api_key = secret(&self.anthropic_api_key)
            .ok_or(ConfigError::MissingCredential("ANTHROPIC_API_KEY"))?;

        Ok(Credentials {
            discord_bot_token,
            anthropic_api_key,
        })
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_minutes.saturating_mul(60))
    }

    pub fn cycle_settings(&self) -> CycleSettings {
        CycleSettings {
            check_interval: self.check_interval(),
            max_posts_per_feed: self.max_posts_per_feed,
            validate_content: self.enable_content_validation,
            post_delay: Duration::from_secs(self.post_delay_secs),
        }
    }
}

/// Comma-separated list, entries trimmed, blanks dropped.
fn split_feed_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn secret(value: &Option<String>) -> Option<SecretString> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| SecretString::from(v.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn complete_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DISCORD_CHANNEL_ID", "123456789012345678"),
            (
                "RSS_FEED_URL",
                "https://a.example.com/feed, https://b.example.com/rss ,,",
            ),
            ("DISCORD_BOT_TOKEN", "discord-secret"),
            ("ANTHROPIC_API_KEY", "anthropic-secret"),
        ]
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.check_interval_minutes, 60);
        assert_eq!(config.max_posts_per_feed, 2);
        assert!(config.enable_content_validation);
        assert_eq!(config.post_delay_secs, 2);
        assert_eq!(config.state_file, PathBuf::from("processed_posts.json"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.feed_urls.is_empty());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("feedcast.toml")).unwrap();
        assert_eq!(config.check_interval_minutes, 60);
    }

    #[test]
    fn test_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedcast.toml");
        std::fs::write(
            &path,
            r#"
discord_channel_id = "42"
feed_urls = ["https://example.com/feed"]
check_interval_minutes = 15
post_delay_secs = 0
model = "claude-test"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.discord_channel_id.as_deref(), Some("42"));
        assert_eq!(config.feed_urls, vec!["https://example.com/feed"]);
        assert_eq!(config.check_interval_minutes, 15);
        assert_eq!(config.post_delay_secs, 0);
        assert_eq!(config.model, "claude-test");
        assert_eq!(config.max_posts_per_feed, 2); // default
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedcast.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedcast.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::TooLarge(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config {
            check_interval_minutes: 15,
            ..Default::default()
        };
        config
            .apply_env(env(&[
                ("CHECK_INTERVAL_MINUTES", "30"),
                ("MAX_POSTS_PER_FEED", "5"),
                ("ENABLE_CONTENT_VALIDATION", "False"),
            ]))
            .unwrap();

        assert_eq!(config.check_interval_minutes, 30);
        assert_eq!(config.max_posts_per_feed, 5);
        assert!(!config.enable_content_validation);
    }

    #[test]
    fn test_validation_flag_only_true_enables() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("ENABLE_CONTENT_VALIDATION", "yes")]))
            .unwrap();
        assert!(!config.enable_content_validation);

        config
            .apply_env(env(&[("ENABLE_CONTENT_VALIDATION", "TRUE")]))
            .unwrap();
        assert!(config.enable_content_validation);
    }

    #[test]
    fn test_feed_list_split_and_trimmed() {
        let mut config = Config::default();
        config.apply_env(env(&complete_env())).unwrap();
        assert_eq!(
            config.feed_urls,
            vec!["https://a.example.com/feed", "https://b.example.com/rss"]
        );
    }

    #[test]
    fn test_bad_number_is_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("CHECK_INTERVAL_MINUTES", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "CHECK_INTERVAL_MINUTES",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_complete_config() {
        let mut config = Config::default();
        config.apply_env(env(&complete_env())).unwrap();

        let creds = config.validate().unwrap();
        assert_eq!(creds.discord_bot_token.expose_secret(), "discord-secret");
        assert_eq!(creds.anthropic_api_key.expose_secret(), "anthropic-secret");
    }

    #[test]
    fn test_missing_discord_token_refuses_start() {
        let mut vars = complete_env();
        vars.retain(|(k, _)| *k != "DISCORD_BOT_TOKEN");
        let mut config = Config::default();
        config.apply_env(env(&vars)).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredential("DISCORD_BOT_TOKEN"))
        ));
    }

    #[test]
    fn test_blank_anthropic_key_refuses_start() {
        let mut vars = complete_env();
        vars.push(("ANTHROPIC_API_KEY", "   "));
        let mut config = Config::default();
        config.apply_env(env(&vars)).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredential("ANTHROPIC_API_KEY"))
        ));
    }

    #[test]
    fn test_missing_channel_refuses_start() {
        let mut vars = complete_env();
        vars.retain(|(k, _)| *k != "DISCORD_CHANNEL_ID");
        let mut config = Config::default();
        config.apply_env(env(&vars)).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("DISCORD_CHANNEL_ID"))
        ));
    }

    #[test]
    fn test_non_numeric_channel_rejected() {
        let mut config = Config::default();
        config.apply_env(env(&complete_env())).unwrap();
        config.discord_channel_id = Some("general".into());

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                key: "DISCORD_CHANNEL_ID",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_feed_urls_dropped() {
        let mut config = Config::default();
        config.apply_env(env(&complete_env())).unwrap();
        config.feed_urls.push("ftp://example.com/feed".into());
        config.feed_urls.push("not a url".into());

        config.validate().unwrap();
        assert_eq!(config.feed_urls.len(), 2);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = Config::default();
        config.apply_env(env(&complete_env())).unwrap();
        config.check_interval_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cycle_settings() {
        let config = Config::default();
        let settings = config.cycle_settings();
        assert_eq!(settings.check_interval, Duration::from_secs(3600));
        assert_eq!(settings.max_posts_per_feed, 2);
        assert!(settings.validate_content);
        assert_eq!(settings.post_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_debug_masks_credentials() {
        let mut config = Config::default();
        config.apply_env(env(&complete_env())).unwrap();

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("discord-secret"));
        assert!(!debug_output.contains("anthropic-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
