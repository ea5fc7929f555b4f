// common/src/config.rs
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use config::{Config as ConfigFile, File, Environment};

use crate::error::ConfigurationError;
use crate::launch::DEFAULT_MAX_AGE_SECS;
use crate::lifecycle::DEFAULT_SESSION_DURATION_SECS;

/// Upper bound for `session.duration_secs`: one year
pub const MAX_SESSION_DURATION_SECS: i64 = 365 * 24 * 60 * 60;
/// Upper bound for `launch.max_age_secs`: one day
pub const MAX_LAUNCH_AGE_SECS: i64 = 24 * 60 * 60;

/// Central configuration for the service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web_server_addr: String,
    /// Bot token used to verify launch data. Absent means every login is refused.
    pub bot_token: Option<String>,
    /// HS256 key for session tokens
    pub jwt_secret: String,
    pub log_level: String,

    pub session: SessionConfig,
    pub launch: LaunchConfig,
    pub routes: RouteConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub duration_secs: i64,
    pub secure_cookie: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Maximum age of `auth_date`
    pub max_age_secs: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Paths where the session is read and renewed
    pub gated_prefixes: Vec<String>,
    /// Paths that require a session
    pub protected_prefixes: Vec<String>,
    /// Where anonymous visitors of protected paths are sent
    pub entry_point: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub paths: Vec<String>,
    pub max_requests: usize,
    pub window_secs: u64,
    /// Key clients by `Forwarded`/`X-Forwarded-For`. Only safe behind a proxy
    /// that overwrites those headers.
    pub trust_forwarded_for: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            bot_token: None,
            jwt_secret: String::new(),
            log_level: "info".to_string(),
            session: SessionConfig::default(),
            launch: LaunchConfig::default(),
            routes: RouteConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session".to_string(),
            duration_secs: DEFAULT_SESSION_DURATION_SECS,
            secure_cookie: false,
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            gated_prefixes: vec!["/protected".to_string(), "/api".to_string()],
            protected_prefixes: vec!["/protected".to_string()],
            entry_point: "/".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            paths: vec!["/api/auth".to_string()],
            max_requests: 10,
            window_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

fn check_range(name: &'static str, value: i64, max: i64) -> Result<(), ConfigurationError> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::OutOfRange { name, value, max })
    }
}

impl SessionConfig {
    /// Only meaningful after [`Config::validate`] has passed.
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }
}

impl LaunchConfig {
    pub fn max_age(&self) -> Duration {
        Duration::seconds(self.max_age_secs)
    }
}

impl Config {
    /// Reject durations that would issue dead sessions or overflow the clock.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_range(
            "session.duration_secs",
            self.session.duration_secs,
            MAX_SESSION_DURATION_SECS,
        )?;
        check_range("launch.max_age_secs", self.launch.max_age_secs, MAX_LAUNCH_AGE_SECS)
    }

    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigurationError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        Self::load_from(&config_dir, &run_mode)
    }

    fn load_from(config_dir: &Path, run_mode: &str) -> Result<Self, ConfigurationError> {
        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            // Local overrides, never committed
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // APP__BOT_TOKEN, APP__SESSION__COOKIE_NAME, ...
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config.with_plain_secrets(|key| env::var(key).ok())
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");
                Self::from_plain_env(|key| env::var(key).ok())
            }
        }
    }

    /// Secrets left unset by the layered sources may still come from
    /// `BOT_TOKEN` and `JWT_SECRET`.
    fn with_plain_secrets<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.bot_token.as_deref().map_or(true, str::is_empty) {
            self.bot_token = var("BOT_TOKEN").filter(|token| !token.is_empty());
        }
        if self.jwt_secret.is_empty() {
            self.jwt_secret = var("JWT_SECRET").unwrap_or_default();
        }
        self
    }

    fn from_plain_env<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let web_server_addr = var("WEB_SERVER_ADDR")
            .unwrap_or(defaults.web_server_addr);

        let bot_token = var("BOT_TOKEN").filter(|token| !token.is_empty());

        let jwt_secret = var("JWT_SECRET").unwrap_or_default();

        let log_level = var("LOG_LEVEL").unwrap_or(defaults.log_level);

        let cookie_name = var("SESSION_COOKIE_NAME")
            .unwrap_or(defaults.session.cookie_name);

        let duration_secs = var("SESSION_DURATION_SECS")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults.session.duration_secs);

        let secure_cookie = var("SECURE_COOKIES")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(defaults.session.secure_cookie);

        let max_age_secs = var("LAUNCH_MAX_AGE_SECS")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults.launch.max_age_secs);

        Self {
            web_server_addr,
            bot_token,
            jwt_secret,
            log_level,
            session: SessionConfig {
                cookie_name,
                duration_secs,
                secure_cookie,
            },
            launch: LaunchConfig { max_age_secs },
            routes: defaults.routes,
            rate_limit: defaults.rate_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.session.cookie_name, "session");
        assert_eq!(config.session.duration(), Duration::hours(1));
        assert_eq!(config.launch.max_age(), Duration::seconds(300));
        assert_eq!(config.routes.protected_prefixes, vec!["/protected"]);
        assert!(config.bot_token.is_none());
        assert!(config.jwt_secret.is_empty());
    }

    #[test]
    fn test_plain_env_fallback() {
        let vars: HashMap<&str, &str> = [
            ("BOT_TOKEN", "123:abc"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("SESSION_DURATION_SECS", "120"),
            ("SECURE_COOKIES", "TRUE"),
            ("LAUNCH_MAX_AGE_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_plain_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.jwt_secret.len(), 32);
        assert_eq!(config.session.duration_secs, 120);
        assert!(config.session.secure_cookie);
        assert_eq!(config.launch.max_age_secs, DEFAULT_MAX_AGE_SECS);
        assert_eq!(config.web_server_addr, "127.0.0.1:8081");
    }

    #[test]
    fn test_empty_bot_token_is_absent() {
        let config = Config::from_plain_env(|key| (key == "BOT_TOKEN").then(String::new));
        assert!(config.bot_token.is_none());
    }

    #[test]
    fn test_plain_secrets_fill_gaps_only() {
        let plain = |key: &str| match key {
            "BOT_TOKEN" => Some("plain-bot".to_string()),
            "JWT_SECRET" => Some("plain-secret".to_string()),
            _ => None,
        };

        let filled = Config::default().with_plain_secrets(plain);
        assert_eq!(filled.bot_token.as_deref(), Some("plain-bot"));
        assert_eq!(filled.jwt_secret, "plain-secret");

        let mut layered = Config::default();
        layered.bot_token = Some("layered-bot".to_string());
        layered.jwt_secret = "layered-secret".to_string();
        let kept = layered.with_plain_secrets(plain);
        assert_eq!(kept.bot_token.as_deref(), Some("layered-bot"));
        assert_eq!(kept.jwt_secret, "layered-secret");
    }

    #[test]
    fn test_validate_rejects_unusable_durations() {
        assert!(Config::default().validate().is_ok());

        for secs in [0, -5, MAX_SESSION_DURATION_SECS + 1, 10_000_000_000_000] {
            let mut config = Config::default();
            config.session.duration_secs = secs;
            assert!(matches!(
                config.validate(),
                Err(ConfigurationError::OutOfRange { name: "session.duration_secs", .. })
            ));
        }

        let mut config = Config::default();
        config.launch.max_age_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::OutOfRange { name: "launch.max_age_secs", .. })
        ));
    }

    #[test]
    fn test_unreadable_file_is_a_load_error() {
        let dir = env::temp_dir().join(format!("miniapp-auth-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("default.toml"), "[session\nduration_secs = ").unwrap();

        let result = Config::load_from(&dir, "test");
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(result, Err(ConfigurationError::Load(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = ConfigFile::builder()
            .add_source(config::File::from_str(
                "bot_token = \"1:x\"\n[session]\ncookie_name = \"tg_session\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.bot_token.as_deref(), Some("1:x"));
        assert_eq!(config.session.cookie_name, "tg_session");
        assert_eq!(config.session.duration_secs, DEFAULT_SESSION_DURATION_SECS);
        assert_eq!(config.routes.entry_point, "/");
    }
}
