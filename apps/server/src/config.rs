//! Environment-driven server configuration. Everything is read once at boot
//! and handed to components by value; nothing reads the environment later.

use std::env;
use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_TURN_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_BOT_DELAY_MS: u64 = 500;
pub const DEFAULT_REMOTE_BOT_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3_600;

/// Remote bot strategy endpoint, if enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteBotConfig {
    pub endpoint: String,
    pub strategy_type: Option<String>,
    pub params: Option<serde_json::Value>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub player_token_secret: String,
    pub player_token_ttl: Duration,
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub turn_timeout: Duration,
    pub bot_delay: Duration,
    pub remote_bot: Option<RemoteBotConfig>,
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env_opt(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::internal(format!("{key} has an unparseable value: {raw}"))),
    }
}

impl ServerConfig {
    /// Load configuration from the environment. `PLAYER_TOKEN_SECRET` is the
    /// only required variable.
    pub fn from_env() -> Result<Self, AppError> {
        let player_token_secret = env_opt("PLAYER_TOKEN_SECRET")
            .ok_or_else(|| AppError::internal("PLAYER_TOKEN_SECRET must be set"))?;

        let host = env_opt("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = env_parsed("PORT", 8080u16)?;
        let player_token_ttl =
            Duration::from_secs(env_parsed("PLAYER_TOKEN_TTL", DEFAULT_TOKEN_TTL_SECS)?);
        let turn_timeout =
            Duration::from_millis(env_parsed("TURN_TIMEOUT_MS", DEFAULT_TURN_TIMEOUT_MS)?);
        let bot_delay = Duration::from_millis(env_parsed("BOT_DELAY_MS", DEFAULT_BOT_DELAY_MS)?);

        let remote_bot = if env_opt("MCTS_ENABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            let endpoint = env_opt("MCTS_ENDPOINT")
                .ok_or_else(|| AppError::internal("MCTS_ENABLED is set but MCTS_ENDPOINT is not"))?;
            let params = match env_opt("MCTS_STRATEGY_PARAMS") {
                None => None,
                Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
                    AppError::internal(format!("MCTS_STRATEGY_PARAMS is not valid JSON: {e}"))
                })?),
            };
            let timeout = params
                .as_ref()
                .and_then(|p: &serde_json::Value| p.get("timeoutMs"))
                .and_then(|v| v.as_u64())
                .unwrap_or(DEFAULT_REMOTE_BOT_TIMEOUT_MS);
            Some(RemoteBotConfig {
                endpoint,
                strategy_type: env_opt("MCTS_STRATEGY_TYPE"),
                params,
                timeout: Duration::from_millis(timeout),
            })
        } else {
            None
        };

        Ok(Self {
            host,
            port,
            player_token_secret,
            player_token_ttl,
            database_url: env_opt("DATABASE_URL"),
            log_level: env_opt("LOG_LEVEL"),
            turn_timeout,
            bot_delay,
            remote_bot,
        })
    }

    /// A config suitable for in-process tests: no database, fast timers.
    pub fn for_tests(secret: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            player_token_secret: secret.to_string(),
            player_token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            database_url: None,
            log_level: None,
            turn_timeout: Duration::from_millis(50),
            bot_delay: Duration::from_millis(1),
            remote_bot: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "PLAYER_TOKEN_SECRET",
            "HOST",
            "PORT",
            "PLAYER_TOKEN_TTL",
            "DATABASE_URL",
            "LOG_LEVEL",
            "TURN_TIMEOUT_MS",
            "BOT_DELAY_MS",
            "MCTS_ENABLED",
            "MCTS_ENDPOINT",
            "MCTS_STRATEGY_TYPE",
            "MCTS_STRATEGY_PARAMS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_when_env_is_minimal() {
        clear_env();
        env::set_var("PLAYER_TOKEN_SECRET", "test-secret");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.turn_timeout, Duration::from_millis(30_000));
        assert_eq!(config.bot_delay, Duration::from_millis(500));
        assert_eq!(config.player_token_ttl, Duration::from_secs(3_600));
        assert!(config.remote_bot.is_none());
        assert!(config.database_url.is_none());
    }

    #[test]
    #[serial]
    fn missing_secret_is_an_error() {
        clear_env();
        assert!(ServerConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn remote_bot_config_is_parsed() {
        clear_env();
        env::set_var("PLAYER_TOKEN_SECRET", "test-secret");
        env::set_var("MCTS_ENABLED", "true");
        env::set_var("MCTS_ENDPOINT", "http://localhost:9000");
        env::set_var("MCTS_STRATEGY_TYPE", "uct");
        env::set_var("MCTS_STRATEGY_PARAMS", r#"{"timeoutMs": 750, "depth": 3}"#);

        let config = ServerConfig::from_env().unwrap();
        let remote = config.remote_bot.expect("remote bot configured");
        assert_eq!(remote.endpoint, "http://localhost:9000");
        assert_eq!(remote.strategy_type.as_deref(), Some("uct"));
        assert_eq!(remote.timeout, Duration::from_millis(750));

        clear_env();
    }

    #[test]
    #[serial]
    fn enabled_remote_bot_requires_an_endpoint() {
        clear_env();
        env::set_var("PLAYER_TOKEN_SECRET", "test-secret");
        env::set_var("MCTS_ENABLED", "1");
        assert!(ServerConfig::from_env().is_err());
        clear_env();
    }
}
