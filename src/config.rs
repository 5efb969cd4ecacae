use crate::error::{Error, Result};
use crate::services::freshness_service::DEFAULT_MAX_AGE;
use crate::services::verification_service::VerificationService;
use crate::utils::query::DuplicateKeyPolicy;
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub max_age: Duration,
    pub duplicate_keys: DuplicateKeyPolicy,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            telegram_bot_token: get_env("TELEGRAM_BOT_TOKEN")?,
            max_age: get_env_parse::<u64>("INIT_DATA_MAX_AGE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_MAX_AGE),
            duplicate_keys: get_env_parse("INIT_DATA_DUPLICATE_KEYS")?.unwrap_or_default(),
            log_format: get_env_parse("LOG_FORMAT")?.unwrap_or_default(),
        })
    }

    pub fn verification_service(&self) -> VerificationService {
        VerificationService::new(&self.telegram_bot_token, self.max_age)
            .with_duplicate_keys(self.duplicate_keys)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"<redacted>")
            .field("max_age", &self.max_age)
            .field("duplicate_keys", &self.duplicate_keys)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn get_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("Missing environment variable: {}", name))),
    }
}

fn get_env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = env::var(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests below mutate process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear() {
        for name in [
            "TELEGRAM_BOT_TOKEN",
            "INIT_DATA_MAX_AGE_SECS",
            "INIT_DATA_DUPLICATE_KEYS",
            "LOG_FORMAT",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn reads_token_and_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");

        let config = Config::from_env().unwrap();
        assert_eq!(config.telegram_bot_token, "123:abc");
        assert_eq!(config.max_age, DEFAULT_MAX_AGE);
        assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::LastWins);
        assert_eq!(config.log_format, LogFormat::Pretty);
        clear();
    }

    #[test]
    fn reads_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
        env::set_var("INIT_DATA_MAX_AGE_SECS", "600");
        env::set_var("INIT_DATA_DUPLICATE_KEYS", "reject");
        env::set_var("LOG_FORMAT", "json");

        let config = Config::from_env().unwrap();
        assert_eq!(config.max_age, Duration::from_secs(600));
        assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::Reject);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.verification_service().max_age(), Duration::from_secs(600));
        clear();
    }

    #[test]
    fn empty_token_is_missing() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        env::set_var("TELEGRAM_BOT_TOKEN", "  ");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("TELEGRAM_BOT_TOKEN")));
        clear();
    }

    #[test]
    fn invalid_max_age_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
        env::set_var("INIT_DATA_MAX_AGE_SECS", "a day");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.starts_with("Invalid value for INIT_DATA_MAX_AGE_SECS")));
        clear();
    }

    #[test]
    fn debug_redacts_token() {
        let config = Config {
            telegram_bot_token: "123:super-secret".into(),
            max_age: DEFAULT_MAX_AGE,
            duplicate_keys: DuplicateKeyPolicy::LastWins,
            log_format: LogFormat::Pretty,
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
