use std::env;

use crate::error::{BotError, BotResult};

pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

#[derive(Clone)]
pub struct TwitterCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

// Hand-written so secrets never end up in logs.
impl std::fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterCredentials").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_model: String,
    pub twitter: TwitterCredentials,
    pub news_api_key: Option<String>,
    pub app_env: String,
    pub timezone: String,
    pub dry_run: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openai_model", &self.openai_model)
            .field("has_news_api_key", &self.news_api_key.is_some())
            .field("app_env", &self.app_env)
            .field("timezone", &self.timezone)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> BotResult<Self> {
        // Try to load .env from multiple locations
        load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> BotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut errors = Vec::new();
        let mut require = |key: &str| match get(key) {
            Some(value) => value,
            None => {
                errors.push(format!("{} is required", key));
                String::new()
            }
        };

        let openai_api_key = require("OPENAI_API_KEY");
        let twitter = TwitterCredentials {
            api_key: require("TWITTER_API_KEY"),
            api_secret: require("TWITTER_API_SECRET"),
            access_token: require("TWITTER_ACCESS_TOKEN"),
            access_secret: require("TWITTER_ACCESS_SECRET"),
        };

        let news_api_key = get("NEWS_API_KEY");
        if news_api_key.is_none() {
            tracing::warn!("NEWS_API_KEY not set, will use RSS feed instead");
        }

        if !errors.is_empty() {
            tracing::error!(errors = ?errors, "Configuration validation failed");
            return Err(BotError::Configuration(errors));
        }

        let config = Self {
            openai_api_key,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            twitter,
            news_api_key,
            app_env: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
            timezone: get("TIMEZONE").unwrap_or_else(|| "America/New_York".to_string()),
            dry_run: get("DRY_RUN").is_some_and(|v| v == "true"),
        };

        tracing::info!(
            app_env = %config.app_env,
            dry_run = config.dry_run,
            has_news_api_key = config.news_api_key.is_some(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }
}

/// Load the first `.env` file found. Missing files are fine: the variables
/// may be set system-wide (e.g. as CI secrets).
pub fn load_dotenv() {
    // 1. Current directory (for development)
    if dotenvy::dotenv().is_ok() {
        return;
    }

    // 2. ~/.config/headline-poster/.env (standard config location)
    if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join("headline-poster").join(".env");
        if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
            return;
        }
    }

    // 3. ~/.env (home directory)
    if let Some(home_dir) = dirs::home_dir() {
        let home_path = home_dir.join(".env");
        if home_path.exists() {
            let _ = dotenvy::from_path(&home_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn full() -> Vec<(&'static str, &'static str)> {
        vec![
            ("OPENAI_API_KEY", "sk-test-key-123"),
            ("TWITTER_API_KEY", "tw-key"),
            ("TWITTER_API_SECRET", "tw-secret"),
            ("TWITTER_ACCESS_TOKEN", "tw-token"),
            ("TWITTER_ACCESS_SECRET", "tw-access-secret"),
        ]
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_lookup(lookup_from(&full())).unwrap();
        assert_eq!(config.openai_model, DEFAULT_MODEL);
        assert_eq!(config.app_env, "development");
        assert_eq!(config.timezone, "America/New_York");
        assert!(!config.dry_run);
        assert!(config.news_api_key.is_none());
    }

    #[test]
    fn test_missing_credentials_are_aggregated() {
        let pairs = [("TWITTER_API_KEY", "tw-key")];
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        match err {
            BotError::Configuration(errors) => {
                assert_eq!(errors.len(), 4);
                assert!(errors.contains(&"OPENAI_API_KEY is required".to_string()));
                assert!(errors.contains(&"TWITTER_ACCESS_SECRET is required".to_string()));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut pairs = full();
        pairs[0] = ("OPENAI_API_KEY", "   ");
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY is required"));
    }

    #[test]
    fn test_dry_run_only_for_literal_true() {
        let mut pairs = full();
        pairs.push(("DRY_RUN", "true"));
        assert!(Config::from_lookup(lookup_from(&pairs)).unwrap().dry_run);

        let mut pairs = full();
        pairs.push(("DRY_RUN", "yes"));
        assert!(!Config::from_lookup(lookup_from(&pairs)).unwrap().dry_run);
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let mut pairs = full();
        pairs.push(("NEWS_API_KEY", "news-secret"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-test-key-123"));
        assert!(!debug.contains("tw-access-secret"));
        assert!(!debug.contains("news-secret"));
        assert!(debug.contains("has_news_api_key: true"));
    }
}
