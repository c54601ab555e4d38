use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Which figure `recipes_count` reports in subscription listings when
/// `recipes_limit` trims an author's recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipesCountMode {
    /// Every recipe the author has published.
    #[default]
    Total,
    /// Only the recipes exposed after `recipes_limit`.
    Limited,
}

impl FromStr for RecipesCountMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "total" => Ok(Self::Total),
            "limited" => Ok(Self::Limited),
            other => Err(format!("expected `total` or `limited`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_address: SocketAddr,
    pub media_root: PathBuf,
    pub media_url: String,
    pub page_size: u32,
    pub recipes_count_mode: RecipesCountMode,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        let page_size: u32 = try_load("PAGE_SIZE", "6")?;
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                message: "must be greater than zero".to_owned(),
            });
        }
        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite://foodgram.db")?,
            jwt_secret,
            bind_address: try_load("BIND_ADDRESS", "127.0.0.1:3001")?,
            media_root: try_load("MEDIA_ROOT", "media")?,
            media_url: try_load::<String>("MEDIA_URL", "/media")?
                .trim_end_matches('/')
                .to_owned(),
            page_size,
            recipes_count_mode: try_load("RECIPES_COUNT_MODE", "total")?,
        })
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        })
}
