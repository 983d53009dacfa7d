use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Hard ceiling on tokens requested from the upstream provider per call,
/// regardless of how many snippets the input warrants.
const MAX_COMPLETION_TOKENS_CAP: i64 = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub openai: OpenAiConfig,
    pub models: ModelConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 secret the identity provider signs access tokens with.
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string for the identity platform's PostgreSQL database
    /// (plan, account and usage tables live there, not in this service).
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model used when the client does not override it.
    pub default_model: String,
    pub default_temperature: f32,
    /// Per-snippet completion budget; multiplied by the snippet target.
    pub default_max_tokens: i64,
    /// Absolute cap applied after the per-snippet multiplication.
    pub max_completion_tokens: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl SummarizeConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(SummarizeConfig {
            common: common_config,
            auth: AuthConfig {
                jwt_secret: get_env("JWT_SECRET", None, is_prod)?,
            },
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .unwrap_or(1),
            },
            openai: OpenAiConfig {
                api_key: get_env("OPENAI_API_KEY", None, is_prod)?,
                base_url: get_env(
                    "OPENAI_BASE_URL",
                    Some("https://api.openai.com/v1"),
                    is_prod,
                )?,
            },
            models: ModelConfig {
                default_model: get_env("SUMMARIZE_MODEL", Some("gpt-3.5-turbo"), is_prod)?,
                default_temperature: get_env("SUMMARIZE_TEMPERATURE", Some("0.5"), is_prod)?
                    .parse()
                    .unwrap_or(0.5),
                default_max_tokens: get_env("SUMMARIZE_MAX_TOKENS", Some("500"), is_prod)?
                    .parse()
                    .unwrap_or(500),
                max_completion_tokens: get_env(
                    "SUMMARIZE_MAX_COMPLETION_TOKENS",
                    Some(&MAX_COMPLETION_TOKENS_CAP.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(MAX_COMPLETION_TOKENS_CAP),
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("*"), is_prod)?
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect(),
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
