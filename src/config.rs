use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Pending intents older than this are moved to `expired`.
    pub intent_ttl_minutes: i64,
    /// Sweep interval for the background expiry task.
    pub expiry_sweep_seconds: u64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            intent_ttl_minutes: 60,
            expiry_sweep_seconds: 300,
        }
    }
}

impl Config {
    /// Load from `config.toml` (path overridable via CONFIG_PATH), falling
    /// back to environment variables when the file is absent. Env vars win
    /// over file values either way.
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => toml::from_str(&config_str)
                .with_context(|| format!("failed to parse {config_path}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .context("DATABASE_URL is required when config.toml is missing")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    checkout: CheckoutConfig {
                        intent_ttl_minutes: get_env_parse("CHECKOUT_INTENT_TTL_MINUTES", 60i64),
                        expiry_sweep_seconds: get_env_parse("CHECKOUT_EXPIRY_SWEEP_SECONDS", 300u64),
                    },
                }
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("failed to read {config_path}")));
            }
        };

        // env overrides apply even when the file exists
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(p) = v.parse() {
                config.server.port = p;
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS") {
            if let Ok(mc) = v.parse() {
                config.database.max_connections = mc;
            }
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN") {
            if let Ok(n) = v.parse() {
                config.jwt.access_token_expires_in = n;
            }
        }
        if let Ok(v) = env::var("CHECKOUT_INTENT_TTL_MINUTES") {
            if let Ok(n) = v.parse() {
                config.checkout.intent_ttl_minutes = n;
            }
        }
        if let Ok(v) = env::var("CHECKOUT_EXPIRY_SWEEP_SECONDS") {
            if let Ok(n) = v.parse() {
                config.checkout.expiry_sweep_seconds = n;
            }
        }

        Ok(config)
    }
}
