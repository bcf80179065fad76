use std::{env, net::SocketAddr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable `{0}`")]
    Missing(&'static str),
    #[error("Invalid value for `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub secret: String,
    pub token_ttl_hours: i64,
    pub admin: Option<AdminSeed>,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub currency: String,
}

/// Credentials of the back-office account created on start-up.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| lookup(name).filter(|value| !value.is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let secret = get("SECRET").ok_or(ConfigError::Missing("SECRET"))?;

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_owned())
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: err.to_string(),
            })?;

        let token_ttl_hours = match get("TOKEN_TTL_HOURS") {
            Some(value) => value.parse::<i64>().map_err(|err| ConfigError::Invalid {
                name: "TOKEN_TTL_HOURS",
                reason: err.to_string(),
            })?,
            None => 24,
        };
        if token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_HOURS",
                reason: "must be positive".to_owned(),
            });
        }

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };

        Ok(Self {
            database_url,
            bind_addr,
            secret,
            token_ttl_hours,
            admin,
            stripe_secret_key: get("STRIPE_SECRET_KEY"),
            stripe_api_base: get("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".to_owned()),
            currency: get("CURRENCY")
                .map(|value| value.to_lowercase())
                .unwrap_or_else(|| "inr".to_owned()),
        })
    }
}
