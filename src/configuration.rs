use chrono::Duration;

use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    /// Keep users and refresh tokens in process memory instead of Postgres
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "chirpy".to_string(),
            in_memory: false,
        }
    }
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Token signing and password hashing settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// HMAC-SHA256 signing secret for access tokens
    pub secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64, // seconds
    #[serde(default = "default_refresh_token_expiry_days")]
    pub refresh_token_expiry_days: i64,
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
}

/// Longest lifetime accepted for either token kind, about ten years
const MAX_TOKEN_LIFETIME_DAYS: i64 = 3650;

fn default_access_token_expiry() -> i64 {
    3600
}

fn default_refresh_token_expiry_days() -> i64 {
    60
}

fn default_password_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl AuthSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_expiry: default_access_token_expiry(),
            refresh_token_expiry_days: default_refresh_token_expiry_days(),
            password_hash_cost: default_password_hash_cost(),
        }
    }

    pub fn access_token_lifetime(&self) -> Duration {
        Duration::seconds(self.access_token_expiry)
    }

    pub fn refresh_token_lifetime(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.secret".to_string()));
        }
        if self.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.access_token_expiry must be positive".to_string(),
            ));
        }
        if self.access_token_expiry > MAX_TOKEN_LIFETIME_DAYS * 24 * 60 * 60 {
            return Err(ConfigError::InvalidValue(format!(
                "auth.access_token_expiry must not exceed {} days",
                MAX_TOKEN_LIFETIME_DAYS
            )));
        }
        if self.refresh_token_expiry_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.refresh_token_expiry_days must be positive".to_string(),
            ));
        }
        if self.refresh_token_expiry_days > MAX_TOKEN_LIFETIME_DAYS {
            return Err(ConfigError::InvalidValue(format!(
                "auth.refresh_token_expiry_days must not exceed {}",
                MAX_TOKEN_LIFETIME_DAYS
            )));
        }
        // bcrypt accepts 4..=31
        if !(4..=31).contains(&self.password_hash_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.password_hash_cost {} is outside 4..=31",
                self.password_hash_cost
            )));
        }
        Ok(())
    }
}

/// Load settings from `configuration.yaml` (optional) overlaid with
/// `APP_`-prefixed environment variables, e.g. `APP_AUTH__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}
