//! [`Config`]-related definitions.

use std::time;

use common::Money;
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Object storage configuration.
    pub storage: Storage,

    /// M-Pesa payment gateway configuration.
    pub mpesa: Mpesa,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }

    /// Builds the [`service::Config`] out of this [`Config`].
    ///
    /// Missing `mpesa.callback_url` and `mpesa.callback_secret` are left for
    /// the payment requests to fail on.
    ///
    /// # Errors
    ///
    /// Errors if the configured `mpesa.callback_url` is not a valid URL.
    pub fn service_config(&self) -> Result<service::Config, String> {
        let Service {
            jwt_secret,
            contact_price,
            simulate_payments,
            tasks: Tasks {
                expire_stale_payments,
            },
        } = &self.service;

        Ok(service::Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.expose_secret().as_bytes(),
            ),
            contact_price: Money::from_shillings(*contact_price),
            simulate_payments: *simulate_payments,
            payment_callback_url: self
                .mpesa
                .callback_url
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(|e| format!("invalid `mpesa.callback_url`: {e}"))?,
            payment_callback_secret: self.mpesa.callback_secret.clone(),
            expire_stale_payments:
                service::task::expire_stale_payments::Config {
                    interval: expire_stale_payments.interval,
                    timeout: expire_stale_payments.timeout,
                },
        })
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,

    /// HTTP path the [`Storage`] root directory is served under.
    #[default("/storage".to_owned())]
    pub storage_path: String,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret the identity provider signs session tokens with.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default(SecretString::from("secret"))]
    pub jwt_secret: SecretString,

    /// Price of unlocking a landlord contact, in Kenyan shillings.
    #[default(200)]
    pub contact_price: u64,

    /// Whether contact purchases may be recorded without a real payment.
    pub simulate_payments: bool,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `ExpireStalePayments` task configuration.
    pub expire_stale_payments: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,

    /// Timeout after which the entities will be considered stale.
    #[default(time::Duration::from_secs(10 * 60))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,
}

/// Object storage configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Storage {
    /// Directory the uploaded objects are kept in.
    #[default("storage".to_owned())]
    pub root: String,

    /// Public URL the `root` directory is served under.
    #[default("http://localhost:8080/storage".to_owned())]
    pub public_url: String,
}

/// M-Pesa payment gateway configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Mpesa {
    /// Base URL of the Daraja API.
    #[default("https://sandbox.safaricom.co.ke".to_owned())]
    pub base_url: String,

    /// Consumer key of the application.
    pub consumer_key: Option<SecretString>,

    /// Consumer secret of the application.
    pub consumer_secret: Option<SecretString>,

    /// Business short code receiving the payments.
    pub shortcode: Option<String>,

    /// Passkey of the `shortcode`.
    pub passkey: Option<SecretString>,

    /// Public URL of the `/api/mpesa/callback` endpoint.
    pub callback_url: Option<String>,

    /// Secret the callback URLs are signed with.
    pub callback_secret: Option<SecretString>,
}

impl From<Mpesa> for service::infra::gateway::mpesa::Config {
    fn from(value: Mpesa) -> Self {
        let Mpesa {
            base_url,
            consumer_key,
            consumer_secret,
            shortcode,
            passkey,
            callback_url: _,
            callback_secret: _,
        } = value;

        Self {
            base_url,
            consumer_key,
            consumer_secret,
            shortcode,
            passkey,
        }
    }
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use super::Config;

    #[test]
    fn leaves_callback_unconfigured_by_default() {
        let config = Config::default();

        let service = config.service_config().unwrap();

        assert_eq!(service.contact_price.whole_shillings(), Some(200));
        assert!(!service.simulate_payments);
        assert!(service.payment_callback_url.is_none());
        assert!(service.payment_callback_secret.is_none());
    }

    #[test]
    fn parses_configured_callback_url() {
        let mut config = Config::default();
        config.mpesa.callback_url =
            Some("https://homes.example.com/api/mpesa/callback".into());
        config.mpesa.callback_secret = Some("s3cr3t".into());

        let service = config.service_config().unwrap();

        assert_eq!(
            service.payment_callback_url.map(String::from).as_deref(),
            Some("https://homes.example.com/api/mpesa/callback"),
        );
        assert!(service.payment_callback_secret.is_some());
    }

    #[test]
    fn rejects_invalid_callback_url() {
        let mut config = Config::default();
        config.mpesa.callback_url = Some("not a url".into());

        assert!(config.service_config().is_err());
    }

    #[test]
    fn loads_without_config_file() {
        let config = Config::new("does-not-exist.toml").unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.service.contact_price, 200);
        assert!(config.mpesa.callback_url.is_none());
    }
}
