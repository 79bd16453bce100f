//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL of the shop, used for payment redirects
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `PRICING_DEFAULT_SHIPPING_FEE` - Fee when no city is given or no zones exist (default: 200)
//! - `PRICING_CACHE_TTL_SECS` - How long zones and discounts are cached (default: 60)
//! - `PRICING_TIE_BREAK` - `highest_priority_then_newest` (default) or `first_found`
//! - `MAYA_API_BASE` - Maya API host (default: <https://pg-sandbox.paymaya.com>)
//! - `MAYA_PUBLIC_KEY` / `MAYA_SECRET_KEY` - Maya checkout keys; both enable Maya
//! - `MAYA_PAYMENT_LINK` - Static payment link used when the checkout API is unavailable
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use stride_core::pricing::{DEFAULT_SHIPPING_FEE, TieBreak};

const DEFAULT_MAYA_API_BASE: &str = "https://pg-sandbox.paymaya.com";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the shop, without a trailing slash
    pub base_url: String,
    /// Server-side timeout applied to every request
    pub request_timeout: Duration,
    /// Pricing engine settings
    pub pricing: PricingSettings,
    /// Maya payment gateway, if configured
    pub maya: Option<MayaConfig>,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Tunables for the pricing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingSettings {
    /// Fee charged when the city is blank or no zones are configured.
    pub default_shipping_fee: Decimal,
    /// TTL for cached shipping zones and discount candidates.
    pub cache_ttl: Duration,
    /// How equal-priority discounts are ordered.
    pub tie_break: TieBreak,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            default_shipping_fee: DEFAULT_SHIPPING_FEE,
            cache_ttl: Duration::from_secs(60),
            tie_break: TieBreak::default(),
        }
    }
}

/// Maya checkout API configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct MayaConfig {
    /// API host, e.g. `https://pg-sandbox.paymaya.com`
    pub api_base: String,
    /// Public key (safe to expose in browser)
    pub public_key: String,
    /// Secret key used for server-to-server calls
    pub secret_key: SecretString,
    /// Static payment link used when the checkout API rejects the request
    pub payment_link: Option<String>,
}

impl std::fmt::Debug for MayaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MayaConfig")
            .field("api_base", &self.api_base)
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .field("payment_link", &self.payment_link)
            .finish()
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Configuration with every optional setting at its default.
    ///
    /// Maya and Sentry are disabled.
    #[must_use]
    pub fn new(database_url: SecretString, base_url: &str) -> Self {
        Self {
            database_url,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(15),
            pricing: PricingSettings::default(),
            maya: None,
            sentry: SentryConfig::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the Maya secret key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let request_timeout =
            Duration::from_secs(parse_env("STOREFRONT_REQUEST_TIMEOUT_SECS", "15")?);

        Ok(Self {
            database_url,
            host,
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
            pricing: PricingSettings::from_env()?,
            maya: MayaConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PricingSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let default_shipping_fee: Decimal = parse_env("PRICING_DEFAULT_SHIPPING_FEE", "200")?;
        if default_shipping_fee < Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "PRICING_DEFAULT_SHIPPING_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }
        Ok(Self {
            default_shipping_fee,
            cache_ttl: Duration::from_secs(parse_env("PRICING_CACHE_TTL_SECS", "60")?),
            tie_break: parse_env("PRICING_TIE_BREAK", "highest_priority_then_newest")?,
        })
    }
}

impl MayaConfig {
    /// Maya is enabled only when both keys are set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(public_key), Some(secret_key)) = (
            get_optional_env("MAYA_PUBLIC_KEY"),
            get_optional_env("MAYA_SECRET_KEY"),
        ) else {
            return Ok(None);
        };
        validate_secret_strength(&secret_key, "MAYA_SECRET_KEY")?;

        Ok(Some(Self {
            api_base: get_env_or_default("MAYA_API_BASE", DEFAULT_MAYA_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            public_key,
            secret_key: SecretString::from(secret_key),
            payment_link: get_optional_env("MAYA_PAYMENT_LINK"),
        }))
    }

    /// The secret key, for building the Basic auth header.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the gateway."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_placeholder_maya_key_rejected() {
        let err = validate_secret_strength("your-maya-secret-key", "MAYA_SECRET_KEY").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_low_entropy_key_rejected() {
        assert!(validate_secret_strength("sk-aaaaaaaaaaaaaaaaaaaaaaaa", "MAYA_SECRET_KEY").is_err());
    }

    #[test]
    fn test_realistic_key_accepted() {
        assert!(
            validate_secret_strength("sk-X8qolYjy62kIzEbr0QRK1h4b4KDVHaNcwMYk39jInSl", "MAYA_SECRET_KEY")
                .is_ok()
        );
    }

    #[test]
    fn test_pricing_defaults() {
        let settings = PricingSettings::default();
        assert_eq!(settings.default_shipping_fee, Decimal::from(200));
        assert_eq!(settings.cache_ttl, Duration::from_secs(60));
        assert_eq!(settings.tie_break, TieBreak::HighestPriorityThenNewest);
    }

    #[test]
    fn test_maya_config_debug_redacts_secret() {
        let config = MayaConfig {
            api_base: DEFAULT_MAYA_API_BASE.to_string(),
            public_key: "pk-public-value".to_string(),
            secret_key: SecretString::from("sk-super-secret-value"),
            payment_link: None,
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("pk-public-value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk-super-secret-value"));
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig::new(
            SecretString::from("postgres://localhost/test"),
            "http://localhost:3000/",
        );

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert_eq!(config.base_url, "http://localhost:3000");
    }
}
