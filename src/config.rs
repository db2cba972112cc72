//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8080)
//! - `SITE_URL` - Public storefront URL used for payment redirects (default: http://localhost:3000)
//! - `API_URL` - Public URL of this service, for provider notifications (default: `SITE_URL`)
//! - `STRIPE_SECRET_KEY` + `STRIPE_WEBHOOK_SECRET` - enable Stripe checkout and webhooks
//! - `MERCADOPAGO_ACCESS_TOKEN` - enables Mercado Pago checkout and webhooks
//! - `MERCADOPAGO_WEBHOOK_SECRET` - verifies `x-signature` on Mercado Pago notifications
//! - `MELHOR_ENVIO_TOKEN` + `MELHOR_ENVIO_FROM_CEP` - enable shipping quotes
//! - `MELHOR_ENVIO_URL` - carrier API base (default: https://melhorenvio.com.br)
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` - enable e-mail
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SECURE_COOKIES` - mark the session cookie `Secure` (default: false)

use secrecy::SecretString;
use thiserror::Error;

pub const DEFAULT_MELHOR_ENVIO_URL: &str = "https://melhorenvio.com.br";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: SecretString,
    pub host: String,
    pub port: u16,
    /// Storefront base URL, without trailing slash.
    pub site_url: String,
    /// Public base URL of this service, without trailing slash.
    pub api_url: String,
    pub secure_cookies: bool,
    pub stripe: Option<StripeConfig>,
    pub mercadopago: Option<MercadoPagoConfig>,
    pub shipping: Option<ShippingConfig>,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    pub webhook_secret: SecretString,
}

#[derive(Debug, Clone)]
pub struct MercadoPagoConfig {
    pub access_token: SecretString,
    /// Notifications are accepted unsigned when absent.
    pub webhook_secret: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct ShippingConfig {
    pub token: SecretString,
    pub origin_postal_code: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first
    /// when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source. Blank
    /// values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let database_url = SecretString::from(required("DATABASE_URL")?);
        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = get("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let site_url = get("SITE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let api_url = get("API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| site_url.clone());
        let secure_cookies = match get("SECURE_COOKIES").as_deref() {
            None => false,
            Some("1" | "true" | "yes") => true,
            Some("0" | "false" | "no") => false,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "SECURE_COOKIES".to_string(),
                    format!("expected true/false, got '{other}'"),
                ))
            }
        };

        let stripe = match (get("STRIPE_SECRET_KEY"), get("STRIPE_WEBHOOK_SECRET")) {
            (Some(key), Some(secret)) => Some(StripeConfig {
                secret_key: SecretString::from(key),
                webhook_secret: SecretString::from(secret),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidEnvVar(
                    "STRIPE_*".to_string(),
                    "Both STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET must be set together"
                        .to_string(),
                ))
            }
        };

        let mercadopago = get("MERCADOPAGO_ACCESS_TOKEN").map(|token| MercadoPagoConfig {
            access_token: SecretString::from(token),
            webhook_secret: get("MERCADOPAGO_WEBHOOK_SECRET").map(SecretString::from),
        });

        let shipping = match (get("MELHOR_ENVIO_TOKEN"), get("MELHOR_ENVIO_FROM_CEP")) {
            (Some(token), Some(cep)) => Some(ShippingConfig {
                token: SecretString::from(token),
                origin_postal_code: cep,
                base_url: get("MELHOR_ENVIO_URL")
                    .unwrap_or_else(|| DEFAULT_MELHOR_ENVIO_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            }),
            _ => None,
        };

        let email = match (
            get("SMTP_HOST"),
            get("SMTP_USERNAME"),
            get("SMTP_PASSWORD"),
            get("SMTP_FROM"),
        ) {
            (Some(smtp_host), Some(smtp_username), Some(password), Some(from_address)) => {
                let smtp_port = get("SMTP_PORT")
                    .unwrap_or_else(|| "587".to_string())
                    .parse::<u16>()
                    .map_err(|e| {
                        ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string())
                    })?;
                Some(EmailConfig {
                    smtp_host,
                    smtp_port,
                    smtp_username,
                    smtp_password: SecretString::from(password),
                    from_address,
                })
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            site_url,
            api_url,
            secure_cookies,
            stripe,
            mercadopago,
            shipping,
            email,
        })
    }
}
