//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Login behaviour.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Payment gateway configuration.
    pub payment: PaymentConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL for request-scoped (standard) access.
    pub url: String,
    /// Connection URL for the elevated role used by cross-tenant writes.
    ///
    /// Falls back to `url` when unset.
    #[serde(default)]
    pub elevated_url: Option<String>,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl DatabaseConfig {
    /// Returns the URL to use for the elevated capability.
    #[must_use]
    pub fn elevated_url(&self) -> &str {
        self.elevated_url.as_deref().unwrap_or(&self.url)
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration as read from config files.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Session token lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_session_ttl() -> u64 {
    86_400 // 24 hours
}

/// Authentication behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Return detailed login failure reasons (development only).
    #[serde(default)]
    pub verbose_errors: bool,
}

/// Payment gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Gateway API base URL.
    pub base_url: String,
    /// Secret key sent as a bearer token to the gateway.
    pub secret_key: String,
    /// Expected value of the `verif-hash` webhook header, if enforced.
    #[serde(default)]
    pub webhook_hash: Option<String>,
    /// Where the gateway redirects the customer after checkout.
    pub redirect_url: String,
    /// Upper bound on a single verify call, in seconds.
    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_secs: u64,
    /// Currency used when a checkout does not specify one.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_verify_timeout() -> u64 {
    10
}

fn default_currency() -> String {
    "NGN".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PHARMACARE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_vars() -> Vec<(&'static str, Option<&'static str>)> {
        vec![
            ("PHARMACARE__SERVER__PORT", Some("9090")),
            ("PHARMACARE__DATABASE__URL", Some("postgres://localhost/pharmacare")),
            ("PHARMACARE__JWT__SECRET", Some("secret")),
            ("PHARMACARE__PAYMENT__BASE_URL", Some("https://gateway.test")),
            ("PHARMACARE__PAYMENT__SECRET_KEY", Some("sk_test")),
            ("PHARMACARE__PAYMENT__REDIRECT_URL", Some("https://app.test/done")),
            ("RUN_MODE", Some("config-test")),
        ]
    }

    #[test]
    fn test_load_from_environment_applies_defaults() {
        temp_env::with_vars(required_vars(), || {
            let config = AppConfig::load().unwrap();

            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.server.port, 9090);
            assert_eq!(config.jwt.session_ttl_secs, 86_400);
            assert!(!config.auth.verbose_errors);
            assert_eq!(config.payment.verify_timeout_secs, 10);
            assert_eq!(config.payment.currency, "NGN");
            assert!(config.payment.webhook_hash.is_none());
            assert_eq!(
                config.database.elevated_url(),
                "postgres://localhost/pharmacare"
            );
        });
    }

    #[test]
    fn test_elevated_url_override() {
        let mut vars = required_vars();
        vars.push((
            "PHARMACARE__DATABASE__ELEVATED_URL",
            Some("postgres://service@localhost/pharmacare"),
        ));

        temp_env::with_vars(vars, || {
            let config = AppConfig::load().unwrap();
            assert_eq!(
                config.database.elevated_url(),
                "postgres://service@localhost/pharmacare"
            );
        });
    }

    #[test]
    fn test_missing_secret_fails() {
        let vars: Vec<_> = required_vars()
            .into_iter()
            .map(|(k, v)| {
                if k == "PHARMACARE__JWT__SECRET" {
                    (k, None)
                } else {
                    (k, v)
                }
            })
            .collect();

        temp_env::with_vars(vars, || {
            assert!(AppConfig::load().is_err());
        });
    }
}
