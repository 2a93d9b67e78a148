use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub payments: PaymentConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Knobs for the installment flow and the pending-charge sweep. Currency is
/// injected from here into every money command rather than read from global
/// state.
#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    pub min_payment_cents: i64,
    pub payment_step_cents: i64,
    /// Pending stripe-checkout charges older than this are reconciled
    /// against the provider by the background sweep.
    pub pending_max_age_minutes: i64,
    pub sweep_interval_minutes: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: Option<String>,
    pub member_services_address: Option<String>,
}

fn default_currency() -> String {
    "usd".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("stripe.enabled", false)?
            .set_default("stripe.currency", "usd")?
            .set_default("payments.min_payment_cents", 75_00)?
            .set_default("payments.payment_step_cents", 50_00)?
            .set_default("payments.pending_max_age_minutes", 60)?
            .set_default("payments.sweep_interval_minutes", 30)?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with CONCLAVE__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("CONCLAVE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://conclave.db".to_string(),
                max_connections: 10,
            },
            stripe: StripeConfig {
                secret_key: None,
                webhook_secret: None,
                currency: "usd".to_string(),
                enabled: false,
            },
            payments: PaymentConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            min_payment_cents: 75_00,
            payment_step_cents: 50_00,
            pending_max_age_minutes: 60,
            sweep_interval_minutes: 30,
        }
    }
}
