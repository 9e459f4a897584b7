use std::env;

use chrono::Duration;
use log::*;
use payhere_tools::PayHereConfig;

use crate::notify::NotifierConfig;

const DEFAULT_EPG_HOST: &str = "127.0.0.1";
const DEFAULT_EPG_PORT: u16 = 8240;
/// PayHere retries an unacknowledged notification on a tight schedule; the webhook handler must
/// answer well inside that window.
const DEFAULT_WEBHOOK_DEADLINE_MS: u64 = 10_000;
const DEFAULT_CART_EXPIRY: Duration = Duration::hours(48);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// PayHere merchant credentials and retrieval-API settings.
    pub payhere: PayHereConfig,
    /// E-mail dispatcher settings. The dispatcher disables itself cleanly when no key is set.
    pub notifier: NotifierConfig,
    /// Upper bound on the work done while the gateway waits for the webhook acknowledgement.
    pub webhook_deadline: std::time::Duration,
    /// How long past its deadline an abandoned cart may linger before the expiry sweep marks it.
    pub cart_expiry_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_EPG_HOST.to_string(),
            port: DEFAULT_EPG_PORT,
            database_url: String::default(),
            payhere: PayHereConfig::default(),
            notifier: NotifierConfig::default(),
            webhook_deadline: std::time::Duration::from_millis(DEFAULT_WEBHOOK_DEADLINE_MS),
            cart_expiry_grace: DEFAULT_CART_EXPIRY,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("EPG_HOST").ok().unwrap_or_else(|| DEFAULT_EPG_HOST.into());
        let port = env::var("EPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for EPG_PORT. {e} Using the default, {DEFAULT_EPG_PORT}, instead.");
                    DEFAULT_EPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_EPG_PORT);
        let database_url = env::var("EPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ EPG_DATABASE_URL is not set. Please set it to the URL for the EPG database.");
            String::default()
        });
        let payhere = PayHereConfig::new_from_env_or_default();
        let notifier = NotifierConfig::from_env_or_default();
        let webhook_deadline = env::var("EPG_WEBHOOK_DEADLINE_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for EPG_WEBHOOK_DEADLINE_MS. {e}"))
                    .ok()
            })
            .map(std::time::Duration::from_millis)
            .unwrap_or(std::time::Duration::from_millis(DEFAULT_WEBHOOK_DEADLINE_MS));
        let cart_expiry_grace = env::var("EPG_CART_EXPIRY_HOURS")
            .map_err(|_| {
                info!(
                    "🪛️ EPG_CART_EXPIRY_HOURS is not set. Using the default value of {} hrs.",
                    DEFAULT_CART_EXPIRY.num_hours()
                )
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map(Duration::hours)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for EPG_CART_EXPIRY_HOURS. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_CART_EXPIRY);
        Self { host, port, database_url, payhere, notifier, webhook_deadline, cart_expiry_grace }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The subset of the configuration that request handlers need. Kept small, and free of secrets,
/// so it can be dropped into the application state wholesale.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub webhook_deadline: std::time::Duration,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { webhook_deadline: config.webhook_deadline }
    }
}
