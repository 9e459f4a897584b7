use epg_common::Secret;
use log::*;

const SANDBOX_API_URL: &str = "https://sandbox.payhere.lk";
const LIVE_API_URL: &str = "https://www.payhere.lk";

#[derive(Debug, Clone, Default)]
pub struct PayHereConfig {
    /// The merchant id PayHere assigned to this store. Echoed in every notification and part of
    /// the checksum base string.
    pub merchant_id: String,
    /// The merchant secret from the PayHere dashboard. Never transmitted; only its digest enters
    /// the checksum.
    pub merchant_secret: Secret<String>,
    /// Business-app credentials for the Payment Retrieval API (OAuth2 client credentials).
    pub app_id: String,
    pub app_secret: Secret<String>,
    /// Base url for the retrieval API. Defaults to the sandbox unless `EPG_PAYHERE_LIVE` is set.
    pub api_url: String,
}

impl PayHereConfig {
    pub fn new_from_env_or_default() -> Self {
        let merchant_id = std::env::var("EPG_PAYHERE_MERCHANT_ID").unwrap_or_else(|_| {
            warn!("EPG_PAYHERE_MERCHANT_ID not set. Incoming notifications will not match any merchant.");
            String::default()
        });
        let merchant_secret = Secret::new(std::env::var("EPG_PAYHERE_MERCHANT_SECRET").unwrap_or_else(|_| {
            warn!("EPG_PAYHERE_MERCHANT_SECRET not set. Signature verification will reject every notification.");
            String::default()
        }));
        let app_id = std::env::var("EPG_PAYHERE_APP_ID").unwrap_or_else(|_| {
            warn!("EPG_PAYHERE_APP_ID not set. The payment retrieval API will be unavailable.");
            String::default()
        });
        let app_secret = Secret::new(std::env::var("EPG_PAYHERE_APP_SECRET").unwrap_or_default());
        let live = std::env::var("EPG_PAYHERE_LIVE").map(|s| &s == "1" || &s == "true").unwrap_or(false);
        let api_url = std::env::var("EPG_PAYHERE_API_URL").unwrap_or_else(|_| {
            let url = if live { LIVE_API_URL } else { SANDBOX_API_URL };
            info!("EPG_PAYHERE_API_URL not set, using {url}");
            url.to_string()
        });
        Self { merchant_id, merchant_secret, app_id, app_secret, api_url }
    }
}
