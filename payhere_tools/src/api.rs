use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{config::PayHereConfig, error::PayHereApiError, notification::RetrievedPayment};

/// Client for PayHere's Payment Retrieval API.
///
/// The retrieval API is the pull-side counterpart to the IPN push: given an order id, it returns
/// the payments PayHere knows about for that order. The return path uses it to resolve payments
/// whose notification has not arrived (or never will).
///
/// Authorization is OAuth2 client-credentials: the business-app id and secret are exchanged for a
/// short-lived bearer token. Tokens are requested per call; at reconciliation volumes there is
/// nothing worth caching.
#[derive(Clone)]
pub struct PayHereApi {
    config: PayHereConfig,
    client: Arc<Client>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: i32,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<Vec<RetrievedPayment>>,
}

impl PayHereApi {
    pub fn new(config: PayHereConfig) -> Result<Self, PayHereApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PayHereApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    async fn access_token(&self) -> Result<String, PayHereApiError> {
        let credentials = base64::encode(format!("{}:{}", self.config.app_id, self.config.app_secret.reveal()));
        let url = self.url("/merchant/v1/oauth/token");
        trace!("🔎️ Requesting retrieval API access token");
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Basic {credentials}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PayHereApiError::AuthorizationError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(PayHereApiError::QueryError { status, message });
        }
        let token: TokenResponse =
            response.json().await.map_err(|e| PayHereApiError::JsonError(e.to_string()))?;
        Ok(token.access_token)
    }

    /// Looks up the payments PayHere has recorded against `order_id`. When the gateway has seen
    /// multiple attempts for the order, the most recent one is returned.
    pub async fn fetch_payment_for_order(&self, order_id: &str) -> Result<RetrievedPayment, PayHereApiError> {
        let token = self.access_token().await?;
        let url = self.url("/merchant/v1/payment/search");
        trace!("🔎️ Querying payment status for order {order_id}");
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("order_id", order_id)])
            .send()
            .await
            .map_err(|e| PayHereApiError::RequestError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(PayHereApiError::QueryError { status, message });
        }
        let body: Value = response.json().await.map_err(|e| PayHereApiError::JsonError(e.to_string()))?;
        trace!("🔎️ Retrieval API response for {order_id}: {body}");
        let parsed: SearchResponse =
            serde_json::from_value(body).map_err(|e| PayHereApiError::JsonError(e.to_string()))?;
        if parsed.status != 1 {
            let msg = parsed.msg.unwrap_or_else(|| "no detail given".to_string());
            debug!("🔎️ Retrieval API reported no result for {order_id}: {msg}");
            return Err(PayHereApiError::PaymentNotFound(order_id.to_string()));
        }
        parsed
            .data
            .unwrap_or_default()
            .into_iter()
            .max_by_key(|p| p.payment_id)
            .ok_or_else(|| PayHereApiError::PaymentNotFound(order_id.to_string()))
    }
}
