//! E-mail dispatch for confirmed registrations.
//!
//! The dispatcher subscribes to the engine's `RegistrationConfirmed` events, so it runs strictly
//! off the request path: a slow or failing e-mail provider can never stall the acknowledgement
//! PayHere is waiting for. Delivery is fire-and-forget by design — failures are logged and not
//! retried. If delivery guarantees ever matter, add an outbox table drained by a worker instead
//! of retrying inline.
//!
//! Three templated mails go out per registration: the registration confirmation (with the
//! registration number), the payment receipt, and the submission guidelines.

use std::{sync::Arc, time::Duration};

use entry_payment_engine::events::RegistrationConfirmedEvent;
use epg_common::Secret;
use log::*;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;

const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    RegistrationConfirmation,
    PaymentReceipt,
    SubmissionGuidelines,
}

impl EmailTemplate {
    pub const ALL: [EmailTemplate; 3] =
        [Self::RegistrationConfirmation, Self::PaymentReceipt, Self::SubmissionGuidelines];

    fn subject(&self, display_code: &str) -> String {
        match self {
            Self::RegistrationConfirmation => format!("Your competition entry {display_code} is confirmed"),
            Self::PaymentReceipt => "Payment receipt for your competition entry".to_string(),
            Self::SubmissionGuidelines => format!("Submission guidelines for entry {display_code}"),
        }
    }

    fn template_key(&self) -> &'static str {
        match self {
            Self::RegistrationConfirmation => "registration_confirmation",
            Self::PaymentReceipt => "payment_receipt",
            Self::SubmissionGuidelines => "submission_guidelines",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct NotifierConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub sender: String,
    pub send_timeout: Duration,
    /// When no API key is configured the dispatcher logs what it would have sent and does
    /// nothing else.
    pub enabled: bool,
}

impl NotifierConfig {
    pub fn from_env_or_default() -> Self {
        let api_url = std::env::var("EPG_EMAIL_API_URL").unwrap_or_else(|_| DEFAULT_EMAIL_API_URL.to_string());
        let (api_key, enabled) = match std::env::var("EPG_EMAIL_API_KEY") {
            Ok(key) if !key.is_empty() => (Secret::new(key), true),
            _ => {
                warn!("🪛️ EPG_EMAIL_API_KEY is not set. Registration e-mails will be logged, not sent.");
                (Secret::default(), false)
            },
        };
        let sender = std::env::var("EPG_EMAIL_SENDER").unwrap_or_else(|_| "entries@example.lk".to_string());
        let send_timeout = std::env::var("EPG_EMAIL_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS));
        Self { api_url, api_key, sender, send_timeout, enabled }
    }
}

#[derive(Debug, Error)]
enum NotifyError {
    #[error("E-mail request failed: {0}")]
    Request(String),
    #[error("E-mail API answered {status}: {message}")]
    Api { status: u16, message: String },
    #[error("E-mail send timed out")]
    TimedOut,
}

#[derive(Clone)]
pub struct Notifier {
    config: NotifierConfig,
    client: Arc<Client>,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self { config, client: Arc::new(Client::new()) }
    }

    /// Sends the full template set for one confirmed registration. Every send is individually
    /// time-boxed; one failure neither aborts the remaining templates nor reaches the caller.
    pub async fn dispatch_registration_emails(&self, event: &RegistrationConfirmedEvent) {
        let registration_number = &event.registration.registration_number;
        for template in EmailTemplate::ALL {
            let send = tokio::time::timeout(self.config.send_timeout, self.send(template, event));
            match send.await.map_err(|_| NotifyError::TimedOut).and_then(|r| r) {
                Ok(()) => trace!("📧️ {} sent for registration {registration_number}", template.template_key()),
                Err(e) => warn!(
                    "📧️ Could not send {} for registration {registration_number} to {}: {e}",
                    template.template_key(),
                    event.recipient_email
                ),
            }
        }
    }

    async fn send(&self, template: EmailTemplate, event: &RegistrationConfirmedEvent) -> Result<(), NotifyError> {
        let registration = &event.registration;
        if !self.config.enabled {
            info!(
                "📧️ E-mail dispatch disabled; would have sent {} for {} to {}",
                template.template_key(),
                registration.registration_number,
                event.recipient_email
            );
            return Ok(());
        }
        let body = json!({
            "from": self.config.sender,
            "to": [event.recipient_email],
            "subject": template.subject(&registration.display_code),
            "template": template.template_key(),
            "variables": {
                "recipient_name": event.recipient_name,
                "registration_number": registration.registration_number,
                "display_code": registration.display_code,
                "competition_id": registration.competition_id,
                "competition_year": registration.competition_year,
                "amount_paid": registration.amount_paid.to_string(),
                "order_id": event.payment.order_id.to_string(),
            },
        });
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.reveal())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(NotifyError::Api { status, message })
        }
    }
}
