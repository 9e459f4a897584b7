use std::fmt::Display;

use chrono::{DateTime, Utc};
use entry_payment_engine::db_types::{PaymentRecord, PaymentStatus, Registration};
use epg_common::Cents;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: String,
    pub cart_id: i64,
}

/// The query string the browser carries back from the gateway. Only the order id; any
/// payment-outcome fields a client might append are untrusted and ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnParams {
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationSummary {
    pub display_code: String,
    pub competition_id: i64,
    pub competition_year: i32,
    pub amount_paid: Cents,
    pub currency: String,
    pub confirmed_at: DateTime<Utc>,
    /// Only present on responses addressed to the registrant (the return path); public status
    /// lookups omit it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
}

impl RegistrationSummary {
    /// For the registrant's own eyes: includes the registration number.
    pub fn private(registration: &Registration) -> Self {
        Self { registration_number: Some(registration.registration_number.clone()), ..Self::public(registration) }
    }

    /// For anonymous display: the display code identifies the entry, nothing identifies the
    /// entrant.
    pub fn public(registration: &Registration) -> Self {
        Self {
            display_code: registration.display_code.clone(),
            competition_id: registration.competition_id,
            competition_year: registration.competition_year,
            amount_paid: registration.amount_paid,
            currency: registration.currency.clone(),
            confirmed_at: registration.confirmed_at,
            registration_number: None,
        }
    }
}

/// The locally reconciled state of an order, as reported to browsers. `status` is always the
/// local record's status — never a claim taken from the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledStatus {
    pub order_id: String,
    pub status: PaymentStatus,
    pub amount: Cents,
    pub currency: String,
    pub message: String,
    pub registrations: Vec<RegistrationSummary>,
}

impl ReconciledStatus {
    pub fn new(payment: &PaymentRecord, registrations: Vec<RegistrationSummary>) -> Self {
        let message = match payment.status {
            PaymentStatus::Pending => "Your payment is still being processed. Check again shortly.".to_string(),
            PaymentStatus::Completed => format!("Payment received. {} registrations confirmed.", registrations.len()),
            PaymentStatus::Failed => "The payment did not complete.".to_string(),
            PaymentStatus::Cancelled => "The payment was cancelled.".to_string(),
            PaymentStatus::Refunded => "This payment has been refunded.".to_string(),
        };
        Self {
            order_id: payment.order_id.to_string(),
            status: payment.status,
            amount: payment.amount,
            currency: payment.currency.clone(),
            message,
            registrations,
        }
    }
}
