use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use epg_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

// Re-exported so API consumers can build records without depending on sqlx themselves.
pub use sqlx::types::Json;

#[derive(Debug, Clone, Error)]
#[error("Invalid value in database field: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------      OrderId        ---------------------------------------------------------
/// The caller-supplied correlation key shared with the payment gateway. Unique per checkout
/// attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
/// The authoritative status of one payment attempt.
///
/// Legal transitions:
/// `Pending → Completed`, `Pending → Failed`, `Pending → Cancelled`, `Completed → Refunded`.
/// Everything else is rejected by the conditional update in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// The checkout exists, but the gateway has not reported a terminal outcome yet.
    Pending,
    /// The gateway confirmed the charge. Registrations are materialized from this state.
    Completed,
    /// The gateway reported the charge as failed, or the notification failed verification.
    Failed,
    /// The paying user abandoned the payment at the gateway.
    Cancelled,
    /// A chargeback arrived for an already-completed payment.
    Refunded,
}

impl PaymentStatus {
    /// The status a payment must currently hold for a transition into `self` to be legal.
    pub fn required_predecessor(&self) -> Option<PaymentStatus> {
        match self {
            PaymentStatus::Pending => None,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled => Some(PaymentStatus::Pending),
            PaymentStatus::Refunded => Some(PaymentStatus::Completed),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Cancelled => write!(f, "Cancelled"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Cancelled" => Ok(Self::Cancelled),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid payment status in database: {value}. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------   PaymentRecord     ---------------------------------------------------------
/// One checkout attempt. Created `Pending` when the checkout is built, moved exactly once into a
/// terminal state by the state machine, and never deleted.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub cart_id: i64,
    /// The cart-item snapshot captured at checkout time. Materialization reads this, never the
    /// live cart.
    pub item_ids: Json<Vec<i64>>,
    pub amount: Cents,
    pub currency: String,
    pub status: PaymentStatus,
    pub merchant_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_status_code: Option<i32>,
    pub gateway_signature: Option<String>,
    pub payment_method: Option<String>,
    pub card_holder_name: Option<String>,
    /// The full notification payload, verbatim, for audit and dispute investigation.
    pub raw_gateway_response: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn item_count(&self) -> usize {
        self.item_ids.0.len()
    }
}

//--------------------------------------    NewCheckout      ---------------------------------------------------------
/// Request to open a new checkout against an active cart. The amount is computed from the cart
/// items inside the checkout transaction; callers only pick the correlation key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCheckout {
    pub order_id: OrderId,
    pub cart_id: i64,
}

//--------------------------------------   GatewayFields     ---------------------------------------------------------
/// The gateway-reported details stamped onto a payment row by a status transition. All fields are
/// optional; `None` leaves the stored value untouched, so a signature-rejection write does not
/// erase details from an earlier notification.
#[derive(Debug, Clone, Default)]
pub struct GatewayFields {
    pub gateway_payment_id: Option<String>,
    pub gateway_status_code: Option<i32>,
    pub gateway_signature: Option<String>,
    pub payment_method: Option<String>,
    pub card_holder_name: Option<String>,
    pub raw_response: Option<String>,
    pub error_message: Option<String>,
}

impl GatewayFields {
    pub fn with_error(message: impl Into<String>) -> Self {
        Self { error_message: Some(message.into()), ..Default::default() }
    }
}

//--------------------------------------  TransitionResult   ---------------------------------------------------------
/// The outcome of a conditional status transition. `applied == false` is the normal result of a
/// duplicate delivery or a lost race, not an error.
#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub applied: bool,
    pub payment: PaymentRecord,
}

//--------------------------------------     CartStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CartStatus {
    Active,
    Completed,
    Expired,
}

impl Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartStatus::Active => write!(f, "Active"),
            CartStatus::Completed => write!(f, "Completed"),
            CartStatus::Expired => write!(f, "Expired"),
        }
    }
}

impl FromStr for CartStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Completed" => Ok(Self::Completed),
            "Expired" => Ok(Self::Expired),
            s => Err(ConversionError(format!("Invalid cart status: {s}"))),
        }
    }
}

//--------------------------------------        Cart         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    pub status: CartStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == CartStatus::Expired || self.expires_at.map(|t| t <= now).unwrap_or(false)
    }
}

//--------------------------------------  ParticipantType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ParticipantType {
    Individual,
    Team,
}

impl Display for ParticipantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantType::Individual => write!(f, "Individual"),
            ParticipantType::Team => write!(f, "Team"),
        }
    }
}

//--------------------------------------     TeamMember      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub email: String,
}

//--------------------------------------      CartItem       ---------------------------------------------------------
/// One competition entry in a cart. Immutable once its id is snapshotted into a payment record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub competition_id: i64,
    pub competition_year: i32,
    pub registration_type_id: i64,
    pub country: String,
    pub participant_type: ParticipantType,
    pub team_name: Option<String>,
    pub members: Json<Vec<TeamMember>>,
    pub subtotal: Cents,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// The first listed member is the contact for all correspondence about the entry.
    pub fn lead_member(&self) -> Option<&TeamMember> {
        self.members.0.first()
    }
}

//-------------------------------------- RegistrationStatus  ---------------------------------------------------------
/// This pipeline only ever creates confirmed registrations; an unconfirmed registration does not
/// exist as a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RegistrationStatus {
    Confirmed,
}

impl Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Confirmed")
    }
}

impl From<String> for RegistrationStatus {
    fn from(value: String) -> Self {
        if value != "Confirmed" {
            log::error!("Invalid registration status in database: {value}. Defaulting to Confirmed");
        }
        RegistrationStatus::Confirmed
    }
}

//--------------------------------------    Registration     ---------------------------------------------------------
/// The durable proof of a paid competition entry. Exactly one exists per cart item of a completed
/// payment.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Registration {
    pub id: i64,
    /// Globally unique, semi-private. Used in confirmation e-mails and support lookups.
    pub registration_number: String,
    /// Unique within one competition year. Safe for public display; reveals neither the entrant
    /// nor the registration number.
    pub display_code: String,
    pub user_id: i64,
    pub competition_id: i64,
    pub competition_year: i32,
    pub registration_type_id: i64,
    pub payment_id: i64,
    pub cart_item_id: i64,
    pub amount_paid: Cents,
    pub currency: String,
    pub status: RegistrationStatus,
    pub confirmed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
