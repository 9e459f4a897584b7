use serde::{Deserialize, Serialize};

use crate::db_types::{PaymentRecord, Registration};

/// Emitted once per registration after a materialization transaction commits. Carries the contact
/// details resolved from the cart-item snapshot so that subscribers (the e-mail dispatcher) never
/// have to re-read the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationConfirmedEvent {
    pub registration: Registration,
    pub payment: PaymentRecord,
    pub recipient_name: String,
    pub recipient_email: String,
}

impl RegistrationConfirmedEvent {
    pub fn new(registration: Registration, payment: PaymentRecord, recipient_name: String, recipient_email: String) -> Self {
        Self { registration, payment, recipient_name, recipient_email }
    }
}
