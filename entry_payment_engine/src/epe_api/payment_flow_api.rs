use std::fmt::Debug;

use chrono::Duration;
use log::*;

use crate::{
    db_types::{GatewayFields, NewCheckout, OrderId, PaymentRecord, PaymentStatus, Registration},
    events::{EventProducers, RegistrationConfirmedEvent},
    traits::{MaterializationOutcome, RegistrationGatewayDatabase, RegistrationGatewayError},
};

/// `PaymentFlowApi` is the single entry point for payment outcomes, regardless of how they were
/// learned: the gateway's IPN push, the browser's return-trip pull, or an admin replay. All of
/// them funnel into [`Self::process_gateway_outcome`], so the conditional transition in the
/// backend is the only arbiter of who performs the side effects.
pub struct PaymentFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

/// The reconciled state after a delivery has been processed. `applied` reports whether *this*
/// delivery won the status transition; `registrations` holds the full registration set whenever
/// the payment is completed, no matter which delivery created them.
#[derive(Debug, Clone)]
pub struct ReconciliationResult {
    pub applied: bool,
    pub payment: PaymentRecord,
    pub registrations: Vec<Registration>,
}

impl<B> PaymentFlowApi<B>
where B: RegistrationGatewayDatabase
{
    /// Opens a checkout for an active cart. The pending payment record this creates is the local
    /// anchor that every later notification for the order id must find.
    pub async fn create_checkout(&self, checkout: NewCheckout) -> Result<PaymentRecord, RegistrationGatewayError> {
        let payment = self.db.create_checkout(checkout).await?;
        info!("💳️ Checkout opened for order [{}]: {} from cart #{}", payment.order_id, payment.amount, payment.cart_id);
        Ok(payment)
    }

    /// Applies a gateway-reported outcome to the payment for `order_id`.
    ///
    /// The transition is conditional in the backend, so any number of concurrent calls for the
    /// same order collapse to one applied transition. When the payment ends up `Completed` —
    /// whether this call won the transition, lost the race, or is a retry after a crash —
    /// materialization is (re-)driven, which is a no-op once the registration set is complete.
    /// This is what makes a redelivered webhook, a racing return path, and a crash between
    /// transition and materialization all converge on the same end state.
    pub async fn process_gateway_outcome(
        &self,
        order_id: &OrderId,
        target: PaymentStatus,
        fields: GatewayFields,
    ) -> Result<ReconciliationResult, RegistrationGatewayError> {
        if target.required_predecessor().is_none() {
            return Err(RegistrationGatewayError::InvalidTargetStatus(target));
        }
        let result = self.db.transition_payment(order_id, target, fields).await?;
        if result.applied {
            info!("💳️ Payment [{order_id}] transitioned to {target}");
        } else {
            info!("💳️ Payment [{order_id}] is already {}; delivery of {target} treated as duplicate", result.payment.status);
        }
        let mut registrations = Vec::new();
        if result.payment.status == PaymentStatus::Completed && target == PaymentStatus::Completed {
            let outcome = self.db.materialize_registrations(&result.payment).await?;
            if outcome.newly_created {
                info!("🎫️ {} registrations issued for order [{order_id}]", outcome.registrations.len());
                self.call_registration_confirmed_hook(&result.payment, &outcome).await;
            }
            registrations = outcome.registrations.into_iter().map(|m| m.registration).collect();
        }
        Ok(ReconciliationResult { applied: result.applied, payment: result.payment, registrations })
    }

    /// Records that a notification for `order_id` failed signature verification. The payment is
    /// failed (conditionally, so a completed payment is never clobbered by a forged follow-up)
    /// and the offending payload is retained for the security audit.
    pub async fn record_signature_rejection(
        &self,
        order_id: &OrderId,
        supplied_signature: &str,
        raw_payload: &str,
    ) -> Result<ReconciliationResult, RegistrationGatewayError> {
        warn!("🔐️ Invalid gateway signature for order [{order_id}]. Recording rejection.");
        let fields = GatewayFields {
            gateway_signature: Some(supplied_signature.to_string()),
            raw_response: Some(raw_payload.to_string()),
            error_message: Some("Invalid signature".to_string()),
            ..Default::default()
        };
        let result = self.db.transition_payment(order_id, PaymentStatus::Failed, fields).await?;
        if !result.applied {
            info!(
                "🔐️ Signature rejection for order [{order_id}] left the payment untouched; it is already {}",
                result.payment.status
            );
        }
        Ok(ReconciliationResult { applied: result.applied, payment: result.payment, registrations: Vec::new() })
    }

    pub async fn fetch_payment(&self, order_id: &OrderId) -> Result<Option<PaymentRecord>, RegistrationGatewayError> {
        self.db.fetch_payment_by_order_id(order_id).await
    }

    /// The registration set for an order, empty while the payment is not completed.
    pub async fn registrations_for_order(&self, order_id: &OrderId) -> Result<Vec<Registration>, RegistrationGatewayError> {
        match self.db.fetch_payment_by_order_id(order_id).await? {
            Some(payment) => self.db.fetch_registrations_for_payment(payment.id).await,
            None => Err(RegistrationGatewayError::OrderNotFound(order_id.clone())),
        }
    }

    pub async fn expire_old_carts(&self, grace: Duration) -> Result<u64, RegistrationGatewayError> {
        self.db.expire_old_carts(grace).await
    }

    async fn call_registration_confirmed_hook(&self, payment: &PaymentRecord, outcome: &MaterializationOutcome) {
        for emitter in &self.producers.registration_confirmed_producer {
            for materialized in &outcome.registrations {
                let Some(contact) = &materialized.contact else {
                    warn!(
                        "🎫️ Registration {} has no contact on its cart item; no notification will be sent",
                        materialized.registration.registration_number
                    );
                    continue;
                };
                let event = RegistrationConfirmedEvent::new(
                    materialized.registration.clone(),
                    payment.clone(),
                    contact.name.clone(),
                    contact.email.clone(),
                );
                emitter.publish_event(event).await;
            }
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
