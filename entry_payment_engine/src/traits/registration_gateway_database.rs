use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{GatewayFields, NewCheckout, OrderId, PaymentRecord, PaymentStatus, Registration, TeamMember, TransitionResult},
    helpers::CodeGenerationError,
};

/// The storage contract for the payment reconciliation pipeline.
///
/// Two requirements are load-bearing and non-negotiable:
/// * [`transition_payment`](Self::transition_payment) must perform its legality check and its
///   write as one atomic conditional update. It is the only serialization point in the system;
///   a read-then-write implementation reintroduces the check-then-act race this design exists to
///   remove.
/// * [`materialize_registrations`](Self::materialize_registrations) must be all-or-nothing. A
///   completed payment with fewer registrations than snapshot items breaks the invariant that
///   support tooling and reconciliation both lean on.
#[allow(async_fn_in_trait)]
pub trait RegistrationGatewayDatabase {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Opens a checkout: verifies the cart is active and non-empty, snapshots its item ids,
    /// computes the total, and stores a `Pending` payment record — all in one transaction.
    ///
    /// Returns [`RegistrationGatewayError::PaymentAlreadyExists`] if the order id has been used.
    async fn create_checkout(&self, checkout: NewCheckout) -> Result<PaymentRecord, RegistrationGatewayError>;

    async fn fetch_payment_by_order_id(&self, order_id: &OrderId) -> Result<Option<PaymentRecord>, RegistrationGatewayError>;

    /// Attempts to move the payment for `order_id` into `target`, stamping the gateway-reported
    /// fields on success.
    ///
    /// The current-status check and the write are a single conditional update; of any number of
    /// concurrent callers requesting the same transition, exactly one observes `applied == true`.
    /// `applied == false` with the current record is returned when the payment is already past
    /// the required predecessor status (duplicate delivery, lost race). A missing payment record
    /// is an error: the gateway believes this payment exists, so the gap must be surfaced, never
    /// acknowledged away.
    async fn transition_payment(
        &self,
        order_id: &OrderId,
        target: PaymentStatus,
        fields: GatewayFields,
    ) -> Result<TransitionResult, RegistrationGatewayError>;

    /// Converts a completed payment's item snapshot into registrations, one per item, and marks
    /// the originating cart `Completed` — all in one transaction.
    ///
    /// Re-invocation is a cheap no-op once the registration count matches the snapshot, so the
    /// call is safe from both delivery paths and after a crash between the status transition and
    /// materialization.
    async fn materialize_registrations(&self, payment: &PaymentRecord) -> Result<MaterializationOutcome, RegistrationGatewayError>;

    async fn fetch_registrations_for_payment(&self, payment_id: i64) -> Result<Vec<Registration>, RegistrationGatewayError>;

    /// Marks active carts whose deadline passed longer than `grace` ago as `Expired`. Carts
    /// already snapshotted into a payment are unaffected by expiry: materialization never reads
    /// the live cart.
    async fn expire_old_carts(&self, grace: Duration) -> Result<u64, RegistrationGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), RegistrationGatewayError> {
        Ok(())
    }
}

/// One registration produced (or found) by a materialization call, together with the contact
/// resolved from its cart item. The contact is what downstream notification hooks need; resolving
/// it here saves subscribers a round trip back into the cart tables.
#[derive(Debug, Clone)]
pub struct MaterializedRegistration {
    pub registration: Registration,
    pub contact: Option<TeamMember>,
}

/// The result of a materialization attempt. `newly_created` is false when an earlier attempt
/// already produced the full set; `registrations` always holds the complete set either way.
#[derive(Debug, Clone, Default)]
pub struct MaterializationOutcome {
    pub registrations: Vec<MaterializedRegistration>,
    pub newly_created: bool,
}

#[derive(Debug, Clone, Error)]
pub enum RegistrationGatewayError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cannot create checkout, an order with id {0} already exists")]
    PaymentAlreadyExists(OrderId),
    #[error("No payment record found for order {0}. The gateway knows this order but we do not.")]
    OrderNotFound(OrderId),
    #[error("Cart {0} does not exist")]
    CartNotFound(i64),
    #[error("Cart {0} is not active")]
    CartNotActive(i64),
    #[error("Cart {0} has no items to register")]
    EmptyCart(i64),
    #[error("Payments can never transition into {0}")]
    InvalidTargetStatus(PaymentStatus),
    #[error("Payment {0} has a snapshot that references missing cart items")]
    SnapshotInconsistent(OrderId),
    #[error("Cannot materialize registrations for order {order_id} while its payment is {status}")]
    PaymentNotCompleted { order_id: OrderId, status: PaymentStatus },
    #[error("{0}")]
    CodeGeneration(#[from] CodeGenerationError),
}

impl From<sqlx::Error> for RegistrationGatewayError {
    fn from(e: sqlx::Error) -> Self {
        RegistrationGatewayError::DatabaseError(e.to_string())
    }
}
