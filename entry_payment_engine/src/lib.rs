//! Entry Payment Engine
//!
//! The core of the entry payment gateway: it turns asynchronous, at-least-once payment
//! notifications into exactly-once competition registrations.
//!
//! The library is divided into three main sections:
//! 1. The database types and backend trait ([`db_types`], [`traits`]). A backend must provide a
//!    single-round-trip conditional status update (the system's only serialization point) and
//!    multi-row transactions for materialization. SQLite is the provided backend
//!    ([`SqliteDatabase`]).
//! 2. The reconciliation API ([`PaymentFlowApi`]). Both delivery paths (the gateway's webhook push
//!    and the browser's return pull) drive the same flow here, so duplicate and racing deliveries
//!    converge on one outcome.
//! 3. Event hooks ([`events`]). Once registrations are materialized, a `RegistrationConfirmed`
//!    event is emitted per registration so that side effects (confirmation e-mails) run off the
//!    request path.
pub mod db_types;
mod epe_api;
pub mod events;
pub mod helpers;
pub mod sqlite;
pub mod traits;

pub use epe_api::payment_flow_api::{PaymentFlowApi, ReconciliationResult};
pub use sqlite::SqliteDatabase;
pub use traits::{RegistrationGatewayDatabase, RegistrationGatewayError};
