//! Traits that a storage backend must implement to power the payment engine. The SQLite backend
//! in [`crate::SqliteDatabase`] is the canonical implementation.
mod registration_gateway_database;

pub use registration_gateway_database::{
    MaterializationOutcome,
    MaterializedRegistration,
    RegistrationGatewayDatabase,
    RegistrationGatewayError,
};
