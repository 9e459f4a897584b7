//! PayHere gateway integration.
//!
//! Everything that depends on the PayHere wire contract lives in this crate: the typed IPN
//! notification payload, the status-code mapping, the md5sig checksum scheme, and a client for the
//! Payment Retrieval API (used by the return path when the IPN has not arrived yet).
//!
//! The checksum and status-code rules follow PayHere's published integration documentation. If
//! PayHere ever versions its signature scheme, this crate is the only place that needs to change.
mod api;
mod checksum;
mod config;
mod error;
mod notification;

pub use api::PayHereApi;
pub use checksum::{local_md5sig, md5_hex_upper, verify_md5sig};
pub use config::PayHereConfig;
pub use error::PayHereApiError;
pub use notification::{IpnNotification, PaymentOutcome, RetrievedPayment};
