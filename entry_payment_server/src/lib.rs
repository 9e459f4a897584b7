//! # Entry payment server
//! This module hosts the HTTP face of the entry payment gateway. It is responsible for:
//! Listening for incoming payment notifications (IPN) from PayHere.
//! Verifying notification signatures and driving the payment state machine.
//! Serving the browser return path, including active reconciliation against the gateway when the
//! notification has not arrived yet.
//! Dispatching confirmation e-mails off the request path via the engine's event hooks.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/checkout`: Opens a checkout against an active cart and returns the pending payment.
//! * `/webhook/payhere`: The IPN endpoint PayHere POSTs payment outcomes to.
//! * `/payhere/return`: Where the paying user's browser lands after leaving the gateway.
//! * `/status/{order_id}`: The locally reconciled status of an order.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod notify;
pub mod payhere_routes;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
