//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions.
//!
//! All interactions are maintained as simple functions (rather than stateful structs) that accept
//! a `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or create an
//! atomic transaction as the need arises and call through to the functions without any other
//! changes. The materializer leans on this: code allocation, registration inserts and the cart
//! status update all share one transaction.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod carts;
pub mod payments;
pub mod registrations;

const SQLITE_DB_URL: &str = "sqlite://data/entry_payments.db";

pub fn db_url() -> String {
    let result = env::var("EPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("EPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    // SQLite opens the database in WAL mode, which permits at most one writer at a time. sqlx
    // begins transactions as DEFERRED, so a transaction that reads before it writes (as the
    // checkout and materialization transactions do) takes its snapshot on the first read and then
    // fails with SQLITE_BUSY_SNAPSHOT when it tries to upgrade to a writer after another pooled
    // connection has committed in between. Serializing on a single connection keeps that
    // read-then-write pattern consistent; correctness still rests on the atomic conditional UPDATE,
    // not on pool parallelism. `max_connections` is retained in the signature for the callers.
    let _ = max_connections;
    let pool = SqlitePoolOptions::new().max_connections(1).connect(url).await?;
    Ok(pool)
}
