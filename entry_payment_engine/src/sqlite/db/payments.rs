use epg_common::Cents;
use log::{debug, trace};
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{GatewayFields, OrderId, PaymentRecord, PaymentStatus},
    traits::RegistrationGatewayError,
};

/// Inserts a new `Pending` payment record. Not atomic on its own; the checkout flow embeds this
/// in a transaction together with the cart-snapshot reads.
pub async fn insert_payment(
    order_id: &OrderId,
    cart_id: i64,
    item_ids: &[i64],
    amount: Cents,
    currency: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentRecord, RegistrationGatewayError> {
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, cart_id, item_ids, amount, currency)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(cart_id)
    .bind(Json(item_ids.to_vec()))
    .bind(amount)
    .bind(currency)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            RegistrationGatewayError::PaymentAlreadyExists(order_id.clone())
        },
        _ => RegistrationGatewayError::from(e),
    })?;
    Ok(payment)
}

pub async fn fetch_payment_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(payment)
}

/// The compare-and-swap at the heart of the state machine.
///
/// The current-status check and the write are one UPDATE, so of any number of concurrent callers
/// racing the same transition, the database hands exactly one of them the updated row. Everyone
/// else gets `None` and must re-read to find out what actually happened.
///
/// Gateway fields are stamped with COALESCE: an absent field never erases a previously stored
/// value, and the timestamps only move when the matching status is entered.
pub async fn conditional_transition(
    order_id: &OrderId,
    expected: PaymentStatus,
    target: PaymentStatus,
    fields: &GatewayFields,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    trace!("🗃️ Attempting conditional transition of [{order_id}] from {expected} to {target}");
    let updated: Option<PaymentRecord> = sqlx::query_as(
        r#"
            UPDATE payments SET
                status = $1,
                updated_at = CURRENT_TIMESTAMP,
                gateway_payment_id = COALESCE($2, gateway_payment_id),
                gateway_status_code = COALESCE($3, gateway_status_code),
                gateway_signature = COALESCE($4, gateway_signature),
                payment_method = COALESCE($5, payment_method),
                card_holder_name = COALESCE($6, card_holder_name),
                raw_gateway_response = COALESCE($7, raw_gateway_response),
                error_message = COALESCE($8, error_message),
                completed_at = CASE WHEN $1 = 'Completed' THEN CURRENT_TIMESTAMP ELSE completed_at END,
                refunded_at = CASE WHEN $1 = 'Refunded' THEN CURRENT_TIMESTAMP ELSE refunded_at END
            WHERE order_id = $9 AND status = $10
            RETURNING *;
        "#,
    )
    .bind(target.to_string())
    .bind(fields.gateway_payment_id.as_deref())
    .bind(fields.gateway_status_code)
    .bind(fields.gateway_signature.as_deref())
    .bind(fields.payment_method.as_deref())
    .bind(fields.card_holder_name.as_deref())
    .bind(fields.raw_response.as_deref())
    .bind(fields.error_message.as_deref())
    .bind(order_id.as_str())
    .bind(expected.to_string())
    .fetch_optional(conn)
    .await?;
    if updated.is_some() {
        debug!("🗃️ Payment [{order_id}] moved from {expected} to {target}");
    }
    Ok(updated)
}
