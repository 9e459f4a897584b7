use chrono::{DateTime, Duration, Utc};
use epg_common::Cents;
use log::trace;
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use crate::db_types::{Cart, CartItem, CartStatus, ParticipantType, TeamMember};

/// A cart waiting to be filled. Carts are normally created by the storefront; the engine exposes
/// this for provisioning and test setup.
#[derive(Debug, Clone)]
pub struct NewCart {
    pub user_id: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub cart_id: i64,
    pub competition_id: i64,
    pub competition_year: i32,
    pub registration_type_id: i64,
    pub country: String,
    pub participant_type: ParticipantType,
    pub team_name: Option<String>,
    pub members: Vec<TeamMember>,
    pub subtotal: Cents,
}

pub async fn insert_cart(cart: NewCart, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    let cart = sqlx::query_as("INSERT INTO carts (user_id, expires_at) VALUES ($1, $2) RETURNING *")
        .bind(cart.user_id)
        .bind(cart.expires_at)
        .fetch_one(conn)
        .await?;
    Ok(cart)
}

pub async fn insert_cart_item(item: NewCartItem, conn: &mut SqliteConnection) -> Result<CartItem, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO cart_items (
                cart_id,
                competition_id,
                competition_year,
                registration_type_id,
                country,
                participant_type,
                team_name,
                members,
                subtotal
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(item.cart_id)
    .bind(item.competition_id)
    .bind(item.competition_year)
    .bind(item.registration_type_id)
    .bind(item.country)
    .bind(item.participant_type)
    .bind(item.team_name)
    .bind(Json(item.members))
    .bind(item.subtotal)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<Option<Cart>, sqlx::Error> {
    let cart = sqlx::query_as("SELECT * FROM carts WHERE id = $1").bind(cart_id).fetch_optional(conn).await?;
    Ok(cart)
}

pub async fn fetch_items_for_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY id ASC")
        .bind(cart_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Fetches the snapshotted items by id. The result is ordered by id so materialization is
/// deterministic; callers compare the returned count against the snapshot to detect gaps.
pub async fn fetch_items_by_ids(item_ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    if item_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM cart_items WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in item_ids {
        separated.push_bind(id);
    }
    builder.push(") ORDER BY id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let items = builder.build_query_as::<CartItem>().fetch_all(conn).await?;
    Ok(items)
}

pub async fn update_cart_status(
    cart_id: i64,
    status: CartStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Cart>, sqlx::Error> {
    let cart =
        sqlx::query_as("UPDATE carts SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status.to_string())
            .bind(cart_id)
            .fetch_optional(conn)
            .await?;
    Ok(cart)
}

/// Expires active carts whose deadline passed more than `grace` ago. Expiry never touches carts
/// already snapshotted into a payment: materialization reads the snapshot, not the live cart.
pub async fn expire_carts(grace: Duration, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        format!(
            "UPDATE carts SET status = 'Expired', updated_at = CURRENT_TIMESTAMP WHERE status = 'Active' AND \
             expires_at IS NOT NULL AND (unixepoch(CURRENT_TIMESTAMP) - unixepoch(expires_at)) > {};",
            grace.num_seconds()
        )
        .as_str(),
    )
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
