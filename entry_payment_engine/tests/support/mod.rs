//! Shared scaffolding for the engine integration tests: throwaway SQLite databases and cart
//! seeding.
#![allow(dead_code)]

use std::path::Path;

use entry_payment_engine::{
    db_types::{Cart, CartItem, GatewayFields, NewCheckout, OrderId, ParticipantType, PaymentRecord, TeamMember},
    sqlite::db::carts::{insert_cart, insert_cart_item, NewCart, NewCartItem},
    RegistrationGatewayDatabase,
    SqliteDatabase,
};
use epg_common::Cents;
use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    format!("sqlite://../data/test_epg_{}.db", rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

/// Seeds an active cart holding one item per subtotal (in rupees), all in the same
/// competition-year scope.
pub async fn seed_cart(db: &SqliteDatabase, user_id: i64, subtotals_rupees: &[i64]) -> (Cart, Vec<CartItem>) {
    seed_cart_for_competition(db, user_id, 1, 2024, subtotals_rupees).await
}

pub async fn seed_cart_for_competition(
    db: &SqliteDatabase,
    user_id: i64,
    competition_id: i64,
    competition_year: i32,
    subtotals_rupees: &[i64],
) -> (Cart, Vec<CartItem>) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let cart = insert_cart(NewCart { user_id, expires_at: None }, &mut conn).await.expect("Error inserting cart");
    let mut items = Vec::with_capacity(subtotals_rupees.len());
    for (i, subtotal) in subtotals_rupees.iter().enumerate() {
        let item = insert_cart_item(
            NewCartItem {
                cart_id: cart.id,
                competition_id,
                competition_year,
                registration_type_id: 1,
                country: "LK".to_string(),
                participant_type: ParticipantType::Individual,
                team_name: None,
                members: vec![TeamMember {
                    name: format!("Entrant {i}"),
                    email: format!("entrant{i}@example.com"),
                }],
                subtotal: Cents::from_rupees(*subtotal),
            },
            &mut conn,
        )
        .await
        .expect("Error inserting cart item");
        items.push(item);
    }
    (cart, items)
}

/// A cart with items, snapshotted into a pending payment, ready for notifications.
pub async fn seed_checkout(db: &SqliteDatabase, order_id: &str, subtotals_rupees: &[i64]) -> (PaymentRecord, Vec<CartItem>) {
    let (cart, items) = seed_cart(db, 42, subtotals_rupees).await;
    let payment = db
        .create_checkout(NewCheckout { order_id: OrderId::from(order_id), cart_id: cart.id })
        .await
        .expect("Error creating checkout");
    (payment, items)
}

/// The gateway fields a genuine success notification would carry.
pub fn success_fields(payment_id: &str) -> GatewayFields {
    GatewayFields {
        gateway_payment_id: Some(payment_id.to_string()),
        gateway_status_code: Some(2),
        gateway_signature: Some("AABBCCDDEEFF00112233445566778899".to_string()),
        payment_method: Some("VISA".to_string()),
        card_holder_name: Some("S. Perera".to_string()),
        raw_response: Some(r#"{"status_code":"2"}"#.to_string()),
        error_message: None,
    }
}
