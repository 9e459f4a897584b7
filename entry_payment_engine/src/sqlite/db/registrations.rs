use epg_common::Cents;
use sqlx::SqliteConnection;

use crate::{
    db_types::Registration,
    helpers::{display_code_candidate, registration_number_candidate, CodeGenerationError, CodeSpace},
};

/// Everything needed to insert one registration row. Codes are allocated by the caller so that a
/// constraint violation can be retried with fresh candidates.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub registration_number: String,
    pub display_code: String,
    pub user_id: i64,
    pub competition_id: i64,
    pub competition_year: i32,
    pub registration_type_id: i64,
    pub payment_id: i64,
    pub cart_item_id: i64,
    pub amount_paid: Cents,
    pub currency: String,
}

/// Inserts a registration row. Returns `Ok(None)` when a uniqueness constraint rejected the
/// insert — both generated codes raced another allocator — which callers treat as a collision and
/// retry with fresh candidates.
pub async fn insert_registration(
    registration: NewRegistration,
    conn: &mut SqliteConnection,
) -> Result<Option<Registration>, sqlx::Error> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO registrations (
                registration_number,
                display_code,
                user_id,
                competition_id,
                competition_year,
                registration_type_id,
                payment_id,
                cart_item_id,
                amount_paid,
                currency
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(registration.registration_number)
    .bind(registration.display_code)
    .bind(registration.user_id)
    .bind(registration.competition_id)
    .bind(registration.competition_year)
    .bind(registration.registration_type_id)
    .bind(registration.payment_id)
    .bind(registration.cart_item_id)
    .bind(registration.amount_paid)
    .bind(registration.currency)
    .fetch_one(conn)
    .await;
    match result {
        Ok(registration) => Ok(Some(registration)),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn count_for_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn fetch_for_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Registration>, sqlx::Error> {
    let registrations = sqlx::query_as("SELECT * FROM registrations WHERE payment_id = $1 ORDER BY id ASC")
        .bind(payment_id)
        .fetch_all(conn)
        .await?;
    Ok(registrations)
}

//--------------------------------------    Code spaces      ---------------------------------------------------------

/// The global scope for registration numbers.
pub struct RegistrationNumberSpace<'a> {
    pub conn: &'a mut SqliteConnection,
}

impl CodeSpace for RegistrationNumberSpace<'_> {
    fn scope(&self) -> String {
        "registration numbers (global)".to_string()
    }

    fn candidate(&self) -> String {
        registration_number_candidate()
    }

    async fn exists(&mut self, code: &str) -> Result<bool, CodeGenerationError> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM registrations WHERE registration_number = $1)")
            .bind(code)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| CodeGenerationError::LookupFailed(e.to_string()))?;
        Ok(found)
    }
}

/// The per-competition-year scope for display codes.
pub struct DisplayCodeSpace<'a> {
    pub conn: &'a mut SqliteConnection,
    pub competition_id: i64,
    pub competition_year: i32,
}

impl CodeSpace for DisplayCodeSpace<'_> {
    fn scope(&self) -> String {
        format!("display codes (competition {} / {})", self.competition_id, self.competition_year)
    }

    fn candidate(&self) -> String {
        display_code_candidate()
    }

    async fn exists(&mut self, code: &str) -> Result<bool, CodeGenerationError> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM registrations WHERE competition_id = $1 AND competition_year = $2 AND \
             display_code = $3)",
        )
        .bind(self.competition_id)
        .bind(self.competition_year)
        .bind(code)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| CodeGenerationError::LookupFailed(e.to_string()))?;
        Ok(found)
    }
}
