//! `SqliteDatabase` is the concrete SQLite implementation of the payment engine backend.
//!
//! It implements [`RegistrationGatewayDatabase`] over a connection pool, delegating single
//! queries to the functions in [`super::db`] and composing them into transactions where the
//! contract demands atomicity (checkout creation and materialization).
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{
    carts,
    new_pool,
    payments,
    registrations,
    registrations::{DisplayCodeSpace, NewRegistration, RegistrationNumberSpace},
};
use crate::{
    db_types::{
        CartStatus,
        GatewayFields,
        NewCheckout,
        OrderId,
        PaymentRecord,
        PaymentStatus,
        TransitionResult,
    },
    helpers::{generate_unique_code, MAX_CODE_ATTEMPTS},
    traits::{MaterializationOutcome, MaterializedRegistration, RegistrationGatewayDatabase, RegistrationGatewayError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the url from the environment (or default).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = super::db::db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl RegistrationGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_checkout(&self, checkout: NewCheckout) -> Result<PaymentRecord, RegistrationGatewayError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_cart(checkout.cart_id, &mut tx)
            .await?
            .ok_or(RegistrationGatewayError::CartNotFound(checkout.cart_id))?;
        if cart.status != CartStatus::Active || cart.is_expired(Utc::now()) {
            return Err(RegistrationGatewayError::CartNotActive(cart.id));
        }
        let items = carts::fetch_items_for_cart(cart.id, &mut tx).await?;
        if items.is_empty() {
            return Err(RegistrationGatewayError::EmptyCart(cart.id));
        }
        let amount = items.iter().map(|i| i.subtotal).sum();
        let item_ids = items.iter().map(|i| i.id).collect::<Vec<_>>();
        let currency = epg_common::LKR_CURRENCY_CODE;
        let payment = payments::insert_payment(&checkout.order_id, cart.id, &item_ids, amount, currency, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Checkout [{}] snapshotted {} items from cart #{}", payment.order_id, item_ids.len(), cart.id);
        Ok(payment)
    }

    async fn fetch_payment_by_order_id(&self, order_id: &OrderId) -> Result<Option<PaymentRecord>, RegistrationGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_order_id(order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn transition_payment(
        &self,
        order_id: &OrderId,
        target: PaymentStatus,
        fields: GatewayFields,
    ) -> Result<TransitionResult, RegistrationGatewayError> {
        let expected = target
            .required_predecessor()
            .ok_or(RegistrationGatewayError::InvalidTargetStatus(target))?;
        let mut conn = self.pool.acquire().await?;
        match payments::conditional_transition(order_id, expected, target, &fields, &mut conn).await? {
            Some(payment) => Ok(TransitionResult { applied: true, payment }),
            None => {
                // Lost the race, duplicate delivery, or the order is simply unknown. Only a
                // re-read can tell which.
                match payments::fetch_payment_by_order_id(order_id, &mut conn).await? {
                    Some(payment) => {
                        debug!(
                            "🗃️ Transition of [{order_id}] to {target} not applied; current status is {}",
                            payment.status
                        );
                        Ok(TransitionResult { applied: false, payment })
                    },
                    None => {
                        error!("🗃️ The gateway reported an outcome for order [{order_id}], but no payment record exists.");
                        Err(RegistrationGatewayError::OrderNotFound(order_id.clone()))
                    },
                }
            },
        }
    }

    async fn materialize_registrations(
        &self,
        payment: &PaymentRecord,
    ) -> Result<MaterializationOutcome, RegistrationGatewayError> {
        if payment.status != PaymentStatus::Completed {
            return Err(RegistrationGatewayError::PaymentNotCompleted {
                order_id: payment.order_id.clone(),
                status: payment.status,
            });
        }
        let item_ids = &payment.item_ids.0;
        let mut tx = self.pool.begin().await?;

        // Second line of defence behind the conditional transition: if a previous attempt (or a
        // racing one that has already committed) produced the full set, this attempt is a no-op.
        let existing = registrations::count_for_payment(payment.id, &mut tx).await?;
        #[allow(clippy::cast_possible_wrap)]
        let snapshot_len = item_ids.len() as i64;
        if existing == snapshot_len {
            let registrations = registrations::fetch_for_payment(payment.id, &mut tx).await?;
            tx.commit().await?;
            trace!("🗃️ Order [{}] is already fully materialized ({existing} registrations)", payment.order_id);
            let registrations =
                registrations.into_iter().map(|registration| MaterializedRegistration { registration, contact: None }).collect();
            return Ok(MaterializationOutcome { registrations, newly_created: false });
        }

        let items = carts::fetch_items_by_ids(item_ids, &mut tx).await?;
        if items.len() != item_ids.len() {
            error!(
                "🗃️ Order [{}] snapshot lists {} items but only {} exist. Rolling back.",
                payment.order_id,
                item_ids.len(),
                items.len()
            );
            return Err(RegistrationGatewayError::SnapshotInconsistent(payment.order_id.clone()));
        }
        let cart = carts::fetch_cart(payment.cart_id, &mut tx)
            .await?
            .ok_or(RegistrationGatewayError::CartNotFound(payment.cart_id))?;

        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let mut attempt = 0u32;
            let registration = loop {
                attempt += 1;
                let registration_number =
                    generate_unique_code(&mut RegistrationNumberSpace { conn: &mut tx }, MAX_CODE_ATTEMPTS).await?;
                let display_code = generate_unique_code(
                    &mut DisplayCodeSpace {
                        conn: &mut tx,
                        competition_id: item.competition_id,
                        competition_year: item.competition_year,
                    },
                    MAX_CODE_ATTEMPTS,
                )
                .await?;
                let new_registration = NewRegistration {
                    registration_number,
                    display_code,
                    user_id: cart.user_id,
                    competition_id: item.competition_id,
                    competition_year: item.competition_year,
                    registration_type_id: item.registration_type_id,
                    payment_id: payment.id,
                    cart_item_id: item.id,
                    amount_paid: item.subtotal,
                    currency: payment.currency.clone(),
                };
                match registrations::insert_registration(new_registration, &mut tx).await? {
                    Some(registration) => break registration,
                    None if attempt < MAX_CODE_ATTEMPTS => {
                        warn!(
                            "🗃️ Registration insert for item #{} hit a uniqueness constraint on attempt {attempt}. \
                             Retrying with fresh codes.",
                            item.id
                        );
                    },
                    None => {
                        return Err(crate::helpers::CodeGenerationError::Exhausted {
                            scope: format!("registration insert for item #{}", item.id),
                            attempts: MAX_CODE_ATTEMPTS,
                        }
                        .into());
                    },
                }
            };
            trace!(
                "🗃️ Registration {} ({}) created for item #{}",
                registration.registration_number,
                registration.display_code,
                item.id
            );
            let contact = item.lead_member().cloned();
            created.push(MaterializedRegistration { registration, contact });
        }

        carts::update_cart_status(cart.id, CartStatus::Completed, &mut tx)
            .await?
            .ok_or(RegistrationGatewayError::CartNotFound(cart.id))?;
        tx.commit().await?;
        info!(
            "🗃️ Materialized {} registrations for order [{}]; cart #{} is complete",
            created.len(),
            payment.order_id,
            cart.id
        );
        Ok(MaterializationOutcome { registrations: created, newly_created: true })
    }

    async fn fetch_registrations_for_payment(&self, payment_id: i64) -> Result<Vec<crate::db_types::Registration>, RegistrationGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let registrations = registrations::fetch_for_payment(payment_id, &mut conn).await?;
        Ok(registrations)
    }

    async fn expire_old_carts(&self, grace: Duration) -> Result<u64, RegistrationGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let expired = carts::expire_carts(grace, &mut conn).await?;
        if expired > 0 {
            info!("🗃️ {expired} abandoned carts expired");
        }
        Ok(expired)
    }

    async fn close(&mut self) -> Result<(), RegistrationGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}
