use chrono::Duration;
use entry_payment_engine::{events::EventProducers, PaymentFlowApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the cart expiry worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
///
/// Expiry only touches carts that were never snapshotted into a payment; a cart referenced by a
/// pending payment keeps its snapshot usable regardless of what happens to the live cart row.
pub fn start_expiry_worker(db: SqliteDatabase, grace: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = PaymentFlowApi::new(db, EventProducers::default());
        info!("🕰️ Cart expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running cart expiry job");
            match api.expire_old_carts(grace).await {
                Ok(0) => {},
                Ok(expired) => info!("🕰️ {expired} carts expired"),
                Err(e) => error!("🕰️ Error running cart expiry job: {e}"),
            }
        }
    })
}
