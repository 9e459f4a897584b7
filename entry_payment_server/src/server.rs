use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use entry_payment_engine::{
    events::{EventHandlers, EventHooks},
    PaymentFlowApi,
    SqliteDatabase,
};
use log::*;
use payhere_tools::PayHereApi;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    notify::Notifier,
    payhere_routes::{PayhereReturnRoute, PayhereWebhookRoute},
    routes::{health, CreateCheckoutRoute, OrderStatusRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<actix_web::dev::Server, ServerError> {
    // The notification dispatcher hangs off the engine's event hooks, so e-mail dispatch runs on
    // its own task and can never delay a webhook acknowledgement.
    let notifier = Notifier::new(config.notifier.clone());
    let mut hooks = EventHooks::default();
    hooks.on_registration_confirmed(move |event| {
        let notifier = notifier.clone();
        Box::pin(async move {
            notifier.dispatch_registration_emails(&event).await;
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(64, hooks);
    let producers = handlers.producers();
    tokio::spawn(handlers.start_handlers());

    start_expiry_worker(db.clone(), config.cart_expiry_grace);

    let payhere_api =
        PayHereApi::new(config.payhere.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let options = ServerOptions::from_config(&config);
    let payhere_config = config.payhere.clone();

    info!("🚀️ Payment notifications will be accepted for merchant {}", payhere_config.merchant_id);
    let srv = HttpServer::new(move || {
        let flow_api = PaymentFlowApi::new(db.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("epg::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(payhere_config.clone()))
            .app_data(web::Data::new(payhere_api.clone()))
            .app_data(web::Data::new(options))
            .service(health)
            .service(CreateCheckoutRoute::<SqliteDatabase>::new())
            .service(OrderStatusRoute::<SqliteDatabase>::new())
            .service(PayhereWebhookRoute::<SqliteDatabase>::new())
            .service(PayhereReturnRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
