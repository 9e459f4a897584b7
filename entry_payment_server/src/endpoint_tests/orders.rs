use actix_web::{http::StatusCode, web, web::ServiceConfig};
use entry_payment_engine::{
    db_types::{PaymentStatus, TransitionResult},
    events::EventProducers,
    traits::RegistrationGatewayError,
    PaymentFlowApi,
};
use payhere_tools::{PayHereApi, PayHereConfig};

use super::{
    helpers::{get_request, post_json},
    mocks::{full_outcome, payment_record, registration, MockRegistrationGatewayDb},
};
use crate::{
    data_objects::CheckoutRequest,
    payhere_routes::PayhereReturnRoute,
    routes::{CreateCheckoutRoute, OrderStatusRoute},
};

fn register_mock(cfg: &mut ServiceConfig, db: MockRegistrationGatewayDb) {
    let api = PaymentFlowApi::new(db, EventProducers::default());
    cfg.service(CreateCheckoutRoute::<MockRegistrationGatewayDb>::new())
        .service(OrderStatusRoute::<MockRegistrationGatewayDb>::new())
        .service(PayhereReturnRoute::<MockRegistrationGatewayDb>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(PayHereApi::new(PayHereConfig::default()).unwrap()));
}

#[actix_web::test]
async fn checkout_returns_the_pending_payment() {
    let _ = env_logger::try_init().ok();
    let request = CheckoutRequest { order_id: "EPG-9001".to_string(), cart_id: 5 };
    let (status, body) = post_json("/checkout", &request, |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_create_checkout()
            .withf(|checkout| checkout.order_id.as_str() == "EPG-9001" && checkout.cart_id == 5)
            .returning(|_| Ok(payment_record(PaymentStatus::Pending)));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"Pending\""), "unexpected body: {body}");
    assert!(body.contains("EPG-9001"), "unexpected body: {body}");
}

#[actix_web::test]
async fn checkout_against_a_missing_cart_is_not_found() {
    let _ = env_logger::try_init().ok();
    let request = CheckoutRequest { order_id: "EPG-9002".to_string(), cart_id: 99 };
    let (status, _body) = post_json("/checkout", &request, |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_create_checkout().returning(|_| Err(RegistrationGatewayError::CartNotFound(99)));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn status_lookup_withholds_registration_numbers() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/status/EPG-9001", |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_fetch_payment_by_order_id()
            .returning(|_| Ok(Some(payment_record(PaymentStatus::Completed))));
        db.expect_fetch_registrations_for_payment().returning(|_| Ok(vec![registration(1), registration(2)]));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"Completed\""), "unexpected body: {body}");
    assert!(body.contains("display_code"), "unexpected body: {body}");
    assert!(!body.contains("registration_number"), "public status must not leak registration numbers: {body}");
}

#[actix_web::test]
async fn status_lookup_for_an_unknown_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let (status, _body) = get_request("/status/NOPE", |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_fetch_payment_by_order_id().returning(|_| Ok(None));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn return_path_shows_the_registrant_their_numbers() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/payhere/return?order_id=EPG-9001", |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_fetch_payment_by_order_id()
            .returning(|_| Ok(Some(payment_record(PaymentStatus::Completed))));
        // The snapshot holds two items, so a complete set is two registrations.
        db.expect_fetch_registrations_for_payment()
            .returning(|_| Ok(vec![registration(1), registration(2)]));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("registration_number"), "the registrant should see their number: {body}");
    assert!(body.contains("REG-ABCDEF123451"), "unexpected body: {body}");
    assert!(body.contains("REG-ABCDEF123452"), "unexpected body: {body}");
}

#[actix_web::test]
async fn return_path_settles_an_interrupted_materialization() {
    let _ = env_logger::try_init().ok();
    // A crash left the payment Completed with one of two registrations. The return path must
    // finish the job before answering.
    let (status, body) = get_request("/payhere/return?order_id=EPG-9001", |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_fetch_payment_by_order_id()
            .returning(|_| Ok(Some(payment_record(PaymentStatus::Completed))));
        db.expect_fetch_registrations_for_payment().returning(|_| Ok(vec![registration(1)]));
        db.expect_transition_payment()
            .returning(|_, _, _| Ok(TransitionResult { applied: false, payment: payment_record(PaymentStatus::Completed) }));
        db.expect_materialize_registrations().times(1).returning(|_| Ok(full_outcome(true)));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("REG-ABCDEF123451"), "unexpected body: {body}");
    assert!(body.contains("REG-ABCDEF123452"), "unexpected body: {body}");
}

#[actix_web::test]
async fn return_path_ignores_outcome_claims_in_the_url() {
    let _ = env_logger::try_init().ok();
    // A tampering client appends status fields to the return URL; only order_id may be read.
    let (status, body) = get_request("/payhere/return?order_id=EPG-9001&status_code=2&payhere_amount=1.00", |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_fetch_payment_by_order_id()
            .returning(|_| Ok(Some(payment_record(PaymentStatus::Failed))));
        db.expect_fetch_registrations_for_payment().returning(|_| Ok(Vec::new()));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"Failed\""), "the local record must win over URL claims: {body}");
}
