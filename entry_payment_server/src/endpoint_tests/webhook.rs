use actix_web::{http::StatusCode, web, web::ServiceConfig};
use entry_payment_engine::{
    db_types::{OrderId, PaymentStatus, TransitionResult},
    events::EventProducers,
    traits::RegistrationGatewayError,
    PaymentFlowApi,
};
use epg_common::{Cents, Secret};
use payhere_tools::{local_md5sig, IpnNotification, PayHereConfig};

use super::{
    helpers::post_form,
    mocks::{full_outcome, payment_record, MockRegistrationGatewayDb},
};
use crate::{config::ServerOptions, payhere_routes::PayhereWebhookRoute};

const TEST_MERCHANT_ID: &str = "1211149";
const TEST_SECRET: &str = "test_merchant_secret";

fn test_gateway_config() -> PayHereConfig {
    PayHereConfig {
        merchant_id: TEST_MERCHANT_ID.to_string(),
        merchant_secret: Secret::new(TEST_SECRET.to_string()),
        ..Default::default()
    }
}

fn signed_notification(order_id: &str, rupees: i64, status_code: i32) -> IpnNotification {
    let amount = Cents::from_rupees(rupees);
    let md5sig = local_md5sig(
        TEST_MERCHANT_ID,
        order_id,
        amount,
        "LKR",
        status_code,
        &Secret::new(TEST_SECRET.to_string()),
    );
    IpnNotification {
        merchant_id: TEST_MERCHANT_ID.to_string(),
        order_id: order_id.to_string(),
        payment_id: "320021101".to_string(),
        payhere_amount: amount.to_decimal_string(),
        payhere_currency: "LKR".to_string(),
        status_code,
        md5sig,
        status_message: None,
        method: Some("VISA".to_string()),
        card_holder_name: None,
        card_no: None,
        custom_1: None,
        custom_2: None,
    }
}

fn register_mock(cfg: &mut ServiceConfig, db: MockRegistrationGatewayDb) {
    let api = PaymentFlowApi::new(db, EventProducers::default());
    cfg.service(PayhereWebhookRoute::<MockRegistrationGatewayDb>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(test_gateway_config()))
        .app_data(web::Data::new(ServerOptions { webhook_deadline: std::time::Duration::from_secs(10) }));
}

#[actix_web::test]
async fn valid_success_notification_is_acked() {
    let _ = env_logger::try_init().ok();
    let notification = signed_notification("EPG-9001", 8000, 2);
    let (status, body) = post_form("/webhook/payhere", &notification, |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_transition_payment()
            .withf(|oid, target, fields| {
                oid == &OrderId::from("EPG-9001")
                    && *target == PaymentStatus::Completed
                    && fields.gateway_payment_id.as_deref() == Some("320021101")
            })
            .returning(|_, _, _| Ok(TransitionResult { applied: true, payment: payment_record(PaymentStatus::Completed) }));
        db.expect_materialize_registrations().returning(|_| Ok(full_outcome(true)));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"success\":true"), "unexpected body: {body}");
    assert!(body.contains("Completed"), "unexpected body: {body}");
}

#[actix_web::test]
async fn duplicate_delivery_is_acked_without_side_effects() {
    let _ = env_logger::try_init().ok();
    let notification = signed_notification("EPG-9001", 8000, 2);
    let (status, body) = post_form("/webhook/payhere", &notification, |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_transition_payment()
            .returning(|_, _, _| Ok(TransitionResult { applied: false, payment: payment_record(PaymentStatus::Completed) }));
        // Re-driving the materializer on a duplicate is the designed crash-recovery path; the
        // mock reports the set as already complete.
        db.expect_materialize_registrations().returning(|_| Ok(full_outcome(false)));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("already"), "unexpected body: {body}");
}

#[actix_web::test]
async fn tampered_signature_is_rejected_and_recorded() {
    let _ = env_logger::try_init().ok();
    let mut notification = signed_notification("EPG-9001", 8000, 2);
    notification.payhere_amount = "9000.00".to_string(); // md5sig no longer matches
    let (status, body) = post_form("/webhook/payhere", &notification, |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_transition_payment()
            .withf(|_, target, fields| {
                *target == PaymentStatus::Failed && fields.error_message.as_deref() == Some("Invalid signature")
            })
            .times(1)
            .returning(|_, _, _| Ok(TransitionResult { applied: true, payment: payment_record(PaymentStatus::Failed) }));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid gateway signature"), "unexpected body: {body}");
}

#[actix_web::test]
async fn foreign_merchant_id_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut notification = signed_notification("EPG-9001", 8000, 2);
    notification.merchant_id = "999999".to_string();
    let (status, _body) = post_form("/webhook/payhere", &notification, |cfg| {
        // No expectations: a notification for some other merchant must touch nothing.
        register_mock(cfg, MockRegistrationGatewayDb::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_order_is_not_silently_acked() {
    let _ = env_logger::try_init().ok();
    let notification = signed_notification("EPG-9001", 8000, 2);
    let (status, body) = post_form("/webhook/payhere", &notification, |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_transition_payment()
            .returning(|oid, _, _| Err(RegistrationGatewayError::OrderNotFound(oid.clone())));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("EPG-9001"), "unexpected body: {body}");
}

#[actix_web::test]
async fn persistence_failure_asks_the_gateway_to_retry() {
    let _ = env_logger::try_init().ok();
    let notification = signed_notification("EPG-9001", 8000, 2);
    let (status, _body) = post_form("/webhook/payhere", &notification, |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_transition_payment()
            .returning(|_, _, _| Err(RegistrationGatewayError::DatabaseError("database is locked".to_string())));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn pending_status_code_is_acked_without_a_transition() {
    let _ = env_logger::try_init().ok();
    let notification = signed_notification("EPG-9001", 8000, 0);
    let (status, body) = post_form("/webhook/payhere", &notification, |cfg| {
        // No expectations: a pending notification must not touch the state machine.
        register_mock(cfg, MockRegistrationGatewayDb::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("pending"), "unexpected body: {body}");
}

#[actix_web::test]
async fn cancellation_drives_the_cancelled_transition() {
    let _ = env_logger::try_init().ok();
    let notification = signed_notification("EPG-9001", 8000, -1);
    let (status, _body) = post_form("/webhook/payhere", &notification, |cfg| {
        let mut db = MockRegistrationGatewayDb::new();
        db.expect_transition_payment()
            .withf(|_, target, _| *target == PaymentStatus::Cancelled)
            .returning(|_, _, _| Ok(TransitionResult { applied: true, payment: payment_record(PaymentStatus::Cancelled) }));
        register_mock(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
}
