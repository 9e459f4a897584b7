use chrono::Duration;
use entry_payment_engine::{
    db_types::{
        GatewayFields,
        Json,
        NewCheckout,
        OrderId,
        PaymentRecord,
        PaymentStatus,
        Registration,
        RegistrationStatus,
        TransitionResult,
    },
    traits::{MaterializationOutcome, MaterializedRegistration, RegistrationGatewayDatabase, RegistrationGatewayError},
};
use epg_common::Cents;
use mockall::mock;

mock! {
    pub RegistrationGatewayDb {}
    impl RegistrationGatewayDatabase for RegistrationGatewayDb {
        fn url(&self) -> &str;
        async fn create_checkout(&self, checkout: NewCheckout) -> Result<PaymentRecord, RegistrationGatewayError>;
        async fn fetch_payment_by_order_id(&self, order_id: &OrderId) -> Result<Option<PaymentRecord>, RegistrationGatewayError>;
        async fn transition_payment(
            &self,
            order_id: &OrderId,
            target: PaymentStatus,
            fields: GatewayFields,
        ) -> Result<TransitionResult, RegistrationGatewayError>;
        async fn materialize_registrations(&self, payment: &PaymentRecord) -> Result<MaterializationOutcome, RegistrationGatewayError>;
        async fn fetch_registrations_for_payment(&self, payment_id: i64) -> Result<Vec<Registration>, RegistrationGatewayError>;
        async fn expire_old_carts(&self, grace: Duration) -> Result<u64, RegistrationGatewayError>;
    }
}

/// A payment record in the given state, matching the notification fixtures in the tests.
pub fn payment_record(status: PaymentStatus) -> PaymentRecord {
    let now = chrono::Utc::now();
    PaymentRecord {
        id: 1,
        order_id: OrderId::from("EPG-9001"),
        cart_id: 5,
        item_ids: Json(vec![11, 12]),
        amount: Cents::from_rupees(8000),
        currency: "LKR".to_string(),
        status,
        merchant_id: Some("1211149".to_string()),
        gateway_payment_id: None,
        gateway_status_code: None,
        gateway_signature: None,
        payment_method: None,
        card_holder_name: None,
        raw_gateway_response: None,
        error_message: None,
        created_at: now,
        updated_at: now,
        completed_at: (status == PaymentStatus::Completed).then_some(now),
        refunded_at: None,
    }
}

pub fn registration(n: i64) -> Registration {
    let now = chrono::Utc::now();
    Registration {
        id: n,
        registration_number: format!("REG-ABCDEF12345{n}"),
        display_code: format!("CDE42{n}"),
        user_id: 42,
        competition_id: 1,
        competition_year: 2024,
        registration_type_id: 1,
        payment_id: 1,
        cart_item_id: 10 + n,
        amount_paid: Cents::from_rupees(4000),
        currency: "LKR".to_string(),
        status: RegistrationStatus::Confirmed,
        confirmed_at: now,
        created_at: now,
    }
}

pub fn full_outcome(newly_created: bool) -> MaterializationOutcome {
    let registrations = vec![
        MaterializedRegistration { registration: registration(1), contact: None },
        MaterializedRegistration { registration: registration(2), contact: None },
    ];
    MaterializationOutcome { registrations, newly_created }
}
