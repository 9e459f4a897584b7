//! The two gateway-facing entry points.
//!
//! Both the webhook (PayHere pushing an IPN at us) and the return path (the user's browser coming
//! back from the gateway) end up driving the same engine flow,
//! [`PaymentFlowApi::process_gateway_outcome`]. The engine's conditional transition decides which
//! caller performs the side effects, so these handlers stay free of any ordering assumptions:
//! either path may arrive first, twice, or not at all.

use actix_web::{web, HttpResponse};
use entry_payment_engine::{
    db_types::{GatewayFields, OrderId, PaymentRecord, PaymentStatus, Registration},
    PaymentFlowApi,
    RegistrationGatewayDatabase,
    RegistrationGatewayError,
};
use log::*;
use payhere_tools::{IpnNotification, PayHereApi, PayHereApiError, PayHereConfig, PaymentOutcome, RetrievedPayment};
use tokio::time::timeout;

use crate::{
    config::ServerOptions,
    data_objects::{JsonResponse, ReconciledStatus, RegistrationSummary, ReturnParams},
    errors::ServerError,
    route,
};

/// Maps a gateway outcome onto the target state of the local state machine. `Pending` has no
/// target; the state machine only deals in terminal outcomes.
fn target_status(outcome: PaymentOutcome) -> Option<PaymentStatus> {
    match outcome {
        PaymentOutcome::Success => Some(PaymentStatus::Completed),
        PaymentOutcome::Failed => Some(PaymentStatus::Failed),
        PaymentOutcome::Canceled => Some(PaymentStatus::Cancelled),
        PaymentOutcome::Chargedback => Some(PaymentStatus::Refunded),
        PaymentOutcome::Pending => None,
    }
}

fn fields_from_notification(notification: &IpnNotification, raw: String) -> GatewayFields {
    GatewayFields {
        gateway_payment_id: Some(notification.payment_id.clone()),
        gateway_status_code: Some(notification.status_code),
        gateway_signature: Some(notification.md5sig.clone()),
        payment_method: notification.method.clone(),
        card_holder_name: notification.card_holder_name.clone(),
        raw_response: Some(raw),
        error_message: notification.status_message.clone().filter(|_| notification.status_code < 0),
    }
}

fn fields_from_retrieval(retrieved: &RetrievedPayment) -> GatewayFields {
    GatewayFields {
        gateway_payment_id: Some(retrieved.payment_id.to_string()),
        gateway_status_code: retrieved.outcome().map(|o| o.status_code()),
        payment_method: retrieved.method.clone(),
        raw_response: serde_json::to_string(retrieved).ok(),
        ..Default::default()
    }
}

//----------------------------------------------  Webhook  ----------------------------------------------------
route!(payhere_webhook => Post "/webhook/payhere" impl RegistrationGatewayDatabase);
/// The IPN endpoint.
///
/// Response codes are the retry protocol with the gateway:
/// * 200 — the notification has been durably recorded (including the duplicate case), stop
///   retrying;
/// * 400 — the notification is permanently unprocessable (bad signature, unknown status code),
///   stop retrying;
/// * 404 — the order is unknown locally, which is alert-worthy but not retryable;
/// * 500 — persistence is unavailable or the deadline elapsed, deliver again.
pub async fn payhere_webhook<B: RegistrationGatewayDatabase>(
    form: web::Form<IpnNotification>,
    api: web::Data<PaymentFlowApi<B>>,
    gateway: web::Data<PayHereConfig>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let notification = form.into_inner();
    let order_id = OrderId::from(notification.order_id.clone());
    trace!("💳️ IPN received for order [{order_id}], status code {}", notification.status_code);
    let raw = serde_json::to_string(&notification)
        .unwrap_or_else(|_| format!("order_id={order_id}&status_code={}", notification.status_code));

    if notification.merchant_id != gateway.merchant_id {
        warn!(
            "🔐️ IPN for order [{order_id}] names merchant {}, but we are {}. Rejecting.",
            notification.merchant_id, gateway.merchant_id
        );
        return Err(ServerError::InvalidSignature);
    }
    if !notification.verify_signature(&gateway.merchant_secret) {
        warn!("🔐️ IPN for order [{order_id}] failed signature verification. Payload retained for audit.");
        match api.record_signature_rejection(&order_id, &notification.md5sig, &raw).await {
            Ok(_) => {},
            Err(RegistrationGatewayError::OrderNotFound(_)) => {
                warn!("🔐️ The forged/corrupt IPN also referenced an unknown order [{order_id}].");
            },
            // If we cannot even record the rejection, let the gateway retry the delivery.
            Err(e) => return Err(e.into()),
        }
        return Err(ServerError::InvalidSignature);
    }

    let Some(outcome) = notification.outcome() else {
        warn!("💳️ IPN for order [{order_id}] carries unrecognized status code {}.", notification.status_code);
        return Err(ServerError::InvalidRequestBody(format!(
            "Unrecognized status code {}",
            notification.status_code
        )));
    };
    let Some(target) = target_status(outcome) else {
        debug!("💳️ IPN for order [{order_id}] reports the payment as still pending. Nothing to do.");
        return Ok(HttpResponse::Ok().json(JsonResponse::success("Payment is still pending.")));
    };

    let fields = fields_from_notification(&notification, raw);
    let result = timeout(options.webhook_deadline, api.process_gateway_outcome(&order_id, target, fields))
        .await
        .map_err(|_| {
            error!("💳️ IPN processing for order [{order_id}] exceeded the webhook deadline.");
            ServerError::BackendError("Webhook deadline exceeded".to_string())
        })??;

    let message = if result.applied {
        format!("Order {order_id} is now {}.", result.payment.status)
    } else {
        format!("Order {order_id} was already {}.", result.payment.status)
    };
    info!("💳️ {message}");
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

//----------------------------------------------   Return   ----------------------------------------------------
route!(payhere_return => Get "/payhere/return" impl RegistrationGatewayDatabase);
/// Where the paying user's browser lands after the gateway.
///
/// The browser brings only the order id; every payment-outcome claim a client could append to the
/// URL is ignored. If the local record is still pending — the IPN lost the race or never left the
/// gateway — the handler asks PayHere's retrieval API for the authoritative outcome and drives
/// the normal reconciliation flow with it. The user therefore sees a confirmation as soon as the
/// gateway knows one, and never an error merely because the webhook got there first.
pub async fn payhere_return<B: RegistrationGatewayDatabase>(
    query: web::Query<ReturnParams>,
    api: web::Data<PaymentFlowApi<B>>,
    gateway_api: web::Data<PayHereApi>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(query.into_inner().order_id);
    trace!("💳️ Browser returned from the gateway for order [{order_id}]");
    let payment = api
        .fetch_payment(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No payment record for order {order_id}")))?;

    let (payment, registrations) = match payment.status {
        PaymentStatus::Pending => reconcile_with_gateway(&order_id, payment, &api, &gateway_api).await?,
        PaymentStatus::Completed => {
            let registrations = api.registrations_for_order(&order_id).await?;
            if registrations.len() == payment.item_count() {
                (payment, registrations)
            } else {
                // A crash (or rolled-back race) left a completed payment short of its full
                // registration set; re-driving the flow settles it before the user sees it.
                info!("💳️ Order [{order_id}] is completed but not fully materialized. Settling now.");
                let result = api
                    .process_gateway_outcome(&order_id, PaymentStatus::Completed, GatewayFields::default())
                    .await?;
                (result.payment, result.registrations)
            }
        },
        _ => {
            let registrations = api.registrations_for_order(&order_id).await?;
            (payment, registrations)
        },
    };
    let summaries = registrations.iter().map(RegistrationSummary::private).collect();
    Ok(HttpResponse::Ok().json(ReconciledStatus::new(&payment, summaries)))
}

/// Resolves a still-pending payment by querying the gateway directly. Gateway unavailability is
/// not an error here: the payment simply stays pending and the status page tells the browser to
/// poll.
async fn reconcile_with_gateway<B: RegistrationGatewayDatabase>(
    order_id: &OrderId,
    payment: PaymentRecord,
    api: &PaymentFlowApi<B>,
    gateway_api: &PayHereApi,
) -> Result<(PaymentRecord, Vec<Registration>), ServerError> {
    let retrieved = match gateway_api.fetch_payment_for_order(order_id.as_str()).await {
        Ok(retrieved) => retrieved,
        Err(PayHereApiError::PaymentNotFound(_)) => {
            debug!("💳️ The gateway has no record of order [{order_id}] yet. Leaving it pending.");
            return Ok((payment, Vec::new()));
        },
        Err(e) => {
            warn!("💳️ Could not query the gateway for order [{order_id}]: {e}. Leaving it pending.");
            return Ok((payment, Vec::new()));
        },
    };
    let Some(target) = retrieved.outcome().and_then(target_status) else {
        debug!("💳️ The gateway still reports order [{order_id}] as pending.");
        return Ok((payment, Vec::new()));
    };
    info!("💳️ Return path is reconciling order [{order_id}] to {target} from the retrieval API.");
    let fields = fields_from_retrieval(&retrieved);
    let result = api.process_gateway_outcome(order_id, target, fields).await?;
    Ok((result.payment, result.registrations))
}
