//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module
//! neat and tidy 🙏
//!
//! The gateway-facing handlers (webhook and return path) live in [`crate::payhere_routes`].

use actix_web::{get, web, HttpResponse, Responder};
use entry_payment_engine::{
    db_types::{NewCheckout, OrderId},
    PaymentFlowApi,
    RegistrationGatewayDatabase,
};
use log::*;

use crate::{
    data_objects::{CheckoutRequest, ReconciledStatus, RegistrationSummary},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!`
// macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Checkout  ----------------------------------------------------
route!(create_checkout => Post "/checkout" impl RegistrationGatewayDatabase);
/// Opens a checkout against an active cart.
///
/// The caller supplies the order id that will correlate every gateway notification with this
/// payment, and the id of the cart to snapshot. The cart items are frozen into the payment record
/// here; whatever happens to the cart afterwards (expiry, edits elsewhere in the forum) has no
/// effect on what a completed payment will materialize.
pub async fn create_checkout<B: RegistrationGatewayDatabase>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST checkout for order [{}] from cart #{}", request.order_id, request.cart_id);
    let order_id = OrderId::from(request.order_id);
    let payment = api.create_checkout(NewCheckout { order_id, cart_id: request.cart_id }).await?;
    Ok(HttpResponse::Ok().json(ReconciledStatus::new(&payment, Vec::new())))
}

//----------------------------------------------   Status   ----------------------------------------------------
route!(order_status => Get "/status/{order_id}" impl RegistrationGatewayDatabase);
/// The locally reconciled status of an order. Public: registration numbers are withheld, display
/// codes are included.
pub async fn order_status<B: RegistrationGatewayDatabase>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ GET status for order [{order_id}]");
    let payment = api
        .fetch_payment(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No payment record for order {order_id}")))?;
    let registrations = api.registrations_for_order(&order_id).await?;
    let summaries = registrations.iter().map(RegistrationSummary::public).collect();
    Ok(HttpResponse::Ok().json(ReconciledStatus::new(&payment, summaries)))
}
