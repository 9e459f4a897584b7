use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use entry_payment_engine::RegistrationGatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid gateway signature")]
    InvalidSignature,
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Conflicting record. {0}")]
    RecordConflict(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::RecordConflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

/// The HTTP mapping doubles as the retry protocol with the gateway: 4xx tells PayHere the
/// notification is permanently unprocessable (stop retrying), 5xx tells it to deliver again.
impl From<RegistrationGatewayError> for ServerError {
    fn from(e: RegistrationGatewayError) -> Self {
        match e {
            RegistrationGatewayError::OrderNotFound(oid) => {
                Self::NoRecordFound(format!("No payment record for order {oid}"))
            },
            RegistrationGatewayError::CartNotFound(id) => Self::NoRecordFound(format!("Cart {id} does not exist")),
            RegistrationGatewayError::PaymentAlreadyExists(oid) => {
                Self::RecordConflict(format!("An order with id {oid} already exists"))
            },
            RegistrationGatewayError::CartNotActive(_) | RegistrationGatewayError::EmptyCart(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            RegistrationGatewayError::DatabaseError(_)
            | RegistrationGatewayError::InvalidTargetStatus(_)
            | RegistrationGatewayError::SnapshotInconsistent(_)
            | RegistrationGatewayError::PaymentNotCompleted { .. }
            | RegistrationGatewayError::CodeGeneration(_) => Self::BackendError(e.to_string()),
        }
    }
}
