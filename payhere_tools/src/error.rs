use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayHereApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not obtain an access token: {0}")]
    AuthorizationError(String),
    #[error("Invalid retrieval request: {0}")]
    RequestError(String),
    #[error("Invalid retrieval response: {0}")]
    ResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("No payment found for order {0}")]
    PaymentNotFound(String),
}
