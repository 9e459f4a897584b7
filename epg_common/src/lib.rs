mod money;

pub mod op;
mod secret;

pub use money::{Cents, CentsConversionError, LKR_CURRENCY_CODE, LKR_CURRENCY_CODE_LOWER};
pub use secret::Secret;
