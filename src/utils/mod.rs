pub mod bounded;
pub mod error;

pub use bounded::call_bounded;
pub use error::{DecodeError, ErrorKind, KycError};
