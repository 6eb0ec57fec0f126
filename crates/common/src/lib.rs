//! Types shared by the Aratiri admin console crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
