pub mod config;
pub mod connection;
pub mod error;
pub mod listener;
pub mod pending;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use error::{ConnectionError, TransportError, ValidationError};
