pub mod axis;
pub mod config;
pub mod contact;
pub mod cover;
pub mod error;
pub mod glove;
pub mod report;
pub mod session;
pub mod sink;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{Error, Result};
