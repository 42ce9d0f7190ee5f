//! Base types and error handling.
//!
//! - [`NetError`]: every failure a remote call can produce, with stable codes
//! - [`context`]: the failure sentinel

pub mod context;
pub mod neterror;

pub use neterror::NetError;
