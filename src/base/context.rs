//! Ergonomic error context helpers.
//!
//! Collapses a request result into the single failure sentinel older
//! callers expect.

use crate::base::neterror::NetError;
use crate::http::response::Payload;

/// Collapses a request result into an `Option`, where `None` is the uniform
/// failure sentinel.
///
/// The cause has already been logged where the failure was observed, so
/// callers that only care about "worked or not" can drop it here.
pub trait SentinelExt {
    fn into_sentinel(self) -> Option<Payload>;
}

impl SentinelExt for Result<Payload, NetError> {
    fn into_sentinel(self) -> Option<Payload> {
        match self {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::debug!(error = %e, code = e.as_i32(), "remote call collapsed to failure sentinel");
                None
            }
        }
    }
}
