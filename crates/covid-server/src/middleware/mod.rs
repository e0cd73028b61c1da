//! Request interceptors.
//!
//! Layer order, outermost first: timing, fault, panic catching, handlers.
//! Timing therefore observes the final status, including uniform failures.

pub mod fault;
pub mod timing;

pub use fault::{FAILURE_BODY, fault_interceptor, panic_response};
pub use timing::timing_interceptor;

use axum::extract::Request;

/// Route plus query string of a request, as received.
pub(crate) fn request_target(request: &Request) -> String {
    request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}
