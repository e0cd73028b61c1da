//! Fault interceptor.
//!
//! A request is either answered normally or, once any stage has faulted,
//! with exactly one [`failure_response`]. Fault detail is written to the
//! fault log and never sent to the client.

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use covid_audit::FaultEntry;
use std::any::Any;

use super::request_target;
use crate::state::AppState;

/// Body of every failure response.
pub const FAILURE_BODY: &str = "Internal server error.";

/// The uniform client-visible failure.
pub fn failure_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        FAILURE_BODY,
    )
        .into_response()
}

/// A failure response carrying `entry` for the fault interceptor.
pub fn faulted(entry: FaultEntry) -> Response {
    let mut response = failure_response();
    response.extensions_mut().insert(entry);
    response
}

/// Convert a caught handler panic into a faulted response.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    faulted(FaultEntry::new("panic", message))
}

/// Record faulted responses and replace them with the uniform failure.
///
/// A fault log write failure is traced and swallowed; the client still gets
/// its 500.
pub async fn fault_interceptor(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let target = request_target(&request);

    let mut response = next.run(request).await;
    let Some(entry) = response.extensions_mut().remove::<FaultEntry>() else {
        return response;
    };

    let entry = entry.with_request(method, target);
    tracing::error!(
        fault_id = %entry.fault_id,
        kind = %entry.kind,
        method = entry.method.as_deref().unwrap_or("-"),
        path = entry.path.as_deref().unwrap_or("-"),
        message = %entry.message,
        "Request failed"
    );

    if let Err(e) = state.faults.append(entry).await {
        tracing::error!(error = %e, "Failed to write fault log");
    }

    failure_response()
}
