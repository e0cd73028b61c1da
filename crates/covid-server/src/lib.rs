//! # covid-server
//!
//! HTTP front end for the covid-estimator service.
//!
//! Every estimation route runs the same pipeline (decode, estimate, encode)
//! with the response format chosen by the route. Around the handlers sit two
//! interceptors: [`middleware::timing_interceptor`] audits each request once
//! its response has been sent, and [`middleware::fault_interceptor`] turns
//! any failure into the one uniform 500.

pub mod config;
pub mod encoder;
pub mod error;
pub mod form;
pub mod middleware;
pub mod pipeline;
pub mod state;

pub use encoder::{Encoded, Format, XmlOptions};
pub use error::PipelineFault;
pub use state::AppState;

use axum::Router;
use axum::routing::{any, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let base = state.base_path().to_string();

    Router::new()
        .route("/", any(pipeline::readiness))
        .route(&base, post(pipeline::estimate_json))
        .route(&format!("{base}/"), post(pipeline::estimate_json))
        .route(&format!("{base}/json"), post(pipeline::estimate_json))
        .route(&format!("{base}/xml"), post(pipeline::estimate_xml))
        .route(&state.logs_path(), any(pipeline::audit_report))
        .layer(CatchPanicLayer::custom(middleware::panic_response))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::fault_interceptor,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::timing_interceptor,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
