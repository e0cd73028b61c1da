//! Pipeline faults.
//!
//! Every handler failure is a [`PipelineFault`]. Turning one into a response
//! never exposes its detail to the client: the detail travels as a
//! [`FaultEntry`] response extension to the fault interceptor, which logs it
//! and sends the uniform failure response.

use axum::extract::rejection::BytesRejection;
use axum::response::{IntoResponse, Response};
use covid_audit::{AuditError, FaultEntry};
use covid_core::EstimateError;
use thiserror::Error;

use crate::encoder::EncodeError;
use crate::middleware::fault::faulted;

#[derive(Debug, Error)]
pub enum PipelineFault {
    #[error("failed to read request body")]
    ReadBody(#[from] BytesRejection),

    #[error("failed to decode request body")]
    Decode(#[source] serde_json::Error),

    #[error("failed to decode form body")]
    Form(#[source] serde_urlencoded::de::Error),

    #[error("estimation failed")]
    Estimation(#[from] EstimateError),

    #[error("failed to encode response")]
    Encode(#[from] EncodeError),

    #[error("failed to read audit log")]
    Store(#[from] AuditError),
}

impl PipelineFault {
    /// Fault class recorded in the fault log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReadBody(_) | Self::Decode(_) | Self::Form(_) => "decode",
            Self::Estimation(_) => "estimation",
            Self::Encode(_) => "encode",
            Self::Store(_) => "store",
        }
    }
}

impl IntoResponse for PipelineFault {
    fn into_response(self) -> Response {
        faulted(FaultEntry::from_error(self.kind(), &self))
    }
}
