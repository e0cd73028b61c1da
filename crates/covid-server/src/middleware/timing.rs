//! Timing interceptor.
//!
//! Times every request and, once its response body has been fully handed to
//! the connection, records an [`AuditRecord`] on a detached task. The client
//! never waits for the audit write.
//!
//! The response body is wrapped in a [`CompletionBody`] holding a one-shot
//! sender. Whichever terminal event comes first (end of stream, body error,
//! or drop) consumes the sender, so each response signals exactly once.

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use covid_audit::{AuditLogger, AuditRecord, AuditRecordBuilder, FaultEntry, FaultLog};
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use super::request_target;
use crate::state::AppState;

/// Terminal state of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The last frame was produced.
    Finished { elapsed: Duration, at: DateTime<Utc> },
    /// The body errored or was dropped early, e.g. on client disconnect.
    Aborted,
}

/// Response body that reports its own completion once.
#[derive(Debug)]
pub struct CompletionBody {
    inner: Body,
    started: Instant,
    signal: Option<oneshot::Sender<Completion>>,
}

impl CompletionBody {
    pub fn new(inner: Body, started: Instant, signal: oneshot::Sender<Completion>) -> Self {
        Self {
            inner,
            started,
            signal: Some(signal),
        }
    }

    fn complete(&mut self, finished: bool) {
        let Some(signal) = self.signal.take() else {
            return;
        };
        let completion = if finished {
            Completion::Finished {
                elapsed: self.started.elapsed(),
                at: Utc::now(),
            }
        } else {
            Completion::Aborted
        };
        // The receiver only goes away if the runtime is shutting down.
        let _ = signal.send(completion);
    }
}

impl HttpBody for CompletionBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) => self.complete(true),
            Poll::Ready(Some(Ok(_))) if self.inner.is_end_stream() => self.complete(true),
            Poll::Ready(Some(Err(_))) => self.complete(false),
            _ => {}
        }
        polled
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }
}

impl Drop for CompletionBody {
    fn drop(&mut self) {
        // Bodies the connection never had to poll (empty ones) end here.
        let finished = self.inner.is_end_stream();
        self.complete(finished);
    }
}

/// Middleware that times each request and audits it after the response.
pub async fn timing_interceptor(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.is_audited(request.uri().path()) {
        return next.run(request).await;
    }

    let started = Instant::now();
    let method = request.method().to_string();
    let target = request_target(&request);

    let response = next.run(request).await;
    let status = response.status().as_u16();

    let (signal, completion) = oneshot::channel();
    tokio::spawn(record_on_completion(
        state.audit.clone(),
        state.faults.clone(),
        completion,
        AuditRecord::builder(target).method(method).status_code(status),
    ));

    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(CompletionBody::new(body, started, signal)))
}

async fn record_on_completion(
    audit: Arc<AuditLogger>,
    faults: Arc<dyn FaultLog>,
    completion: oneshot::Receiver<Completion>,
    pending: AuditRecordBuilder,
) {
    let record = match completion.await {
        Ok(Completion::Finished { elapsed, at }) => pending.duration(elapsed).completed_at(at).build(),
        Ok(Completion::Aborted) | Err(_) => {
            tracing::debug!("Response did not complete; no audit record written");
            return;
        }
    };

    let method = record.method.clone().unwrap_or_default();
    let path = record.path.clone();
    if let Err(e) = audit.log(record).await {
        tracing::error!(error = %e, %path, "Failed to append audit record");
        let entry = FaultEntry::from_error("audit", &e).with_request(method, path);
        if let Err(e) = faults.append(entry).await {
            tracing::error!(error = %e, "Failed to write fault log");
        }
    }
}
