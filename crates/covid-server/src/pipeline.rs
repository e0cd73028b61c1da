//! Route handlers.
//!
//! Each estimation route is the same pipeline with a different [`Format`]:
//! decode the body, run the estimator, encode the output. Any stage failing
//! short-circuits into a [`PipelineFault`].

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, header};
use serde_json::{Value, json};

use crate::encoder::{Encoded, Format, encode_records, encode_value};
use crate::error::PipelineFault;
use crate::form::{decode_form, is_form};
use crate::state::AppState;

pub async fn estimate_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Encoded, PipelineFault> {
    estimate(&state, content_type(&headers), &body?, Format::Json)
}

pub async fn estimate_xml(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Encoded, PipelineFault> {
    estimate(&state, content_type(&headers), &body?, Format::Xml)
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::CONTENT_TYPE)?.to_str().ok()
}

/// Decode a request body: form-encoded when the content type says so, JSON
/// otherwise.
pub fn decode_input(content_type: Option<&str>, body: &[u8]) -> Result<Value, PipelineFault> {
    if content_type.is_some_and(is_form) {
        return decode_form(body).map_err(PipelineFault::Form);
    }
    serde_json::from_slice(body).map_err(PipelineFault::Decode)
}

/// Decode, estimate, encode.
pub fn estimate(
    state: &AppState,
    content_type: Option<&str>,
    body: &[u8],
    format: Format,
) -> Result<Encoded, PipelineFault> {
    let input = decode_input(content_type, body)?;
    let output = state.estimator.estimate(&input)?;
    Ok(encode_value(&output, format, &state.xml)?)
}

/// Every audit record, one text line each, in store order.
pub async fn audit_report(State(state): State<AppState>) -> Result<Encoded, PipelineFault> {
    let records = state.audit.read_all().await?;
    Ok(encode_records(&records, Format::Text)?)
}

pub async fn readiness() -> Json<Value> {
    Json(json!({ "ok": true, "service": "covid-server" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use covid_audit::{AuditLogger, FileFaultLog};
    use covid_core::CovidEstimator;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(
            Arc::new(CovidEstimator::new()),
            Arc::new(AuditLogger::disabled()),
            Arc::new(FileFaultLog::new("unused-error-log.txt")),
        )
    }

    const INPUT: &str = r#"{
        "region": {"name": "Africa", "avgAge": 19.7, "avgDailyIncomeInUSD": 3, "avgDailyIncomePopulation": 1},
        "periodType": "days",
        "timeToElapse": 6,
        "reportedCases": 2,
        "population": 1000,
        "totalHospitalBeds": 100
    }"#;

    #[test]
    fn test_estimate_json_matches_estimator() {
        let state = state();
        let encoded = estimate(&state, None, INPUT.as_bytes(), Format::Json).unwrap();
        assert_eq!(encoded.content_type, "application/json");

        let direct = state
            .estimator
            .estimate(&serde_json::from_str(INPUT).unwrap())
            .unwrap();
        let body: Value = serde_json::from_slice(&encoded.body).unwrap();
        assert_eq!(body, direct);
    }

    #[test]
    fn test_estimate_stages_map_to_fault_kinds() {
        let state = state();

        let decode = estimate(&state, None, b"not json", Format::Json).unwrap_err();
        assert_eq!(decode.kind(), "decode");

        let estimation = estimate(&state, Some("application/json"), br#"{"reportedCases": 2}"#, Format::Xml).unwrap_err();
        assert_eq!(estimation.kind(), "estimation");
    }

    #[test]
    fn test_form_body_is_decoded_by_content_type() {
        let form = b"region[name]=Africa&region[avgAge]=19.7&region[avgDailyIncomeInUSD]=3\
            &region[avgDailyIncomePopulation]=1&periodType=days&timeToElapse=6\
            &reportedCases=2&population=1000&totalHospitalBeds=100";
        let state = state();

        let encoded = estimate(&state, Some("application/x-www-form-urlencoded"), form, Format::Json).unwrap();
        let body: Value = serde_json::from_slice(&encoded.body).unwrap();
        assert_eq!(body["impact"]["currentlyInfected"], 20);
        assert_eq!(body["data"]["region"]["name"], "Africa");

        // The same bytes are not JSON.
        let err = estimate(&state, None, form, Format::Json).unwrap_err();
        assert!(matches!(err, PipelineFault::Decode(_)));
    }
}
