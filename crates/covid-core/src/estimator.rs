//! The estimator collaborator.
//!
//! [`Estimator`] is the seam the HTTP pipeline calls through: it maps one
//! decoded request body to one projection, both as JSON values.
//! [`CovidEstimator`] is the COVID-19 impact projection served by default.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Maps an input record to a projection record.
///
/// Implementations are synchronous and CPU-only.
pub trait Estimator: Send + Sync {
    fn estimate(&self, input: &Value) -> Result<Value, EstimateError>;
}

/// Errors raised by an estimator.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("invalid estimation input: {0}")]
    InvalidInput(#[from] serde_json::Error),

    #[error("timeToElapse must be positive, got {0}")]
    NonPositivePeriod(f64),

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("failed to build estimation output: {0}")]
    Output(String),
}

/// Unit of `timeToElapse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Days,
    Weeks,
    Months,
}

impl PeriodType {
    pub fn to_days(self, amount: f64) -> f64 {
        match self {
            Self::Days => amount,
            Self::Weeks => amount * 7.0,
            Self::Months => amount * 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub name: String,
    #[serde(deserialize_with = "number")]
    pub avg_age: f64,
    #[serde(rename = "avgDailyIncomeInUSD", deserialize_with = "number")]
    pub avg_daily_income_in_usd: f64,
    #[serde(deserialize_with = "number")]
    pub avg_daily_income_population: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationInput {
    pub region: Region,
    pub period_type: PeriodType,
    #[serde(deserialize_with = "number")]
    pub time_to_elapse: f64,
    #[serde(deserialize_with = "number")]
    pub reported_cases: f64,
    #[serde(deserialize_with = "number")]
    pub population: f64,
    #[serde(deserialize_with = "number")]
    pub total_hospital_beds: f64,
}

/// A JSON number, or a string holding a finite one (form bodies carry only
/// strings).
fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {text:?}"))),
    }
}

impl EstimationInput {
    fn validate(&self) -> Result<(), EstimateError> {
        if self.time_to_elapse <= 0.0 {
            return Err(EstimateError::NonPositivePeriod(self.time_to_elapse));
        }
        let counts = [
            ("reportedCases", self.reported_cases),
            ("population", self.population),
            ("totalHospitalBeds", self.total_hospital_beds),
        ];
        for (field, value) in counts {
            if value < 0.0 {
                return Err(EstimateError::Negative { field, value });
            }
        }
        Ok(())
    }

    pub fn days(&self) -> f64 {
        self.period_type.to_days(self.time_to_elapse)
    }
}

/// Projection for one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Impact {
    pub currently_infected: i64,
    pub infections_by_requested_time: i64,
    pub severe_cases_by_requested_time: i64,
    pub hospital_beds_by_requested_time: i64,
    #[serde(rename = "casesForICUByRequestedTime")]
    pub cases_for_icu_by_requested_time: i64,
    pub cases_for_ventilators_by_requested_time: i64,
    pub dollars_in_flight: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EstimationOutput<'a> {
    data: &'a Value,
    impact: Impact,
    severe_impact: Impact,
}

/// COVID-19 impact projection.
///
/// Each scenario scales reported cases by a fixed multiplier, then doubles
/// infections every three days until the requested time.
#[derive(Debug, Clone, Copy)]
pub struct CovidEstimator {
    impact_multiplier: f64,
    severe_multiplier: f64,
}

impl Default for CovidEstimator {
    fn default() -> Self {
        Self {
            impact_multiplier: 10.0,
            severe_multiplier: 50.0,
        }
    }
}

impl CovidEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project both scenarios for a typed input.
    pub fn project(&self, input: &EstimationInput) -> Result<(Impact, Impact), EstimateError> {
        input.validate()?;
        Ok((
            project_scenario(input, self.impact_multiplier),
            project_scenario(input, self.severe_multiplier),
        ))
    }
}

impl Estimator for CovidEstimator {
    fn estimate(&self, input: &Value) -> Result<Value, EstimateError> {
        let parsed = EstimationInput::deserialize(input)?;
        let (impact, severe_impact) = self.project(&parsed)?;
        serde_json::to_value(EstimationOutput {
            data: input,
            impact,
            severe_impact,
        })
        .map_err(|e| EstimateError::Output(e.to_string()))
    }
}

fn project_scenario(input: &EstimationInput, multiplier: f64) -> Impact {
    let days = input.days();
    let region = &input.region;

    let currently_infected = (input.reported_cases * multiplier).trunc();
    let doublings = (days / 3.0).trunc();
    let infections = (currently_infected * 2f64.powf(doublings)).trunc();
    let severe_cases = (0.15 * infections).trunc();
    let hospital_beds = (0.35 * input.total_hospital_beds - severe_cases).trunc();
    let icu = (0.05 * infections).trunc();
    let ventilators = (0.02 * infections).trunc();
    let dollars = (infections
        * region.avg_daily_income_population
        * region.avg_daily_income_in_usd
        / days)
        .trunc();

    // `as` saturates, which is what we want for runaway doublings.
    Impact {
        currently_infected: currently_infected as i64,
        infections_by_requested_time: infections as i64,
        severe_cases_by_requested_time: severe_cases as i64,
        hospital_beds_by_requested_time: hospital_beds as i64,
        cases_for_icu_by_requested_time: icu as i64,
        cases_for_ventilators_by_requested_time: ventilators as i64,
        dollars_in_flight: dollars as i64,
    }
}
