use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What a metric's point estimate is a fraction (or multiple) of.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricBasis {
    /// Fraction of annual cloud spend (cost avoidance, efficiency).
    CloudSpend,
    /// Fraction of the team's fully-loaded cost (productivity gains).
    Payroll,
    /// Absolute currency amount per engineer.
    PerHead,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImpactMetric {
    pub value: f64,
    pub basis: MetricBasis,
    #[serde(default = "default_exposure")]
    pub exposure: f64,
    /// Coefficient of variation; falls back to the configured default.
    #[serde(default)]
    pub uncertainty: Option<f64>,
}

fn default_exposure() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct CompensationBand {
    pub low: f64,
    pub high: f64,
}

impl CompensationBand {
    pub fn midpoint(self) -> f64 {
        (self.low + self.high) * 0.5
    }
}

impl From<[f64; 2]> for CompensationBand {
    fn from([low, high]: [f64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<CompensationBand> for [f64; 2] {
    fn from(band: CompensationBand) -> Self {
        [band.low, band.high]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleProfile {
    pub id: String,
    pub impact_metrics: BTreeMap<String, ImpactMetric>,
    pub compensation_bands: BTreeMap<String, CompensationBand>,
}

/// Engine-wide tunables for the simulation, sourced from configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    pub default_trials: u32,
    pub max_trials: u32,
    pub default_seed: u64,
    pub default_coefficient_of_variation: f64,
    pub overhead_loading: f64,
    pub default_seniority: String,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            default_trials: 10_000,
            max_trials: 1_000_000,
            default_seed: 42,
            default_coefficient_of_variation: 0.25,
            overhead_loading: 0.30,
            default_seniority: "mid".to_string(),
        }
    }
}

/// Deterministic assumptions used to turn a simulated ROI into memo figures.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InvestmentSettings {
    pub discount_rate: f64,
    pub horizon_years: u32,
    pub ramp_up_fraction: f64,
}

impl Default for InvestmentSettings {
    fn default() -> Self {
        Self {
            discount_rate: 0.10,
            horizon_years: 3,
            ramp_up_fraction: 0.25,
        }
    }
}

/// A caller's request before defaults are applied and the role is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub role: String,
    pub team_size: u32,
    pub cloud_spend: f64,
    pub trials: Option<u32>,
    pub seed: Option<u64>,
    pub seniority: Option<String>,
}

/// Fully-resolved per-run inputs for [`crate::core::simulate`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInputs {
    pub team_size: u32,
    pub cloud_spend: f64,
    pub trials: u32,
    pub seed: u64,
    pub seniority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub role: String,
    pub team_size: u32,
    pub cloud_spend: f64,
    pub trials: u32,
    pub seed: u64,
    pub seniority: String,
    pub annual_cost: f64,
    pub mean_annual_value: f64,
    pub mean_roi: f64,
    pub std_dev_roi: f64,
    pub median_roi: f64,
    pub percentile_90: f64,
    pub percentile_95: f64,
    pub value_at_risk_95: f64,
    pub expected_shortfall_95: f64,
    pub risk_adjusted_return: Option<f64>,
}

/// A figure derived from a cash-flow schedule that may never materialise
/// within the modelled horizon. Serialized as a plain number, or as the
/// string `"not_reached"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HorizonFigure {
    Value(f64),
    Marker(HorizonMarker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizonMarker {
    #[serde(rename = "not_reached")]
    NotReached,
}

impl HorizonFigure {
    pub const NOT_REACHED: Self = HorizonFigure::Marker(HorizonMarker::NotReached);

    pub fn from_option(value: Option<f64>) -> Self {
        value.map_or(Self::NOT_REACHED, HorizonFigure::Value)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            HorizonFigure::Value(v) => Some(v),
            HorizonFigure::Marker(_) => None,
        }
    }
}

/// Flat record of the figures a memo prints. Every field is optional so that
/// partially-filled records from callers can be reported precisely. Keys are
/// camelCase on output; snake_case keys are accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InvestmentMemoInput {
    #[serde(alias = "analysis_id")]
    pub analysis_id: Option<String>,
    #[serde(alias = "as_of")]
    pub as_of: Option<String>,
    pub role: Option<String>,
    pub roi: Option<f64>,
    #[serde(alias = "payback_period_months", alias = "payback_period")]
    pub payback_period_months: Option<HorizonFigure>,
    pub npv: Option<f64>,
    pub irr: Option<HorizonFigure>,
    #[serde(alias = "annualized_return")]
    pub annualized_return: Option<HorizonFigure>,
    #[serde(rename = "var95", alias = "var_95")]
    pub var_95: Option<f64>,
    #[serde(alias = "expected_shortfall")]
    pub expected_shortfall: Option<f64>,
    #[serde(alias = "risk_adjusted_ratio", alias = "sharpe_ratio")]
    pub risk_adjusted_ratio: Option<f64>,
}
