mod engine;
mod error;
mod estimator;
mod finance;
mod memo;
mod roles;
mod types;

pub use engine::{expected_roi, fully_loaded_cost, percentile, simulate};
pub use error::RoiError;
pub use estimator::RoiEngine;
pub use finance::{annualized_return, internal_rate_of_return, payback_period_months, present_value};
pub use memo::{
    FAVORABLE, FURTHER_ANALYSIS, format_currency, format_percent, investment_cash_flows,
    render_memo,
};
pub use roles::RoleLibrary;
pub use types::{
    CompensationBand, HorizonFigure, HorizonMarker, ImpactMetric, InvestmentMemoInput,
    InvestmentSettings, MetricBasis, RoleProfile, SimulationInputs, SimulationRequest,
    SimulationResult, SimulationSettings,
};
