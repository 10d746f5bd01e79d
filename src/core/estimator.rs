use tracing::{Span, debug, info, warn};

use super::engine::{simulate, validate_inputs};
use super::error::RoiError;
use super::memo::render_memo;
use super::roles::RoleLibrary;
use super::types::{
    InvestmentMemoInput, InvestmentSettings, RoleProfile, SimulationInputs, SimulationRequest,
    SimulationResult, SimulationSettings,
};

/// Request-level entry point. Owns the role library and tunables, and logs
/// inside the span handed to it by the caller instead of any global context.
#[derive(Debug)]
pub struct RoiEngine {
    library: RoleLibrary,
    simulation: SimulationSettings,
    investment: InvestmentSettings,
    span: Span,
}

impl RoiEngine {
    pub fn new(
        library: RoleLibrary,
        simulation: SimulationSettings,
        investment: InvestmentSettings,
    ) -> Self {
        Self {
            library,
            simulation,
            investment,
            span: Span::none(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn roles(&self) -> &RoleLibrary {
        &self.library
    }

    pub fn simulation_settings(&self) -> &SimulationSettings {
        &self.simulation
    }

    pub fn investment_settings(&self) -> &InvestmentSettings {
        &self.investment
    }

    pub fn lookup_role(&self, id: &str) -> Result<&RoleProfile, RoiError> {
        self.library.lookup_role(id)
    }

    /// Applies defaults and runs every validation, without sampling anything.
    pub fn resolve(
        &self,
        request: &SimulationRequest,
    ) -> Result<(&RoleProfile, SimulationInputs), RoiError> {
        let role = self.library.lookup_role(&request.role)?;
        let inputs = SimulationInputs {
            team_size: request.team_size,
            cloud_spend: request.cloud_spend,
            trials: request.trials.unwrap_or(self.simulation.default_trials),
            seed: request.seed.unwrap_or(self.simulation.default_seed),
            seniority: request
                .seniority
                .clone()
                .unwrap_or_else(|| self.simulation.default_seniority.clone()),
        };
        validate_inputs(&inputs, &self.simulation)?;
        role.band(&inputs.seniority)?;
        Ok((role, inputs))
    }

    pub fn run(&self, request: &SimulationRequest) -> Result<SimulationResult, RoiError> {
        let _entered = self.span.enter();

        let (role, inputs) = self.resolve(request).inspect_err(|err| {
            warn!(role = %request.role, kind = err.kind(), "rejected simulation request: {err}");
        })?;

        info!(
            role = %role.id,
            team_size = inputs.team_size,
            cloud_spend = inputs.cloud_spend,
            trials = inputs.trials,
            seed = inputs.seed,
            seniority = %inputs.seniority,
            "running ROI simulation"
        );
        let result = simulate(role, &inputs, &self.simulation)?;
        info!(
            mean_roi = result.mean_roi,
            std_dev_roi = result.std_dev_roi,
            percentile_95 = result.percentile_95,
            "simulation complete"
        );
        Ok(result)
    }

    pub fn memo_input(
        &self,
        analysis_id: &str,
        as_of: &str,
        result: &SimulationResult,
    ) -> Result<InvestmentMemoInput, RoiError> {
        let _entered = self.span.enter();
        let input =
            InvestmentMemoInput::from_simulation(analysis_id, as_of, result, &self.investment)?;
        debug!(analysis_id, npv = ?input.npv, irr = ?input.irr, "derived memo figures");
        Ok(input)
    }

    pub fn render_memo(&self, input: &InvestmentMemoInput) -> Result<String, RoiError> {
        let _entered = self.span.enter();
        render_memo(input).inspect_err(|err| {
            warn!(kind = err.kind(), "memo rendering failed: {err}");
        })
    }
}
