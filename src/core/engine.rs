use std::f64::consts::PI;

use rayon::prelude::*;

use super::error::RoiError;
use super::types::{
    MetricBasis, RoleProfile, SimulationInputs, SimulationResult, SimulationSettings,
};

#[derive(Debug, Clone, Copy)]
struct MetricSampler {
    mean: f64,
    std_dev: f64,
    scale: f64,
}

/// Everything a single trial needs, resolved once per run.
#[derive(Debug)]
struct TrialModel {
    annual_cost: f64,
    samplers: Vec<MetricSampler>,
}

impl TrialModel {
    fn build(
        role: &RoleProfile,
        inputs: &SimulationInputs,
        settings: &SimulationSettings,
    ) -> Result<Self, RoiError> {
        let band = role.band(&inputs.seniority)?;
        let annual_cost =
            fully_loaded_cost(band.midpoint(), inputs.team_size, settings.overhead_loading);

        let samplers = role
            .impact_metrics
            .values()
            .map(|metric| {
                let basis_amount = match metric.basis {
                    MetricBasis::CloudSpend => inputs.cloud_spend,
                    MetricBasis::Payroll => annual_cost,
                    MetricBasis::PerHead => inputs.team_size as f64,
                };
                let cv = metric
                    .uncertainty
                    .unwrap_or(settings.default_coefficient_of_variation);
                MetricSampler {
                    mean: metric.value,
                    std_dev: metric.value.abs() * cv,
                    scale: metric.exposure * basis_amount,
                }
            })
            .collect();

        Ok(Self {
            annual_cost,
            samplers,
        })
    }

    fn expected_value(&self) -> f64 {
        self.samplers.iter().map(|s| s.mean * s.scale).sum()
    }

    fn run_trial(&self, rng: &mut Rng) -> f64 {
        let value: f64 = self
            .samplers
            .iter()
            .map(|s| (s.mean + s.std_dev * rng.standard_normal()) * s.scale)
            .sum();
        (value - self.annual_cost) / self.annual_cost
    }
}

pub fn fully_loaded_cost(salary_midpoint: f64, team_size: u32, overhead_loading: f64) -> f64 {
    salary_midpoint * team_size as f64 * (1.0 + overhead_loading)
}

pub fn validate_inputs(
    inputs: &SimulationInputs,
    settings: &SimulationSettings,
) -> Result<(), RoiError> {
    if inputs.trials < 1 || inputs.trials > settings.max_trials {
        return Err(RoiError::InvalidTrialCount {
            value: inputs.trials,
            max: settings.max_trials,
        });
    }

    if inputs.team_size < 1 {
        return Err(RoiError::InvalidTeamSize {
            value: inputs.team_size,
        });
    }

    if !inputs.cloud_spend.is_finite() || inputs.cloud_spend < 0.0 {
        return Err(RoiError::InvalidSpend {
            value: inputs.cloud_spend,
        });
    }

    Ok(())
}

/// Runs `inputs.trials` independent ROI trials for `role` and aggregates them.
///
/// Every trial draws from its own RNG stream derived from `inputs.seed` and the
/// trial index, so the result is identical for a given seed no matter how rayon
/// schedules the work. Aggregation starts only after all trials are collected.
pub fn simulate(
    role: &RoleProfile,
    inputs: &SimulationInputs,
    settings: &SimulationSettings,
) -> Result<SimulationResult, RoiError> {
    validate_inputs(inputs, settings)?;
    let model = TrialModel::build(role, inputs, settings)?;

    let mut outcomes: Vec<f64> = (0..inputs.trials)
        .into_par_iter()
        .map(|trial| {
            let mut rng = Rng::new(derive_seed(inputs.seed, trial));
            model.run_trial(&mut rng)
        })
        .collect();

    let summary = summarize(&mut outcomes);

    Ok(SimulationResult {
        role: role.id.clone(),
        team_size: inputs.team_size,
        cloud_spend: inputs.cloud_spend,
        trials: inputs.trials,
        seed: inputs.seed,
        seniority: inputs.seniority.clone(),
        annual_cost: model.annual_cost,
        mean_annual_value: model.annual_cost * (1.0 + summary.mean),
        mean_roi: summary.mean,
        std_dev_roi: summary.std_dev,
        median_roi: summary.median,
        percentile_90: summary.p90,
        percentile_95: summary.p95,
        value_at_risk_95: summary.value_at_risk,
        expected_shortfall_95: summary.expected_shortfall,
        risk_adjusted_return: (summary.std_dev > 0.0).then(|| summary.mean / summary.std_dev),
    })
}

/// Closed-form mean ROI of the model, ignoring sampling noise.
pub fn expected_roi(
    role: &RoleProfile,
    inputs: &SimulationInputs,
    settings: &SimulationSettings,
) -> Result<f64, RoiError> {
    validate_inputs(inputs, settings)?;
    let model = TrialModel::build(role, inputs, settings)?;
    Ok((model.expected_value() - model.annual_cost) / model.annual_cost)
}

#[derive(Debug, Clone, Copy)]
struct OutcomeSummary {
    mean: f64,
    std_dev: f64,
    median: f64,
    p90: f64,
    p95: f64,
    value_at_risk: f64,
    expected_shortfall: f64,
}

fn summarize(outcomes: &mut [f64]) -> OutcomeSummary {
    let n = outcomes.len();
    let mut mean = outcomes.iter().sum::<f64>() / n as f64;

    let median = percentile(outcomes, 50.0);
    let p90 = percentile(outcomes, 90.0);
    let p95 = percentile(outcomes, 95.0);
    let p5 = percentile(outcomes, 5.0);

    // sorted by the percentile calls above
    let constant = outcomes.first() == outcomes.last();
    let std_dev = if n < 2 || constant {
        mean = outcomes[0];
        0.0
    } else {
        let ss: f64 = outcomes.iter().map(|x| (x - mean) * (x - mean)).sum();
        (ss / (n as f64 - 1.0)).sqrt()
    };

    let tail: Vec<f64> = outcomes.iter().copied().take_while(|x| *x <= p5).collect();
    let tail_mean = if tail.is_empty() {
        p5
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    };

    OutcomeSummary {
        mean,
        std_dev,
        median,
        p90,
        p95,
        value_at_risk: (-p5).max(0.0),
        expected_shortfall: (-tail_mean).max(0.0),
    }
}

fn derive_seed(base_seed: u64, trial: u32) -> u64 {
    let mixed = base_seed ^ (trial as u64).wrapping_mul(0xD1B5_4A32_D192_ED03);
    splitmix64(mixed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// xorshift64* stream with a cached Box-Muller pair.
struct Rng {
    state: u64,
    cached_normal: Option<f64>,
}

impl Rng {
    fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
        Self {
            state,
            cached_normal: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }

    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.cached_normal = Some(r * theta.sin());
        r * theta.cos()
    }
}

/// Order-statistic percentile with linear interpolation between ranks.
/// Sorts `values` in place.
pub fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}
