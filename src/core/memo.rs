use super::error::RoiError;
use super::finance::{annualized_return, internal_rate_of_return, payback_period_months, present_value};
use super::types::{HorizonFigure, InvestmentMemoInput, InvestmentSettings, SimulationResult};

pub const FAVORABLE: &str = "favorable";
pub const FURTHER_ANALYSIS: &str = "requires further analysis";

const NOT_REACHED: &str = "n/a (not reached within horizon)";

/// Year-0 ramp-up outlay followed by `horizon_years` of mean net annual gain.
pub fn investment_cash_flows(result: &SimulationResult, settings: &InvestmentSettings) -> Vec<f64> {
    let net_annual_gain = result.mean_roi * result.annual_cost;
    let mut flows = Vec::with_capacity(settings.horizon_years as usize + 1);
    flows.push(-(result.annual_cost * settings.ramp_up_fraction));
    flows.extend(std::iter::repeat_n(net_annual_gain, settings.horizon_years as usize));
    flows
}

impl InvestmentMemoInput {
    /// Derives memo figures from a simulation plus deterministic investment
    /// assumptions. A schedule that never breaks even yields
    /// [`HorizonFigure::NOT_REACHED`] for IRR, payback and annualized return.
    pub fn from_simulation(
        analysis_id: impl Into<String>,
        as_of: impl Into<String>,
        result: &SimulationResult,
        settings: &InvestmentSettings,
    ) -> Result<Self, RoiError> {
        let risk_adjusted_ratio =
            result
                .risk_adjusted_return
                .ok_or(RoiError::DegenerateDistribution {
                    metric: "risk_adjusted_ratio",
                })?;

        let flows = investment_cash_flows(result, settings);
        let npv = present_value(&flows, settings.discount_rate)?;

        Ok(Self {
            analysis_id: Some(analysis_id.into()),
            as_of: Some(as_of.into()),
            role: Some(result.role.clone()),
            roi: Some(result.mean_roi),
            payback_period_months: Some(HorizonFigure::from_option(payback_period_months(&flows))),
            npv: Some(npv),
            irr: Some(HorizonFigure::from_option(internal_rate_of_return(&flows))),
            annualized_return: Some(HorizonFigure::from_option(annualized_return(&flows))),
            var_95: Some(result.value_at_risk_95 * result.annual_cost),
            expected_shortfall: Some(result.expected_shortfall_95),
            risk_adjusted_ratio: Some(risk_adjusted_ratio),
        })
    }

    pub fn recommendation(&self) -> Result<&'static str, RoiError> {
        let npv = required(self.npv, "npv")?;
        Ok(if npv > 0.0 { FAVORABLE } else { FURTHER_ANALYSIS })
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, RoiError> {
    value.ok_or(RoiError::MissingField { field })
}

fn required_str<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, RoiError> {
    value.as_deref().ok_or(RoiError::MissingField { field })
}

fn horizon_percent(figure: HorizonFigure) -> String {
    figure
        .value()
        .map_or_else(|| NOT_REACHED.to_string(), format_percent)
}

/// Renders the investment memorandum. Pure: identical input yields identical
/// bytes, and nothing is read from the clock or the locale.
pub fn render_memo(input: &InvestmentMemoInput) -> Result<String, RoiError> {
    let as_of = required_str(&input.as_of, "as_of")?;
    let analysis_id = required_str(&input.analysis_id, "analysis_id")?;
    let role = required_str(&input.role, "role")?;
    let roi = required(input.roi, "roi")?;
    let payback = required(input.payback_period_months, "payback_period_months")?;
    let npv = required(input.npv, "npv")?;
    let irr = required(input.irr, "irr")?;
    let annualized = required(input.annualized_return, "annualized_return")?;
    let var_95 = required(input.var_95, "var_95")?;
    let shortfall = required(input.expected_shortfall, "expected_shortfall")?;
    let ratio = required(input.risk_adjusted_ratio, "risk_adjusted_ratio")?;
    let recommendation = input.recommendation()?;

    let payback = match payback.value() {
        Some(months) => format!("a payback period of {} months", format_fixed(months, 1)),
        None => "no payback within the modelled horizon".to_string(),
    };

    Ok(format!(
        "CLOUD TALENT INVESTMENT MEMORANDUM
Date: {as_of}
Analysis ID: {analysis_id}

EXECUTIVE SUMMARY
-----------------
Investment in a {role} team models a mean annual ROI of {roi} with {payback}.

FINANCIAL ANALYSIS
------------------
- Net Present Value (NPV): {npv}
- Internal Rate of Return (IRR): {irr}
- Annualized Return: {annualized}

RISK ASSESSMENT
---------------
- Value at Risk (95% confidence): {var_95}
- Expected Shortfall (95%): {shortfall}
- Risk-Adjusted Performance: {ratio}

RECOMMENDATION
--------------
{recommendation}
",
        roi = format_percent(roi),
        npv = format_currency(npv),
        irr = horizon_percent(irr),
        annualized = horizon_percent(annualized),
        var_95 = format_currency(var_95),
        shortfall = format_percent(shortfall),
        ratio = format_fixed(ratio, 1),
        recommendation = recommendation.to_uppercase(),
    ))
}

/// Fixed-point rendering that never prints a negative zero.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let mut rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{rounded:.decimals$}")
}

pub fn format_percent(ratio: f64) -> String {
    format!("{}%", format_fixed(ratio * 100.0, 1))
}

/// `$1,234,567.89`; negatives as `-$1,234.00`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{fraction:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn sample_input() -> InvestmentMemoInput {
        InvestmentMemoInput {
            analysis_id: Some("CTIS-2024-08-23-001".to_string()),
            as_of: Some("2024-08-23".to_string()),
            role: Some("cloud_architect".to_string()),
            roi: Some(0.425),
            payback_period_months: Some(HorizonFigure::Value(8.2)),
            npv: Some(1_200_000.0),
            irr: Some(HorizonFigure::Value(0.42)),
            annualized_return: Some(HorizonFigure::Value(0.38)),
            var_95: Some(250_000.0),
            expected_shortfall: Some(0.12),
            risk_adjusted_ratio: Some(3.2),
        }
    }

    fn sample_result() -> SimulationResult {
        SimulationResult {
            role: "cloud_architect".to_string(),
            team_size: 3,
            cloud_spend: 2_000_000.0,
            trials: 10_000,
            seed: 42,
            seniority: "mid".to_string(),
            annual_cost: 400_000.0,
            mean_annual_value: 600_000.0,
            mean_roi: 0.5,
            std_dev_roi: 0.25,
            median_roi: 0.5,
            percentile_90: 0.82,
            percentile_95: 0.91,
            value_at_risk_95: 0.1,
            expected_shortfall_95: 0.2,
            risk_adjusted_return: Some(2.0),
        }
    }

    #[test]
    fn renders_full_memo() {
        let memo = render_memo(&sample_input()).expect("complete input");
        let expected = "\
CLOUD TALENT INVESTMENT MEMORANDUM
Date: 2024-08-23
Analysis ID: CTIS-2024-08-23-001

EXECUTIVE SUMMARY
-----------------
Investment in a cloud_architect team models a mean annual ROI of 42.5% with a payback period of 8.2 months.

FINANCIAL ANALYSIS
------------------
- Net Present Value (NPV): $1,200,000.00
- Internal Rate of Return (IRR): 42.0%
- Annualized Return: 38.0%

RISK ASSESSMENT
---------------
- Value at Risk (95% confidence): $250,000.00
- Expected Shortfall (95%): 12.0%
- Risk-Adjusted Performance: 3.2

RECOMMENDATION
--------------
FAVORABLE
";
        assert_eq!(memo, expected);
    }

    #[test]
    fn non_positive_npv_requires_further_analysis() {
        let mut input = sample_input();
        input.npv = Some(0.0);
        let memo = render_memo(&input).expect("complete input");
        assert!(memo.ends_with("REQUIRES FURTHER ANALYSIS\n"));
        assert_eq!(input.recommendation(), Ok(FURTHER_ANALYSIS));

        input.npv = Some(-5_000.0);
        assert!(render_memo(&input).expect("complete").contains("-$5,000.00"));
    }

    #[test]
    fn missing_npv_is_reported_by_name() {
        let mut input = sample_input();
        input.npv = None;
        let err = render_memo(&input).expect_err("npv missing");
        assert_eq!(err, RoiError::MissingField { field: "npv" });
    }

    #[test]
    fn json_record_with_original_keys_parses() {
        let input: InvestmentMemoInput = serde_json::from_str(
            r#"{"analysis_id":"A-1","as_of":"2024-01-01","role":"devops_engineer","roi":0.1,
                "payback_period":8.2,"npv":10.0,"irr":0.42,"annualized_return":0.38,
                "var_95":250000,"expected_shortfall":0.12,"sharpe_ratio":3.2}"#,
        )
        .expect("valid json");
        assert_eq!(input.payback_period_months, Some(HorizonFigure::Value(8.2)));
        assert_eq!(input.risk_adjusted_ratio, Some(3.2));
        assert!(render_memo(&input).is_ok());

        let partial: InvestmentMemoInput =
            serde_json::from_str(r#"{"analysis_id":"A-1"}"#).expect("valid json");
        assert_eq!(
            render_memo(&partial),
            Err(RoiError::MissingField { field: "as_of" })
        );
    }

    #[test]
    fn currency_formatting_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_currency(-0.001), "$0.00");
        assert_eq!(format_currency(-12.5), "-$12.50");
    }

    #[test]
    fn fixed_formatting_never_prints_negative_zero() {
        assert_eq!(format_fixed(-0.04, 1), "0.0");
        assert_eq!(format_percent(-0.0004), "0.0%");
        assert_eq!(format_percent(0.4251), "42.5%");
    }

    #[test]
    fn derives_memo_figures_from_simulation() {
        let settings = InvestmentSettings::default();
        let result = sample_result();
        let input = InvestmentMemoInput::from_simulation("A-7", "2026-01-02", &result, &settings)
            .expect("non-degenerate");

        // outlay 100k, then 200k a year for 3 years
        assert_eq!(
            investment_cash_flows(&result, &settings),
            vec![-100_000.0, 200_000.0, 200_000.0, 200_000.0]
        );
        let expected_npv = -100_000.0 + 200_000.0 / 1.1 + 200_000.0 / 1.21 + 200_000.0 / 1.331;
        assert!((input.npv.expect("npv") - expected_npv).abs() < 1e-6);
        let payback = input.payback_period_months.and_then(HorizonFigure::value);
        assert!((payback.expect("payback") - 6.0).abs() < 1e-9);
        assert!((input.var_95.expect("var") - 40_000.0).abs() < 1e-9);
        assert_eq!(input.expected_shortfall, Some(0.2));
        assert_eq!(input.risk_adjusted_ratio, Some(2.0));
        assert!(input.irr.and_then(HorizonFigure::value).expect("irr") > 1.0);
        assert!(render_memo(&input).expect("complete").contains("FAVORABLE"));
    }

    #[test]
    fn degenerate_distribution_blocks_memo_derivation() {
        let mut result = sample_result();
        result.std_dev_roi = 0.0;
        result.risk_adjusted_return = None;
        let err = InvestmentMemoInput::from_simulation(
            "A-7",
            "2026-01-02",
            &result,
            &InvestmentSettings::default(),
        )
        .expect_err("degenerate");
        assert_eq!(err.kind(), "degenerate_distribution");
    }

    #[test]
    fn loss_making_schedule_renders_unreached_figures() {
        let mut result = sample_result();
        result.mean_roi = -0.4;
        let input = InvestmentMemoInput::from_simulation(
            "A-8",
            "2026-01-02",
            &result,
            &InvestmentSettings::default(),
        )
        .expect("non-degenerate");

        assert_eq!(input.payback_period_months, Some(HorizonFigure::NOT_REACHED));
        assert_eq!(input.irr, Some(HorizonFigure::NOT_REACHED));
        assert_eq!(input.annualized_return, Some(HorizonFigure::NOT_REACHED));
        assert!(input.npv.expect("npv") < 0.0);

        let memo = render_memo(&input).expect("derived records are complete");
        assert!(memo.contains("with no payback within the modelled horizon."));
        assert!(memo.contains("- Internal Rate of Return (IRR): n/a (not reached within horizon)"));
        assert!(memo.ends_with("REQUIRES FURTHER ANALYSIS\n"));
    }

    #[test]
    fn unreached_figures_serialize_as_a_marker() {
        let mut input = sample_input();
        input.irr = Some(HorizonFigure::NOT_REACHED);
        let value = serde_json::to_value(&input).expect("serializable");
        assert_eq!(value["irr"], "not_reached");
        assert_eq!(value["paybackPeriodMonths"], 8.2);
        assert_eq!(value["analysisId"], "CTIS-2024-08-23-001");
        assert_eq!(value["var95"], 250_000.0);

        let parsed: InvestmentMemoInput = serde_json::from_value(value).expect("round trip");
        assert_eq!(parsed, input);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_render_is_pure(
            npv in -5_000_000i64..5_000_000,
            irr_bp in -5_000i32..20_000,
            ratio_bp in -500i32..1_000
        ) {
            let mut input = sample_input();
            input.npv = Some(npv as f64 + 0.25);
            input.irr = Some(HorizonFigure::Value(irr_bp as f64 / 10_000.0));
            input.risk_adjusted_ratio = Some(ratio_bp as f64 / 100.0);

            let a = render_memo(&input).expect("complete");
            let b = render_memo(&input.clone()).expect("complete");
            prop_assert_eq!(&a, &b);
            let favorable = a.ends_with("FAVORABLE\n") && !a.contains("FURTHER");
            prop_assert!(favorable == (npv as f64 + 0.25 > 0.0));
        }
    }
}
