//! Startup configuration: simulation tunables, investment assumptions and the
//! role library, read from a single YAML document.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::{
    CompensationBand, ImpactMetric, InvestmentSettings, RoiEngine, RoiError, RoleLibrary,
    RoleProfile, SimulationSettings,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/parameters.yaml";
pub const CONFIG_PATH_ENV: &str = "TALENT_ROI_CONFIG";

/// The configuration shipped with the crate.
pub const BUNDLED_CONFIG: &str = include_str!("../config/parameters.yaml");

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoleDefinition {
    impact_metrics: BTreeMap<String, ImpactMetric>,
    compensation_bands: BTreeMap<String, CompensationBand>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub investment: InvestmentSettings,
    roles: BTreeMap<String, RoleDefinition>,
}

/// Explicit path wins, then `TALENT_ROI_CONFIG`, then the default location.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RoiError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| RoiError::ConfigurationLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&raw, &path.display().to_string())
    }

    pub fn from_yaml_str(raw: &str, origin: &str) -> Result<Self, RoiError> {
        let config: AppConfig = serde_yaml::from_str(raw).map_err(|e| RoiError::ConfigurationLoad {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        config.validate().map_err(|reason| RoiError::ConfigurationLoad {
            path: origin.to_string(),
            reason,
        })?;
        Ok(config)
    }

    pub fn role_library(&self) -> RoleLibrary {
        RoleLibrary::new(self.roles.iter().map(|(id, def)| {
            RoleProfile::new(
                id.clone(),
                def.impact_metrics.clone(),
                def.compensation_bands.clone(),
            )
        }))
    }

    pub fn into_engine(self) -> RoiEngine {
        let library = self.role_library();
        RoiEngine::new(library, self.simulation, self.investment)
    }

    fn validate(&self) -> Result<(), String> {
        let sim = &self.simulation;
        if sim.max_trials == 0 {
            return Err("simulation.max_trials must be > 0".to_string());
        }
        if sim.default_trials == 0 || sim.default_trials > sim.max_trials {
            return Err("simulation.default_trials must be between 1 and max_trials".to_string());
        }
        if !non_negative(sim.default_coefficient_of_variation) {
            return Err("simulation.default_coefficient_of_variation must be >= 0".to_string());
        }
        if !non_negative(sim.overhead_loading) {
            return Err("simulation.overhead_loading must be >= 0".to_string());
        }

        let inv = &self.investment;
        if !inv.discount_rate.is_finite() || inv.discount_rate <= -1.0 {
            return Err("investment.discount_rate must be > -1".to_string());
        }
        if inv.horizon_years == 0 {
            return Err("investment.horizon_years must be >= 1".to_string());
        }
        if !inv.ramp_up_fraction.is_finite() || inv.ramp_up_fraction <= 0.0 {
            return Err("investment.ramp_up_fraction must be > 0".to_string());
        }

        if self.roles.is_empty() {
            return Err("roles must define at least one role".to_string());
        }
        for (id, role) in &self.roles {
            if role.impact_metrics.is_empty() {
                return Err(format!("roles.{id}.impact_metrics must not be empty"));
            }
            for (name, metric) in &role.impact_metrics {
                if !metric.value.is_finite() {
                    return Err(format!("roles.{id}.impact_metrics.{name}.value must be finite"));
                }
                if !non_negative(metric.exposure) {
                    return Err(format!("roles.{id}.impact_metrics.{name}.exposure must be >= 0"));
                }
                if metric.uncertainty.is_some_and(|cv| !non_negative(cv)) {
                    return Err(format!(
                        "roles.{id}.impact_metrics.{name}.uncertainty must be >= 0"
                    ));
                }
            }
            for (level, band) in &role.compensation_bands {
                if !band.low.is_finite() || !band.high.is_finite() || band.low <= 0.0 {
                    return Err(format!("roles.{id}.compensation_bands.{level} must be positive"));
                }
                if band.high < band.low {
                    return Err(format!(
                        "roles.{id}.compensation_bands.{level} must be [low, high] with low <= high"
                    ));
                }
            }
            if !role.compensation_bands.contains_key(&sim.default_seniority) {
                return Err(format!(
                    "roles.{id}.compensation_bands is missing the default '{}' band",
                    sim.default_seniority
                ));
            }
        }

        Ok(())
    }
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
roles:
  sre:
    impact_metrics:
      toil_reduction: { value: 0.2, basis: payroll }
    compensation_bands:
      mid: [100000, 120000]
"#;

    fn reason(err: RoiError) -> String {
        match err {
            RoiError::ConfigurationLoad { reason, .. } => reason,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn bundled_config_loads_both_roles() {
        let config = AppConfig::from_yaml_str(BUNDLED_CONFIG, "bundled").expect("valid config");
        let library = config.role_library();
        assert_eq!(
            library.role_ids().collect::<Vec<_>>(),
            vec!["cloud_architect", "devops_engineer"]
        );
        let architect = library.lookup_role("cloud_architect").expect("present");
        assert_eq!(architect.impact_metrics.len(), 3);
        assert_eq!(architect.band("principal").expect("band").high, 220_000.0);
        assert_eq!(config.simulation.default_trials, 10_000);
        assert_eq!(config.investment.horizon_years, 3);
    }

    #[test]
    fn sections_default_when_omitted() {
        let config = AppConfig::from_yaml_str(MINIMAL, "inline").expect("valid config");
        assert_eq!(config.simulation, SimulationSettings::default());
        assert_eq!(config.investment, InvestmentSettings::default());
        let sre = config.role_library();
        let metric = &sre.lookup_role("sre").expect("present").impact_metrics["toil_reduction"];
        assert_eq!(metric.exposure, 1.0);
        assert_eq!(metric.uncertainty, None);
    }

    #[test]
    fn new_roles_need_no_code_change() {
        let yaml = format!(
            "{MINIMAL}  finops_analyst:\n    impact_metrics:\n      waste_cut: {{ value: 0.05, basis: cloud_spend }}\n    compensation_bands:\n      mid: [90000, 100000]\n"
        );
        let engine = AppConfig::from_yaml_str(&yaml, "inline")
            .expect("valid config")
            .into_engine();
        assert!(engine.lookup_role("finops_analyst").is_ok());
    }

    #[test]
    fn malformed_yaml_is_a_configuration_error() {
        let err = AppConfig::from_yaml_str("roles: [not, a, map", "broken.yaml").expect_err("malformed");
        assert_eq!(err.kind(), "configuration_load");
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let yaml = format!("{MINIMAL}simulation:\n  default_trails: 5\n");
        assert!(AppConfig::from_yaml_str(&yaml, "inline").is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let yaml = format!("{MINIMAL}investment:\n  discount_rate: -1.0\n");
        let err = AppConfig::from_yaml_str(&yaml, "inline").expect_err("bad rate");
        assert!(reason(err).contains("discount_rate"));

        let yaml = MINIMAL.replace("[100000, 120000]", "[120000, 100000]");
        let err = AppConfig::from_yaml_str(&yaml, "inline").expect_err("inverted band");
        assert!(reason(err).contains("low <= high"));

        let yaml = MINIMAL.replace("mid: [", "senior: [");
        let err = AppConfig::from_yaml_str(&yaml, "inline").expect_err("no default band");
        assert!(reason(err).contains("'mid'"));

        let yaml = format!("{MINIMAL}simulation:\n  default_trials: 0\n");
        let err = AppConfig::from_yaml_str(&yaml, "inline").expect_err("zero trials");
        assert!(reason(err).contains("default_trials"));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = AppConfig::load("does/not/exist.yaml").expect_err("missing file");
        assert_eq!(err.kind(), "configuration_load");
    }

    #[test]
    fn explicit_path_takes_precedence() {
        let path = resolve_config_path(Some(PathBuf::from("custom.yaml")));
        assert_eq!(path, PathBuf::from("custom.yaml"));
    }
}
