use thiserror::Error;

/// Every failure the estimator reports. Validation variants name the offending
/// field so callers can surface it without parsing the message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoiError {
    #[error("unknown role '{role}'")]
    UnknownRole { role: String },

    #[error("role '{role}' has no '{seniority}' compensation band")]
    UnknownSeniority { role: String, seniority: String },

    #[error("team_size must be >= 1 (got {value})")]
    InvalidTeamSize { value: u32 },

    #[error("cloud_spend must be a finite amount >= 0 (got {value})")]
    InvalidSpend { value: f64 },

    #[error("trials must be between 1 and {max} (got {value})")]
    InvalidTrialCount { value: u32, max: u32 },

    #[error("discount_rate must be finite and > -1 (got {value})")]
    InvalidRate { value: f64 },

    #[error("ROI distribution has zero standard deviation; {metric} is undefined")]
    DegenerateDistribution { metric: &'static str },

    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("failed to load configuration from {path}: {reason}")]
    ConfigurationLoad { path: String, reason: String },
}

impl RoiError {
    /// Name of the request or record field the error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            RoiError::UnknownRole { .. } => Some("role"),
            RoiError::UnknownSeniority { .. } => Some("seniority"),
            RoiError::InvalidTeamSize { .. } => Some("team_size"),
            RoiError::InvalidSpend { .. } => Some("cloud_spend"),
            RoiError::InvalidTrialCount { .. } => Some("trials"),
            RoiError::InvalidRate { .. } => Some("discount_rate"),
            RoiError::DegenerateDistribution { metric } => Some(metric),
            RoiError::MissingField { field } => Some(field),
            RoiError::ConfigurationLoad { .. } => None,
        }
    }

    /// Stable snake_case tag used in machine-readable error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            RoiError::UnknownRole { .. } => "unknown_role",
            RoiError::UnknownSeniority { .. } => "unknown_seniority",
            RoiError::InvalidTeamSize { .. } => "invalid_team_size",
            RoiError::InvalidSpend { .. } => "invalid_spend",
            RoiError::InvalidTrialCount { .. } => "invalid_trial_count",
            RoiError::InvalidRate { .. } => "invalid_rate",
            RoiError::DegenerateDistribution { .. } => "degenerate_distribution",
            RoiError::MissingField { .. } => "missing_field",
            RoiError::ConfigurationLoad { .. } => "configuration_load",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_name_their_field() {
        assert_eq!(RoiError::InvalidTeamSize { value: 0 }.field(), Some("team_size"));
        assert_eq!(
            RoiError::MissingField { field: "npv" }.field(),
            Some("npv")
        );
        assert_eq!(
            RoiError::UnknownRole {
                role: "x".to_string()
            }
            .field(),
            Some("role")
        );
    }

    #[test]
    fn unknown_role_is_distinct_from_numeric_errors() {
        let unknown = RoiError::UnknownRole {
            role: "nonexistent_role".to_string(),
        };
        let spend = RoiError::InvalidSpend { value: -1.0 };
        assert_ne!(unknown.kind(), spend.kind());
        assert!(unknown.to_string().contains("nonexistent_role"));
        assert!(spend.to_string().contains("cloud_spend"));
    }
}
