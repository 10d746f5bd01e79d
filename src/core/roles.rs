use std::collections::BTreeMap;

use super::error::RoiError;
use super::types::{CompensationBand, ImpactMetric, RoleProfile};

/// Read-only table of role profiles, keyed by role identifier.
#[derive(Debug, Clone, Default)]
pub struct RoleLibrary {
    roles: BTreeMap<String, RoleProfile>,
}

impl RoleLibrary {
    pub fn new(roles: impl IntoIterator<Item = RoleProfile>) -> Self {
        Self {
            roles: roles
                .into_iter()
                .map(|profile| (profile.id.clone(), profile))
                .collect(),
        }
    }

    pub fn lookup_role(&self, id: &str) -> Result<&RoleProfile, RoiError> {
        self.roles.get(id).ok_or_else(|| RoiError::UnknownRole {
            role: id.to_string(),
        })
    }

    pub fn role_ids(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }
}

impl RoleProfile {
    pub fn new(
        id: impl Into<String>,
        impact_metrics: BTreeMap<String, ImpactMetric>,
        compensation_bands: BTreeMap<String, CompensationBand>,
    ) -> Self {
        Self {
            id: id.into(),
            impact_metrics,
            compensation_bands,
        }
    }

    pub fn band(&self, seniority: &str) -> Result<CompensationBand, RoiError> {
        self.compensation_bands
            .get(seniority)
            .copied()
            .ok_or_else(|| RoiError::UnknownSeniority {
                role: self.id.clone(),
                seniority: seniority.to_string(),
            })
    }
}
