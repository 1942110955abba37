//! Labeling configuration.
//!
//! Provides the knobs of the labeling pipeline together with a few presets
//! matching the training-data flavours in use.

use serde::{Deserialize, Serialize};

use crate::constants::GHOST_SHP;
use crate::error::LabelError;

/// Which group resolution policy to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    VetoChain,
    EarliestNonEmpty,
    AncestorFraction,
}

impl Default for PolicyKind {
    fn default() -> Self {
        PolicyKind::VetoChain
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "veto_chain" | "veto-chain" => Ok(PolicyKind::VetoChain),
            "earliest_non_empty" | "earliest-non-empty" => Ok(PolicyKind::EarliestNonEmpty),
            "ancestor_fraction" | "ancestor-fraction" => Ok(PolicyKind::AncestorFraction),
            other => Err(LabelError::InvalidConfig(format!("unknown policy '{}'", other))),
        }
    }
}

/// Labeling pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub policy: PolicyKind,

    // Voxel fraction a parent must own to take over a group (ancestor_fraction only)
    pub fraction_threshold: f64,

    // Replace cluster-carried semantics with the semantic tensor
    pub override_semantics: bool,

    // Semantic labels at or above this value are ghosts
    pub ghost_label: i32,

    // Fail if a reference voxel has no cluster voxel
    pub require_full_coverage: bool,

    // Neutrino column and neutrino-only output
    pub include_nu: bool,
    pub nu_only: bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::VetoChain,
            fraction_threshold: 0.5,
            override_semantics: true,
            ghost_label: GHOST_SHP,
            require_full_coverage: true,
            include_nu: false,
            nu_only: false,
        }
    }
}

impl LabelConfig {
    /// Group and interaction labels with the neutrino column.
    pub fn extended() -> Self {
        Self {
            include_nu: true,
            ..Self::default()
        }
    }

    /// Only voxels of the neutrino interaction are kept.
    pub fn neutrino() -> Self {
        Self {
            include_nu: true,
            nu_only: true,
            ..Self::default()
        }
    }

    /// Tolerates reference voxels the clusters do not cover.
    pub fn permissive() -> Self {
        Self {
            require_full_coverage: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), LabelError> {
        if !(self.fraction_threshold > 0.0 && self.fraction_threshold <= 1.0) {
            return Err(LabelError::InvalidConfig(format!(
                "fraction_threshold must lie in (0, 1], got {}",
                self.fraction_threshold
            )));
        }
        if self.ghost_label < 0 {
            return Err(LabelError::InvalidConfig(format!(
                "ghost_label must be non-negative, got {}",
                self.ghost_label
            )));
        }
        if self.nu_only && !self.include_nu {
            return Err(LabelError::InvalidConfig(
                "nu_only requires include_nu".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LabelConfig::default();
        assert_eq!(config.policy, PolicyKind::VetoChain);
        assert_eq!(config.ghost_label, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert!(LabelConfig::extended().include_nu);
        assert!(LabelConfig::neutrino().nu_only);
        assert!(!LabelConfig::permissive().require_full_coverage);
    }

    #[test]
    fn test_invalid_config() {
        let config = LabelConfig { fraction_threshold: 1.5, ..LabelConfig::default() };
        assert!(config.validate().is_err());

        let config = LabelConfig { nu_only: true, include_nu: false, ..LabelConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: LabelConfig = serde_json::from_str(r#"{"policy": "ancestor_fraction"}"#).unwrap();
        assert_eq!(config.policy, PolicyKind::AncestorFraction);
        assert!(config.override_semantics);
        assert_eq!("earliest-non-empty".parse::<PolicyKind>().unwrap(), PolicyKind::EarliestNonEmpty);
    }
}
