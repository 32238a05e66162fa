//! Analysis configuration
//!
//! Loaded from TOML, e.g.
//!
//! ```toml
//! unknown_index = "conservative"
//! report_unreachable = true
//! ```

use super::AnalysisError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What an index evaluator does with a scalar that has no known constant value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownIndexPolicy {
    /// Treat the scalar as 0
    #[default]
    AssumeZero,
    /// Treat the index as unknown; comparisons against it are undetermined
    Conservative,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub unknown_index: UnknownIndexPolicy,

    /// Emit an info diagnostic for every assignment the propagation never reaches
    pub report_unreachable: bool,
}

impl AnalysisConfig {
    pub fn conservative() -> Self {
        Self {
            unknown_index: UnknownIndexPolicy::Conservative,
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, AnalysisError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| AnalysisError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.unknown_index, UnknownIndexPolicy::AssumeZero);
        assert!(!config.report_unreachable);
    }

    #[test]
    fn test_parse_policy() {
        let config = AnalysisConfig::from_toml_str(
            "unknown_index = \"conservative\"\nreport_unreachable = true\n",
        )
        .unwrap();
        assert_eq!(config.unknown_index, UnknownIndexPolicy::Conservative);
        assert!(config.report_unreachable);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = AnalysisConfig::from_toml_str("unknown_indx = \"conservative\"").unwrap_err();
        assert!(matches!(err, AnalysisError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = AnalysisConfig::from_file("/nonexistent/flowcheck.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/flowcheck.toml"));
    }
}
