//! Engine configuration, loadable from TOML or JSON.
//!
//! Every key is optional:
//!
//! ```toml
//! reference_category = "PP"
//! default_deadweight = 50000
//! baseline_bound = "min"
//!
//! [curve]
//! kind = "expression"
//! expression = "a * dwt ^ (0 - c) * (1 - d) ^ (year - e) + b"
//! ```

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::baseline::BaselineBound;
use crate::curve::{ConfiguredCurve, ExpressionCurve, PowerLawCurve};
use crate::error::ConfigError;
use crate::models::{DEFAULT_DEADWEIGHT, POSEIDON_PRINCIPLES_CATEGORY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Reference category vessels are matched against.
    pub reference_category: String,
    /// Deadweight for vessels without one on record.
    pub default_deadweight: Decimal,
    pub baseline_bound: BaselineBound,
    pub curve: CurveSpec,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_category: POSEIDON_PRINCIPLES_CATEGORY.to_string(),
            default_deadweight: DEFAULT_DEADWEIGHT,
            baseline_bound: BaselineBound::Min,
            curve: CurveSpec::PowerLaw,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurveSpec {
    #[default]
    PowerLaw,
    Expression { expression: String },
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are read as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_toml_str(&source),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reference_category.trim().is_empty() {
            return Err(ConfigError::EmptyCategory);
        }
        if self.default_deadweight <= Decimal::ZERO {
            return Err(ConfigError::InvalidDefaultDeadweight(self.default_deadweight));
        }
        self.build_curve()?;
        Ok(())
    }

    pub fn build_curve(&self) -> Result<ConfiguredCurve, ConfigError> {
        Ok(match &self.curve {
            CurveSpec::PowerLaw => ConfiguredCurve::PowerLaw(PowerLawCurve),
            CurveSpec::Expression { expression } => {
                ConfiguredCurve::Expression(ExpressionCurve::parse(expression)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CurveError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.reference_category, "PP");
        assert_eq!(config.default_deadweight, dec!(50000));
        assert_eq!(config.baseline_bound, BaselineBound::Min);
        assert_eq!(config.curve, CurveSpec::PowerLaw);
    }

    #[test]
    fn test_full_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            reference_category = "EEDI"
            default_deadweight = 42000
            baseline_bound = "max"

            [curve]
            kind = "expression"
            expression = "a * dwt ^ (0 - c)"
            "#,
        )
        .unwrap();

        assert_eq!(config.reference_category, "EEDI");
        assert_eq!(config.default_deadweight, dec!(42000));
        assert_eq!(config.baseline_bound, BaselineBound::Max);
        assert!(matches!(
            config.build_curve().unwrap(),
            ConfiguredCurve::Expression(curve) if curve.source() == "a * dwt ^ (0 - c)"
        ));
    }

    #[test]
    fn test_json_config() {
        let config = EngineConfig::from_json_str(
            r#"{"baseline_bound": "max", "curve": {"kind": "power_law"}}"#,
        )
        .unwrap();
        assert_eq!(config.baseline_bound, BaselineBound::Max);
        assert_eq!(config.build_curve().unwrap(), ConfiguredCurve::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = EngineConfig::from_toml_str("reference_catgory = \"PP\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("reference_category = \" \""),
            Err(ConfigError::EmptyCategory)
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("default_deadweight = 0"),
            Err(ConfigError::InvalidDefaultDeadweight(_))
        ));
    }

    #[test]
    fn test_invalid_curve_expression_rejected() {
        let result = EngineConfig::from_toml_str(
            "[curve]\nkind = \"expression\"\nexpression = \"a * draft\"",
        );
        assert!(matches!(
            result,
            Err(ConfigError::Curve(CurveError::UnknownVariable(name))) if name == "draft"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("engine.toml");
        fs::write(&toml_path, "baseline_bound = \"max\"").unwrap();
        assert_eq!(
            EngineConfig::load(&toml_path).unwrap().baseline_bound,
            BaselineBound::Max
        );

        let json_path = dir.path().join("engine.json");
        fs::write(&json_path, r#"{"reference_category": "EEDI"}"#).unwrap();
        assert_eq!(
            EngineConfig::load(&json_path).unwrap().reference_category,
            "EEDI"
        );

        let missing = EngineConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
