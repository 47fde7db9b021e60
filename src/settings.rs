//! Typed settings and the configuration levels they may appear at.
//!
//! Settings are configuration objects keyed by a string: either a plain
//! generic key (e.g. `"resources"`) or a key addressing a stack component
//! (`"<kind>.<flavor>"`, e.g. `"orchestrator.kubeflow"`). Each settings
//! object declares the configuration levels it may legally be attached to.
//! Attaching settings at an undeclared level is a hard validation failure,
//! checked by the compiler via [`Settings::supports`].

use serde::{Deserialize, Serialize};

use crate::core::ConfigMap;

/// The level at which a settings object was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationLevel {
    Pipeline,
    Step,
}

impl std::fmt::Display for ConfigurationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationLevel::Pipeline => write!(f, "pipeline"),
            ConfigurationLevel::Step => write!(f, "step"),
        }
    }
}

/// A settings object tagged by the configuration levels it supports.
///
/// The capability set is part of the variant, not a runtime attribute probe:
/// [`Settings::Shared`] may appear at both levels, the other two variants are
/// restricted to one level each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "level", content = "values", rename_all = "snake_case")]
pub enum Settings {
    /// Applicable at both the pipeline and the step level.
    Shared(ConfigMap),
    /// Applicable at the pipeline level only.
    Pipeline(ConfigMap),
    /// Applicable at the step level only.
    Step(ConfigMap),
}

impl Settings {
    /// Whether these settings may be attached at the given level.
    pub fn supports(&self, level: ConfigurationLevel) -> bool {
        match self {
            Settings::Shared(_) => true,
            Settings::Pipeline(_) => level == ConfigurationLevel::Pipeline,
            Settings::Step(_) => level == ConfigurationLevel::Step,
        }
    }

    pub fn values(&self) -> &ConfigMap {
        match self {
            Settings::Shared(values) | Settings::Pipeline(values) | Settings::Step(values) => {
                values
            }
        }
    }

    pub fn into_values(self) -> ConfigMap {
        match self {
            Settings::Shared(values) | Settings::Pipeline(values) | Settings::Step(values) => {
                values
            }
        }
    }

    /// The same capability variant carrying a different payload.
    pub(crate) fn with_values(&self, values: ConfigMap) -> Self {
        match self {
            Settings::Shared(_) => Settings::Shared(values),
            Settings::Pipeline(_) => Settings::Pipeline(values),
            Settings::Step(_) => Settings::Step(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_sets() {
        let shared = Settings::Shared(ConfigMap::new());
        assert!(shared.supports(ConfigurationLevel::Pipeline));
        assert!(shared.supports(ConfigurationLevel::Step));

        let pipeline_only = Settings::Pipeline(ConfigMap::new());
        assert!(pipeline_only.supports(ConfigurationLevel::Pipeline));
        assert!(!pipeline_only.supports(ConfigurationLevel::Step));

        let step_only = Settings::Step(ConfigMap::new());
        assert!(!step_only.supports(ConfigurationLevel::Pipeline));
        assert!(step_only.supports(ConfigurationLevel::Step));
    }

    #[test]
    fn serialized_form_is_level_tagged() {
        let settings = Settings::Step([("cpu".to_string(), serde_json::json!(2))].into());

        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"level": "step", "values": {"cpu": 2}})
        );

        let back: Settings = serde_json::from_value(value).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn with_values_keeps_the_variant() {
        let mut values = ConfigMap::new();
        values.insert("cpu".into(), serde_json::json!(2));

        let settings = Settings::Step(ConfigMap::new()).with_values(values.clone());
        assert_eq!(settings, Settings::Step(values));
    }
}
