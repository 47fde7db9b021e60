//! Immutable, content-addressable records describing a compiled pipeline.
//!
//! Specs are the unit of identity for caching and change detection: two
//! compilations that produce field-for-field equal specs (and therefore equal
//! fingerprints) are behaviorally identical. Everything in here is plain
//! data with deterministic ordering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{ConfigMap, Hash32};
use crate::source::Source;

/// Spec version for pipelines authored in the current style.
pub const CURRENT_SPEC_VERSION: &str = "0.4";
/// Spec version pinned for pipelines authored in the deprecated class-based
/// style.
pub const LEGACY_SPEC_VERSION: &str = "0.3";

/// Where a step input comes from: a named output of an upstream invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub step_name: String,
    pub output_name: String,
}

/// The spec of a single step invocation.
///
/// Upstream steps are sorted so that ordering never produces spurious spec
/// differences between otherwise-identical compilations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub source: Source,
    pub upstream_steps: Vec<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputSpec>,
    /// The identifier of this invocation within its pipeline.
    pub pipeline_parameter_name: String,
}

impl StepSpec {
    pub fn fingerprint(&self) -> serde_json::Result<Hash32> {
        Hash32::hash_json(self)
    }
}

/// The spec of a whole pipeline: the ordered list of step specs plus the
/// pipeline's own identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ConfigMap>,
    pub steps: Vec<StepSpec>,
}

impl PipelineSpec {
    /// Spec for a pipeline authored in the current style.
    pub fn new(source: Source, parameters: ConfigMap, steps: Vec<StepSpec>) -> Self {
        Self {
            version: CURRENT_SPEC_VERSION.to_string(),
            source: Some(source),
            parameters: Some(parameters),
            steps,
        }
    }

    /// Spec for a pipeline authored in the deprecated class-based style.
    /// These carry only the pinned legacy version tag, no source reference.
    pub fn legacy(steps: Vec<StepSpec>) -> Self {
        Self {
            version: LEGACY_SPEC_VERSION.to_string(),
            source: None,
            parameters: None,
            steps,
        }
    }

    pub fn fingerprint(&self) -> serde_json::Result<Hash32> {
        Hash32::hash_json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_spec(id: &str, upstream: &[&str]) -> StepSpec {
        StepSpec {
            source: Source::new("project.steps", id),
            upstream_steps: upstream.iter().map(|s| s.to_string()).collect(),
            inputs: BTreeMap::new(),
            pipeline_parameter_name: id.to_string(),
        }
    }

    #[test]
    fn legacy_and_current_specs_differ_in_shape() {
        let steps = vec![step_spec("train", &[])];

        let legacy = PipelineSpec::legacy(steps.clone());
        assert_eq!(legacy.version, LEGACY_SPEC_VERSION);
        assert!(legacy.source.is_none());
        assert!(legacy.parameters.is_none());

        let current =
            PipelineSpec::new(Source::new("project", "pipe"), ConfigMap::new(), steps);
        assert_eq!(current.version, CURRENT_SPEC_VERSION);
        assert!(current.source.is_some());
    }

    #[test]
    fn equal_specs_have_equal_fingerprints() {
        let a = PipelineSpec::legacy(vec![step_spec("train", &["load"])]);
        let b = PipelineSpec::legacy(vec![step_spec("train", &["load"])]);

        assert_eq!(a, b);
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn upstream_order_changes_the_fingerprint() {
        let a = PipelineSpec::legacy(vec![step_spec("join", &["left", "right"])]);
        let b = PipelineSpec::legacy(vec![step_spec("join", &["right", "left"])]);

        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
