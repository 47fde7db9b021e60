//! Pipeline, step and run configuration shapes.
//!
//! Configurations are plain data; layering semantics live in the `*Update`
//! types applied through [`MergeMode`]. An unset `Option` in an update always
//! means "leave the existing value alone", never "clear it".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::ConfigMap;
use crate::merge::{self, MergeMode};
use crate::settings::Settings;
use crate::source::Source;

/// Configuration authored at the pipeline level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_artifact_metadata: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_artifact_visualization: Option<bool>,
    #[serde(default)]
    pub settings: BTreeMap<String, Settings>,
    #[serde(default)]
    pub extra: ConfigMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_hook_source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_hook_source: Option<Source>,
}

/// A partial pipeline configuration applied on top of an existing one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfigurationUpdate {
    pub enable_cache: Option<bool>,
    pub enable_artifact_metadata: Option<bool>,
    pub enable_artifact_visualization: Option<bool>,
    #[serde(default)]
    pub settings: BTreeMap<String, Settings>,
    #[serde(default)]
    pub extra: ConfigMap,
    pub failure_hook_source: Option<Source>,
    pub success_hook_source: Option<Source>,
}

impl PipelineConfiguration {
    pub fn apply(&mut self, update: PipelineConfigurationUpdate, mode: MergeMode) {
        if let Some(value) = update.enable_cache {
            self.enable_cache = Some(value);
        }
        if let Some(value) = update.enable_artifact_metadata {
            self.enable_artifact_metadata = Some(value);
        }
        if let Some(value) = update.enable_artifact_visualization {
            self.enable_artifact_visualization = Some(value);
        }
        if let Some(source) = update.failure_hook_source {
            self.failure_hook_source = Some(source);
        }
        if let Some(source) = update.success_hook_source {
            self.success_hook_source = Some(source);
        }
        merge::apply_settings(&mut self.settings, update.settings, mode);
        merge::apply_map(&mut self.extra, update.extra, mode);
    }
}

/// Configuration of a single step, authored on the step itself and later
/// enriched by the compiler with everything inherited from the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_artifact_metadata: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_artifact_visualization: Option<bool>,
    #[serde(default)]
    pub parameters: ConfigMap,
    #[serde(default)]
    pub settings: BTreeMap<String, Settings>,
    #[serde(default)]
    pub extra: ConfigMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_hook_source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_hook_source: Option<Source>,
    /// Name of the step operator this step must run on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_operator: Option<String>,
    /// Name of the experiment tracker this step logs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_tracker: Option<String>,
}

/// A partial step configuration, either authored as a run-level per-step
/// override or assembled internally by the compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepConfigurationUpdate {
    pub enable_cache: Option<bool>,
    pub enable_artifact_metadata: Option<bool>,
    pub enable_artifact_visualization: Option<bool>,
    #[serde(default)]
    pub parameters: ConfigMap,
    #[serde(default)]
    pub settings: BTreeMap<String, Settings>,
    #[serde(default)]
    pub extra: ConfigMap,
    pub failure_hook_source: Option<Source>,
    pub success_hook_source: Option<Source>,
    pub step_operator: Option<String>,
    pub experiment_tracker: Option<String>,
}

impl StepConfiguration {
    pub fn apply(&mut self, update: StepConfigurationUpdate, mode: MergeMode) {
        if let Some(value) = update.enable_cache {
            self.enable_cache = Some(value);
        }
        if let Some(value) = update.enable_artifact_metadata {
            self.enable_artifact_metadata = Some(value);
        }
        if let Some(value) = update.enable_artifact_visualization {
            self.enable_artifact_visualization = Some(value);
        }
        if let Some(source) = update.failure_hook_source {
            self.failure_hook_source = Some(source);
        }
        if let Some(source) = update.success_hook_source {
            self.success_hook_source = Some(source);
        }
        if let Some(name) = update.step_operator {
            self.step_operator = Some(name);
        }
        if let Some(name) = update.experiment_tracker {
            self.experiment_tracker = Some(name);
        }
        merge::apply_map(&mut self.parameters, update.parameters, mode);
        merge::apply_settings(&mut self.settings, update.settings, mode);
        merge::apply_map(&mut self.extra, update.extra, mode);
    }
}

/// The run-specific configuration overlay supplied at invocation time, e.g.
/// assembled from CLI flags, a config file or an API payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunConfiguration {
    /// Optional run name template. May only contain the `{date}` and `{time}`
    /// placeholders, resolved at dispatch time by the orchestrator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,
    pub enable_cache: Option<bool>,
    pub enable_artifact_metadata: Option<bool>,
    pub enable_artifact_visualization: Option<bool>,
    /// Per-step overrides, keyed by invocation id.
    #[serde(default)]
    pub steps: BTreeMap<String, StepConfigurationUpdate>,
    #[serde(default)]
    pub settings: BTreeMap<String, Settings>,
    #[serde(default)]
    pub extra: ConfigMap,
}
