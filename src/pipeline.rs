//! In-memory pipeline definitions: a named graph of step invocations plus
//! pipeline-level configuration.
//!
//! Definitions are constructed by the caller before compilation. The
//! compiler deep-copies them on entry, so a definition may be a long-lived,
//! process-wide object shared by many concurrent compilations.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{PipelineConfiguration, PipelineConfigurationUpdate, StepConfiguration};
use crate::core::ConfigMap;
use crate::error::ConfigurationError;
use crate::merge::MergeMode;
use crate::source::Source;

/// How the pipeline was authored. Kept as an explicit tag so spec building
/// can branch at the boundary instead of probing object shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum Authoring {
    /// The deprecated class-based definition style; pinned to the legacy
    /// spec version.
    Legacy,
    /// The current style, carrying a resolvable source reference and the
    /// pipeline's declared parameters.
    Source {
        source: Source,
        #[serde(default)]
        parameters: ConfigMap,
    },
}

/// A step definition: a resolvable source identifier plus configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub source: Source,
    #[serde(default)]
    pub config: StepConfiguration,
}

impl StepDefinition {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            config: StepConfiguration::default(),
        }
    }

    pub fn with_config(mut self, config: StepConfiguration) -> Self {
        self.config = config;
        self
    }
}

/// A named output of an upstream invocation wired into a step input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputArtifact {
    pub invocation_id: String,
    pub output_name: String,
}

impl InputArtifact {
    pub fn new(invocation_id: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            output_name: output_name.into(),
        }
    }
}

/// A node of the pipeline graph: one invocation of a step definition.
///
/// Every id in `upstream` must exist as an invocation of the same pipeline;
/// the compiler verifies this when it builds the step graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInvocation {
    pub id: String,
    pub step: StepDefinition,
    #[serde(default)]
    pub upstream: BTreeSet<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputArtifact>,
}

impl StepInvocation {
    pub fn new(id: impl Into<String>, step: StepDefinition) -> Self {
        Self {
            id: id.into(),
            step,
            upstream: BTreeSet::new(),
            inputs: BTreeMap::new(),
        }
    }

    /// Declares an explicit upstream dependency.
    pub fn after(mut self, upstream: impl Into<String>) -> Self {
        self.upstream.insert(upstream.into());
        self
    }

    /// Wires an input parameter to an upstream output. The upstream
    /// invocation is implicitly added to the dependency set.
    pub fn with_input(mut self, name: impl Into<String>, artifact: InputArtifact) -> Self {
        self.upstream.insert(artifact.invocation_id.clone());
        self.inputs.insert(name.into(), artifact);
        self
    }
}

/// A named graph of step invocations plus pipeline-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    pub authoring: Authoring,
    #[serde(default)]
    pub config: PipelineConfiguration,
    invocations: IndexMap<String, StepInvocation>,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>, authoring: Authoring) -> Self {
        Self {
            name: name.into(),
            authoring,
            config: PipelineConfiguration::default(),
            invocations: IndexMap::new(),
        }
    }

    /// Adds a step invocation. Invocation ids must be unique within the
    /// pipeline; the insertion order is preserved and breaks ties during
    /// topological layering.
    pub fn add_step(&mut self, invocation: StepInvocation) -> Result<(), ConfigurationError> {
        if self.invocations.contains_key(&invocation.id) {
            return Err(ConfigurationError::DuplicateInvocation {
                id: invocation.id.clone(),
            });
        }
        self.invocations.insert(invocation.id.clone(), invocation);
        Ok(())
    }

    pub fn invocations(&self) -> &IndexMap<String, StepInvocation> {
        &self.invocations
    }

    pub(crate) fn invocations_mut(&mut self) -> &mut IndexMap<String, StepInvocation> {
        &mut self.invocations
    }

    /// Applies a configuration update to the pipeline level.
    pub fn configure(&mut self, update: PipelineConfigurationUpdate, mode: MergeMode) {
        self.config.apply(update, mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_invocation_ids_are_rejected() {
        let mut pipeline = PipelineDefinition::new("p", Authoring::Legacy);
        let step = StepDefinition::new(Source::new("project.steps", "load"));

        pipeline.add_step(StepInvocation::new("load", step.clone())).unwrap();
        let err = pipeline
            .add_step(StepInvocation::new("load", step))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::DuplicateInvocation { id } if id == "load"
        ));
    }

    #[test]
    fn inputs_imply_upstream_dependencies() {
        let step = StepDefinition::new(Source::new("project.steps", "train"));
        let invocation = StepInvocation::new("train", step)
            .with_input("dataset", InputArtifact::new("load", "output"));

        assert!(invocation.upstream.contains("load"));
        assert_eq!(invocation.inputs["dataset"].output_name, "output");
    }
}
