//! The final compilation output handed to an external orchestrator.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{PipelineConfiguration, StepConfiguration};
use crate::spec::StepSpec;

/// A fully compiled step: its content-addressable spec plus the merged
/// configuration with every applicable layer already folded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub spec: StepSpec,
    pub config: StepConfiguration,
}

/// A fully resolved, self-contained deployment descriptor.
///
/// Downstream orchestrators execute this without any reference back into the
/// original pipeline object graph. Step configurations are keyed by
/// invocation id in execution-safe topological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDeployment {
    /// Run name with the `{date}` and `{time}` placeholders left for the
    /// dispatcher to resolve.
    pub run_name_template: String,
    pub pipeline_configuration: PipelineConfiguration,
    pub step_configurations: IndexMap<String, Step>,
    /// Descriptive snapshot of the client environment at compile time.
    pub client_environment: BTreeMap<String, String>,
}
