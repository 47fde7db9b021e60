#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod compiler;
mod config;
mod core;
mod deployment;
mod environment;
mod error;
#[cfg(feature = "logging")]
mod logging;
mod merge;
mod pipeline;
mod resolver;
mod settings;
mod source;
mod spec;
mod stack;
mod topology;

pub use crate::compiler::Compiler;
pub use crate::config::{
    PipelineConfiguration, PipelineConfigurationUpdate, PipelineRunConfiguration,
    StepConfiguration, StepConfigurationUpdate,
};
pub use crate::core::{ConfigMap, Hash32};
pub use crate::deployment::{PipelineDeployment, Step};
pub use crate::environment::client_environment;
pub use crate::error::*;
#[cfg(feature = "logging")]
pub use crate::logging::init_logging;
pub use crate::merge::MergeMode;
pub use crate::pipeline::{
    Authoring, InputArtifact, PipelineDefinition, StepDefinition, StepInvocation,
};
pub use crate::settings::{ConfigurationLevel, Settings};
pub use crate::source::Source;
pub use crate::spec::{
    CURRENT_SPEC_VERSION, InputSpec, LEGACY_SPEC_VERSION, PipelineSpec, StepSpec,
};
pub use crate::stack::{ComponentKind, SettingsSchema, Stack, StackComponent};
pub use crate::topology::StepGraph;
