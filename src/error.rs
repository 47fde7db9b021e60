use thiserror::Error;

use crate::settings::ConfigurationLevel;

/// Structural errors in the step graph. Always fatal.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(
        "Step '{step}' declares upstream steps {missing:?} which do not exist. \
         Available steps in this pipeline: {available:?}."
    )]
    UnknownUpstream {
        step: String,
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Cycle detected in the step graph. Unprocessable steps: {remaining:?}.")]
    Cycle { remaining: Vec<String> },
}

/// Structurally invalid configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("No step with name '{step}' in pipeline '{pipeline}'. Available steps: {available:?}.")]
    UnknownStep {
        step: String,
        pipeline: String,
        available: Vec<String>,
    },

    #[error("A step invocation with id '{id}' already exists in this pipeline.")]
    DuplicateInvocation { id: String },

    #[error("Settings with key '{key}' can not be specified at the {level} level.")]
    UnsupportedLevel {
        key: String,
        level: ConfigurationLevel,
    },

    #[error(
        "Invalid run name '{run_name}': unknown placeholder '{{{placeholder}}}'. \
         Only the placeholders {{date}} and {{time}} are allowed in run names."
    )]
    InvalidRunNamePlaceholder {
        run_name: String,
        placeholder: String,
    },
}

/// A settings key addressed to a component that is not part of the current
/// stack. Recoverable: the compiler drops the settings and logs a notice.
#[derive(Debug, Error)]
pub enum SettingsResolutionError {
    #[error("the stack has no {kind} component to match settings key '{key}'")]
    MissingComponent { key: String, kind: &'static str },

    #[error(
        "settings key '{key}' targets flavor '{expected}', but the stack's \
         {kind} has flavor '{actual}'"
    )]
    FlavorMismatch {
        key: String,
        kind: &'static str,
        expected: String,
        actual: String,
    },

    #[error("settings key '{key}' does not name a known component kind")]
    UnknownKind { key: String },
}

/// A step requires an infrastructure component the stack does not provide.
/// Always fatal, and checked only after all overrides are merged.
#[derive(Debug, Error)]
pub enum StackValidationError {
    #[error(
        "Step '{step}' requires step operator '{requirement}' which is not \
         configured in the stack '{stack}'. Available step operators: {available:?}."
    )]
    MissingStepOperator {
        step: String,
        requirement: String,
        stack: String,
        available: Vec<String>,
    },

    #[error(
        "Step '{step}' requires experiment tracker '{requirement}' which is not \
         configured in the stack '{stack}'. Available experiment trackers: {available:?}."
    )]
    MissingExperimentTracker {
        step: String,
        requirement: String,
        stack: String,
        available: Vec<String>,
    },
}

/// Any fatal compilation failure.
///
/// The variants preserve the error class so callers can render distinct
/// messages for graph, configuration and infrastructure problems. No partial
/// deployment is ever produced alongside one of these.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    StackValidation(#[from] StackValidationError),
}
