//! Compilation of pipeline definitions into serializable deployments.
//!
//! `Compiler::compile` is a pure, synchronous computation over the in-memory
//! pipeline graph: it deep-copies the definition, folds run configuration and
//! stack defaults into it, orders the invocations topologically, merges every
//! settings layer per step and emits a self-contained deployment plus a
//! content-addressable pipeline spec. Nothing the caller passed in is ever
//! mutated, and no partial output is produced on failure.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::{
    PipelineConfiguration, PipelineConfigurationUpdate, PipelineRunConfiguration,
    StepConfigurationUpdate,
};
use crate::deployment::{PipelineDeployment, Step};
use crate::environment;
use crate::error::{CompileError, ConfigurationError, GraphError, StackValidationError};
use crate::merge::MergeMode;
use crate::pipeline::{Authoring, PipelineDefinition, StepInvocation};
use crate::resolver::SettingsResolver;
use crate::settings::{ConfigurationLevel, Settings};
use crate::spec::{InputSpec, PipelineSpec, StepSpec};
use crate::stack::Stack;
use crate::topology::StepGraph;

/// Compiles pipeline definitions to serializable representations.
///
/// The compiler is stateless; a single instance may be shared freely between
/// concurrent compilations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Self
    }

    /// Compiles a pipeline for execution on a stack.
    ///
    /// Returns the deployment handed to the orchestrator together with the
    /// pipeline spec used for caching and change detection.
    pub fn compile(
        &self,
        pipeline: &PipelineDefinition,
        stack: &Stack,
        run_configuration: &PipelineRunConfiguration,
    ) -> Result<(PipelineDeployment, PipelineSpec), CompileError> {
        debug!("Compiling pipeline `{}`.", pipeline.name);

        // Work on an independent copy so run-level configuration never leaks
        // into the caller's pipeline or step objects.
        let mut pipeline = pipeline.clone();
        self.apply_run_configuration(&mut pipeline, run_configuration)?;
        self.apply_stack_default_settings(&mut pipeline, stack);
        if let Some(run_name) = &run_configuration.run_name {
            Self::verify_run_name(run_name)?;
        }

        let pipeline_settings = self.filter_and_validate_settings(
            &pipeline.config.settings,
            ConfigurationLevel::Pipeline,
            stack,
        )?;
        pipeline.config.settings = pipeline_settings;

        let settings_to_passdown: BTreeMap<String, Settings> = pipeline
            .config
            .settings
            .iter()
            .filter(|(_, settings)| settings.supports(ConfigurationLevel::Step))
            .map(|(key, settings)| (key.clone(), settings.clone()))
            .collect();

        let order = self.sorted_invocations(&pipeline)?;

        let mut steps: IndexMap<String, Step> = IndexMap::with_capacity(order.len());
        for name in order {
            let invocation = pipeline
                .invocations()
                .get(&name)
                .cloned()
                .expect("sorted invocation ids come from the pipeline's own invocation map");
            let compiled = self.compile_step_invocation(
                invocation,
                &settings_to_passdown,
                &pipeline.config,
                stack,
            )?;
            steps.insert(name, compiled);
        }

        Self::ensure_required_stack_components_exist(stack, &steps)?;

        let run_name = run_configuration
            .run_name
            .clone()
            .unwrap_or_else(|| Self::default_run_name(&pipeline.name));

        let step_specs = steps.values().map(|step| step.spec.clone()).collect();
        let deployment = PipelineDeployment {
            run_name_template: run_name,
            pipeline_configuration: pipeline.config.clone(),
            step_configurations: steps,
            client_environment: environment::client_environment(),
        };
        let pipeline_spec = Self::compute_pipeline_spec(&pipeline, step_specs);

        debug!(
            "Compiled pipeline `{}` into {} steps.",
            pipeline.name,
            deployment.step_configurations.len()
        );

        Ok((deployment, pipeline_spec))
    }

    /// Compiles only the pipeline spec, skipping stack binding and settings
    /// resolution entirely.
    ///
    /// Use this when a content-addressable identity for the pipeline graph is
    /// needed (e.g. client-side diffing) without full infrastructure
    /// validation.
    pub fn compile_spec(
        &self,
        pipeline: &PipelineDefinition,
    ) -> Result<PipelineSpec, CompileError> {
        debug!("Compiling pipeline spec for pipeline `{}`.", pipeline.name);
        let pipeline = pipeline.clone();

        let order = self.sorted_invocations(&pipeline)?;
        let step_specs = order
            .iter()
            .map(|name| {
                let invocation = pipeline
                    .invocations()
                    .get(name)
                    .expect("sorted invocation ids come from the pipeline's own invocation map");
                Self::step_spec(invocation)
            })
            .collect();

        Ok(Self::compute_pipeline_spec(&pipeline, step_specs))
    }

    /// Applies the run configuration to the pipeline and its steps.
    fn apply_run_configuration(
        &self,
        pipeline: &mut PipelineDefinition,
        config: &PipelineRunConfiguration,
    ) -> Result<(), ConfigurationError> {
        pipeline.configure(
            PipelineConfigurationUpdate {
                enable_cache: config.enable_cache,
                enable_artifact_metadata: config.enable_artifact_metadata,
                enable_artifact_visualization: config.enable_artifact_visualization,
                settings: config.settings.clone(),
                extra: config.extra.clone(),
                failure_hook_source: None,
                success_hook_source: None,
            },
            MergeMode::Replace,
        );

        for step_name in config.steps.keys() {
            if !pipeline.invocations().contains_key(step_name) {
                let mut available: Vec<String> =
                    pipeline.invocations().keys().cloned().collect();
                available.sort();
                return Err(ConfigurationError::UnknownStep {
                    step: step_name.clone(),
                    pipeline: pipeline.name.clone(),
                    available,
                });
            }
        }
        for (step_name, update) in &config.steps {
            if let Some(invocation) = pipeline.invocations_mut().get_mut(step_name) {
                invocation
                    .step
                    .config
                    .apply(update.clone(), MergeMode::Replace);
            }
        }

        // Run-level values for these three flags win unconditionally, even
        // over step-local configuration.
        for invocation in pipeline.invocations_mut().values_mut() {
            let step = &mut invocation.step.config;
            if let Some(value) = config.enable_cache {
                step.enable_cache = Some(value);
            }
            if let Some(value) = config.enable_artifact_metadata {
                step.enable_artifact_metadata = Some(value);
            }
            if let Some(value) = config.enable_artifact_visualization {
                step.enable_artifact_visualization = Some(value);
            }
        }

        Ok(())
    }

    /// Merges stack component default settings under the pipeline settings.
    /// Authored pipeline settings win field by field over the defaults.
    fn apply_stack_default_settings(&self, pipeline: &mut PipelineDefinition, stack: &Stack) {
        for component in stack.components() {
            let Some(defaults) = component.default_settings() else {
                continue;
            };
            let key = component.settings_key();
            let settings = &mut pipeline.config.settings;

            // Authored settings may address the component by its bare kind
            // or by the fully qualified key. Both win over the defaults, the
            // qualified form over the bare one.
            let mut combined = defaults;
            if let Some(authored) = settings.remove(component.kind.as_str()) {
                combined = crate::merge::combine_setting(combined, authored);
            }
            if let Some(authored) = settings.remove(&key) {
                combined = crate::merge::combine_setting(combined, authored);
            }
            settings.insert(key, combined);
        }
    }

    /// Resolves every settings key against the stack and checks the level
    /// capability.
    ///
    /// Settings addressed to a component absent from the stack are dropped
    /// with a notice; settings attached at an unsupported level abort
    /// compilation.
    fn filter_and_validate_settings(
        &self,
        settings: &BTreeMap<String, Settings>,
        level: ConfigurationLevel,
        stack: &Stack,
    ) -> Result<BTreeMap<String, Settings>, ConfigurationError> {
        let mut validated = BTreeMap::new();

        for (key, instance) in settings {
            let resolved = match SettingsResolver::new(key).resolve(stack) {
                Ok(resolved) => resolved,
                Err(err) => {
                    info!("Not including settings with key `{key}`: {err}.");
                    continue;
                }
            };

            if !instance.supports(level) {
                return Err(ConfigurationError::UnsupportedLevel {
                    key: key.clone(),
                    level,
                });
            }
            // A bare-kind key and its qualified form canonicalize to the
            // same resolved key. Combine instead of overwriting; the
            // qualified entry iterates later and wins field by field.
            match validated.remove(&resolved) {
                Some(existing) => {
                    validated.insert(
                        resolved,
                        crate::merge::combine_setting(existing, instance.clone()),
                    );
                }
                None => {
                    validated.insert(resolved, instance.clone());
                }
            }
        }

        Ok(validated)
    }

    /// Compiles a single step invocation by folding the pipeline-level
    /// pass-down configuration under the step's own.
    fn compile_step_invocation(
        &self,
        mut invocation: StepInvocation,
        settings_to_passdown: &BTreeMap<String, Settings>,
        pipeline_config: &PipelineConfiguration,
        stack: &Stack,
    ) -> Result<Step, CompileError> {
        let spec = Self::step_spec(&invocation);

        let config = &mut invocation.step.config;
        let step_settings = self.filter_and_validate_settings(
            &config.settings,
            ConfigurationLevel::Step,
            stack,
        )?;
        let step_extra = std::mem::take(&mut config.extra);
        let step_failure = config.failure_hook_source.take();
        let step_success = config.success_hook_source.take();

        // The step first inherits everything the pipeline passes down...
        config.settings = settings_to_passdown.clone();
        config.extra = pipeline_config.extra.clone();
        config.failure_hook_source = pipeline_config.failure_hook_source.clone();
        config.success_hook_source = pipeline_config.success_hook_source.clone();

        // ...then its own authored configuration wins field by field.
        config.apply(
            StepConfigurationUpdate {
                settings: step_settings,
                extra: step_extra,
                failure_hook_source: step_failure,
                success_hook_source: step_success,
                ..Default::default()
            },
            MergeMode::Combine,
        );

        Ok(Step {
            spec,
            config: invocation.step.config,
        })
    }

    /// The spec of a single invocation, with upstream steps in sorted order.
    fn step_spec(invocation: &StepInvocation) -> StepSpec {
        let inputs = invocation
            .inputs
            .iter()
            .map(|(name, artifact)| {
                (
                    name.clone(),
                    InputSpec {
                        step_name: artifact.invocation_id.clone(),
                        output_name: artifact.output_name.clone(),
                    },
                )
            })
            .collect();

        StepSpec {
            source: invocation.step.source.clone(),
            // BTreeSet iteration is already sorted.
            upstream_steps: invocation.upstream.iter().cloned().collect(),
            inputs,
            pipeline_parameter_name: invocation.id.clone(),
        }
    }

    fn verify_run_name(run_name: &str) -> Result<(), ConfigurationError> {
        const ALLOWED: [&str; 2] = ["date", "time"];

        let mut rest = run_name;
        while let Some(start) = rest.find('{') {
            let tail = &rest[start + 1..];
            // An unterminated `{` is malformed, not a literal brace.
            let Some(end) = tail.find('}') else {
                return Err(ConfigurationError::InvalidRunNamePlaceholder {
                    run_name: run_name.to_string(),
                    placeholder: tail.to_string(),
                });
            };
            let placeholder = &tail[..end];
            if !ALLOWED.contains(&placeholder) {
                return Err(ConfigurationError::InvalidRunNamePlaceholder {
                    run_name: run_name.to_string(),
                    placeholder: placeholder.to_string(),
                });
            }
            rest = &tail[end + 1..];
        }

        Ok(())
    }

    /// Default run name, resolved against actual date and time at dispatch
    /// time by the orchestrator.
    fn default_run_name(pipeline_name: &str) -> String {
        format!("{pipeline_name}-{{date}}-{{time}}")
    }

    fn sorted_invocations(&self, pipeline: &PipelineDefinition) -> Result<Vec<String>, GraphError> {
        let graph = StepGraph::new(pipeline.invocations().iter().map(|(id, invocation)| {
            (
                id.clone(),
                invocation.upstream.iter().cloned().collect::<Vec<_>>(),
            )
        }))?;
        graph.sorted()
    }

    /// Checks that every requirement named by a merged step configuration is
    /// satisfied by the stack. Runs after per-step merging so run-level
    /// overrides are taken into account.
    fn ensure_required_stack_components_exist(
        stack: &Stack,
        steps: &IndexMap<String, Step>,
    ) -> Result<(), StackValidationError> {
        let available_step_operators: Vec<String> = stack
            .step_operator()
            .map(|component| component.name.clone())
            .into_iter()
            .collect();
        let available_experiment_trackers: Vec<String> = stack
            .experiment_tracker()
            .map(|component| component.name.clone())
            .into_iter()
            .collect();

        for (name, step) in steps {
            if let Some(requirement) = &step.config.step_operator {
                if !available_step_operators.contains(requirement) {
                    return Err(StackValidationError::MissingStepOperator {
                        step: name.clone(),
                        requirement: requirement.clone(),
                        stack: stack.name.clone(),
                        available: available_step_operators,
                    });
                }
            }
            if let Some(requirement) = &step.config.experiment_tracker {
                if !available_experiment_trackers.contains(requirement) {
                    return Err(StackValidationError::MissingExperimentTracker {
                        step: name.clone(),
                        requirement: requirement.clone(),
                        stack: stack.name.clone(),
                        available: available_experiment_trackers,
                    });
                }
            }
        }

        Ok(())
    }

    fn compute_pipeline_spec(
        pipeline: &PipelineDefinition,
        step_specs: Vec<StepSpec>,
    ) -> PipelineSpec {
        match &pipeline.authoring {
            Authoring::Legacy => PipelineSpec::legacy(step_specs),
            Authoring::Source { source, parameters } => {
                PipelineSpec::new(source.clone(), parameters.clone(), step_specs)
            }
        }
    }
}
