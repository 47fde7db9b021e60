//! The target execution stack: a named collection of infrastructure
//! components. Stacks are read-only inputs to compilation and are never
//! mutated here.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::ConfigMap;
use crate::settings::Settings;

/// The kinds of infrastructure components a stack may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Orchestrator,
    ArtifactStore,
    ContainerRegistry,
    StepOperator,
    ExperimentTracker,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Orchestrator => "orchestrator",
            ComponentKind::ArtifactStore => "artifact_store",
            ComponentKind::ContainerRegistry => "container_registry",
            ComponentKind::StepOperator => "step_operator",
            ComponentKind::ExperimentTracker => "experiment_tracker",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "orchestrator" => Some(ComponentKind::Orchestrator),
            "artifact_store" => Some(ComponentKind::ArtifactStore),
            "container_registry" => Some(ComponentKind::ContainerRegistry),
            "step_operator" => Some(ComponentKind::StepOperator),
            "experiment_tracker" => Some(ComponentKind::ExperimentTracker),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of a component's configuration understood by its settings type.
///
/// Fields outside `fields` never become default settings; fields whose value
/// equals the schema default are considered unset and are not promoted
/// either.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsSchema {
    pub fields: BTreeSet<String>,
    #[serde(default)]
    pub defaults: ConfigMap,
}

/// A single infrastructure component of a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackComponent {
    pub kind: ComponentKind,
    pub name: String,
    pub flavor: String,
    #[serde(default)]
    pub config: ConfigMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_schema: Option<SettingsSchema>,
}

impl StackComponent {
    pub fn new(kind: ComponentKind, name: impl Into<String>, flavor: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            flavor: flavor.into(),
            config: ConfigMap::new(),
            settings_schema: None,
        }
    }

    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.config = config;
        self
    }

    pub fn with_settings_schema(mut self, schema: SettingsSchema) -> Self {
        self.settings_schema = Some(schema);
        self
    }

    /// The canonical settings key addressing this component.
    pub fn settings_key(&self) -> String {
        format!("{}.{}", self.kind.as_str(), self.flavor)
    }

    /// Default settings derived from the component configuration: restricted
    /// to the fields the settings schema understands and excluding fields
    /// left at their default value. `None` if the component has no settings
    /// schema at all.
    pub fn default_settings(&self) -> Option<Settings> {
        let schema = self.settings_schema.as_ref()?;
        let mut values = ConfigMap::new();

        for field in &schema.fields {
            let Some(value) = self.config.get(field) else {
                continue;
            };
            if schema.defaults.get(field) == Some(value) {
                continue;
            }
            values.insert(field.clone(), value.clone());
        }

        Some(Settings::Shared(values))
    }
}

/// A named, ordered collection of infrastructure components. At most one
/// component per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    components: IndexMap<ComponentKind, StackComponent>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: IndexMap::new(),
        }
    }

    /// Adds a component, replacing any previous component of the same kind.
    pub fn with_component(mut self, component: StackComponent) -> Self {
        self.components.insert(component.kind, component);
        self
    }

    pub fn components(&self) -> impl Iterator<Item = &StackComponent> {
        self.components.values()
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&StackComponent> {
        self.components.get(&kind)
    }

    pub fn orchestrator(&self) -> Option<&StackComponent> {
        self.component(ComponentKind::Orchestrator)
    }

    pub fn step_operator(&self) -> Option<&StackComponent> {
        self.component(ComponentKind::StepOperator)
    }

    pub fn experiment_tracker(&self) -> Option<&StackComponent> {
        self.component(ComponentKind::ExperimentTracker)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn settings_key_uses_kind_and_flavor() {
        let component = StackComponent::new(ComponentKind::Orchestrator, "main", "kubeflow");
        assert_eq!(component.settings_key(), "orchestrator.kubeflow");
    }

    #[test]
    fn default_settings_respect_schema_and_defaults() {
        let component = StackComponent::new(ComponentKind::Orchestrator, "main", "kubeflow")
            .with_config(
                [
                    ("namespace".to_string(), json!("prod")),
                    ("timeout".to_string(), json!(300)),
                    ("internal_url".to_string(), json!("http://kfp")),
                ]
                .into(),
            )
            .with_settings_schema(SettingsSchema {
                fields: ["namespace".to_string(), "timeout".to_string()].into(),
                defaults: [("timeout".to_string(), json!(300))].into(),
            });

        let settings = component.default_settings().unwrap();
        // `internal_url` is not a settings field, `timeout` equals its
        // default, only `namespace` is promoted.
        assert_eq!(
            settings,
            Settings::Shared([("namespace".to_string(), json!("prod"))].into())
        );
    }

    #[test]
    fn no_schema_means_no_default_settings() {
        let component = StackComponent::new(ComponentKind::ArtifactStore, "store", "s3");
        assert!(component.default_settings().is_none());
    }

    #[test]
    fn components_keep_insertion_order() {
        let stack = Stack::new("prod")
            .with_component(StackComponent::new(
                ComponentKind::StepOperator,
                "batch",
                "aws",
            ))
            .with_component(StackComponent::new(
                ComponentKind::Orchestrator,
                "main",
                "airflow",
            ));

        let kinds: Vec<_> = stack.components().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ComponentKind::StepOperator, ComponentKind::Orchestrator]
        );
    }
}
