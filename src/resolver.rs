//! Resolution of settings keys against the components of a target stack.

use crate::error::SettingsResolutionError;
use crate::stack::{ComponentKind, Stack};

/// Resolves a settings key to its canonical form for a given stack.
///
/// Three key shapes are accepted:
///
/// * a plain key that is not a component kind (e.g. `"resources"`) — generic
///   settings, resolved to itself;
/// * a bare component kind (e.g. `"orchestrator"`) — canonicalized to
///   `"orchestrator.<flavor>"` using the flavor of the stack's component;
/// * a fully qualified `"<kind>.<flavor>"` key — accepted only if the stack's
///   component of that kind has that flavor.
///
/// A failure here means the settings address a component that is not part of
/// the current stack. That is inapplicable configuration, not a structural
/// error: callers drop the settings and continue.
pub struct SettingsResolver<'a> {
    key: &'a str,
}

impl<'a> SettingsResolver<'a> {
    pub fn new(key: &'a str) -> Self {
        Self { key }
    }

    pub fn resolve(&self, stack: &Stack) -> Result<String, SettingsResolutionError> {
        match self.key.split_once('.') {
            None => match ComponentKind::parse(self.key) {
                Some(kind) => {
                    let component = stack.component(kind).ok_or_else(|| {
                        SettingsResolutionError::MissingComponent {
                            key: self.key.to_string(),
                            kind: kind.as_str(),
                        }
                    })?;
                    Ok(component.settings_key())
                }
                // Not a component kind: a generic settings key.
                None => Ok(self.key.to_string()),
            },
            Some((prefix, flavor)) => {
                let kind = ComponentKind::parse(prefix).ok_or_else(|| {
                    SettingsResolutionError::UnknownKind {
                        key: self.key.to_string(),
                    }
                })?;
                let component = stack.component(kind).ok_or_else(|| {
                    SettingsResolutionError::MissingComponent {
                        key: self.key.to_string(),
                        kind: kind.as_str(),
                    }
                })?;
                if component.flavor != flavor {
                    return Err(SettingsResolutionError::FlavorMismatch {
                        key: self.key.to_string(),
                        kind: kind.as_str(),
                        expected: flavor.to_string(),
                        actual: component.flavor.clone(),
                    });
                }
                Ok(self.key.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackComponent;

    fn stack() -> Stack {
        Stack::new("test").with_component(StackComponent::new(
            ComponentKind::Orchestrator,
            "main",
            "kubeflow",
        ))
    }

    #[test]
    fn generic_keys_resolve_to_themselves() {
        let resolved = SettingsResolver::new("resources").resolve(&stack()).unwrap();
        assert_eq!(resolved, "resources");
    }

    #[test]
    fn bare_kind_is_canonicalized_to_the_stack_flavor() {
        let resolved = SettingsResolver::new("orchestrator")
            .resolve(&stack())
            .unwrap();
        assert_eq!(resolved, "orchestrator.kubeflow");
    }

    #[test]
    fn qualified_key_must_match_the_stack_flavor() {
        let resolved = SettingsResolver::new("orchestrator.kubeflow").resolve(&stack());
        assert_eq!(resolved.unwrap(), "orchestrator.kubeflow");

        let err = SettingsResolver::new("orchestrator.airflow")
            .resolve(&stack())
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsResolutionError::FlavorMismatch { .. }
        ));
    }

    #[test]
    fn absent_component_is_reported() {
        let err = SettingsResolver::new("step_operator")
            .resolve(&stack())
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsResolutionError::MissingComponent { .. }
        ));
    }

    #[test]
    fn unknown_kind_prefix_is_reported() {
        let err = SettingsResolver::new("warehouse.snowflake")
            .resolve(&stack())
            .unwrap_err();
        assert!(matches!(err, SettingsResolutionError::UnknownKind { .. }));
    }
}
