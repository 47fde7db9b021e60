use serde::{Deserialize, Serialize};

/// A stable, serializable reference to the code location of a step or
/// pipeline, used for reproducibility.
///
/// Sources are resolved by the caller when the pipeline is authored; the
/// compiler only carries them through into specs and deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// The module containing the object, e.g. `my_project.steps`.
    pub module: String,
    /// The attribute inside the module, e.g. `train_model`.
    pub attribute: String,
}

impl Source {
    pub fn new(module: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            attribute: attribute.into(),
        }
    }

    /// The dotted import path of the referenced object.
    pub fn import_path(&self) -> String {
        format!("{}.{}", self.module, self.attribute)
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module, self.attribute)
    }
}
