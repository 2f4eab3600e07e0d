//! Credential types
//!
//! Secrets are resolved just before the declaring stage runs and dropped
//! when it completes. The value is only reachable through [`Secret::expose`]
//! so it cannot leak through `Debug`, `Display`, or serialization.

/// Name of the package-registry publish token
pub const REGISTRY_TOKEN: &str = "REGISTRY_TOKEN";

/// Name of the coverage-upload token
pub const COVERAGE_TOKEN: &str = "COVERAGE_TOKEN";

/// An opaque credential value
#[derive(Clone)]
pub struct Secret {
    name: String,
    value: String,
}

impl Secret {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the underlying value
    ///
    /// Callers must pass the value straight to the external collaborator
    /// and never store or log it.
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret({}: ***)", self.name)
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}
