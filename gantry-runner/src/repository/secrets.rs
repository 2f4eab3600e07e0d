//! Secret store adapter

use async_trait::async_trait;

use gantry_core::domain::secret::Secret;

/// Repository trait for the external secret store
///
/// `get` either yields the named credential or nothing; the broker above
/// turns nothing into a fail-closed stage failure.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, name: &str) -> Option<Secret>;
}

/// Secret store backed by process environment variables
///
/// An optional prefix maps the logical name to the variable (e.g. prefix
/// `GANTRY_` resolves `REGISTRY_TOKEN` from `GANTRY_REGISTRY_TOKEN`).
pub struct EnvSecretStore {
    prefix: Option<String>,
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, name: &str) -> Option<Secret> {
        let var = match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, name),
            None => name.to_string(),
        };

        std::env::var(&var).ok().map(|value| Secret::new(name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_env_store_resolves_variable() {
        // Uses a test-unique variable name since the environment is
        // process-global.
        unsafe { std::env::set_var("GANTRY_TEST_SECRET_A", "s3cret") };
        let store = EnvSecretStore::new();

        let secret = store.get("GANTRY_TEST_SECRET_A").await.unwrap();
        assert_eq!(secret.expose(), "s3cret");
        assert_eq!(secret.name(), "GANTRY_TEST_SECRET_A");
    }

    #[tokio::test]
    async fn test_env_store_applies_prefix() {
        unsafe { std::env::set_var("PFX_GANTRY_TEST_SECRET_B", "s3cret") };
        let store = EnvSecretStore::with_prefix("PFX_");

        let secret = store.get("GANTRY_TEST_SECRET_B").await.unwrap();
        assert_eq!(secret.name(), "GANTRY_TEST_SECRET_B");
    }

    #[tokio::test]
    async fn test_env_store_missing_is_none() {
        let store = EnvSecretStore::new();
        assert!(store.get("GANTRY_TEST_SECRET_MISSING").await.is_none());
    }
}
