//! Secret brokering service
//!
//! Secrets are resolved lazily, immediately before the stage that declares
//! them runs, and dropped once that stage completes. A stage only ever sees
//! the names it declared; an unresolvable name fails the stage closed
//! before any external call is attempted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use gantry_core::domain::secret::Secret;
use gantry_core::error::StageError;

use crate::repository::SecretStore;

/// Service trait for credential resolution
#[async_trait]
pub trait SecretBroker: Send + Sync {
    /// Resolves one named credential
    ///
    /// # Errors
    /// `StageError::CredentialNotFound` when the store has no value for
    /// the name.
    async fn resolve(&self, name: &str) -> Result<Secret, StageError>;

    /// Resolves every name a stage declares
    ///
    /// Fails on the first unresolvable name; no partial set is returned.
    async fn resolve_all(&self, names: &[String]) -> Result<HashMap<String, Secret>, StageError> {
        let mut secrets = HashMap::with_capacity(names.len());
        for name in names {
            secrets.insert(name.clone(), self.resolve(name).await?);
        }
        Ok(secrets)
    }
}

/// Standard implementation of SecretBroker
pub struct StandardSecretBroker {
    store: Arc<dyn SecretStore>,
}

impl StandardSecretBroker {
    /// Creates a broker over the given store
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SecretBroker for StandardSecretBroker {
    async fn resolve(&self, name: &str) -> Result<Secret, StageError> {
        self.store
            .get(name)
            .await
            .ok_or_else(|| StageError::CredentialNotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapSecretStore {
        values: HashMap<String, String>,
    }

    impl MapSecretStore {
        fn with(pairs: &[(&str, &str)]) -> Self {
            Self {
                values: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl SecretStore for MapSecretStore {
        async fn get(&self, name: &str) -> Option<Secret> {
            self.values.get(name).map(|v| Secret::new(name, v))
        }
    }

    #[tokio::test]
    async fn test_resolve_known_secret() {
        let broker =
            StandardSecretBroker::new(Arc::new(MapSecretStore::with(&[("COVERAGE_TOKEN", "t")])));

        let secret = broker.resolve("COVERAGE_TOKEN").await.unwrap();
        assert_eq!(secret.expose(), "t");
    }

    #[tokio::test]
    async fn test_resolve_unknown_secret_fails_closed() {
        let broker = StandardSecretBroker::new(Arc::new(MapSecretStore::with(&[])));

        let err = broker.resolve("REGISTRY_TOKEN").await.unwrap_err();
        assert!(err.is_credential_not_found());
    }

    #[tokio::test]
    async fn test_resolve_all_is_all_or_nothing() {
        let broker =
            StandardSecretBroker::new(Arc::new(MapSecretStore::with(&[("COVERAGE_TOKEN", "t")])));

        let names = vec!["COVERAGE_TOKEN".to_string(), "REGISTRY_TOKEN".to_string()];
        let err = broker.resolve_all(&names).await.unwrap_err();
        assert!(err.is_credential_not_found());

        let names = vec!["COVERAGE_TOKEN".to_string()];
        let secrets = broker.resolve_all(&names).await.unwrap();
        assert_eq!(secrets.len(), 1);
    }
}
