//! Repository layer
//!
//! Repositories are thin adapters over the external collaborators: the
//! key-value cache store, the secret store, the coverage collector, and the
//! package registry. They hold no business logic; the services above them
//! decide what a miss, a missing credential, or an upload failure means.
//!
//! All repositories are trait-based to enable testing and mocking.

mod cache;
mod coverage;
mod registry;
mod secrets;

// Re-export traits
pub use cache::CacheStore;
pub use coverage::ArtifactSink;
pub use registry::PackageRegistry;
pub use secrets::SecretStore;

// Re-export implementations
pub use cache::LocalCacheStore;
pub use coverage::HttpArtifactSink;
pub use registry::HttpPackageRegistry;
pub use secrets::EnvSecretStore;
