//! Service layer
//!
//! Services contain the orchestration logic: cache resolution, secret
//! brokering, stage execution, and result reporting. They operate on the
//! repository traits and never talk to an external collaborator directly.
//!
//! All services are trait-based to enable testing and dependency injection.

mod cache;
mod execution;
mod report;
mod secrets;

// Re-export traits
pub use cache::CacheService;
pub use execution::{ExecutionService, RunInputs};
pub use report::ReportService;
pub use secrets::SecretBroker;

// Re-export implementations
pub use cache::StandardCacheService;
pub use execution::StandardExecutionService;
pub use report::StandardReportService;
pub use secrets::StandardSecretBroker;
