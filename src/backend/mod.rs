// ABOUTME: Provisioning backend adapter over the infrastructure engine.
// ABOUTME: Defines the SiteBackend trait, its error type, and the factory.

mod memory;
mod program;
mod pulumi;

pub use memory::MemoryBackend;
pub use program::SiteProgram;
pub use pulumi::PulumiBackend;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{BackendKind, Config};
use crate::types::SiteName;

/// Errors surfaced by a provisioning backend.
///
/// These carry the engine-level failure conditions; classification into the
/// caller-facing taxonomy happens in the lifecycle layer.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The engine refused to create a deployment that already exists.
    #[error("deployment already exists")]
    AlreadyExists,

    /// The engine has no record of the deployment.
    #[error("deployment not found")]
    NotFound,

    /// The engine holds a lock for a provisioning run already in flight.
    #[error("a provisioning run is already in progress")]
    InProgress,

    /// Any other engine, transport, or I/O failure.
    #[error("engine failure: {0}")]
    Engine(String),
}

impl BackendError {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}

/// Idempotent-intent operations against the provisioning engine.
///
/// Side effects are external and not transactional: a run that fails partway
/// may leave partially applied resources. The adapter reports the failure and
/// leaves cleanup to a retry of the same operation or an explicit [`retire`].
///
/// [`retire`]: SiteBackend::retire
#[async_trait]
pub trait SiteBackend: Send + Sync {
    /// Verify the engine is usable and install required plugins.
    async fn preflight(&self) -> Result<(), BackendError>;

    /// Create the site if absent, or converge an existing site to `content`.
    ///
    /// Returns the public website endpoint on success.
    async fn ensure(&self, name: &SiteName, content: &Bytes) -> Result<String, BackendError>;

    /// Resolve the public endpoint without triggering a provisioning run.
    async fn inspect(&self, name: &SiteName) -> Result<String, BackendError>;

    /// Tear down all site resources and remove the bookkeeping record, so a
    /// subsequent [`ensure`](SiteBackend::ensure) behaves as a fresh create.
    async fn retire(&self, name: &SiteName) -> Result<(), BackendError>;

    /// List all known site names regardless of state.
    async fn enumerate(&self) -> Result<Vec<SiteName>, BackendError>;
}

/// Create the backend selected by configuration.
pub fn create_backend(config: &Config) -> crate::error::Result<Arc<dyn SiteBackend>> {
    match config.engine.kind {
        BackendKind::Pulumi => {
            let base = std::env::current_dir()?;
            Ok(Arc::new(PulumiBackend::new(config, &base)))
        }
        BackendKind::Memory => Ok(Arc::new(MemoryBackend::new(&config.region))),
    }
}
