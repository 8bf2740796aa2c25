// ABOUTME: Site lifecycle orchestration over the provisioning backend.
// ABOUTME: Owns per-name mutual exclusion and failure classification.

mod error;
mod lock;

pub use error::{SiteError, SiteErrorKind};
pub use lock::{LockInfo, LockRegistry, Operation, RunGuard};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{BackendError, SiteBackend};
use crate::types::{Site, SiteName};

/// A site omitted from a listing because its inspection failed.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSite {
    pub name: SiteName,
    pub reason: String,
}

/// Result of a listing: resolvable sites plus the entries skipped over.
///
/// Partial results are preferable to a total failure, but the omission has
/// to stay observable, so every skipped name is carried alongside.
#[derive(Debug, Clone, Serialize)]
pub struct SiteListing {
    pub sites: Vec<Site>,
    pub skipped: Vec<SkippedSite>,
}

/// The single authority for site lifecycle operations.
///
/// Sequences backend calls, rejects concurrent mutating runs on the same
/// name, bounds every provisioning run with the configured timeout, and
/// classifies backend failures into the caller-facing taxonomy.
pub struct SiteManager {
    backend: Arc<dyn SiteBackend>,
    locks: Arc<LockRegistry>,
    run_timeout: Duration,
}

impl SiteManager {
    pub fn new(backend: Arc<dyn SiteBackend>, run_timeout: Duration) -> Self {
        Self {
            backend,
            locks: Arc::new(LockRegistry::default()),
            run_timeout,
        }
    }

    /// Provision a new site serving `content`.
    ///
    /// A name with any run in flight is not absent, so contention surfaces
    /// as `AlreadyExists` here rather than `Conflict`.
    pub async fn create(&self, name: &SiteName, content: Bytes) -> Result<String, SiteError> {
        let _guard = self
            .locks
            .try_acquire(name, Operation::Create)
            .map_err(|_| SiteError::AlreadyExists(name.clone()))?;

        match self.backend.inspect(name).await {
            Ok(_) => return Err(SiteError::AlreadyExists(name.clone())),
            Err(BackendError::NotFound) => {}
            Err(other) => return Err(classify(name, other)),
        }

        info!(site = %name, "provisioning site");
        let url = self.run(name, self.backend.ensure(name, &content)).await?;
        info!(site = %name, url = %url, "site provisioned");
        Ok(url)
    }

    /// List every known site, skipping entries whose inspection fails.
    pub async fn list(&self) -> Result<SiteListing, SiteError> {
        let names = self
            .backend
            .enumerate()
            .await
            .map_err(|e| SiteError::Unknown(e.to_string()))?;

        let mut sites = Vec::with_capacity(names.len());
        let mut skipped = Vec::new();
        for name in names {
            match self.backend.inspect(&name).await {
                Ok(url) => sites.push(Site { name, url }),
                Err(err) => {
                    warn!(site = %name, error = %err, "skipping site with failed inspection");
                    skipped.push(SkippedSite {
                        name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(SiteListing { sites, skipped })
    }

    /// Resolve one site's endpoint. Never touches the in-flight marks.
    pub async fn get(&self, name: &SiteName) -> Result<Site, SiteError> {
        let url = self
            .backend
            .inspect(name)
            .await
            .map_err(|e| classify(name, e))?;

        Ok(Site {
            name: name.clone(),
            url,
        })
    }

    /// Converge an existing site to new content.
    pub async fn update(&self, name: &SiteName, content: Bytes) -> Result<String, SiteError> {
        let _guard = self
            .locks
            .try_acquire(name, Operation::Update)
            .map_err(|holder| SiteError::Conflict {
                name: name.clone(),
                holder: Some(holder),
            })?;

        self.backend
            .inspect(name)
            .await
            .map_err(|e| classify(name, e))?;

        info!(site = %name, "updating site");
        let url = self.run(name, self.backend.ensure(name, &content)).await?;
        info!(site = %name, url = %url, "site updated");
        Ok(url)
    }

    /// Tear down a site and remove its record.
    pub async fn delete(&self, name: &SiteName) -> Result<(), SiteError> {
        let _guard = self
            .locks
            .try_acquire(name, Operation::Delete)
            .map_err(|holder| SiteError::Conflict {
                name: name.clone(),
                holder: Some(holder),
            })?;

        self.backend
            .inspect(name)
            .await
            .map_err(|e| classify(name, e))?;

        info!(site = %name, "destroying site");
        self.run(name, self.backend.retire(name)).await?;
        info!(site = %name, "site destroyed");
        Ok(())
    }

    /// Whether a mutating run is currently in flight for `name`.
    pub fn run_in_flight(&self, name: &SiteName) -> bool {
        self.locks.is_marked(name)
    }

    /// Run one backend call under the provisioning timeout.
    ///
    /// The in-flight mark is held by the caller's guard, which drops on
    /// every path out of here, timeout included.
    async fn run<T>(
        &self,
        name: &SiteName,
        call: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, SiteError> {
        match tokio::time::timeout(self.run_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(classify(name, err)),
            Err(_) => Err(SiteError::Unknown(format!(
                "provisioning run for '{name}' timed out after {}s",
                self.run_timeout.as_secs()
            ))),
        }
    }
}

/// Map a backend failure onto the caller-facing taxonomy.
fn classify(name: &SiteName, err: BackendError) -> SiteError {
    match err {
        BackendError::AlreadyExists => SiteError::AlreadyExists(name.clone()),
        BackendError::NotFound => SiteError::NotFound(name.clone()),
        // The engine holds the lock, not this manager, so no holder info.
        BackendError::InProgress => SiteError::Conflict {
            name: name.clone(),
            holder: None,
        },
        BackendError::Engine(message) => SiteError::Unknown(message),
    }
}
