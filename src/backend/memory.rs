// ABOUTME: In-memory SiteBackend for tests and local dry runs.
// ABOUTME: Supports fault injection and artificial provisioning latency.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::types::SiteName;

use super::{BackendError, SiteBackend};

#[derive(Debug)]
struct StoredSite {
    content: Bytes,
    url: String,
}

#[derive(Debug, Default)]
struct Faults {
    inspect: HashSet<SiteName>,
    ensure: HashSet<SiteName>,
    enumerate: bool,
}

/// Backend that provisions nothing and keeps all state in process.
///
/// Selectable via `engine.kind: memory`, and the workhorse of the test
/// suite: individual operations can be made to fail per site, and `ensure`
/// can be slowed down to widen race windows in concurrency tests.
pub struct MemoryBackend {
    region: String,
    ensure_delay: Option<Duration>,
    sites: RwLock<HashMap<SiteName, StoredSite>>,
    faults: RwLock<Faults>,
}

impl MemoryBackend {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            ensure_delay: None,
            sites: RwLock::new(HashMap::new()),
            faults: RwLock::new(Faults::default()),
        }
    }

    /// Make every `ensure` sleep before taking effect.
    pub fn with_ensure_delay(mut self, delay: Duration) -> Self {
        self.ensure_delay = Some(delay);
        self
    }

    /// Make `inspect` fail for one site until faults are cleared.
    pub fn fail_inspect(&self, name: &SiteName) {
        self.faults.write().inspect.insert(name.clone());
    }

    /// Make `ensure` fail for one site until faults are cleared.
    pub fn fail_ensure(&self, name: &SiteName) {
        self.faults.write().ensure.insert(name.clone());
    }

    /// Make `enumerate` fail until faults are cleared.
    pub fn fail_enumerate(&self) {
        self.faults.write().enumerate = true;
    }

    pub fn clear_faults(&self) {
        *self.faults.write() = Faults::default();
    }

    /// Stored page content, for asserting side effects in tests.
    pub fn content_of(&self, name: &SiteName) -> Option<Bytes> {
        self.sites.read().get(name).map(|site| site.content.clone())
    }

    fn url_for(&self, name: &SiteName) -> String {
        format!("{name}.s3-website-{}.amazonaws.com", self.region)
    }
}

#[async_trait]
impl SiteBackend for MemoryBackend {
    async fn preflight(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn ensure(&self, name: &SiteName, content: &Bytes) -> Result<String, BackendError> {
        if let Some(delay) = self.ensure_delay {
            tokio::time::sleep(delay).await;
        }

        if self.faults.read().ensure.contains(name) {
            return Err(BackendError::engine(format!(
                "injected ensure failure for '{name}'"
            )));
        }

        let url = self.url_for(name);
        self.sites.write().insert(
            name.clone(),
            StoredSite {
                content: content.clone(),
                url: url.clone(),
            },
        );
        Ok(url)
    }

    async fn inspect(&self, name: &SiteName) -> Result<String, BackendError> {
        if self.faults.read().inspect.contains(name) {
            return Err(BackendError::engine(format!(
                "injected inspect failure for '{name}'"
            )));
        }

        self.sites
            .read()
            .get(name)
            .map(|site| site.url.clone())
            .ok_or(BackendError::NotFound)
    }

    async fn retire(&self, name: &SiteName) -> Result<(), BackendError> {
        match self.sites.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(BackendError::NotFound),
        }
    }

    async fn enumerate(&self) -> Result<Vec<SiteName>, BackendError> {
        if self.faults.read().enumerate {
            return Err(BackendError::engine("injected enumerate failure"));
        }

        let mut names: Vec<SiteName> = self.sites.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> SiteName {
        SiteName::new(value).unwrap()
    }

    #[tokio::test]
    async fn ensure_is_idempotent_over_content() {
        let backend = MemoryBackend::new("us-west-2");
        let site = name("site1");

        let first = backend.ensure(&site, &Bytes::from("<h1>hi</h1>")).await.unwrap();
        let second = backend.ensure(&site, &Bytes::from("<h1>bye</h1>")).await.unwrap();

        assert_eq!(first, second, "endpoint is stable across converges");
        assert_eq!(
            backend.content_of(&site).unwrap(),
            Bytes::from("<h1>bye</h1>")
        );
    }

    #[tokio::test]
    async fn retire_removes_the_record_entirely() {
        let backend = MemoryBackend::new("us-west-2");
        let site = name("site1");

        backend.ensure(&site, &Bytes::from("x")).await.unwrap();
        backend.retire(&site).await.unwrap();

        assert!(matches!(
            backend.inspect(&site).await,
            Err(BackendError::NotFound)
        ));
        assert!(matches!(
            backend.retire(&site).await,
            Err(BackendError::NotFound)
        ));
        assert!(backend.enumerate().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enumerate_lists_all_sites_sorted() {
        let backend = MemoryBackend::new("us-west-2");
        for value in ["c-site", "a-site", "b-site"] {
            backend.ensure(&name(value), &Bytes::from("x")).await.unwrap();
        }

        let names = backend.enumerate().await.unwrap();
        assert_eq!(names, vec![name("a-site"), name("b-site"), name("c-site")]);
    }

    #[tokio::test]
    async fn injected_faults_fail_their_operation() {
        let backend = MemoryBackend::new("us-west-2");
        let site = name("site1");
        backend.ensure(&site, &Bytes::from("x")).await.unwrap();

        backend.fail_inspect(&site);
        assert!(matches!(
            backend.inspect(&site).await,
            Err(BackendError::Engine(_))
        ));

        backend.clear_faults();
        assert!(backend.inspect(&site).await.is_ok());
    }
}
