// ABOUTME: Per-site mutual-exclusion registry for mutating provisioning runs.
// ABOUTME: RAII guards release on drop so a name is never left marked in flight.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::types::SiteName;

/// The mutating operation holding a site's in-flight mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Information about the run holding a site's mark.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// Which operation is in flight.
    pub operation: Operation,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

/// The shared set of per-site in-flight marks.
///
/// All mutating operations dispatched through one manager instance contend
/// on this registry; check-and-mark is atomic under the inner mutex, and a
/// held mark rejects the second caller immediately rather than queueing it.
#[derive(Debug, Default)]
pub struct LockRegistry {
    held: Mutex<HashMap<SiteName, LockInfo>>,
}

impl LockRegistry {
    /// Atomically mark `name` as having a run in flight.
    ///
    /// On contention, returns the holding run's info instead of blocking.
    pub fn try_acquire(
        self: &Arc<Self>,
        name: &SiteName,
        operation: Operation,
    ) -> Result<RunGuard, LockInfo> {
        let mut held = self.held.lock();
        if let Some(info) = held.get(name) {
            return Err(info.clone());
        }

        held.insert(
            name.clone(),
            LockInfo {
                operation,
                started_at: Utc::now(),
            },
        );

        Ok(RunGuard {
            registry: Arc::clone(self),
            name: name.clone(),
        })
    }

    /// Whether a run is currently marked in flight for `name`.
    pub fn is_marked(&self, name: &SiteName) -> bool {
        self.held.lock().contains_key(name)
    }
}

/// A held in-flight mark, cleared on drop along every exit path.
#[derive(Debug)]
pub struct RunGuard {
    registry: Arc<LockRegistry>,
    name: SiteName,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.held.lock().remove(&self.name);
    }
}
