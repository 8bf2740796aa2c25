// ABOUTME: The caller-facing failure taxonomy for site operations.
// ABOUTME: Exactly four kinds; backend representations never cross this boundary.

use crate::types::SiteName;

use super::lock::LockInfo;

/// Failure of a site lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// A create collided with an existing (or in-flight) name.
    #[error("site '{0}' already exists")]
    AlreadyExists(SiteName),

    /// The operation targeted an unknown name.
    #[error("site '{0}' does not exist")]
    NotFound(SiteName),

    /// A mutating run is already in flight for this name.
    #[error("site '{name}' already has a provisioning run in progress")]
    Conflict {
        name: SiteName,
        /// Holder details when the conflicting run is local to this manager.
        holder: Option<LockInfo>,
    },

    /// Any other backend, transport, or internal failure, including timeouts.
    #[error("{0}")]
    Unknown(String),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteErrorKind {
    AlreadyExists,
    NotFound,
    Conflict,
    Unknown,
}

impl SiteError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> SiteErrorKind {
        match self {
            SiteError::AlreadyExists(_) => SiteErrorKind::AlreadyExists,
            SiteError::NotFound(_) => SiteErrorKind::NotFound,
            SiteError::Conflict { .. } => SiteErrorKind::Conflict,
            SiteError::Unknown(_) => SiteErrorKind::Unknown,
        }
    }

    /// Returns details about the conflicting run, when known.
    pub fn conflict_holder(&self) -> Option<&LockInfo> {
        match self {
            SiteError::Conflict { holder, .. } => holder.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Operation;
    use chrono::Utc;

    fn name(value: &str) -> SiteName {
        SiteName::new(value).unwrap()
    }

    #[test]
    fn kinds_cover_every_variant() {
        assert_eq!(
            SiteError::AlreadyExists(name("a")).kind(),
            SiteErrorKind::AlreadyExists
        );
        assert_eq!(SiteError::NotFound(name("a")).kind(), SiteErrorKind::NotFound);
        assert_eq!(
            SiteError::Conflict {
                name: name("a"),
                holder: None
            }
            .kind(),
            SiteErrorKind::Conflict
        );
        assert_eq!(
            SiteError::Unknown("boom".to_string()).kind(),
            SiteErrorKind::Unknown
        );
    }

    #[test]
    fn conflict_exposes_holder_info() {
        let err = SiteError::Conflict {
            name: name("site1"),
            holder: Some(LockInfo {
                operation: Operation::Update,
                started_at: Utc::now(),
            }),
        };

        let holder = err.conflict_holder().unwrap();
        assert_eq!(holder.operation, Operation::Update);
        assert!(SiteError::NotFound(name("site1")).conflict_holder().is_none());
    }

    #[test]
    fn messages_name_the_site() {
        assert_eq!(
            SiteError::NotFound(name("site1")).to_string(),
            "site 'site1' does not exist"
        );
        assert_eq!(
            SiteError::AlreadyExists(name("site1")).to_string(),
            "site 'site1' already exists"
        );
    }
}
