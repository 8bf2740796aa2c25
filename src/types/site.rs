// ABOUTME: The site record reported back to callers.
// ABOUTME: Only successfully provisioned sites carry an endpoint.

use serde::Serialize;

use super::SiteName;

/// One addressable site deployment with its resolved public endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    /// Caller-supplied site identifier.
    pub name: SiteName,
    /// Public website endpoint reported by the provisioning backend.
    pub url: String,
}
