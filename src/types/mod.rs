// ABOUTME: Validated domain types for the kiosk control plane.
// ABOUTME: Site names double as stack and bucket identifiers.

mod site;
mod site_name;

pub use site::Site;
pub use site_name::{SiteName, SiteNameError};
