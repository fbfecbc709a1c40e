//! Provider configuration

use nsxt_core::provider::{ProviderError, ProviderResult};

/// Default enforcement point for objects under `/infra/sites/<site>`
pub const DEFAULT_ENFORCEMENT_POINT: &str = "default";

/// Default organization for multitenant paths (`/orgs/<org>/projects/...`)
pub const DEFAULT_ORG_ID: &str = "default";

/// Connection settings for an NSX manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Manager host name or URL (e.g., "nsx.example.com" or "https://10.0.0.10")
    pub host: String,
    pub username: String,
    pub password: String,
    /// Skip TLS certificate verification
    pub allow_unverified_ssl: bool,
    /// Enforcement point used when a resource does not name one
    pub enforcement_point: String,
    pub org_id: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            allow_unverified_ssl: false,
            enforcement_point: DEFAULT_ENFORCEMENT_POINT.to_string(),
            org_id: DEFAULT_ORG_ID.to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> ProviderResult<()> {
        if self.host.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "NSX manager host is required (--host or NSXT_MANAGER_HOST)".to_string(),
            ));
        }
        if self.username.is_empty() {
            return Err(ProviderError::Configuration(
                "username is required (--username or NSXT_USERNAME)".to_string(),
            ));
        }
        if self.enforcement_point.is_empty() || self.org_id.is_empty() {
            return Err(ProviderError::Configuration(
                "enforcement point and org ID must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the Policy API, without trailing slash
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("https://") || host.starts_with("http://") {
            format!("{}/policy/api/v1", host)
        } else {
            format!("https://{}/policy/api/v1", host)
        }
    }
}
