//! Spacecat catalog client
//!
//! Read-only access to sites, opportunities and suggestions over the
//! Spacecat REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::GatewayError;
use crate::records::{Opportunity, Site, Suggestion, SuggestionRecord};
use crate::traits::Directory;
use crate::Result;

/// Default API base when none is configured.
pub const DEFAULT_SPACECAT_API_BASE: &str = "https://spacecat.experiencecloud.live/api/ci";

const SITES_TIMEOUT: Duration = Duration::from_secs(60);
const DETAIL_TIMEOUT: Duration = Duration::from_secs(30);

/// How requests authenticate against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpacecatAuth {
    /// Bearer session token (preferred)
    SessionToken(String),
    /// Legacy API key
    ApiKey(String),
}

/// Spacecat client configuration
#[derive(Debug, Clone)]
pub struct SpacecatConfig {
    /// API base URL
    pub api_base: String,
    /// IMS organization sent with every request
    pub ims_org_id: String,
    /// Credentials
    pub auth: SpacecatAuth,
}

impl SpacecatConfig {
    /// Create config against the default API base
    pub fn new(ims_org_id: &str, auth: SpacecatAuth) -> Self {
        SpacecatConfig {
            api_base: DEFAULT_SPACECAT_API_BASE.to_string(),
            ims_org_id: ims_org_id.to_string(),
            auth,
        }
    }

    /// Point at a different API base
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    /// Absolute URL for a path under the API base.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Authentication header name and value.
    pub fn auth_header(&self) -> (&'static str, String) {
        match &self.auth {
            SpacecatAuth::SessionToken(token) => ("Authorization", format!("Bearer {token}")),
            SpacecatAuth::ApiKey(key) => ("x-api-key", key.clone()),
        }
    }
}

/// HTTP-backed [`Directory`].
pub struct SpacecatDirectory {
    config: SpacecatConfig,
    http_client: reqwest::Client,
}

impl SpacecatDirectory {
    /// Create a new catalog client
    pub fn new(config: SpacecatConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("a11y-autofix/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(SpacecatDirectory {
            config,
            http_client,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, timeout: Duration) -> Result<T> {
        let url = self.config.endpoint(path);
        let (auth_name, auth_value) = self.config.auth_header();
        debug!(url = %url, "catalog request");

        let response = self
            .http_client
            .get(&url)
            .header("x-gw-ims-org-id", &self.config.ims_org_id)
            .header("Content-Type", "application/json")
            .header(auth_name, auth_value)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                method: "GET".to_string(),
                url,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode {
            url,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Directory for SpacecatDirectory {
    async fn list_sites(&self) -> Result<Vec<Site>> {
        let sites: Vec<Site> = self.get_json("sites", SITES_TIMEOUT).await?;
        debug!(count = sites.len(), "fetched sites");
        Ok(sites)
    }

    async fn list_opportunities(&self, site_id: &str) -> Result<Vec<Opportunity>> {
        let path = format!("sites/{site_id}/opportunities");
        let mut opportunities: Vec<Opportunity> = self.get_json(&path, DETAIL_TIMEOUT).await?;
        for opportunity in &mut opportunities {
            if opportunity.site_id.is_empty() {
                opportunity.site_id = site_id.to_string();
            }
        }
        Ok(opportunities)
    }

    async fn list_suggestions(&self, opportunity: &Opportunity) -> Result<Vec<Suggestion>> {
        let path = format!(
            "sites/{}/opportunities/{}/suggestions",
            opportunity.site_id, opportunity.id
        );
        let records: Vec<SuggestionRecord> = self.get_json(&path, DETAIL_TIMEOUT).await?;
        Ok(records
            .into_iter()
            .map(|record| record.normalize(&opportunity.id))
            .collect())
    }
}
