//! vSphere port-group client
//!
//! Talks to the port-group inventory endpoint exposed alongside vCenter:
//! `GET {base}/api/vcenter/network/portgroups/{id}` returns a `PortGroupInfo`.

use crate::error::VSphereError;
use crate::models::PortGroupInfo;
use crate::port_group_trait::PortGroupClientTrait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Header carrying the vCenter API session token
const SESSION_HEADER: &str = "vmware-api-session-id";

/// vSphere port-group API client
pub struct VSphereClient {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for VSphereClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VSphereClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl VSphereClient {
    /// Create a new vSphere client
    ///
    /// # Arguments
    /// * `base_url` - vCenter base URL (e.g., "https://vcenter.local")
    /// * `token` - API session token
    pub fn new(base_url: String, token: String) -> Result<Self, VSphereError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(VSphereError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Make a GET request and decode the JSON body
    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, VSphereError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(SESSION_HEADER, &self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| classify_transport_error(path, e))?;

        let status = response.status();
        if status == 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(VSphereError::NotFound(format!(
                "Resource not found: {} - {}",
                path, body
            )));
        }

        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(VSphereError::Authentication(format!("{} - {}", status, body)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VSphereError::Api(format!(
                "GET {} failed: {} - {}",
                path, status, body
            )));
        }

        let response_text = response.text().await.map_err(|e| classify_transport_error(path, e))?;
        serde_json::from_str(&response_text).map_err(|e| {
            VSphereError::Api(format!(
                "error decoding response body: {} - Response (first 500 chars): {}",
                e,
                response_text.chars().take(500).collect::<String>()
            ))
        })
    }
}

fn classify_transport_error(path: &str, e: reqwest::Error) -> VSphereError {
    if e.is_timeout() {
        VSphereError::Timeout(format!("GET {}: {}", path, e))
    } else {
        VSphereError::Http(e)
    }
}

#[async_trait::async_trait]
impl PortGroupClientTrait for VSphereClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validate the session token against the session endpoint.
    async fn validate_token(&self) -> Result<(), VSphereError> {
        debug!("Validating vSphere session token and connectivity");
        let _: serde_json::Value = self.get("/api/session").await.map_err(|e| match e {
            VSphereError::NotFound(msg) => VSphereError::Api(format!("Session endpoint missing: {}", msg)),
            other => other,
        })?;
        debug!("Session token validated successfully");
        Ok(())
    }

    async fn query_port_group(&self, port_group_id: &str) -> Result<PortGroupInfo, VSphereError> {
        let path = format!(
            "/api/vcenter/network/portgroups/{}",
            urlencoding::encode(port_group_id)
        );
        self.get(&path).await
    }
}
