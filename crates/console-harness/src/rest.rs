//! Authenticated REST client for the console backend.
//!
//! Used for out-of-band setup and teardown. Every request carries a Basic
//! authorization header computed once from the bootstrap credential.
//!
//! Only connect failures are retried (the backend may still be starting).
//! An HTTP error status is a definitive answer and is returned at once.

use crate::resource::{ResourceBackend, ResourceKind};
use crate::result::{HarnessError, HarnessResult};
use crate::retry::{retry_with, RetrySpec};
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// CREDENTIAL
// =============================================================================

/// Bootstrap identity used for REST calls
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredential {
    organization: String,
    username: String,
    password: String,
    header: String,
}

impl AuthCredential {
    /// Create a credential and precompute its authorization header
    #[must_use]
    pub fn new(
        organization: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let organization = organization.into();
        let username = username.into();
        let password = password.into();
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{organization}/{username}:{password}"));
        Self {
            organization,
            username,
            password,
            header: format!("Basic {token}"),
        }
    }

    /// Organization
    #[must_use]
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// User name without organization
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// `org/user`, the name the backend lists this user under
    #[must_use]
    pub fn qualified_user(&self) -> String {
        format!("{}/{}", self.organization, self.username)
    }

    /// Value for the `Authorization` header
    #[must_use]
    pub fn authorization(&self) -> &str {
        &self.header
    }
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredential")
            .field("organization", &self.organization)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Option<Vec<String>>,
}

/// REST client for the console backend
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: String,
    credential: AuthCredential,
    http: reqwest::Client,
    connect_retry: RetrySpec,
}

impl RestClient {
    /// Create a client for `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>, credential: AuthCredential) -> HarnessResult<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HarnessError::config(format!("HTTP client: {e}")))?;
        let base_url = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
            http,
            connect_retry: RetrySpec::rest_connect(),
        })
    }

    /// Override the connect-failure retry policy
    #[must_use]
    pub const fn with_connect_retry(mut self, spec: RetrySpec) -> Self {
        self.connect_retry = spec;
        self
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Credential in use
    #[must_use]
    pub const fn credential(&self) -> &AuthCredential {
        &self.credential
    }

    /// Absolute URL for a path below the base
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    async fn send_once(&self, method: &Method, url: &str, body: Option<&str>) -> HarnessResult<String> {
        debug!(%method, url, "rest call");
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, self.credential.authorization());
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }
        let response = request
            .send()
            .await
            .map_err(|e| HarnessError::from_reqwest(url, &e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HarnessError::from_reqwest(url, &e))?;
        if !status.is_success() {
            return Err(HarnessError::Http {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    /// Authenticated call; returns the response body.
    ///
    /// Connect failures are retried per the connect policy. Any received
    /// non-2xx status fails immediately with [`HarnessError::Http`].
    pub async fn call(&self, method: Method, path: &str, body: Option<&str>) -> HarnessResult<String> {
        let url = self.url(path);
        let (method, url) = (&method, url.as_str());
        retry_with(self.connect_retry, move || self.send_once(method, url, body)).await
    }

    /// Names of every resource of a kind
    pub async fn list(&self, kind: ResourceKind) -> HarnessResult<Vec<String>> {
        let body = self.call(Method::GET, kind.as_str(), None).await?;
        let response: ListResponse = serde_json::from_str(&body)?;
        Ok(response.items.unwrap_or_default())
    }

    /// Create or update a resource with a JSON body.
    ///
    /// `path` is appended to the kind's collection; a missing leading slash
    /// is added.
    pub async fn create(
        &self,
        kind: ResourceKind,
        path: Option<&str>,
        body: &str,
    ) -> HarnessResult<String> {
        let path = match path {
            None | Some("") => String::new(),
            Some(p) if p.starts_with('/') => p.to_string(),
            Some(p) => format!("/{p}"),
        };
        self.call(Method::PUT, &format!("{}{path}", kind.as_str()), Some(body))
            .await
    }

    /// Delete one resource
    pub async fn delete(&self, kind: ResourceKind, name: &str) -> HarnessResult<()> {
        self.call(Method::DELETE, &format!("{}/{name}", kind.as_str()), None)
            .await
            .map(|_| ())
    }

    /// Succeeds once the backend accepts connections and answers a listing
    pub async fn wait_until_reachable(&self) -> HarnessResult<()> {
        self.list(ResourceKind::Users).await.map(|_| ())
    }
}

#[async_trait]
impl ResourceBackend for RestClient {
    async fn list(&self, kind: ResourceKind) -> HarnessResult<Vec<String>> {
        RestClient::list(self, kind).await
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> HarnessResult<()> {
        RestClient::delete(self, kind, name).await
    }
}
