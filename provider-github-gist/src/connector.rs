//! GitHub Gist API connector implementation
//!
//! Implements the `RemoteBlobStore` trait on top of the Gist REST API.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{RemoteBlob, RemoteBlobStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::GistError;
use crate::types::{single_file, CreateGistRequest, Gist, GistUser, UpdateGistRequest};

/// GitHub REST API base URL
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Maximum results per page (GitHub API limit)
const MAX_PAGE_SIZE: u32 = 100;

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

const GITHUB_API_VERSION: &str = "2022-11-28";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub Gist connector
///
/// # Features
///
/// - Token verification against `/user`
/// - Paginated gist listing
/// - Private single-file gist creation and in-place update
/// - Raw content download for truncated files
///
/// # Example
///
/// ```ignore
/// use provider_github_gist::GistConnector;
/// use bridge_traits::storage::RemoteBlobStore;
///
/// let connector = GistConnector::new(http_client);
/// let login = connector.verify_credential(&token).await?;
/// ```
pub struct GistConnector {
    http_client: Arc<dyn HttpClient>,
    api_base: String,
    retry_policy: RetryPolicy,
}

impl GistConnector {
    /// Create a connector against the public GitHub API
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_api_base(http_client, GITHUB_API_BASE)
    }

    /// Create a connector against a custom API base (GitHub Enterprise, tests)
    pub fn with_api_base(http_client: Arc<dyn HttpClient>, api_base: impl Into<String>) -> Self {
        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn request(&self, method: HttpMethod, path: &str, credential: &str) -> HttpRequest {
        HttpRequest::new(method, format!("{}{}", self.api_base, path))
            .bearer_token(credential)
            .accept(GITHUB_MEDIA_TYPE)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .timeout(REQUEST_TIMEOUT)
    }

    /// Execute a request and turn any non-2xx status into a [`GistError`]
    ///
    /// Retries for 5xx/429 and transport failures are left to the
    /// `HttpClient` implementation.
    async fn send(&self, request: HttpRequest, resource: &str) -> Result<HttpResponse> {
        let response = self
            .http_client
            .execute_with_retry(request, self.retry_policy.clone())
            .await?;

        if response.is_success() {
            debug!(status = response.status, resource, "GitHub API request succeeded");
            return Ok(response);
        }

        warn!(status = response.status, resource, "GitHub API request failed");
        Err(GistError::from_status(response.status, resource, &response.body).into())
    }

    fn parse<T: serde::de::DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
        serde_json::from_slice(&response.body).map_err(|e| {
            GistError::ParseError(format!("Failed to parse {}: {}", what, e)).into()
        })
    }
}

#[async_trait]
impl RemoteBlobStore for GistConnector {
    #[instrument(skip(self, credential))]
    async fn verify_credential(&self, credential: &str) -> Result<String> {
        let request = self.request(HttpMethod::Get, "/user", credential);
        let response = self.send(request, "user").await?;
        let user: GistUser = Self::parse(&response, "user profile")?;

        info!(login = %user.login, "Verified GitHub credential");
        Ok(user.login)
    }

    #[instrument(skip(self, credential))]
    async fn list_blobs(&self, credential: &str) -> Result<Vec<RemoteBlob>> {
        let mut blobs = Vec::new();
        let mut page = 1u32;

        loop {
            let path = format!("/gists?per_page={}&page={}", MAX_PAGE_SIZE, page);
            let request = self.request(HttpMethod::Get, &path, credential);
            let response = self.send(request, "gists").await?;
            let gists: Vec<Gist> = Self::parse(&response, "gist list")?;

            let fetched = gists.len();
            blobs.extend(gists.into_iter().map(RemoteBlob::from));

            // A short page is the last one
            if fetched < MAX_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        info!(count = blobs.len(), pages = page, "Listed gists");
        Ok(blobs)
    }

    #[instrument(skip(self, credential), fields(gist_id = %id))]
    async fn get_blob(&self, credential: &str, id: &str) -> Result<RemoteBlob> {
        let request = self.request(HttpMethod::Get, &format!("/gists/{}", id), credential);
        let response = self.send(request, &format!("gist {}", id)).await?;
        let gist: Gist = Self::parse(&response, "gist")?;

        Ok(gist.into())
    }

    #[instrument(skip(self, credential, content), fields(bytes = content.len()))]
    async fn create_blob(
        &self,
        credential: &str,
        description: &str,
        file_name: &str,
        content: &str,
    ) -> Result<RemoteBlob> {
        let body = CreateGistRequest {
            description,
            public: false,
            files: single_file(file_name, content),
        };
        let request = self
            .request(HttpMethod::Post, "/gists", credential)
            .json(&body)?;
        let response = self.send(request, "gists").await?;
        let gist: Gist = Self::parse(&response, "created gist")?;

        info!(gist_id = %gist.id, "Created gist");
        Ok(gist.into())
    }

    #[instrument(skip(self, credential, content), fields(gist_id = %id, bytes = content.len()))]
    async fn update_blob(
        &self,
        credential: &str,
        id: &str,
        file_name: &str,
        content: &str,
    ) -> Result<RemoteBlob> {
        let body = UpdateGistRequest {
            files: single_file(file_name, content),
        };
        let request = self
            .request(HttpMethod::Patch, &format!("/gists/{}", id), credential)
            .json(&body)?;
        let response = self.send(request, &format!("gist {}", id)).await?;
        let gist: Gist = Self::parse(&response, "updated gist")?;

        info!(gist_id = %gist.id, "Updated gist");
        Ok(gist.into())
    }

    #[instrument(skip(self, credential))]
    async fn fetch_raw(&self, credential: &str, raw_url: &str) -> Result<String> {
        let request = HttpRequest::new(HttpMethod::Get, raw_url)
            .bearer_token(credential)
            .timeout(Duration::from_secs(60));
        let response = self.send(request, raw_url).await?;

        info!(bytes = response.body.len(), "Downloaded raw gist content");
        response.text()
    }
}
