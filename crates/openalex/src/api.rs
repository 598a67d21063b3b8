//! REST client for the OpenAlex API and the S3 snapshot bucket.
//!
//! Wraps the HTTP endpoints the pipeline needs (institution lookup and
//! search, filtered work listing, snapshot manifest and data files)
//! using [`reqwest`].

use aphrc_core::work::OpenAlexWork;
use serde::Deserialize;

/// Public OpenAlex REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openalex.org";

/// HTTP front of the `openalex` S3 bucket.
pub const DEFAULT_SNAPSHOT_URL: &str = "https://openalex.s3.amazonaws.com";

/// Bucket prefix used by `s3://` URLs in the snapshot manifest.
const S3_BUCKET_PREFIX: &str = "s3://openalex/";

/// HTTP client for OpenAlex.
#[derive(Debug, Clone)]
pub struct OpenAlexApi {
    client: reqwest::Client,
    api_url: String,
    snapshot_url: String,
}

/// An institution entity (only the fields the pipeline uses).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Institution {
    pub id: String,
    pub display_name: String,
}

/// Pagination metadata of a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListMeta {
    /// Total number of matching entities.
    pub count: u64,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// One page of `/works` results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorksPage {
    pub meta: ListMeta,
    pub results: Vec<OpenAlexWork>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct InstitutionsPage {
    results: Vec<Institution>,
}

/// Snapshot manifest listing every works data file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManifestEntry {
    pub url: String,
    pub meta: Option<ManifestEntryMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManifestEntryMeta {
    pub record_count: Option<u64>,
}

/// Errors from the OpenAlex HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum OpenAlexError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// OpenAlex returned a non-2xx status code.
    #[error("OpenAlex API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A payload could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl Default for OpenAlexApi {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL.to_string(), DEFAULT_SNAPSHOT_URL.to_string())
    }
}

impl OpenAlexApi {
    /// * `api_url` - REST base URL, e.g. `https://api.openalex.org`.
    /// * `snapshot_url` - HTTP base of the snapshot bucket.
    pub fn new(api_url: String, snapshot_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, snapshot_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String, snapshot_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            snapshot_url: snapshot_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /institutions/{id}`.
    pub async fn get_institution(&self, id: &str) -> Result<Institution, OpenAlexError> {
        let response = self
            .client
            .get(format!("{}/institutions/{id}", self.api_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `GET /institutions?search=...`.
    pub async fn search_institutions(&self, query: &str) -> Result<Vec<Institution>, OpenAlexError> {
        let response = self
            .client
            .get(format!("{}/institutions", self.api_url))
            .query(&[("search", query)])
            .send()
            .await?;

        let page: InstitutionsPage = Self::parse_response(response).await?;
        Ok(page.results)
    }

    /// `GET /works?filter=...&page=...&per-page=...`.
    pub async fn list_works(
        &self,
        filter: &str,
        page: u32,
        per_page: u32,
    ) -> Result<WorksPage, OpenAlexError> {
        let response = self
            .client
            .get(format!("{}/works", self.api_url))
            .query(&[
                ("filter", filter.to_string()),
                ("page", page.to_string()),
                ("per-page", per_page.to_string()),
            ])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download the works manifest of the snapshot.
    pub async fn get_manifest(&self) -> Result<Manifest, OpenAlexError> {
        let response = self
            .client
            .get(format!("{}/data/works/manifest", self.snapshot_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download a snapshot data file. `s3://openalex/` URLs are rewritten
    /// to the HTTP front of the bucket.
    pub async fn download_snapshot_file(&self, url: &str) -> Result<Vec<u8>, OpenAlexError> {
        let response = self.client.get(self.snapshot_http_url(url)).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// HTTP URL for a manifest entry.
    pub fn snapshot_http_url(&self, url: &str) -> String {
        match url.strip_prefix(S3_BUCKET_PREFIX) {
            Some(key) => format!("{}/{key}", self.snapshot_url),
            None => url.to_string(),
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, otherwise return
    /// [`OpenAlexError::Api`] with the status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, OpenAlexError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(OpenAlexError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, OpenAlexError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| OpenAlexError::Decode(e.to_string()))
    }
}
