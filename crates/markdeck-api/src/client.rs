use reqwest::{multipart, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry, RetryConfig};
use crate::wire::{
    ApiBookmark, BookmarksData, Envelope, ErrorBody, FavoriteCreated, FaviconUpload,
    FavoritesData, NewFavorite, ObsoleteData, StatusResponse,
};

pub const DEFAULT_USER_AGENT: &str = concat!("Markdeck/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Server rejected the operation: {0}")]
    Rejected(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether trying the same request again could help
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::RequestFailed { status, .. } => StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            ApiError::NetworkError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Client for the bookmark backend REST API
///
/// Every method takes the bearer token as an `Option`; whether an endpoint
/// needs one is the caller's call.
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_user_agent(base_url, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(base_url: impl Into<String>, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    /// Replace the retry policy used for GET requests
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET /bookmarks`
    pub async fn get_bookmarks(&self, token: Option<&str>) -> Result<Vec<ApiBookmark>> {
        let data: BookmarksData = self.get_data("bookmarks", token).await?;
        Ok(data.bookmarks)
    }

    /// `GET /favorites`
    pub async fn get_favorites(&self, token: Option<&str>) -> Result<Vec<ApiBookmark>> {
        let data: FavoritesData = self.get_data("favorites", token).await?;
        Ok(data.favorites)
    }

    /// `GET /obsolete-bookmarks`
    pub async fn get_obsolete_bookmarks(&self, token: Option<&str>) -> Result<Vec<ApiBookmark>> {
        let data: ObsoleteData = self.get_data("obsolete-bookmarks", token).await?;
        Ok(data.obsolete_bookmarks)
    }

    /// `POST /favorites`; returns the stored record when the server echoes it
    pub async fn add_favorite(
        &self,
        token: Option<&str>,
        favorite: &NewFavorite<'_>,
    ) -> Result<Option<ApiBookmark>> {
        let url = self.endpoint("favorites");
        debug!("POST {}", url);

        let request = authorize(self.client.post(&url).json(favorite), token);
        let response = check(request.send().await?).await?;
        let body = response.text().await?;

        if body.trim().is_empty() {
            return Ok(None);
        }

        let created: FavoriteCreated = serde_json::from_str(&body)?;
        Ok(created.data.and_then(|d| d.favorite))
    }

    /// `DELETE /favorites/:url` with the URL percent-encoded as one segment
    pub async fn remove_favorite(&self, token: Option<&str>, url: &str) -> Result<()> {
        let endpoint = self.endpoint(&favorite_path(url));
        debug!("DELETE {}", endpoint);

        let request = authorize(self.client.delete(&endpoint), token);
        check(request.send().await?).await?;
        Ok(())
    }

    /// `POST /favicons` as multipart `{url, favicon}`
    pub async fn upload_favicon(
        &self,
        token: Option<&str>,
        url: &str,
        upload: FaviconUpload,
    ) -> Result<()> {
        let endpoint = self.endpoint("favicons");
        debug!("POST {} ({} bytes for {})", endpoint, upload.bytes.len(), url);

        let part = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let form = multipart::Form::new()
            .text("url", url.to_string())
            .part("favicon", part);

        let request = authorize(self.client.post(&endpoint).multipart(form), token);
        let response = check(request.send().await?).await?;
        expect_success(response, "favicon upload").await
    }

    /// `POST /update` - asks the server to reprocess its bookmark sources
    pub async fn trigger_update(&self, token: Option<&str>) -> Result<()> {
        self.post_action("update", token).await
    }

    /// `POST /xbel-reload` - asks the server to re-ingest the XBEL export
    pub async fn reload_xbel(&self, token: Option<&str>) -> Result<()> {
        self.post_action("xbel-reload", token).await
    }

    async fn post_action(&self, path: &str, token: Option<&str>) -> Result<()> {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let request = authorize(self.client.post(&url).json(&serde_json::json!({})), token);
        let response = check(request.send().await?).await?;
        expect_success(response, path).await
    }

    /// GET an enveloped collection, retrying transient failures
    async fn get_data<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T> {
        let url = &self.endpoint(path);

        with_retry(&self.retry_config, ApiError::is_transient, move || async move {
            debug!("GET {}", url);
            let request = authorize(self.client.get(url), token);
            let response = check(request.send().await?).await?;
            let body = response.text().await?;
            let envelope: Envelope<T> = serde_json::from_str(&body)?;
            Ok(envelope.data)
        })
        .await
    }
}

/// Path of a single favorite resource
pub fn favorite_path(url: &str) -> String {
    format!("favorites/{}", urlencoding::encode(url))
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::AuthRequired);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::RequestFailed {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }

    Ok(response)
}

async fn expect_success(response: Response, operation: &str) -> Result<()> {
    let body = response.text().await?;
    let reply: StatusResponse = serde_json::from_str(&body)?;

    if reply.is_success() {
        Ok(())
    } else {
        Err(ApiError::Rejected(reply.message.unwrap_or_else(|| {
            format!("{} returned status '{}'", operation, reply.status)
        })))
    }
}

/// Prefer the server's `message` field; fall back to status and raw body
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { message: Some(message) }) = serde_json::from_str::<ErrorBody>(body) {
        if !message.is_empty() {
            return message;
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("Status {}", status)
    } else {
        format!("Status {}: {}", status, body)
    }
}
