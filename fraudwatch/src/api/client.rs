use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::ApiError;
use crate::core::session::Session;

/// HTTP client for the fraud-monitoring backend.
///
/// Cheap to clone; clones share the connection pool. Endpoints live in
/// the sibling modules as further `impl ApiClient` blocks.
///
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// A client carrying the token of `session`, if any.
    pub fn for_session(base_url: impl Into<String>, session: &Session) -> Self {
        let mut client = Self::new(base_url);
        client.token = session.token().map(str::to_string);
        client
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Attaches the bearer token, failing early when there is none.
    pub(crate) fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match &self.token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => {
                warn!("no token available, request not sent");
                Err(ApiError::Unauthenticated)
            }
        }
    }

    /// Sends the request and turns any non-success status into an error.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "backend response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            warn!(status = status.as_u16(), body = %body, "backend server error");
        }
        Err(ApiError::from_status(status.as_u16(), &body))
    }

    pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Authenticated GET decoding a JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.authorized(self.http.get(self.url(path)))?;
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// Authenticated POST with an optional JSON body, decoding a JSON reply.
    pub(crate) async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.send(self.authorized(request)?).await?;
        Self::decode(response).await
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_URL)
    }
}
