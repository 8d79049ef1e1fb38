//! HTTP client for the ticket API

use crate::error::ApiError;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "https://my-json-server.typicode.com/neelbakshi94/test-plc";

/// Shape of an error body; only `message` is looked at
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Ticket API client
///
/// One outbound request per call: no retries, no caching, no timeout.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL (trailing slashes are ignored)
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// The configured base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform a JSON request against `endpoint` and parse the response
    ///
    /// # Errors
    ///
    /// - [`ApiError::Http`] for a status outside 200..=299
    /// - [`ApiError::Network`] when no response was received
    /// - [`ApiError::Decode`] when a successful body is not the expected JSON
    #[tracing::instrument(skip(self, body), fields(base_url = %self.base_url))]
    pub async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let mut builder = self
            .client
            .request(method, format!("{}{endpoint}", self.base_url))
            .header("content-type", "application/json")
            .header("accept", "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request failed before a response arrived");
            ApiError::network(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body_message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message);
            let error = ApiError::http(status.as_u16(), status.canonical_reason(), body_message);
            tracing::warn!(status = status.as_u16(), message = %error, "API returned an error");
            return Err(error);
        }

        let bytes = response.bytes().await.map_err(ApiError::network)?;
        tracing::debug!(status = status.as_u16(), len = bytes.len(), "API request succeeded");
        serde_json::from_slice(&bytes).map_err(ApiError::decode)
    }

    /// `GET` helper
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, endpoint, None).await
    }

    /// `POST` helper
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    /// `PUT` helper
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        self.request(Method::PUT, endpoint, Some(body)).await
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
