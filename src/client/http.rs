use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error: {0}")]
    Api(ApiError),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Minimal JSON client for the backend; failures come back as [`ApiError`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let mut request = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.bytes().await?;
        Err(ClientError::Api(error_from_body(status, &body)))
    }
}

/// Parse an ApiError body, or synthesize one from the status when the body isn't one
pub fn error_from_body(status: StatusCode, body: &[u8]) -> ApiError {
    serde_json::from_slice::<ApiError>(body).unwrap_or_else(|_| ApiError::from_status(status))
}
