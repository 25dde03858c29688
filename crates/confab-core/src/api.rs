//! Thin REST client shared by every service crate.
//!
//! Wraps a [`reqwest::Client`] with the base URL, bearer auth, and JSON
//! request/response handling so the service layers only describe resources
//! and payloads.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::defaults;
use crate::error::{Error, Result};

/// REST client for the Confab platform API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ApiClient {
    /// Create a client against the given base URL with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(defaults::HTTP_TIMEOUT_SECS))
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        info!(base_url = %base_url, "Initializing API client");

        Self {
            client,
            base_url,
            auth_token: None,
        }
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CONFAB_API_BASE` | `https://api.confab.io/v1` | REST base URL |
    /// | `CONFAB_AUTH_TOKEN` | unset | Bearer token |
    /// | `CONFAB_HTTP_TIMEOUT_SECS` | `30` | Request timeout |
    pub fn from_env() -> Self {
        let base_url = std::env::var("CONFAB_API_BASE")
            .unwrap_or_else(|_| defaults::API_BASE_URL.to_string());
        let timeout = std::env::var("CONFAB_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::HTTP_TIMEOUT_SECS);

        let mut api = Self::with_timeout(base_url, Duration::from_secs(timeout));
        if let Ok(token) = std::env::var("CONFAB_AUTH_TOKEN") {
            if !token.is_empty() {
                api.auth_token = Some(token);
            }
        }
        api
    }

    /// Set the bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, resource: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.url(resource));
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "API request failed");
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(if message.is_empty() {
                status.to_string()
            } else {
                message
            }));
        }
        Err(Error::Http {
            status: status.as_u16(),
            message,
        })
    }

    /// `GET` a resource and deserialize the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        let response = self.request(Method::GET, resource).send().await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    /// `GET` a resource with query parameters and deserialize the JSON body.
    pub async fn get_json_query<Q: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &Q,
    ) -> Result<T> {
        let response = self
            .request(Method::GET, resource)
            .query(query)
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    /// `POST` a JSON body and deserialize the JSON response.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request(Method::POST, resource)
            .json(body)
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    /// `PUT` a JSON body and deserialize the JSON response.
    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request(Method::PUT, resource)
            .json(body)
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    /// `DELETE` a resource. A `204 No Content` answer is success with no body.
    pub async fn delete(&self, resource: &str) -> Result<()> {
        let response = self.request(Method::DELETE, resource).send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            debug!(resource = resource, "Delete returned 204");
            return Ok(());
        }
        Self::check_status(response).await?;
        Ok(())
    }
}
