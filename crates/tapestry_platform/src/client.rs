//! HTTP implementation of the platform gateway.

use crate::gateway::{PAGE_SIZE, PlatformGateway};
use crate::wire::{WireChannel, WireMessage, WireThread};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tapestry_error::{PlatformError, PlatformErrorKind, PlatformResult};
use tracing::{debug, instrument};

/// Per-request timeout for platform reads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reqwest-backed [`PlatformGateway`] implementation.
///
/// # Example
/// ```no_run
/// use tapestry_platform::HttpPlatformClient;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpPlatformClient::new("https://api.chat.example", "token")?;
/// # Ok(())
/// # }
/// ```
pub struct HttpPlatformClient {
    base_url: String,
    token: String,
    client: Client,
}

impl HttpPlatformClient {
    /// Create a client against the given API base URL with a bearer token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> PlatformResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PlatformError::from)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> PlatformResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "platform GET");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(PlatformError::from)?;

        let response = Self::check_status(response, path)?;

        response
            .json::<T>()
            .await
            .map_err(|e| PlatformError::new(PlatformErrorKind::Decode(e.to_string())))
    }

    fn check_status(response: Response, path: &str) -> PlatformResult<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(PlatformError::new(PlatformErrorKind::Unauthorized))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                Err(PlatformError::new(PlatformErrorKind::RateLimited))
            }
            StatusCode::NOT_FOUND => Err(PlatformError::new(PlatformErrorKind::NotFound(
                path.to_string(),
            ))),
            status => Err(PlatformError::new(PlatformErrorKind::Status(
                status.as_u16(),
            ))),
        }
    }

    fn page_query(before: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![("limit", PAGE_SIZE.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        query
    }
}

#[async_trait]
impl PlatformGateway for HttpPlatformClient {
    #[instrument(skip(self))]
    async fn list_thread_channels(&self, server_id: &str) -> PlatformResult<Vec<WireChannel>> {
        let channels: Vec<WireChannel> = self
            .get_json(&format!("/servers/{server_id}/channels"), &[])
            .await?;

        Ok(channels
            .into_iter()
            .filter(|c| c.supports_threads)
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_active_threads(
        &self,
        channel_id: &str,
        before: Option<&str>,
    ) -> PlatformResult<Vec<WireThread>> {
        self.get_json(
            &format!("/channels/{channel_id}/threads/active"),
            &Self::page_query(before),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_archived_threads(
        &self,
        channel_id: &str,
        before: Option<&str>,
    ) -> PlatformResult<Vec<WireThread>> {
        self.get_json(
            &format!("/channels/{channel_id}/threads/archived"),
            &Self::page_query(before),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_messages(
        &self,
        thread_id: &str,
        before: Option<&str>,
    ) -> PlatformResult<Vec<WireMessage>> {
        self.get_json(
            &format!("/channels/{thread_id}/messages"),
            &Self::page_query(before),
        )
        .await
    }
}
