//! reqwest-backed [`RemoteApi`] implementation.

use crate::api::{
    CharterRequest, CharterResponse, PublishRequest, PublishResponse, RemoteApi,
    UpdatePublishedRequest, UpdatePublishedResponse,
};
use crate::{error_for_status, ApiError, ApiResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP client for the content backend.
pub struct HttpRemoteApi {
    client: Client,
    base_url: Url,
    access_token: RwLock<Option<String>>,
}

impl HttpRemoteApi {
    /// Create a client with a per-request timeout.
    pub fn new(base_url: Url, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("anchorline-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            access_token: RwLock::new(None),
        })
    }

    /// Builder-style token setter.
    pub fn with_access_token(self, token: Option<String>) -> Self {
        *self.access_token.write() = token;
        self
    }

    /// Replace the bearer token, e.g. after a session refresh.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write() = token;
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::InvalidRequest(format!("base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.access_token.read().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %truncate(&body, 256), "Remote API returned an error");
        Err(error_for_status(status.as_u16()))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn publish(&self, request: &PublishRequest) -> ApiResult<PublishResponse> {
        let url = self.endpoint(&["v1", "published-content"])?;
        debug!(public_id = %request.public_id, content_type = %request.content_type, "Publishing content");
        self.send_json(self.request(Method::POST, url).json(request))
            .await
    }

    async fn unpublish(&self, public_id: &str) -> ApiResult<()> {
        let url = self.endpoint(&["v1", "published-content", public_id])?;
        debug!(public_id, "Unpublishing content");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn update_published(
        &self,
        public_id: &str,
        request: &UpdatePublishedRequest,
    ) -> ApiResult<UpdatePublishedResponse> {
        let url = self.endpoint(&["v1", "published-content", public_id])?;
        debug!(public_id, "Updating published content");
        self.send_json(self.request(Method::PUT, url).json(request))
            .await
    }

    async fn create_charter(&self, request: &CharterRequest) -> ApiResult<CharterResponse> {
        let url = self.endpoint(&["v1", "charters"])?;
        debug!(name = %request.name, "Creating charter");
        self.send_json(self.request(Method::POST, url).json(request))
            .await
    }

    async fn update_charter(
        &self,
        remote_id: &str,
        request: &CharterRequest,
    ) -> ApiResult<CharterResponse> {
        let url = self.endpoint(&["v1", "charters", remote_id])?;
        debug!(remote_id, "Updating charter");
        self.send_json(self.request(Method::PUT, url).json(request))
            .await
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkErrorKind;

    fn client(base: &str) -> HttpRemoteApi {
        HttpRemoteApi::new(Url::parse(base).unwrap(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn endpoint_appends_segments() {
        let api = client("https://api.anchorline.app");
        assert_eq!(
            api.endpoint(&["v1", "published-content"]).unwrap().as_str(),
            "https://api.anchorline.app/v1/published-content"
        );

        let api = client("https://example.com/api/");
        assert_eq!(
            api.endpoint(&["v1", "charters", "c-1"]).unwrap().as_str(),
            "https://example.com/api/v1/charters/c-1"
        );
    }

    #[test]
    fn endpoint_encodes_ids() {
        let api = client("https://api.anchorline.app");
        let url = api
            .endpoint(&["v1", "published-content", "a/b c"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.anchorline.app/v1/published-content/a%2Fb%20c"
        );
    }

    #[test]
    fn endpoint_rejects_non_base_url() {
        let api = client("mailto:crew@anchorline.app");
        assert!(matches!(
            api.endpoint(&["v1"]),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        // Port 9 (discard) on loopback is closed on any sane test machine.
        let api = client("http://127.0.0.1:9").with_access_token(Some("token".to_string()));
        let err = api.unpublish("anything").await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Network {
                kind: NetworkErrorKind::NotConnected | NetworkErrorKind::ConnectionLost,
                ..
            }
        ));
    }
}
