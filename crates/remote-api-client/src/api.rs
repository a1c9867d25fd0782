//! The remote API contract and its wire types.

use crate::ApiResult;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/published-content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub title: String,
    pub description: String,
    pub content_type: String,
    /// Structured content, opaque to the transport.
    pub content_data: serde_json::Value,
    pub tags: Vec<String>,
    pub language: String,
    pub public_id: String,
    pub can_fork: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forked_from_id: Option<String>,
}

/// Server view of freshly published content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub id: String,
    pub public_id: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub author_username: Option<String>,
    pub can_fork: bool,
}

/// Body of `PUT /v1/published-content/{public_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePublishedRequest {
    pub title: String,
    pub description: String,
    pub content_type: String,
    pub content_data: serde_json::Value,
    pub tags: Vec<String>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePublishedResponse {
    pub id: String,
    pub public_id: String,
    pub updated_at: DateTime<Utc>,
}

/// Body of the charter create and update calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharterRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boat_name: Option<String>,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub visibility: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharterResponse {
    /// Server-side charter id.
    pub id: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Typed calls against the content backend.
///
/// Implementations must be safe to call from several tasks; the sync engine
/// never calls them concurrently for the same content id.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> ApiResult<PublishResponse>;

    /// Remove published content. Callers treat `NotFound` as success.
    async fn unpublish(&self, public_id: &str) -> ApiResult<()>;

    async fn update_published(
        &self,
        public_id: &str,
        request: &UpdatePublishedRequest,
    ) -> ApiResult<UpdatePublishedResponse>;

    async fn create_charter(&self, request: &CharterRequest) -> ApiResult<CharterResponse>;

    async fn update_charter(
        &self,
        remote_id: &str,
        request: &CharterRequest,
    ) -> ApiResult<CharterResponse>;
}
