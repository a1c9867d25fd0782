//! Operation payload snapshots.
//!
//! A payload is captured when an operation is enqueued and replayed verbatim
//! on every retry, so later local edits never leak into an in-flight
//! operation.

use chrono::NaiveDate;
use remote_api_client::{CharterRequest, PublishRequest, UpdatePublishedRequest};
use serde::{Deserialize, Serialize};
use sync_database::{Charter, ContentBody, ContentItem, OperationKind, Visibility};

/// Everything needed to publish a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishPayload {
    pub title: String,
    pub description: String,
    pub content: ContentBody,
    pub tags: Vec<String>,
    pub language: String,
    pub public_id: String,
    pub can_fork: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forked_from_id: Option<String>,
}

impl PublishPayload {
    pub fn from_item(item: &ContentItem, public_id: impl Into<String>) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            content: item.body.clone(),
            tags: item.tags.clone(),
            language: item.language.clone(),
            public_id: public_id.into(),
            can_fork: item.can_fork,
            forked_from_id: item.forked_from_id.clone(),
        }
    }

    pub fn to_request(&self) -> serde_json::Result<PublishRequest> {
        Ok(PublishRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            content_type: self.content.content_type().to_string(),
            content_data: serde_json::to_value(&self.content)?,
            tags: self.tags.clone(),
            language: self.language.clone(),
            public_id: self.public_id.clone(),
            can_fork: self.can_fork,
            forked_from_id: self.forked_from_id.clone(),
        })
    }
}

/// Unpublish carries only the public identifier, if one was ever assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnpublishPayload {
    #[serde(default)]
    pub public_id: Option<String>,
}

/// Edits pushed to already-published content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishUpdatePayload {
    pub public_id: String,
    pub title: String,
    pub description: String,
    pub content: ContentBody,
    pub tags: Vec<String>,
    pub language: String,
}

impl PublishUpdatePayload {
    pub fn from_item(item: &ContentItem, public_id: impl Into<String>) -> Self {
        Self {
            public_id: public_id.into(),
            title: item.title.clone(),
            description: item.description.clone(),
            content: item.body.clone(),
            tags: item.tags.clone(),
            language: item.language.clone(),
        }
    }

    pub fn to_request(&self) -> serde_json::Result<UpdatePublishedRequest> {
        Ok(UpdatePublishedRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            content_type: self.content.content_type().to_string(),
            content_data: serde_json::to_value(&self.content)?,
            tags: self.tags.clone(),
            language: self.language.clone(),
        })
    }
}

/// Charter fields sent to the backend.
///
/// Whether this becomes a create or an update is decided when the operation
/// runs, from the remote id stored on the local charter at that time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharterSnapshot {
    pub name: String,
    #[serde(default)]
    pub boat_name: Option<String>,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: u32,
    #[serde(default)]
    pub notes: Option<String>,
    pub visibility: Visibility,
}

impl CharterSnapshot {
    pub fn from_charter(charter: &Charter) -> Self {
        Self {
            name: charter.name.clone(),
            boat_name: charter.boat_name.clone(),
            destination: charter.destination.clone(),
            start_date: charter.start_date,
            end_date: charter.end_date,
            guests: charter.guests,
            notes: charter.notes.clone(),
            visibility: charter.visibility,
        }
    }

    pub fn to_request(&self) -> CharterRequest {
        CharterRequest {
            name: self.name.clone(),
            boat_name: self.boat_name.clone(),
            destination: self.destination.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            guests: self.guests,
            notes: self.notes.clone(),
            visibility: self.visibility.as_str().to_string(),
        }
    }
}

/// Stored form of an operation's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationPayload {
    Publish(PublishPayload),
    Unpublish(UnpublishPayload),
    PublishUpdate(PublishUpdatePayload),
    CharterUpsert(CharterSnapshot),
}

impl OperationPayload {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Publish(_) => OperationKind::Publish,
            Self::Unpublish(_) => OperationKind::Unpublish,
            Self::PublishUpdate(_) => OperationKind::PublishUpdate,
            Self::CharterUpsert(_) => OperationKind::CharterUpsert,
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
