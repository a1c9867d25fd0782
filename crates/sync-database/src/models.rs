//! Database model types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a row in `sync_operations`.
pub type OperationId = i64;

/// What a sync operation asks the remote to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Publish,
    Unpublish,
    PublishUpdate,
    /// Create or update a charter; decided by the presence of a remote id.
    CharterUpsert,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::PublishUpdate => "publish_update",
            Self::CharterUpsert => "charter_upsert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "publish" => Some(Self::Publish),
            "unpublish" => Some(Self::Unpublish),
            "publish_update" => Some(Self::PublishUpdate),
            "charter_upsert" => Some(Self::CharterUpsert),
            _ => None,
        }
    }
}

/// Lifecycle state of a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl Default for OperationStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Who can see a content item or charter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Unlisted,
    Public,
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Private
    }
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Unlisted => "unlisted",
            Self::Public => "public",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "private" => Some(Self::Private),
            "unlisted" => Some(Self::Unlisted),
            "public" => Some(Self::Public),
            _ => None,
        }
    }

    /// Unlisted and public content lives on the server.
    pub fn is_shared(&self) -> bool {
        !matches!(self, Self::Private)
    }
}

/// Sync status projected onto a content item or charter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Never synced.
    Local,
    Queued,
    Syncing,
    Synced,
    /// Waiting for a retry.
    Pending,
    Failed,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::Local
    }
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Queued => "queued",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(Self::Local),
            "queued" => Some(Self::Queued),
            "syncing" => Some(Self::Syncing),
            "synced" => Some(Self::Synced),
            "pending" => Some(Self::Pending),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A persisted unit of sync work.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOperation {
    pub id: OperationId,
    pub content_id: String,
    pub kind: OperationKind,
    pub visibility: Visibility,
    /// Serialized payload snapshot, opaque to the store.
    pub payload: String,
    pub status: OperationStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// New operation for insertion.
#[derive(Debug, Clone)]
pub struct NewSyncOperation {
    pub content_id: String,
    pub kind: OperationKind,
    pub visibility: Visibility,
    pub payload: String,
}

/// Local changes committed in the same transaction as a new operation.
///
/// The record's sync status always becomes `queued`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueEffects {
    /// Pending operations of these kinds for the same record are cancelled.
    pub cancel_kinds: Vec<OperationKind>,
    /// New local visibility of the content item, if the action changes it.
    pub visibility: Option<Visibility>,
}

/// Result of a transactional enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueReceipt {
    pub operation_id: OperationId,
    /// Pending operations cancelled by [`EnqueueEffects::cancel_kinds`].
    pub cancelled: usize,
}

/// Server-assigned fields attached after a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicMetadata {
    pub public_id: String,
    pub published_at: DateTime<Utc>,
    pub can_fork: bool,
    pub author_username: Option<String>,
}

/// Pending/failed operation counts for status badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub failed: u64,
}

/// Structured content of a shareable item, one schema per content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBody {
    Checklist { sections: Vec<ChecklistSection> },
    PracticeGuide { sections: Vec<GuideSection> },
    FlashcardDeck { cards: Vec<Flashcard> },
}

impl ContentBody {
    /// Wire name of the content type.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Checklist { .. } => "checklist",
            Self::PracticeGuide { .. } => "practice_guide",
            Self::FlashcardDeck { .. } => "flashcard_deck",
        }
    }

    /// True when there is nothing worth sharing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Checklist { sections } => sections.iter().all(|s| s.items.is_empty()),
            Self::PracticeGuide { sections } => sections.is_empty(),
            Self::FlashcardDeck { cards } => cards.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistSection {
    pub title: String,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideSection {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// A local checklist, practice guide or flashcard deck.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub body: ContentBody,
    pub tags: Vec<String>,
    pub language: String,
    pub visibility: Visibility,
    pub sync_status: SyncStatus,
    pub public_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub can_fork: bool,
    pub author_username: Option<String>,
    pub forked_from_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Whether the local record carries public metadata from a publish.
    pub fn looks_published(&self) -> bool {
        self.public_id.is_some() && self.published_at.is_some()
    }
}

/// New content item for insertion.
#[derive(Debug, Clone)]
pub struct NewContentItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub body: ContentBody,
    pub tags: Vec<String>,
    pub language: String,
    pub forked_from_id: Option<String>,
}

/// A planned sailing charter.
#[derive(Debug, Clone, PartialEq)]
pub struct Charter {
    pub id: String,
    pub name: String,
    pub boat_name: Option<String>,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: u32,
    pub notes: Option<String>,
    pub visibility: Visibility,
    /// Server-side id once the charter has been created remotely.
    pub remote_id: Option<String>,
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Charter fields the user edits; used to insert or update a charter.
#[derive(Debug, Clone)]
pub struct CharterDraft {
    pub id: String,
    pub name: String,
    pub boat_name: Option<String>,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: u32,
    pub notes: Option<String>,
    pub visibility: Visibility,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_strings_roundtrip() {
        for kind in [
            OperationKind::Publish,
            OperationKind::Unpublish,
            OperationKind::PublishUpdate,
            OperationKind::CharterUpsert,
        ] {
            assert_eq!(OperationKind::parse(kind.as_str()), Some(kind));
        }
        for status in [
            SyncStatus::Local,
            SyncStatus::Queued,
            SyncStatus::Syncing,
            SyncStatus::Synced,
            SyncStatus::Pending,
            SyncStatus::Failed,
        ] {
            assert_eq!(SyncStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OperationKind::parse("delete"), None);
        assert_eq!(Visibility::parse("PUBLIC"), Some(Visibility::Public));
    }

    #[test]
    fn content_body_uses_type_tag() {
        let body = ContentBody::FlashcardDeck {
            cards: vec![Flashcard {
                front: "Port".to_string(),
                back: "Left side facing forward".to_string(),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "flashcard_deck");
        assert_eq!(json["cards"][0]["front"], "Port");
        assert_eq!(body.content_type(), "flashcard_deck");
    }

    #[test]
    fn checklist_without_items_is_empty() {
        let body = ContentBody::Checklist {
            sections: vec![ChecklistSection {
                title: "Engine".to_string(),
                items: vec![],
            }],
        };
        assert!(body.is_empty());
        assert!(!Visibility::Private.is_shared());
        assert!(Visibility::Unlisted.is_shared());
    }
}
