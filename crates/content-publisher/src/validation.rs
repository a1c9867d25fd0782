//! Pre-publish checks and public identifier generation.

use crate::{PublishError, PublishResult};
use sync_database::{CharterDraft, ContentItem, Visibility};
use uuid::Uuid;

pub const MIN_TITLE_CHARS: usize = 3;
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;
pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_CHARS: usize = 30;

const MAX_SLUG_CHARS: usize = 60;
const MAX_CHARTER_NAME_CHARS: usize = 100;

/// Check that `item` may be shared at `visibility`.
pub fn validate_for_publish(item: &ContentItem, visibility: Visibility) -> PublishResult<()> {
    if !visibility.is_shared() {
        return Err(PublishError::NotPublishable(visibility));
    }
    validate_content(item)
}

/// Field checks shared by first publish and later updates.
pub(crate) fn validate_content(item: &ContentItem) -> PublishResult<()> {
    let title_len = item.title.trim().chars().count();
    if !(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&title_len) {
        return Err(PublishError::InvalidTitle {
            min: MIN_TITLE_CHARS,
            max: MAX_TITLE_CHARS,
        });
    }

    if item.description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(PublishError::DescriptionTooLong {
            max: MAX_DESCRIPTION_CHARS,
        });
    }

    if item.tags.len() > MAX_TAGS {
        return Err(PublishError::TooManyTags { max: MAX_TAGS });
    }
    if let Some(tag) = item.tags.iter().find(|tag| {
        let len = tag.trim().chars().count();
        len == 0 || len > MAX_TAG_CHARS
    }) {
        return Err(PublishError::InvalidTag(tag.clone()));
    }

    if item.body.is_empty() {
        return Err(PublishError::EmptyContent);
    }
    Ok(())
}

pub fn validate_charter(draft: &CharterDraft) -> PublishResult<()> {
    let name_len = draft.name.trim().chars().count();
    if name_len == 0 || name_len > MAX_CHARTER_NAME_CHARS {
        return Err(PublishError::InvalidCharter(format!(
            "name must be between 1 and {MAX_CHARTER_NAME_CHARS} characters"
        )));
    }
    if draft.end_date < draft.start_date {
        return Err(PublishError::InvalidCharter(
            "end date is before start date".to_string(),
        ));
    }
    Ok(())
}

/// Lowercase ASCII slug: alphanumerics kept, everything else collapsed
/// into single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
            if slug.len() >= MAX_SLUG_CHARS {
                break;
            }
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("content");
    }
    slug
}

/// `slug(title)-xxxxxxxx` with eight random hex characters.
pub fn generate_public_id(title: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", slugify(title), &suffix[..8])
}
