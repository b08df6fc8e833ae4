//! Storage port for the retrieval engine
//!
//! The engine talks to storage through the [`ArticleStore`] trait so its
//! semantics can be exercised against an in-memory implementation in
//! tests. The production implementation is [`super::Repository`].

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of an article title, in characters
pub const MAX_TITLE_LEN: usize = 256;

/// Maximum length of a tag name, in characters
pub const MAX_TAG_LEN: usize = 32;

/// A stored tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
}

/// A fully hydrated article, tags included
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<TagRecord>,
}

/// One row of the article-tag association relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagAssociation {
    pub article_id: i64,
    pub tag_id: i64,
}

/// Input for an article insert
///
/// Tag names are expected to be normalized already (lower-cased,
/// deduplicated); the mutation gateway owns that step.
#[derive(Debug, Clone)]
pub struct NewArticle<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub tags: &'a [String],
}

/// Result of a successful insert: the new id plus the resolved tags,
/// so the caller can update the tag index without re-reading storage.
#[derive(Debug, Clone)]
pub struct InsertedArticle {
    pub id: i64,
    pub tags: Vec<TagRecord>,
}

/// Filter for substring search, optionally restricted to an id set
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Case-insensitive substring test against the title
    pub title_substr: Option<String>,

    /// Case-insensitive substring test against the body
    pub body_substr: Option<String>,

    /// Restrict results to these article ids (tag filter push-down)
    pub ids: Option<Vec<i64>>,
}

impl SearchFilter {
    /// True when no filter criterion is set
    pub fn is_empty(&self) -> bool {
        self.title_substr.is_none() && self.body_substr.is_none() && self.ids.is_none()
    }
}

/// Length validation shared by every store implementation.
///
/// Order matters: the title is checked before any tag name, and all
/// checks run before any persistence attempt.
pub fn validate_new_article(new: &NewArticle<'_>) -> Result<()> {
    if new.title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation {
            message: format!("title exceeds {} characters", MAX_TITLE_LEN),
            field: Some("title".to_string()),
        });
    }

    for tag in new.tags {
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(AppError::Validation {
                message: format!("tag name '{}' exceeds {} characters", tag, MAX_TAG_LEN),
                field: Some("tags".to_string()),
            });
        }
    }

    Ok(())
}

/// Transactional article/tag storage
///
/// Implementations must guarantee:
/// - `insert_article` commits the article row, any new tag rows, and
///   the association rows as one atomic unit, or nothing at all
/// - title uniqueness is arbitrated by the storage backend itself, so
///   two concurrent inserts of the same title yield exactly one
///   success and one `DuplicateTitle`
/// - an existing tag name is reused, never duplicated
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert an article with its full tag set. Tag names that do not
    /// exist yet are created; existing ones are reused.
    async fn insert_article(&self, new: NewArticle<'_>) -> Result<InsertedArticle>;

    /// Fetch an article by id, tags hydrated
    async fn find_article_by_id(&self, id: i64) -> Result<Option<ArticleRecord>>;

    /// Fetch an article by exact title, tags hydrated
    async fn find_article_by_title(&self, title: &str) -> Result<Option<ArticleRecord>>;

    /// Substring search in storage (ascending id) order. An empty
    /// filter returns every article.
    async fn search_articles(&self, filter: &SearchFilter) -> Result<Vec<ArticleRecord>>;

    /// All tag rows, for index rebuild
    async fn load_tags(&self) -> Result<Vec<TagRecord>>;

    /// The raw association relation, for index rebuild
    async fn load_tag_associations(&self) -> Result<Vec<TagAssociation>>;

    /// Destructive reset used only by test harnesses
    async fn drop_all(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_checked_before_tags() {
        let long_title = "t".repeat(MAX_TITLE_LEN + 1);
        let long_tag = vec!["g".repeat(MAX_TAG_LEN + 1)];
        let new = NewArticle {
            title: &long_title,
            body: "body",
            tags: &long_tag,
        };

        // Both are invalid; the reported field must be the title
        let err = validate_new_article(&new).unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("title")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_boundary_lengths_pass() {
        let title = "t".repeat(MAX_TITLE_LEN);
        let tags = vec!["g".repeat(MAX_TAG_LEN)];
        let new = NewArticle {
            title: &title,
            body: "body",
            tags: &tags,
        };
        assert!(validate_new_article(&new).is_ok());
    }

    #[test]
    fn test_over_long_tag_rejected() {
        let tags = vec!["ok".to_string(), "g".repeat(MAX_TAG_LEN + 1)];
        let new = NewArticle {
            title: "fine",
            body: "body",
            tags: &tags,
        };
        let err = validate_new_article(&new).unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("tags")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
