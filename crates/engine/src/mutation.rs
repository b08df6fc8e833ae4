//! Mutation gateway
//!
//! Validating front-end over the store's insert: rejects empty fields,
//! normalizes the raw tag specification, and keeps the tag index in
//! step with every committed write.

use crate::Engine;
use tagpress_common::db::{ArticleStore, NewArticle};
use tagpress_common::errors::{AppError, Result};
use tracing::info;

/// Non-whitespace characters accepted as tag separators
const TAG_DELIMITERS: &[char] = &['|', ',', ';', '-'];

/// Normalize a raw tag specification into a deduplicated, lower-cased
/// list of tag names. Splits on `|`, `,`, `;`, `-`, and whitespace;
/// empty tokens are dropped. First-seen order is preserved.
pub fn normalize_tag_spec(spec: &str) -> Vec<String> {
    let mut names = Vec::new();
    for token in spec.split(|c: char| c.is_whitespace() || TAG_DELIMITERS.contains(&c)) {
        let name = token.to_lowercase();
        if name.is_empty() || names.contains(&name) {
            continue;
        }
        names.push(name);
    }
    names
}

impl<S: ArticleStore> Engine<S> {
    /// Insert an article from raw user input.
    ///
    /// Empty/whitespace-only title or body is rejected before the
    /// store is touched; when both are invalid the title is the
    /// reported reason. On success the committed article and its
    /// resolved tags are applied to the tag index before returning.
    pub async fn insert_article(&self, title: &str, body: &str, tag_spec: &str) -> Result<i64> {
        if title.trim().is_empty() {
            return Err(AppError::MissingField {
                field: "title".to_string(),
            });
        }
        if body.trim().is_empty() {
            return Err(AppError::MissingField {
                field: "body".to_string(),
            });
        }

        let tags = normalize_tag_spec(tag_spec);
        let inserted = self
            .store()
            .insert_article(NewArticle {
                title,
                body,
                tags: &tags,
            })
            .await?;

        {
            let mut index = self.index().write().expect("tag index lock poisoned");
            index.apply(inserted.id, &inserted.tags);
        }

        info!(
            article_id = inserted.id,
            title = %title,
            tag_count = inserted.tags.len(),
            "Article inserted"
        );

        Ok(inserted.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemStore;
    use tagpress_common::db::{MAX_TAG_LEN, MAX_TITLE_LEN};

    #[test]
    fn test_normalize_splits_on_every_delimiter() {
        assert_eq!(
            normalize_tag_spec("a|b,c;d-e f\tg"),
            vec!["a", "b", "c", "d", "e", "f", "g"]
        );
    }

    #[test]
    fn test_normalize_lowercases_and_dedups() {
        assert_eq!(normalize_tag_spec("Rust, rust, RUST"), vec!["rust"]);
        assert_eq!(normalize_tag_spec("Db;db Tools,tools"), vec!["db", "tools"]);
    }

    #[test]
    fn test_normalize_drops_empty_tokens() {
        assert_eq!(normalize_tag_spec("a,,b||c  ;-"), vec!["a", "b", "c"]);
        assert!(normalize_tag_spec("  |;,- ").is_empty());
        assert!(normalize_tag_spec("").is_empty());
    }

    #[tokio::test]
    async fn test_insert_rejects_empty_title_before_body() {
        let engine = Engine::new(MemStore::new());

        // Both fields invalid: the title is the reported reason
        let err = engine.insert_article("   ", "", "x").await.unwrap_err();
        match err {
            AppError::MissingField { field } => assert_eq!(field, "title"),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = engine.insert_article("ok", "  \n ", "x").await.unwrap_err();
        match err {
            AppError::MissingField { field } => assert_eq!(field, "body"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_title_fails_once() {
        let engine = Engine::new(MemStore::new());

        engine.insert_article("T1", "B1", "x y").await.unwrap();
        let count_after_first = engine.store().article_count();

        let err = engine.insert_article("T1", "other", "z").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateTitle { .. }));

        // The failed insert left no partial state behind
        assert_eq!(engine.store().article_count(), count_after_first);
    }

    #[tokio::test]
    async fn test_shared_tag_name_reuses_record() {
        let engine = Engine::new(MemStore::new());

        let a = engine.insert_article("T1", "B1", "shared x").await.unwrap();
        let b = engine.insert_article("T2", "B2", "shared y").await.unwrap();

        let first = engine.get_article_by_id(a).await.unwrap().unwrap();
        let second = engine.get_article_by_id(b).await.unwrap().unwrap();

        let id_in_first = first.tags.iter().find(|t| t.name == "shared").unwrap().id;
        let id_in_second = second.tags.iter().find(|t| t.name == "shared").unwrap().id;
        assert_eq!(id_in_first, id_in_second);
        assert_eq!(engine.store().tag_count(), 3); // shared, x, y
    }

    #[tokio::test]
    async fn test_title_length_boundary() {
        let engine = Engine::new(MemStore::new());

        let exact = "t".repeat(MAX_TITLE_LEN);
        assert!(engine.insert_article(&exact, "body", "tag").await.is_ok());

        let over = "t".repeat(MAX_TITLE_LEN + 1);
        let err = engine.insert_article(&over, "body", "tag").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_long_title_reported_before_long_tag() {
        let engine = Engine::new(MemStore::new());

        let title = "t".repeat(MAX_TITLE_LEN + 1);
        let spec = "g".repeat(MAX_TAG_LEN + 1);
        let err = engine.insert_article(&title, "body", &spec).await.unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("title")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tag_spec_normalized_before_storage() {
        let engine = Engine::new(MemStore::new());

        let id = engine.insert_article("T1", "B1", "Rust|DB,rust").await.unwrap();
        let article = engine.get_article_by_id(id).await.unwrap().unwrap();

        let mut names: Vec<&str> = article.tags.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["db", "rust"]);
    }

    #[tokio::test]
    async fn test_insert_updates_index() {
        let engine = Engine::new(MemStore::new());
        assert_eq!(engine.index_size(), (0, 0));

        engine.insert_article("T1", "B1", "x y").await.unwrap();
        assert_eq!(engine.index_size(), (2, 1));
    }
}
