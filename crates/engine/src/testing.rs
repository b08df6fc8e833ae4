//! In-memory [`ArticleStore`] used by the engine's tests
//!
//! Mirrors the production store's contract: sequential ids, title
//! uniqueness arbitration, tag reuse, and ascending-id search order.
//! Substring matching is literal, which is exactly what the escaped
//! SQL path produces.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tagpress_common::db::{
    validate_new_article, ArticleRecord, ArticleStore, InsertedArticle, NewArticle, SearchFilter,
    TagAssociation, TagRecord,
};
use tagpress_common::errors::{AppError, Result};

#[derive(Default)]
struct MemInner {
    next_article_id: i64,
    next_tag_id: i64,
    articles: BTreeMap<i64, ArticleRecord>,
    tag_ids_by_name: BTreeMap<String, i64>,
}

/// Mutex-backed store with the same observable behavior as the
/// Postgres repository
#[derive(Default)]
pub(crate) struct MemStore {
    inner: Mutex<MemInner>,
}

impl MemStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn article_count(&self) -> usize {
        self.inner.lock().unwrap().articles.len()
    }

    pub(crate) fn tag_count(&self) -> usize {
        self.inner.lock().unwrap().tag_ids_by_name.len()
    }
}

#[async_trait]
impl ArticleStore for MemStore {
    async fn insert_article(&self, new: NewArticle<'_>) -> Result<InsertedArticle> {
        validate_new_article(&new)?;

        let mut inner = self.inner.lock().unwrap();

        if inner.articles.values().any(|a| a.title == new.title) {
            return Err(AppError::DuplicateTitle {
                title: new.title.to_string(),
            });
        }

        let mut tags = Vec::with_capacity(new.tags.len());
        for name in new.tags {
            let id = match inner.tag_ids_by_name.get(name).copied() {
                Some(id) => id,
                None => {
                    inner.next_tag_id += 1;
                    let id = inner.next_tag_id;
                    inner.tag_ids_by_name.insert(name.clone(), id);
                    id
                }
            };
            tags.push(TagRecord {
                id,
                name: name.clone(),
            });
        }

        inner.next_article_id += 1;
        let id = inner.next_article_id;
        inner.articles.insert(
            id,
            ArticleRecord {
                id,
                title: new.title.to_string(),
                body: new.body.to_string(),
                created_at: Utc::now(),
                tags: tags.clone(),
            },
        );

        Ok(InsertedArticle { id, tags })
    }

    async fn find_article_by_id(&self, id: i64) -> Result<Option<ArticleRecord>> {
        Ok(self.inner.lock().unwrap().articles.get(&id).cloned())
    }

    async fn find_article_by_title(&self, title: &str) -> Result<Option<ArticleRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .articles
            .values()
            .find(|a| a.title == title)
            .cloned())
    }

    async fn search_articles(&self, filter: &SearchFilter) -> Result<Vec<ArticleRecord>> {
        let inner = self.inner.lock().unwrap();
        let title_substr = filter.title_substr.as_deref().map(str::to_lowercase);
        let body_substr = filter.body_substr.as_deref().map(str::to_lowercase);

        // BTreeMap iteration gives ascending-id (storage) order
        Ok(inner
            .articles
            .values()
            .filter(|a| {
                if let Some(ref substr) = title_substr {
                    if !a.title.to_lowercase().contains(substr) {
                        return false;
                    }
                }
                if let Some(ref substr) = body_substr {
                    if !a.body.to_lowercase().contains(substr) {
                        return false;
                    }
                }
                if let Some(ref ids) = filter.ids {
                    if !ids.contains(&a.id) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect())
    }

    async fn load_tags(&self) -> Result<Vec<TagRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .tag_ids_by_name
            .iter()
            .map(|(name, &id)| TagRecord {
                id,
                name: name.clone(),
            })
            .collect())
    }

    async fn load_tag_associations(&self) -> Result<Vec<TagAssociation>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .articles
            .values()
            .flat_map(|a| {
                a.tags.iter().map(|t| TagAssociation {
                    article_id: a.id,
                    tag_id: t.id,
                })
            })
            .collect())
    }

    async fn drop_all(&self) -> Result<()> {
        *self.inner.lock().unwrap() = MemInner::default();
        Ok(())
    }
}
