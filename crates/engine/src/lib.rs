//! Tagpress retrieval engine
//!
//! The core of the content store: the tag index, the query engine,
//! and the mutation gateway, bound together by the [`Engine`] facade.
//! The engine is generic over its storage port so the semantics can be
//! exercised without a live database.

pub mod index;
pub mod mutation;
pub mod query;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::RwLock;
use tagpress_common::db::{ArticleRecord, ArticleStore};
use tagpress_common::errors::Result;
use tracing::info;

pub use index::TagIndex;
pub use mutation::normalize_tag_spec;

/// The engine facade: storage handle plus the shared tag index
pub struct Engine<S: ArticleStore> {
    store: S,
    index: RwLock<TagIndex>,
}

impl<S: ArticleStore> Engine<S> {
    /// Create an engine with an empty index. Call [`Engine::reload_index`]
    /// (or use [`Engine::bootstrap`]) before serving queries.
    pub fn new(store: S) -> Self {
        Self {
            store,
            index: RwLock::new(TagIndex::new()),
        }
    }

    /// Create an engine and build the index from the store's committed
    /// state. This is also the crash-recovery path: an index that may
    /// have fallen behind a committed write is reconstructed here.
    pub async fn bootstrap(store: S) -> Result<Self> {
        let engine = Self::new(store);
        engine.reload_index().await?;
        Ok(engine)
    }

    /// Rebuild the index from storage and swap it in atomically
    pub async fn reload_index(&self) -> Result<()> {
        let tags = self.store.load_tags().await?;
        let associations = self.store.load_tag_associations().await?;

        let mut rebuilt = TagIndex::new();
        rebuilt.rebuild(&tags, &associations);

        info!(
            tags = rebuilt.tag_count(),
            articles = rebuilt.article_count(),
            "Tag index rebuilt"
        );

        *self.index.write().expect("tag index lock poisoned") = rebuilt;
        Ok(())
    }

    /// Access the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current index size as (tags, articles), for metrics gauges
    pub fn index_size(&self) -> (usize, usize) {
        let index = self.index.read().expect("tag index lock poisoned");
        (index.tag_count(), index.article_count())
    }

    pub(crate) fn index(&self) -> &RwLock<TagIndex> {
        &self.index
    }

    /// Fetch an article by id. Absence is not an error.
    pub async fn get_article_by_id(&self, id: i64) -> Result<Option<ArticleRecord>> {
        self.store.find_article_by_id(id).await
    }

    /// Fetch an article by exact title. Absence is not an error.
    pub async fn get_article_by_title(&self, title: &str) -> Result<Option<ArticleRecord>> {
        self.store.find_article_by_title(title).await
    }
}
