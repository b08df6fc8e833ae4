//! Query engine
//!
//! Composes Entity Store reads with tag index lookups: filtered
//! search (substring and tag-subset filters, conjunctive) and
//! related-article ranking by tag overlap.

use crate::mutation::normalize_tag_spec;
use crate::Engine;
use std::collections::HashMap;
use tagpress_common::db::{ArticleRecord, ArticleStore, SearchFilter};
use tagpress_common::errors::Result;
use tracing::debug;

impl<S: ArticleStore> Engine<S> {
    /// Search articles by optional title substring, body substring,
    /// and tag specification. All supplied filters are conjunctive;
    /// filters that are empty after trimming are treated as absent.
    /// With no filters, every article is returned in storage
    /// (ascending id) order.
    pub async fn search_articles(
        &self,
        title_query: Option<&str>,
        body_query: Option<&str>,
        tag_query: Option<&str>,
    ) -> Result<Vec<ArticleRecord>> {
        let title_substr = title_query
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        let body_substr = body_query
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        // A tag spec that normalizes to nothing carries no constraint
        let tag_names = tag_query.map(normalize_tag_spec).unwrap_or_default();
        let ids = if tag_names.is_empty() {
            None
        } else {
            let index = self.index().read().expect("tag index lock poisoned");
            Some(index.subset_match(&tag_names))
        };

        let filter = SearchFilter {
            title_substr,
            body_substr,
            ids,
        };

        let articles = self.store().search_articles(&filter).await?;

        debug!(
            tags = tag_names.len(),
            results = articles.len(),
            "Search completed"
        );

        Ok(articles)
    }

    /// Rank every other article by the number of tags it shares with
    /// the given one, best match first. Zero-overlap articles and the
    /// article itself never appear; ties order by ascending id; the
    /// result is capped at `max_count`. An unknown id yields an empty
    /// list.
    pub async fn get_related_articles(
        &self,
        article_id: i64,
        max_count: usize,
    ) -> Result<Vec<ArticleRecord>> {
        let ranked = {
            let index = self.index().read().expect("tag index lock poisoned");
            index.related(article_id, max_count)
        };

        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = ranked.iter().map(|&(id, _)| id).collect();
        let filter = SearchFilter {
            ids: Some(ids.clone()),
            ..Default::default()
        };

        // The store returns id order; restore rank order
        let mut by_id: HashMap<i64, ArticleRecord> = self
            .store()
            .search_articles(&filter)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
