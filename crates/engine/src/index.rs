//! Tag index
//!
//! A derived, in-process structure mapping each tag to the set of
//! article ids carrying it and each article to its tag-id set. It
//! answers subset-match and overlap queries without scanning
//! per-article tag lists in storage, and it holds nothing the store
//! does not already have canonically: a full rebuild from the stored
//! association relation always reproduces it.

use std::collections::{BTreeSet, HashMap};
use tagpress_common::db::{TagAssociation, TagRecord};

/// Bidirectional tag/article index
#[derive(Debug, Default)]
pub struct TagIndex {
    tag_ids_by_name: HashMap<String, i64>,
    article_ids_by_tag: HashMap<i64, BTreeSet<i64>>,
    tag_ids_by_article: HashMap<i64, BTreeSet<i64>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct the whole index from the store's tag rows and
    /// association relation. Used at startup and whenever the index
    /// may have fallen behind a committed write.
    pub fn rebuild(&mut self, tags: &[TagRecord], associations: &[TagAssociation]) {
        self.tag_ids_by_name.clear();
        self.article_ids_by_tag.clear();
        self.tag_ids_by_article.clear();

        for tag in tags {
            self.tag_ids_by_name.insert(tag.name.clone(), tag.id);
        }

        for assoc in associations {
            self.article_ids_by_tag
                .entry(assoc.tag_id)
                .or_default()
                .insert(assoc.article_id);
            self.tag_ids_by_article
                .entry(assoc.article_id)
                .or_default()
                .insert(assoc.tag_id);
        }
    }

    /// Apply one committed insert incrementally
    pub fn apply(&mut self, article_id: i64, tags: &[TagRecord]) {
        for tag in tags {
            self.tag_ids_by_name.insert(tag.name.clone(), tag.id);
            self.article_ids_by_tag
                .entry(tag.id)
                .or_default()
                .insert(article_id);
            self.tag_ids_by_article
                .entry(article_id)
                .or_default()
                .insert(tag.id);
        }
    }

    /// Article ids carrying the given tag
    pub fn article_ids_for_tag(&self, tag_id: i64) -> Option<&BTreeSet<i64>> {
        self.article_ids_by_tag.get(&tag_id)
    }

    /// Tag ids attached to the given article
    pub fn tag_ids_for_article(&self, article_id: i64) -> Option<&BTreeSet<i64>> {
        self.tag_ids_by_article.get(&article_id)
    }

    /// Ids of articles whose tag set is a superset of the requested
    /// names, ascending. A name that resolves to no known tag makes
    /// the result empty: no article can satisfy a nonexistent tag.
    pub fn subset_match(&self, names: &[String]) -> Vec<i64> {
        let mut wanted = Vec::with_capacity(names.len());
        for name in names {
            match self.tag_ids_by_name.get(name) {
                Some(id) => wanted.push(*id),
                None => return Vec::new(),
            }
        }

        // Walk the smallest posting set and check the others
        let Some(seed) = wanted
            .iter()
            .filter_map(|id| self.article_ids_by_tag.get(id))
            .min_by_key(|set| set.len())
        else {
            return Vec::new();
        };

        seed.iter()
            .copied()
            .filter(|article_id| {
                self.tag_ids_by_article
                    .get(article_id)
                    .is_some_and(|tags| wanted.iter().all(|id| tags.contains(id)))
            })
            .collect()
    }

    /// Number of tags shared by the two articles
    pub fn overlap_count(&self, a: i64, b: i64) -> usize {
        match (self.tag_ids_by_article.get(&a), self.tag_ids_by_article.get(&b)) {
            (Some(ta), Some(tb)) => ta.intersection(tb).count(),
            _ => 0,
        }
    }

    /// Rank every other article by the number of tags it shares with
    /// `article_id`. Zero-overlap candidates are dropped, ordering is
    /// overlap count descending with ties broken by ascending article
    /// id, and the result is truncated to `max_count`.
    pub fn related(&self, article_id: i64, max_count: usize) -> Vec<(i64, usize)> {
        let Some(tags) = self.tag_ids_by_article.get(&article_id) else {
            return Vec::new();
        };

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for tag_id in tags {
            if let Some(articles) = self.article_ids_by_tag.get(tag_id) {
                for &other in articles {
                    if other != article_id {
                        *counts.entry(other).or_insert(0) += 1;
                    }
                }
            }
        }

        let mut ranked: Vec<(i64, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(max_count);
        ranked
    }

    /// Number of distinct tags known to the index
    pub fn tag_count(&self) -> usize {
        self.tag_ids_by_name.len()
    }

    /// Number of articles with at least one tag
    pub fn article_count(&self) -> usize {
        self.tag_ids_by_article.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: i64, name: &str) -> TagRecord {
        TagRecord {
            id,
            name: name.to_string(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// x=1, y=2, z=3; articles: 1 {x,y}, 2 {y,z}, 3 {x,y,z}
    fn sample_index() -> TagIndex {
        let mut index = TagIndex::new();
        index.apply(1, &[tag(1, "x"), tag(2, "y")]);
        index.apply(2, &[tag(2, "y"), tag(3, "z")]);
        index.apply(3, &[tag(1, "x"), tag(2, "y"), tag(3, "z")]);
        index
    }

    #[test]
    fn test_subset_match_single_tag() {
        let index = sample_index();
        assert_eq!(index.subset_match(&names(&["y"])), vec![1, 2, 3]);
        assert_eq!(index.subset_match(&names(&["z"])), vec![2, 3]);
    }

    #[test]
    fn test_subset_match_all_tags() {
        let index = sample_index();
        // Only the article carrying every requested tag qualifies
        assert_eq!(index.subset_match(&names(&["x", "y", "z"])), vec![3]);
    }

    #[test]
    fn test_subset_match_unknown_tag_is_empty() {
        let index = sample_index();
        assert!(index.subset_match(&names(&["nope"])).is_empty());
        assert!(index.subset_match(&names(&["x", "nope"])).is_empty());
    }

    #[test]
    fn test_overlap_count() {
        let index = sample_index();
        assert_eq!(index.overlap_count(1, 3), 2); // {x,y}
        assert_eq!(index.overlap_count(1, 2), 1); // {y}
        assert_eq!(index.overlap_count(1, 99), 0);
    }

    #[test]
    fn test_related_ordering_and_exclusion() {
        let index = sample_index();
        let ranked = index.related(3, 10);

        // Article 3 itself never appears; 1 and 2 both share two tags,
        // ties resolve by ascending id
        assert_eq!(ranked, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn test_related_drops_zero_overlap() {
        let mut index = sample_index();
        index.apply(4, &[tag(10, "solo")]);

        let ranked = index.related(3, 10);
        assert!(ranked.iter().all(|&(id, _)| id != 4));
    }

    #[test]
    fn test_related_truncates() {
        let index = sample_index();
        assert_eq!(index.related(3, 1), vec![(1, 2)]);
    }

    #[test]
    fn test_related_unknown_article_is_empty() {
        let index = sample_index();
        assert!(index.related(99, 10).is_empty());
    }

    #[test]
    fn test_rebuild_matches_incremental_state() {
        let incremental = sample_index();

        let tags = vec![tag(1, "x"), tag(2, "y"), tag(3, "z")];
        let associations = vec![
            TagAssociation { article_id: 1, tag_id: 1 },
            TagAssociation { article_id: 1, tag_id: 2 },
            TagAssociation { article_id: 2, tag_id: 2 },
            TagAssociation { article_id: 2, tag_id: 3 },
            TagAssociation { article_id: 3, tag_id: 1 },
            TagAssociation { article_id: 3, tag_id: 2 },
            TagAssociation { article_id: 3, tag_id: 3 },
        ];
        let mut rebuilt = TagIndex::new();
        rebuilt.rebuild(&tags, &associations);

        assert_eq!(
            rebuilt.subset_match(&names(&["x", "y"])),
            incremental.subset_match(&names(&["x", "y"]))
        );
        assert_eq!(rebuilt.related(3, 10), incremental.related(3, 10));
        assert_eq!(rebuilt.tag_count(), incremental.tag_count());
        assert_eq!(rebuilt.article_count(), incremental.article_count());
    }

    #[test]
    fn test_rebuild_replaces_stale_state() {
        let mut index = sample_index();
        index.rebuild(&[tag(7, "fresh")], &[TagAssociation { article_id: 9, tag_id: 7 }]);

        assert!(index.subset_match(&names(&["x"])).is_empty());
        assert_eq!(index.subset_match(&names(&["fresh"])), vec![9]);
        assert_eq!(index.tag_count(), 1);
    }

    #[test]
    fn test_bidirectional_lookups() {
        let index = sample_index();
        let for_y: Vec<i64> = index.article_ids_for_tag(2).unwrap().iter().copied().collect();
        assert_eq!(for_y, vec![1, 2, 3]);

        let of_2: Vec<i64> = index.tag_ids_for_article(2).unwrap().iter().copied().collect();
        assert_eq!(of_2, vec![2, 3]);
    }
}
