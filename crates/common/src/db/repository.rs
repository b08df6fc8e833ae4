//! Repository pattern for database operations
//!
//! Production [`ArticleStore`] implementation over Postgres, with
//! transactional inserts and raw statements for the queries the query
//! builder does not express.

use crate::db::models::*;
use crate::db::store::{
    validate_new_article, ArticleRecord, ArticleStore, InsertedArticle, NewArticle, SearchFilter,
    TagAssociation, TagRecord,
};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, SqlErr, Statement, TransactionTrait,
};
use std::collections::HashMap;

/// Escape LIKE/ILIKE metacharacters so user input matches literally.
///
/// Postgres treats `%` and `_` as wildcards and `\` as the default
/// escape character; a search for a literal `%` must not match
/// everything.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    /// Create the schema if it does not exist yet. Run once at startup;
    /// safe to run again.
    pub async fn bootstrap_schema(&self) -> Result<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS tags (
                id   BIGSERIAL PRIMARY KEY,
                name VARCHAR(32) NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS articles (
                id         BIGSERIAL PRIMARY KEY,
                title      VARCHAR(256) NOT NULL UNIQUE,
                body       TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );

            CREATE TABLE IF NOT EXISTS article_tags (
                article_id BIGINT NOT NULL REFERENCES articles (id),
                tag_id     BIGINT NOT NULL REFERENCES tags (id),
                PRIMARY KEY (article_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_article_tags_tag_id
                ON article_tags (tag_id);
        "#;

        self.write_conn().execute_unprepared(ddl).await?;
        tracing::info!("Schema bootstrap complete");
        Ok(())
    }

    /// Hydrate tag sets for a batch of articles in one query
    async fn tags_for_articles(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<TagRecord>>> {
        let mut by_article: HashMap<i64, Vec<TagRecord>> = HashMap::new();
        if ids.is_empty() {
            return Ok(by_article);
        }

        let id_list = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let sql = format!(
            r#"
            SELECT at.article_id, t.id, t.name
            FROM article_tags at
            INNER JOIN tags t ON t.id = at.tag_id
            WHERE at.article_id IN ({})
            ORDER BY t.id ASC
            "#,
            id_list
        );

        let rows = self
            .read_conn()
            .query_all(Statement::from_string(DbBackend::Postgres, sql))
            .await?;

        for row in rows {
            let article_id: i64 = row.try_get_by_index(0)?;
            let tag_id: i64 = row.try_get_by_index(1)?;
            let name: String = row.try_get_by_index(2)?;
            by_article
                .entry(article_id)
                .or_default()
                .push(TagRecord { id: tag_id, name });
        }

        Ok(by_article)
    }

    /// Convert an entity model into a hydrated record
    async fn hydrate(&self, article: Article) -> Result<ArticleRecord> {
        let tags = article
            .find_related(TagEntity)
            .order_by_asc(TagColumn::Id)
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|t| TagRecord {
                id: t.id,
                name: t.name,
            })
            .collect();

        Ok(ArticleRecord {
            id: article.id,
            title: article.title,
            body: article.body,
            created_at: article.created_at.with_timezone(&Utc),
            tags,
        })
    }
}

#[async_trait]
impl ArticleStore for Repository {
    async fn insert_article(&self, new: NewArticle<'_>) -> Result<InsertedArticle> {
        validate_new_article(&new)?;

        // The transaction rolls back on drop if anything below fails,
        // so a failed insert leaves no article row, no tag row, and no
        // association row behind.
        let txn = self.write_conn().begin().await?;
        let now = Utc::now();

        let row = txn
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "INSERT INTO articles (title, body, created_at) VALUES ($1, $2, $3) RETURNING id",
                vec![new.title.into(), new.body.into(), now.into()],
            ))
            .await
            .map_err(|e| match e.sql_err() {
                // The unique index on articles.title is the arbiter for
                // concurrent same-title inserts
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateTitle {
                    title: new.title.to_string(),
                },
                _ => AppError::Database(e),
            })?
            .ok_or_else(|| AppError::Internal {
                message: "article insert returned no id".to_string(),
            })?;

        let article_id: i64 = row.try_get_by_index(0)?;

        let mut tags = Vec::with_capacity(new.tags.len());
        for name in new.tags {
            let inserted = txn
                .query_one(Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    "INSERT INTO tags (name) VALUES ($1) ON CONFLICT (name) DO NOTHING RETURNING id",
                    vec![name.as_str().into()],
                ))
                .await?;

            let tag_id: i64 = match inserted {
                Some(r) => r.try_get_by_index(0)?,
                // Conflict: the name already exists, reuse its id
                None => txn
                    .query_one(Statement::from_sql_and_values(
                        DbBackend::Postgres,
                        "SELECT id FROM tags WHERE name = $1",
                        vec![name.as_str().into()],
                    ))
                    .await?
                    .ok_or_else(|| AppError::Internal {
                        message: format!("tag '{}' missing after upsert", name),
                    })?
                    .try_get_by_index(0)?,
            };

            txn.execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "INSERT INTO article_tags (article_id, tag_id) VALUES ($1, $2)",
                vec![article_id.into(), tag_id.into()],
            ))
            .await?;

            tags.push(TagRecord {
                id: tag_id,
                name: name.clone(),
            });
        }

        txn.commit().await?;

        tracing::debug!(article_id, tag_count = tags.len(), "Article committed");

        Ok(InsertedArticle {
            id: article_id,
            tags,
        })
    }

    async fn find_article_by_id(&self, id: i64) -> Result<Option<ArticleRecord>> {
        let article = ArticleEntity::find_by_id(id).one(self.read_conn()).await?;

        match article {
            Some(a) => Ok(Some(self.hydrate(a).await?)),
            None => Ok(None),
        }
    }

    async fn find_article_by_title(&self, title: &str) -> Result<Option<ArticleRecord>> {
        let article = ArticleEntity::find()
            .filter(ArticleColumn::Title.eq(title))
            .one(self.read_conn())
            .await?;

        match article {
            Some(a) => Ok(Some(self.hydrate(a).await?)),
            None => Ok(None),
        }
    }

    async fn search_articles(&self, filter: &SearchFilter) -> Result<Vec<ArticleRecord>> {
        // An explicitly empty id restriction can match nothing
        if matches!(filter.ids.as_deref(), Some([])) {
            return Ok(vec![]);
        }

        let mut clauses = Vec::new();
        let mut values: Vec<sea_orm::Value> = Vec::new();

        if let Some(ref substr) = filter.title_substr {
            values.push(format!("%{}%", escape_like(substr)).into());
            clauses.push(format!("title ILIKE ${}", values.len()));
        }

        if let Some(ref substr) = filter.body_substr {
            values.push(format!("%{}%", escape_like(substr)).into());
            clauses.push(format!("body ILIKE ${}", values.len()));
        }

        if let Some(ref ids) = filter.ids {
            // Ids come from the tag index, not from user input
            let id_list = ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            clauses.push(format!("id IN ({})", id_list));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT id, title, body, created_at FROM articles {} ORDER BY id ASC",
            where_sql
        );

        let rows = self
            .read_conn()
            .query_all(Statement::from_sql_and_values(DbBackend::Postgres, sql, values))
            .await?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get_by_index(0)?;
            let title: String = row.try_get_by_index(1)?;
            let body: String = row.try_get_by_index(2)?;
            let created_at: sea_orm::prelude::DateTimeWithTimeZone = row.try_get_by_index(3)?;
            articles.push(ArticleRecord {
                id,
                title,
                body,
                created_at: created_at.with_timezone(&Utc),
                tags: Vec::new(),
            });
        }

        let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
        let mut tags_by_article = self.tags_for_articles(&ids).await?;
        for article in &mut articles {
            if let Some(tags) = tags_by_article.remove(&article.id) {
                article.tags = tags;
            }
        }

        Ok(articles)
    }

    async fn load_tags(&self) -> Result<Vec<TagRecord>> {
        let tags = TagEntity::find()
            .order_by_asc(TagColumn::Id)
            .all(self.read_conn())
            .await?;

        Ok(tags
            .into_iter()
            .map(|t| TagRecord {
                id: t.id,
                name: t.name,
            })
            .collect())
    }

    async fn load_tag_associations(&self) -> Result<Vec<TagAssociation>> {
        let rows = ArticleTagEntity::find().all(self.read_conn()).await?;

        Ok(rows
            .into_iter()
            .map(|r| TagAssociation {
                article_id: r.article_id,
                tag_id: r.tag_id,
            })
            .collect())
    }

    async fn drop_all(&self) -> Result<()> {
        self.write_conn()
            .execute_unprepared(
                "DROP TABLE IF EXISTS article_tags; \
                 DROP TABLE IF EXISTS articles; \
                 DROP TABLE IF EXISTS tags;",
            )
            .await?;

        tracing::warn!("All tables dropped");
        Ok(())
    }
}
