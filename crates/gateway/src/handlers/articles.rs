//! Article management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use tagpress_common::{
    db::ArticleRecord,
    errors::{AppError, Result},
    metrics,
};

/// Request to publish a new article
#[derive(Debug, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(max = 256))]
    pub title: String,

    pub body: String,

    /// Raw tag specification; `|`, `,`, `;`, `-`, and whitespace all
    /// separate names
    #[serde(default)]
    pub tags: String,
}

/// Response after creating an article
#[derive(Serialize)]
pub struct CreateArticleResponse {
    pub id: i64,
}

/// A single article as returned by the API
#[derive(Serialize)]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub created_at: String,
}

impl From<ArticleRecord> for ArticleResponse {
    fn from(article: ArticleRecord) -> Self {
        Self {
            id: article.id,
            title: article.title,
            body: article.body,
            tags: article.tags.into_iter().map(|t| t.name).collect(),
            created_at: article.created_at.to_rfc3339(),
        }
    }
}

/// Search query parameters; all optional, all conjunctive
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelatedParams {
    pub limit: Option<usize>,
}

/// List response for search and related queries
#[derive(Serialize)]
pub struct ArticleListResponse {
    pub total: usize,
    pub articles: Vec<ArticleResponse>,
}

/// Publish a new article
pub async fn create_article(
    State(state): State<AppState>,
    Json(request): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<CreateArticleResponse>)> {
    // Validate request
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let result = state
        .engine
        .insert_article(&request.title, &request.body, &request.tags)
        .await;

    match &result {
        Ok(_) => metrics::record_insert(true),
        Err(AppError::DuplicateTitle { .. }) => metrics::record_insert(false),
        Err(_) => {}
    }
    let id = result?;

    let (tags, articles) = state.engine.index_size();
    metrics::record_index_size(tags, articles);

    tracing::info!(
        article_id = id,
        title = %request.title,
        "Article created"
    );

    Ok((StatusCode::CREATED, Json(CreateArticleResponse { id })))
}

/// Get an article by id
pub async fn get_article(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> Result<Json<ArticleResponse>> {
    let article = state
        .engine
        .get_article_by_id(article_id)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound {
            id: article_id.to_string(),
        })?;

    Ok(Json(article.into()))
}

/// Get an article by its exact title
pub async fn get_article_by_title(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<ArticleResponse>> {
    let article = state
        .engine
        .get_article_by_title(&title)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound { id: title.clone() })?;

    Ok(Json(article.into()))
}

/// Search articles by title/body substring and tag subset
pub async fn search_articles(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ArticleListResponse>> {
    let start = Instant::now();

    let articles = state
        .engine
        .search_articles(
            params.title.as_deref(),
            params.body.as_deref(),
            params.tags.as_deref(),
        )
        .await?;

    metrics::record_search(start.elapsed().as_secs_f64(), articles.len());

    tracing::info!(
        title_query = params.title.as_deref().unwrap_or(""),
        body_query = params.body.as_deref().unwrap_or(""),
        tag_query = params.tags.as_deref().unwrap_or(""),
        results = articles.len(),
        "Search completed"
    );

    Ok(Json(ArticleListResponse {
        total: articles.len(),
        articles: articles.into_iter().map(Into::into).collect(),
    }))
}

/// Rank other articles by shared-tag count with the given one
pub async fn get_related_articles(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    Query(params): Query<RelatedParams>,
) -> Result<Json<ArticleListResponse>> {
    let start = Instant::now();
    let limit = params.limit.unwrap_or(state.config.server.related_limit);

    let articles = state.engine.get_related_articles(article_id, limit).await?;

    metrics::record_related(start.elapsed().as_secs_f64());

    Ok(Json(ArticleListResponse {
        total: articles.len(),
        articles: articles.into_iter().map(Into::into).collect(),
    }))
}
