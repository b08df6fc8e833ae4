//! SeaORM entity models
//!
//! Database entities for the Tagpress content store

mod article;
mod article_tag;
mod tag;

pub use article::{
    Entity as ArticleEntity,
    Model as Article,
    ActiveModel as ArticleActiveModel,
    Column as ArticleColumn,
};

pub use tag::{
    Entity as TagEntity,
    Model as Tag,
    ActiveModel as TagActiveModel,
    Column as TagColumn,
};

pub use article_tag::{
    Entity as ArticleTagEntity,
    Model as ArticleTag,
    ActiveModel as ArticleTagActiveModel,
    Column as ArticleTagColumn,
};
