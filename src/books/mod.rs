//! Book catalog: model, input validation and storage.

mod memory;
mod postgres;

pub use self::memory::MemoryBookRepository;
pub use self::postgres::PgBookRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub const BOOK_STATUS_DRAFT: i32 = 0;
pub const BOOK_STATUS_ACTIVE: i32 = 1;

const MAX_TEXT_LEN: usize = 255;
const MAX_RATING: i32 = 10;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookAttrs {
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rating: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user_id: Uuid,
    pub title: String,
    pub author: String,
    pub book_status: i32,
    pub book_attrs: BookAttrs,
}

/// Client-supplied fields for create and update.
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    /// Defaults to active on create and to the current status on update.
    #[serde(default)]
    pub book_status: Option<i32>,
    #[serde(default)]
    pub book_attrs: BookAttrs,
}

impl BookInput {
    /// Trim text fields and check bounds.
    ///
    /// # Errors
    /// Returns [`Error::Invalid`] naming the first offending field.
    pub fn validate(mut self) -> Result<Self, Error> {
        self.title = self.title.trim().to_string();
        self.author = self.author.trim().to_string();

        for (field, value) in [("title", &self.title), ("author", &self.author)] {
            let len = value.chars().count();
            if len == 0 || len > MAX_TEXT_LEN {
                return Err(Error::Invalid(format!(
                    "{field} must be between 1 and {MAX_TEXT_LEN} characters"
                )));
            }
        }

        if let Some(status) = self.book_status {
            if status != BOOK_STATUS_DRAFT && status != BOOK_STATUS_ACTIVE {
                return Err(Error::Invalid(format!(
                    "book_status must be {BOOK_STATUS_DRAFT} or {BOOK_STATUS_ACTIVE}"
                )));
            }
        }

        if !(0..=MAX_RATING).contains(&self.book_attrs.rating) {
            return Err(Error::Invalid(format!(
                "book_attrs.rating must be between 0 and {MAX_RATING}"
            )));
        }

        Ok(self)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Invalid(String),
    #[error("book not found")]
    NotFound,
    #[error("book storage unavailable: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Book>, Error>;

    async fn get(&self, id: Uuid) -> Result<Option<Book>, Error>;

    /// Store a validated input owned by `owner`.
    async fn create(&self, owner: Uuid, input: BookInput) -> Result<Book, Error>;

    /// # Errors
    /// Returns [`Error::NotFound`] if the book is gone.
    async fn update(&self, id: Uuid, input: BookInput) -> Result<Book, Error>;

    /// # Errors
    /// Returns [`Error::NotFound`] if the book is gone.
    async fn delete(&self, id: Uuid) -> Result<(), Error>;
}
