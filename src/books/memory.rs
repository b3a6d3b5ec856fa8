use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Book, BookInput, BookRepository, Error, BOOK_STATUS_ACTIVE};

/// Keyed by v7 ids, so iteration follows creation order.
#[derive(Default)]
pub struct MemoryBookRepository {
    books: RwLock<BTreeMap<Uuid, Book>>,
}

impl MemoryBookRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn list(&self) -> Result<Vec<Book>, Error> {
        Ok(self.books.read().await.values().cloned().collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Book>, Error> {
        Ok(self.books.read().await.get(&id).cloned())
    }

    async fn create(&self, owner: Uuid, input: BookInput) -> Result<Book, Error> {
        let book = Book {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            updated_at: None,
            user_id: owner,
            title: input.title,
            author: input.author,
            book_status: input.book_status.unwrap_or(BOOK_STATUS_ACTIVE),
            book_attrs: input.book_attrs,
        };
        self.books.write().await.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(&self, id: Uuid, input: BookInput) -> Result<Book, Error> {
        let mut books = self.books.write().await;
        let book = books.get_mut(&id).ok_or(Error::NotFound)?;

        book.title = input.title;
        book.author = input.author;
        if let Some(status) = input.book_status {
            book.book_status = status;
        }
        book.book_attrs = input.book_attrs;
        book.updated_at = Some(Utc::now());

        Ok(book.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), Error> {
        self.books
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::NotFound)
    }
}
