use async_trait::async_trait;
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use super::{Book, BookAttrs, BookInput, BookRepository, Error, BOOK_STATUS_ACTIVE};

const BOOK_COLUMNS: &str =
    "id, created_at, updated_at, user_id, title, author, book_status, book_attrs";

#[derive(Clone)]
pub struct PgBookRepository {
    pool: PgPool,
}

impl PgBookRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn book_from_row(row: &PgRow) -> Result<Book, sqlx::Error> {
    let Json(book_attrs): Json<BookAttrs> = row.try_get("book_attrs")?;
    Ok(Book {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        book_status: row.try_get("book_status")?,
        book_attrs,
    })
}

fn query_span(operation: &'static str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn list(&self) -> Result<Vec<Book>, Error> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at, id");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;

        Ok(rows
            .iter()
            .map(book_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Book>, Error> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;

        Ok(row.as_ref().map(book_from_row).transpose()?)
    }

    async fn create(&self, owner: Uuid, input: BookInput) -> Result<Book, Error> {
        let query = format!(
            "INSERT INTO books (id, user_id, title, author, book_status, book_attrs) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {BOOK_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(Uuid::now_v7())
            .bind(owner)
            .bind(&input.title)
            .bind(&input.author)
            .bind(input.book_status.unwrap_or(BOOK_STATUS_ACTIVE))
            .bind(Json(&input.book_attrs))
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await?;

        Ok(book_from_row(&row)?)
    }

    async fn update(&self, id: Uuid, input: BookInput) -> Result<Book, Error> {
        let query = format!(
            "UPDATE books SET updated_at = NOW(), title = $2, author = $3, \
             book_status = COALESCE($4, book_status), book_attrs = $5 \
             WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.author)
            .bind(input.book_status)
            .bind(Json(&input.book_attrs))
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", &query))
            .await?;

        row.as_ref()
            .map(book_from_row)
            .transpose()?
            .ok_or(Error::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), Error> {
        let query = "DELETE FROM books WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}
