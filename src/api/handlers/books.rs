//! Book catalog endpoints. Reads need client credentials, writes need a
//! credential-bearing access token and, for existing books, ownership.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::types::BookList;
use crate::{
    api::{
        error::{ApiError, ErrorBody},
        extract::{bearer_token, ClientAuth},
    },
    auth::{token::AccessClaims, Credential, Guard},
    books::{Book, BookInput, BookRepository},
};

fn book_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request("invalid book id"))
}

async fn owned_book(
    books: &dyn BookRepository,
    id: Uuid,
    claims: &AccessClaims,
    action: &str,
) -> Result<Book, ApiError> {
    let book = books
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("book with the given ID is not found"))?;

    if book.user_id != claims.subject {
        debug!(book = %id, subject = %claims.subject, "not the book owner");
        return Err(ApiError::forbidden(format!(
            "permission denied, only the creator can {action} this book"
        )));
    }

    Ok(book)
}

#[utoipa::path(
    get,
    path = "/v1/books",
    responses (
        (status = 200, description = "All books", body = BookList),
        (status = 401, description = "Missing or wrong client credentials", body = ErrorBody),
    ),
    security(("basic_auth" = [])),
    tag = "book",
)]
#[instrument(skip_all)]
pub async fn list_books(
    headers: HeaderMap,
    Extension(client): Extension<Arc<ClientAuth>>,
    Extension(books): Extension<Arc<dyn BookRepository>>,
) -> Result<Json<BookList>, ApiError> {
    client.check(&headers)?;

    let books = books.list().await?;

    Ok(Json(BookList {
        count: books.len(),
        books,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/book/{id}",
    params(("id" = Uuid, Path, description = "Book id")),
    responses (
        (status = 200, description = "The book", body = Book),
        (status = 400, description = "Invalid id", body = ErrorBody),
        (status = 401, description = "Missing or wrong client credentials", body = ErrorBody),
        (status = 404, description = "No such book", body = ErrorBody),
    ),
    security(("basic_auth" = [])),
    tag = "book",
)]
#[instrument(skip_all)]
pub async fn get_book(
    headers: HeaderMap,
    Extension(client): Extension<Arc<ClientAuth>>,
    Extension(books): Extension<Arc<dyn BookRepository>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Book>, ApiError> {
    client.check(&headers)?;
    let id = book_id(path)?;

    let book = books
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("book with the given ID is not found"))?;

    Ok(Json(book))
}

#[utoipa::path(
    post,
    path = "/v1/book",
    request_body = BookInput,
    responses (
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Missing token or invalid book", body = ErrorBody),
        (status = 401, description = "Invalid or expired token", body = ErrorBody),
        (status = 403, description = "Token lacks book:create", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "book",
)]
#[instrument(skip_all)]
pub async fn create_book(
    headers: HeaderMap,
    Extension(guard): Extension<Arc<Guard>>,
    Extension(books): Extension<Arc<dyn BookRepository>>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let claims = guard.authorize(bearer_token(&headers)?, Credential::BookCreate)?;
    let Json(input) = payload?;
    let input = input.validate()?;

    let book = books.create(claims.subject, input).await?;

    Ok((StatusCode::CREATED, Json(book)))
}

#[utoipa::path(
    put,
    path = "/v1/book/{id}",
    params(("id" = Uuid, Path, description = "Book id")),
    request_body = BookInput,
    responses (
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Missing token, invalid id or invalid book", body = ErrorBody),
        (status = 401, description = "Invalid or expired token", body = ErrorBody),
        (status = 403, description = "Lacks book:update or not the owner", body = ErrorBody),
        (status = 404, description = "No such book", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "book",
)]
#[instrument(skip_all)]
pub async fn update_book(
    headers: HeaderMap,
    Extension(guard): Extension<Arc<Guard>>,
    Extension(books): Extension<Arc<dyn BookRepository>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let id = book_id(path)?;
    let claims = guard.authorize(bearer_token(&headers)?, Credential::BookUpdate)?;
    let Json(input) = payload?;
    let input = input.validate()?;

    owned_book(books.as_ref(), id, &claims, "update").await?;
    let book = books.update(id, input).await?;

    Ok(Json(book))
}

#[utoipa::path(
    delete,
    path = "/v1/book/{id}",
    params(("id" = Uuid, Path, description = "Book id")),
    responses (
        (status = 204, description = "Book deleted"),
        (status = 400, description = "Missing token or invalid id", body = ErrorBody),
        (status = 401, description = "Invalid or expired token", body = ErrorBody),
        (status = 403, description = "Lacks book:delete or not the owner", body = ErrorBody),
        (status = 404, description = "No such book", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "book",
)]
#[instrument(skip_all)]
pub async fn delete_book(
    headers: HeaderMap,
    Extension(guard): Extension<Arc<Guard>>,
    Extension(books): Extension<Arc<dyn BookRepository>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = book_id(path)?;
    let claims = guard.authorize(bearer_token(&headers)?, Credential::BookDelete)?;

    owned_book(books.as_ref(), id, &claims, "delete").await?;
    books.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
