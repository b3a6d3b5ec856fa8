use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::{
    error::ErrorBody,
    handlers::{books, health, misc, types, users},
};
use crate::books::{Book, BookAttrs, BookInput};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::sign_up,
        users::sign_in,
        users::sign_out,
        users::renew,
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        misc::base64_encode,
    ),
    components(schemas(
        health::Health,
        types::SignUpRequest,
        types::SignInRequest,
        types::RenewRequest,
        types::TokensResponse,
        types::UserResponse,
        types::BookList,
        Book,
        BookAttrs,
        BookInput,
        ErrorBody,
    )),
    modifiers(&SecuritySchemes),
    tags(
        (name = "health", description = "Service status"),
        (name = "user", description = "Sign up, sign in, sign out and token renewal"),
        (name = "book", description = "Book catalog"),
        (name = "misc", description = "Utilities"),
    )
)]
struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "basic_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
        );
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
