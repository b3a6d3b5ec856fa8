//! # Folio (book catalog behind credential-scoped tokens)
//!
//! `folio` fronts a small books API with a JWT session layer. Users sign in and
//! receive an access/refresh token pair; access tokens carry the named
//! credentials of the user's role (`book:create`, `book:update`, `book:delete`)
//! and every mutating request is checked against exactly one of them.
//!
//! ## Token lifecycle
//!
//! - **Sign in** resolves the user's role into a credential set, issues a token
//!   pair and stores the refresh token under the user's id. A later sign in
//!   overwrites it, so only one refresh token per user is ever valid.
//! - **Renew** accepts an access token (expired or not, only its signature
//!   matters) plus the stored refresh token and issues a fresh pair, re-reading
//!   the role so role changes apply on the next renewal.
//! - **Sign out** deletes the stored refresh token; repeating it is harmless.
//!
//! Access tokens are never stored. A token is valid up to and including the
//! second named in its `exp` claim.
//!
//! ## Storage
//!
//! Users and books live in Postgres, refresh tokens in Redis keyed to expire
//! just after the token's own `exp` second. In-memory backends exist for every storage trait and
//! drive the test suites.

pub mod api;
pub mod auth;
pub mod books;
pub mod cli;
pub mod directory;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
