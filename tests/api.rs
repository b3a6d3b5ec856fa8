//! Router-level tests against the in-memory backends and a manual clock.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use folio::{
    api::{self, AppState, ClientAuth},
    auth::{clock::ManualClock, store::MemoryRefreshStore, TokenCodec},
    books::MemoryBookRepository,
    directory::{MemoryUserDirectory, USER_STATUS_BLOCKED},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;
use uuid::Uuid;

const NOW: i64 = 1_700_000_000;
const ACCESS_TTL: i64 = 900;
const REFRESH_TTL: i64 = 86_400;
const PASSWORD: &str = "correct horse battery";
const CLIENT_USER: &str = "client";
const CLIENT_PASSWORD: &str = "client-password";

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
    users: Arc<MemoryUserDirectory>,
    store: Arc<MemoryRefreshStore>,
}

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Value,
}

fn app() -> Result<TestApp> {
    let clock = Arc::new(ManualClock::new(NOW));
    let users = Arc::new(MemoryUserDirectory::new());
    let store = Arc::new(MemoryRefreshStore::with_clock(clock.clone()));
    let codec = TokenCodec::new(
        SecretString::from("integration-test-secret-0123456789".to_string()),
        Duration::from_secs(ACCESS_TTL.unsigned_abs()),
        Duration::from_secs(REFRESH_TTL.unsigned_abs()),
    )?;

    let state = AppState::new(
        users.clone(),
        store.clone(),
        Arc::new(MemoryBookRepository::new()),
        Arc::new(codec),
        clock.clone(),
        ClientAuth::new(
            CLIENT_USER.to_string(),
            SecretString::from(CLIENT_PASSWORD.to_string()),
        ),
    );

    Ok(TestApp {
        router: api::router(state),
        clock,
        users,
        store,
    })
}

fn basic() -> String {
    format!(
        "Basic {}",
        Base64::encode_string(format!("{CLIENT_USER}:{CLIENT_PASSWORD}").as_bytes())
    )
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<String>,
        body: Option<Value>,
    ) -> Result<Reply> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not JSON")?
        };

        Ok(Reply {
            status,
            headers,
            body,
        })
    }

    async fn sign_up(&self, email: &str, role: &str) -> Result<Uuid> {
        let reply = self
            .call(
                Method::POST,
                "/v1/user/sign/up",
                Some(basic()),
                Some(json!({"email": email, "password": PASSWORD, "user_role": role})),
            )
            .await?;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        Ok(serde_json::from_value(reply.body["id"].clone())?)
    }

    async fn sign_in(&self, email: &str) -> Result<(String, String)> {
        let reply = self
            .call(
                Method::POST,
                "/v1/user/sign/in",
                Some(basic()),
                Some(json!({"email": email, "password": PASSWORD})),
            )
            .await?;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        Ok((
            reply.body["access"].as_str().context("access")?.to_string(),
            reply.body["refresh"].as_str().context("refresh")?.to_string(),
        ))
    }

    async fn renew(&self, access: &str, refresh: &str) -> Result<Reply> {
        self.call(
            Method::POST,
            "/v1/user/sign/renew",
            Some(bearer(access)),
            Some(json!({"refresh_token": refresh})),
        )
        .await
    }

    async fn create_book(&self, access: &str, title: &str) -> Result<Reply> {
        self.call(
            Method::POST,
            "/v1/book",
            Some(bearer(access)),
            Some(json!({"title": title, "author": "Octavia Butler", "book_attrs": {"rating": 8}})),
        )
        .await
    }
}

#[tokio::test]
async fn end_to_end_user_can_create_but_not_delete() -> Result<()> {
    let app = app()?;
    app.sign_up("reader@example.com", "user").await?;
    let (access, _) = app.sign_in("reader@example.com").await?;

    let created = app.create_book(&access, "Kindred").await?;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["title"], "Kindred");
    let id = created.body["id"].as_str().context("book id")?.to_string();

    let deleted = app
        .call(Method::DELETE, &format!("/v1/book/{id}"), Some(bearer(&access)), None)
        .await?;
    assert_eq!(deleted.status, StatusCode::FORBIDDEN);
    assert!(deleted.body["error"].as_str().is_some());

    let fetched = app
        .call(Method::GET, &format!("/v1/book/{id}"), Some(basic()), None)
        .await?;
    assert_eq!(fetched.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn admin_owner_can_update_and_delete() -> Result<()> {
    let app = app()?;
    app.sign_up("admin@example.com", "admin").await?;
    let (access, _) = app.sign_in("admin@example.com").await?;

    let created = app.create_book(&access, "Parable of the Sower").await?;
    let id = created.body["id"].as_str().context("book id")?.to_string();

    let updated = app
        .call(
            Method::PUT,
            &format!("/v1/book/{id}"),
            Some(bearer(&access)),
            Some(json!({
                "title": "Parable of the Talents",
                "author": "Octavia Butler",
                "book_status": 0,
            })),
        )
        .await?;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["title"], "Parable of the Talents");
    assert_eq!(updated.body["book_status"], 0);

    let deleted = app
        .call(Method::DELETE, &format!("/v1/book/{id}"), Some(bearer(&access)), None)
        .await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let missing = app
        .call(Method::GET, &format!("/v1/book/{id}"), Some(basic()), None)
        .await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn only_the_owner_may_modify_a_book() -> Result<()> {
    let app = app()?;
    app.sign_up("owner@example.com", "moderator").await?;
    app.sign_up("other@example.com", "admin").await?;
    let (owner, _) = app.sign_in("owner@example.com").await?;
    let (other, _) = app.sign_in("other@example.com").await?;

    let created = app.create_book(&owner, "Dawn").await?;
    let id = created.body["id"].as_str().context("book id")?.to_string();

    let update = app
        .call(
            Method::PUT,
            &format!("/v1/book/{id}"),
            Some(bearer(&other)),
            Some(json!({"title": "Mine now", "author": "X"})),
        )
        .await?;
    assert_eq!(update.status, StatusCode::FORBIDDEN);

    let delete = app
        .call(Method::DELETE, &format!("/v1/book/{id}"), Some(bearer(&other)), None)
        .await?;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);

    let absent = app
        .call(
            Method::DELETE,
            &format!("/v1/book/{}", Uuid::nil()),
            Some(bearer(&other)),
            None,
        )
        .await?;
    assert_eq!(absent.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn access_token_expiry_boundary() -> Result<()> {
    let app = app()?;
    app.sign_up("clock@example.com", "user").await?;
    let (access, _) = app.sign_in("clock@example.com").await?;

    app.clock.set(NOW + ACCESS_TTL - 1);
    assert_eq!(app.create_book(&access, "a").await?.status, StatusCode::CREATED);

    app.clock.set(NOW + ACCESS_TTL);
    assert_eq!(app.create_book(&access, "b").await?.status, StatusCode::CREATED);

    app.clock.set(NOW + ACCESS_TTL + 1);
    let expired = app.create_book(&access, "c").await?;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    assert_eq!(expired.body["error"], "token expired");
    Ok(())
}

#[tokio::test]
async fn tampered_signature_is_rejected() -> Result<()> {
    let app = app()?;
    app.sign_up("tamper@example.com", "admin").await?;
    let (access, _) = app.sign_in("tamper@example.com").await?;

    let (signing_input, signature) = access.rsplit_once('.').context("three segments")?;
    let mut bytes = Base64UrlUnpadded::decode_vec(signature).context("signature")?;
    for index in 0..bytes.len() {
        bytes[index] ^= 0x01;
        let forged = format!("{signing_input}.{}", Base64UrlUnpadded::encode_string(&bytes));
        bytes[index] ^= 0x01;

        let reply = app.create_book(&forged, "forged").await?;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "byte {index}");
    }
    Ok(())
}

#[tokio::test]
async fn escalated_credentials_do_not_verify() -> Result<()> {
    let app = app()?;
    app.sign_up("escalate@example.com", "user").await?;
    let (access, _) = app.sign_in("escalate@example.com").await?;

    let mut parts = access.split('.');
    let header = parts.next().context("header")?;
    let payload = parts.next().context("payload")?;
    let signature = parts.next().context("signature")?;

    let mut claims: Value = serde_json::from_slice(&Base64UrlUnpadded::decode_vec(payload)?)?;
    claims["credentials"]["book:delete"] = json!(true);
    let forged_payload = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&claims)?);
    let forged = format!("{header}.{forged_payload}.{signature}");

    let reply = app
        .call(
            Method::DELETE,
            &format!("/v1/book/{}", Uuid::nil()),
            Some(bearer(&forged)),
            None,
        )
        .await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn second_sign_in_invalidates_first_refresh() -> Result<()> {
    let app = app()?;
    app.sign_up("twice@example.com", "user").await?;
    let (first_access, first_refresh) = app.sign_in("twice@example.com").await?;
    let (second_access, second_refresh) = app.sign_in("twice@example.com").await?;

    let stale = app.renew(&first_access, &first_refresh).await?;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);

    let renewed = app.renew(&second_access, &second_refresh).await?;
    assert_eq!(renewed.status, StatusCode::OK);
    assert!(renewed.body["access"].is_string());
    assert!(renewed.body["refresh"].is_string());
    Ok(())
}

#[tokio::test]
async fn sign_out_is_idempotent() -> Result<()> {
    let app = app()?;
    app.sign_up("leaving@example.com", "user").await?;
    let (access, refresh) = app.sign_in("leaving@example.com").await?;
    assert_eq!(app.store.len().await, 1);

    for _ in 0..2 {
        let reply = app
            .call(Method::POST, "/v1/user/sign/out", Some(bearer(&access)), None)
            .await?;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
    }
    assert!(app.store.is_empty().await);

    let renew = app.renew(&access, &refresh).await?;
    assert_eq!(renew.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn renew_works_after_access_expiry_until_refresh_expiry() -> Result<()> {
    let app = app()?;
    app.sign_up("long@example.com", "user").await?;
    let (access, refresh) = app.sign_in("long@example.com").await?;

    app.clock.set(NOW + ACCESS_TTL + 1);
    assert_eq!(app.create_book(&access, "late").await?.status, StatusCode::UNAUTHORIZED);

    let renewed = app.renew(&access, &refresh).await?;
    assert_eq!(renewed.status, StatusCode::OK);
    let access = renewed.body["access"].as_str().context("access")?.to_string();
    let refresh = renewed.body["refresh"].as_str().context("refresh")?.to_string();
    assert_eq!(app.create_book(&access, "fresh").await?.status, StatusCode::CREATED);

    app.clock.set(NOW + ACCESS_TTL + 1 + REFRESH_TTL + 1);
    let expired = app.renew(&access, &refresh).await?;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    assert_eq!(expired.body["error"], "refresh token expired");
    Ok(())
}

#[tokio::test]
async fn renew_succeeds_during_the_refresh_expiry_second() -> Result<()> {
    let app = app()?;
    app.sign_up("edge@example.com", "user").await?;
    let (access, refresh) = app.sign_in("edge@example.com").await?;

    app.clock.set(NOW + REFRESH_TTL);
    let renewed = app.renew(&access, &refresh).await?;
    assert_eq!(renewed.status, StatusCode::OK, "{}", renewed.body);
    assert_eq!(app.store.len().await, 1);

    let access = renewed.body["access"].as_str().context("access")?.to_string();
    let refresh = renewed.body["refresh"].as_str().context("refresh")?.to_string();
    app.clock.set(NOW + REFRESH_TTL + REFRESH_TTL + 1);
    assert!(app.store.is_empty().await);
    let expired = app.renew(&access, &refresh).await?;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn renew_reflects_role_changes() -> Result<()> {
    let app = app()?;
    let id = app.sign_up("promoted@example.com", "user").await?;
    let (access, refresh) = app.sign_in("promoted@example.com").await?;

    let created = app.create_book(&access, "Lilith's Brood").await?;
    let book = created.body["id"].as_str().context("book id")?.to_string();

    app.users.set_role(id, "admin").await;
    let renewed = app.renew(&access, &refresh).await?;
    let access = renewed.body["access"].as_str().context("access")?.to_string();

    let deleted = app
        .call(Method::DELETE, &format!("/v1/book/{book}"), Some(bearer(&access)), None)
        .await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn sign_up_and_sign_in_failures() -> Result<()> {
    let app = app()?;

    let unauthenticated = app
        .call(
            Method::POST,
            "/v1/user/sign/up",
            None,
            Some(json!({"email": "a@example.com", "password": PASSWORD, "user_role": "user"})),
        )
        .await?;
    assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);
    assert!(unauthenticated.headers.contains_key(header::WWW_AUTHENTICATE));

    let bad_role = app
        .call(
            Method::POST,
            "/v1/user/sign/up",
            Some(basic()),
            Some(json!({"email": "a@example.com", "password": PASSWORD, "user_role": "root"})),
        )
        .await?;
    assert_eq!(bad_role.status, StatusCode::BAD_REQUEST);

    let garbage = app
        .call(Method::POST, "/v1/user/sign/up", Some(basic()), Some(json!({"email": 1})))
        .await?;
    assert_eq!(garbage.status, StatusCode::BAD_REQUEST);

    let id = app.sign_up("a@example.com", "user").await?;
    let duplicate = app
        .call(
            Method::POST,
            "/v1/user/sign/up",
            Some(basic()),
            Some(json!({"email": "A@example.com", "password": PASSWORD, "user_role": "user"})),
        )
        .await?;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let unknown = app
        .call(
            Method::POST,
            "/v1/user/sign/in",
            Some(basic()),
            Some(json!({"email": "nobody@example.com", "password": PASSWORD})),
        )
        .await?;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let wrong = app
        .call(
            Method::POST,
            "/v1/user/sign/in",
            Some(basic()),
            Some(json!({"email": "a@example.com", "password": "not the password"})),
        )
        .await?;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    app.users.set_role(id, "librarian").await;
    let unregistered = app
        .call(
            Method::POST,
            "/v1/user/sign/in",
            Some(basic()),
            Some(json!({"email": "a@example.com", "password": PASSWORD})),
        )
        .await?;
    assert_eq!(unregistered.status, StatusCode::FORBIDDEN);

    app.users.set_role(id, "user").await;
    app.users.set_status(id, USER_STATUS_BLOCKED).await;
    let blocked = app
        .call(
            Method::POST,
            "/v1/user/sign/in",
            Some(basic()),
            Some(json!({"email": "a@example.com", "password": PASSWORD})),
        )
        .await?;
    assert_eq!(blocked.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn bearer_header_is_required() -> Result<()> {
    let app = app()?;

    let missing = app.call(Method::POST, "/v1/user/sign/out", None, None).await?;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let wrong_scheme = app
        .call(Method::POST, "/v1/book", Some(basic()), Some(json!({"title": "t", "author": "a"})))
        .await?;
    assert_eq!(wrong_scheme.status, StatusCode::BAD_REQUEST);

    let garbage = app
        .call(Method::POST, "/v1/user/sign/out", Some(bearer("not-a-token")), None)
        .await?;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn book_reads_need_client_credentials() -> Result<()> {
    let app = app()?;
    app.sign_up("lister@example.com", "user").await?;
    let (access, _) = app.sign_in("lister@example.com").await?;
    app.create_book(&access, "One").await?;
    app.create_book(&access, "Two").await?;

    let anonymous = app.call(Method::GET, "/v1/books", None, None).await?;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let listed = app.call(Method::GET, "/v1/books", Some(basic()), None).await?;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["count"], 2);
    assert_eq!(listed.body["books"][0]["title"], "One");

    let bad_id = app.call(Method::GET, "/v1/book/not-a-uuid", Some(basic()), None).await?;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn invalid_books_are_rejected() -> Result<()> {
    let app = app()?;
    app.sign_up("sloppy@example.com", "user").await?;
    let (access, _) = app.sign_in("sloppy@example.com").await?;

    let reply = app
        .call(
            Method::POST,
            "/v1/book",
            Some(bearer(&access)),
            Some(json!({"title": "", "author": "a"})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .call(
            Method::POST,
            "/v1/book",
            Some(bearer(&access)),
            Some(json!({"title": "t", "author": "a", "book_attrs": {"rating": 42}})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn health_and_request_ids() -> Result<()> {
    let app = app()?;

    let reply = app.call(Method::GET, "/health", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.headers.contains_key("x-app"));
    assert!(reply.headers.contains_key("x-request-id"));
    assert_eq!(reply.body["database"], "ok");

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("x-request-id", "fixed-id")
        .body(Body::empty())?;
    let response = app.router.clone().oneshot(request).await?;
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("fixed-id")
    );
    Ok(())
}

#[tokio::test]
async fn base64_endpoint_encodes_raw_body() -> Result<()> {
    let app = app()?;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/misc/base64encode")
        .body(Body::from("folio"))?;
    let response = app.router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let encoded: String = serde_json::from_slice(&bytes)?;
    assert_eq!(encoded, "Zm9saW8=");
    Ok(())
}
