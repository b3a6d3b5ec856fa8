use crate::{
    auth::{
        clock::{Clock, SystemClock},
        store::{RedisRefreshStore, RefreshStore},
        Guard, SessionManager, TokenCodec,
    },
    books::{BookRepository, PgBookRepository},
    cli::actions::server::Args,
    directory::{PgUserDirectory, UserDirectory},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, HeaderName, HeaderValue, Method, Request},
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, error, info, Span};
use ulid::Ulid;

pub mod error;
pub mod extract;
pub mod handlers;
mod openapi;

pub use self::extract::ClientAuth;
pub use self::openapi::openapi;

use self::handlers::{books, health, misc, users};

const SCHEMA: &str = include_str!("../../db/sql/01_folio.sql");

/// Everything the handlers need, shared through `Extension` layers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub guard: Arc<Guard>,
    pub users: Arc<dyn UserDirectory>,
    pub refresh_store: Arc<dyn RefreshStore>,
    pub books: Arc<dyn BookRepository>,
    pub client_auth: Arc<ClientAuth>,
}

impl AppState {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        refresh_store: Arc<dyn RefreshStore>,
        books: Arc<dyn BookRepository>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
        client_auth: ClientAuth,
    ) -> Self {
        let sessions = SessionManager::new(
            users.clone(),
            refresh_store.clone(),
            codec.clone(),
            clock.clone(),
        );

        Self {
            sessions: Arc::new(sessions),
            guard: Arc::new(Guard::new(codec, clock)),
            users,
            refresh_store,
            books,
            client_auth: Arc::new(client_auth),
        }
    }
}

/// Build the application router with its middleware stack.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health::health).options(health::health))
        .route("/v1/user/sign/up", post(users::sign_up))
        .route("/v1/user/sign/in", post(users::sign_in))
        .route("/v1/user/sign/out", post(users::sign_out))
        .route("/v1/user/sign/renew", post(users::renew))
        .route("/v1/books", get(books::list_books))
        .route("/v1/book", post(books::create_book))
        .route(
            "/v1/book/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/v1/misc/base64encode", post(misc::base64_encode))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state.sessions))
                .layer(Extension(state.guard))
                .layer(Extension(state.users))
                .layer(Extension(state.refresh_store))
                .layer(Extension(state.books))
                .layer(Extension(state.client_auth)),
        )
}

/// Connect the backends, apply the schema and serve until Ctrl-C.
///
/// # Errors
/// Returns an error if a backend is unreachable, the signing secret is too
/// short, or the listener cannot bind.
pub async fn new(args: Args) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::raw_sql(SCHEMA)
        .execute(&pool)
        .await
        .context("Failed to apply database schema")?;

    let refresh_store = RedisRefreshStore::connect(&args.redis_url)
        .await
        .context("Failed to connect to redis")?;

    let codec = TokenCodec::new(
        args.jwt_secret,
        Duration::from_secs(args.access_ttl_seconds),
        Duration::from_secs(args.refresh_ttl_seconds),
    )
    .context("Invalid JWT secret")?;

    let state = AppState::new(
        Arc::new(PgUserDirectory::new(pool.clone())),
        Arc::new(refresh_store),
        Arc::new(PgBookRepository::new(pool)),
        Arc::new(codec),
        Arc::new(SystemClock),
        ClientAuth::new(args.basic_auth_user, args.basic_auth_password),
    );

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{}", args.port)).await?;

    info!("Listening on [::]:{}", args.port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http.request", %method, route, request_id)
}
