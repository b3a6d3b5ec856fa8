//! `/health`: build identity plus a ping of the user directory and refresh store.

use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::{auth::store::RefreshStore, directory::UserDirectory, GIT_COMMIT_HASH};

const HEALTH_PROBE_TIMEOUT_SECONDS: u64 = 2;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
    cache: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses (
        (status = 200, description = "Database and refresh store are reachable", body = Health),
        (status = 503, description = "A dependency is unreachable", body = Health)
    ),
    tag = "health",
)]
pub async fn health(
    method: Method,
    users: Extension<Arc<dyn UserDirectory>>,
    store: Extension<Arc<dyn RefreshStore>>,
) -> impl IntoResponse {
    let database_ok = probe("database", users.ping()).await;
    let cache_ok = probe("cache", store.ping()).await;

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: status_label(database_ok),
        cache: status_label(cache_ok),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = health.commit.get(..7).unwrap_or("");
    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app| {
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app);
            headers
        })
        .unwrap_or_else(|err| {
            debug!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    let status = if database_ok && cache_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, body)
}

async fn probe<E: std::fmt::Display>(
    name: &str,
    ping: impl Future<Output = Result<(), E>>,
) -> bool {
    match timeout(Duration::from_secs(HEALTH_PROBE_TIMEOUT_SECONDS), ping).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            error!("{name} ping failed: {err}");
            false
        }
        Err(_) => {
            warn!("{name} ping timed out");
            false
        }
    }
}

fn status_label(ok: bool) -> String {
    let label = if ok { "ok" } else { "error" };
    label.to_string()
}
