use crate::{
    auth::token::MIN_SECRET_BYTES,
    cli::{
        actions::{server::Args, Action},
        commands::{auth, storage, ARG_PORT},
    },
};
use anyhow::{ensure, Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing or the JWT secret is too short.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(storage::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let redis_url = matches
        .get_one::<String>(storage::ARG_REDIS_URL)
        .cloned()
        .context("missing required argument: --redis-url")?;

    let jwt_secret = matches
        .get_one::<String>(auth::ARG_JWT_SECRET)
        .cloned()
        .context("missing required argument: --jwt-secret")?;
    ensure!(
        jwt_secret.len() >= MIN_SECRET_BYTES,
        "--jwt-secret must be at least {MIN_SECRET_BYTES} bytes"
    );

    let access_ttl_seconds = matches
        .get_one::<u64>(auth::ARG_ACCESS_TTL_SECONDS)
        .copied()
        .unwrap_or(900);
    let refresh_ttl_seconds = matches
        .get_one::<u64>(auth::ARG_REFRESH_TTL_SECONDS)
        .copied()
        .unwrap_or(604_800);

    let basic_auth_user = matches
        .get_one::<String>(auth::ARG_BASIC_AUTH_USER)
        .cloned()
        .context("missing required argument: --basic-auth-user")?;
    let basic_auth_password = matches
        .get_one::<String>(auth::ARG_BASIC_AUTH_PASSWORD)
        .cloned()
        .context("missing required argument: --basic-auth-password")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        redis_url,
        jwt_secret: SecretString::from(jwt_secret),
        access_ttl_seconds,
        refresh_ttl_seconds,
        basic_auth_user,
        basic_auth_password: SecretString::from(basic_auth_password),
    }))
}
