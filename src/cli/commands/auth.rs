use clap::{Arg, Command};

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_ACCESS_TTL_SECONDS: &str = "access-ttl-seconds";
pub const ARG_REFRESH_TTL_SECONDS: &str = "refresh-ttl-seconds";
pub const ARG_BASIC_AUTH_USER: &str = "basic-auth-user";
pub const ARG_BASIC_AUTH_PASSWORD: &str = "basic-auth-password";

pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_client_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HMAC secret used to sign access and refresh tokens (at least 32 bytes)")
                .env("FOLIO_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TTL_SECONDS)
                .long(ARG_ACCESS_TTL_SECONDS)
                .help("Access token lifetime in seconds")
                .env("FOLIO_ACCESS_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TTL_SECONDS)
                .long(ARG_REFRESH_TTL_SECONDS)
                .help("Refresh token lifetime in seconds")
                .env("FOLIO_REFRESH_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

fn with_client_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASIC_AUTH_USER)
                .long(ARG_BASIC_AUTH_USER)
                .help("Client user for the Basic-protected routes")
                .env("FOLIO_BASIC_AUTH_USER")
                .required(true),
        )
        .arg(
            Arg::new(ARG_BASIC_AUTH_PASSWORD)
                .long(ARG_BASIC_AUTH_PASSWORD)
                .help("Client password for the Basic-protected routes")
                .env("FOLIO_BASIC_AUTH_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}
