use clap::{Arg, Command};

pub const ARG_DSN: &str = "dsn";
pub const ARG_REDIS_URL: &str = "redis-url";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("FOLIO_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_REDIS_URL)
                .long(ARG_REDIS_URL)
                .help("Redis URL for the refresh token store")
                .env("FOLIO_REDIS_URL")
                .default_value("redis://127.0.0.1:6379"),
        )
}
