//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let jwt_secret = matches
        .get_one::<String>(auth::ARG_JWT_SECRET)
        .cloned()
        .context("missing required argument: --jwt-secret")?;

    let jwt_algorithm = matches
        .get_one::<String>(auth::ARG_JWT_ALGORITHM)
        .cloned()
        .context("missing required argument: --jwt-algorithm")?;

    let access_ttl_seconds = matches
        .get_one::<i64>(auth::ARG_ACCESS_TTL)
        .copied()
        .context("missing required argument: --access-ttl-seconds")?;

    let refresh_ttl_seconds = matches
        .get_one::<i64>(auth::ARG_REFRESH_TTL)
        .copied()
        .context("missing required argument: --refresh-ttl-seconds")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret,
        jwt_algorithm,
        access_ttl_seconds,
        refresh_ttl_seconds,
        dev: matches.get_flag(auth::ARG_DEV),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn handler_builds_server_action() {
        temp_env::with_vars(
            [
                ("BIGLIETTI_JWT_SECRET", Some("s3cret")),
                ("BIGLIETTI_DSN", None::<&str>),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "biglietti",
                    "--dsn",
                    "postgres://user@localhost:5432/biglietti",
                    "--port",
                    "9999",
                ]);

                let action = handler(&matches).expect("handler should succeed");
                let Action::Server(args) = action;
                assert_eq!(args.port, 9999);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/biglietti");
                assert_eq!(args.jwt_secret, "s3cret");
                assert_eq!(args.jwt_algorithm, "HS256");
                assert_eq!(args.access_ttl_seconds, 900);
                assert_eq!(args.refresh_ttl_seconds, 2_592_000);
                assert!(!args.dev);
            },
        );
    }
}
