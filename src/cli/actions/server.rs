use crate::{api, cli::commands::auth::DEV_SIGNING_SECRET};
use anyhow::{anyhow, bail, Result};
use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use tracing::warn;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub dev: bool,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the signing configuration is invalid or the server
/// fails to start.
pub async fn execute(args: Args) -> Result<()> {
    if args.jwt_secret == DEV_SIGNING_SECRET {
        if !args.dev {
            bail!(
                "refusing to start with the development signing secret, \
                 set BIGLIETTI_JWT_SECRET or pass --dev"
            );
        }
        warn!("Running with the development signing secret, tokens are forgeable");
    }

    let algorithm: Algorithm = args
        .jwt_algorithm
        .parse()
        .map_err(|_| anyhow!("unsupported signing algorithm: {}", args.jwt_algorithm))?;

    // Shared-secret signing only, the keys are derived from one secret string.
    if !matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    ) {
        bail!("only HMAC algorithms are supported: HS256, HS384, HS512");
    }

    if args.access_ttl_seconds <= 0 || args.refresh_ttl_seconds <= 0 {
        bail!("token lifetimes must be positive");
    }

    let auth_config = api::auth::AuthConfig::new(SecretString::from(args.jwt_secret))
        .with_algorithm(algorithm)
        .with_access_ttl_seconds(args.access_ttl_seconds)
        .with_refresh_ttl_seconds(args.refresh_ttl_seconds);

    api::new(args.port, args.dsn, auth_config).await
}
