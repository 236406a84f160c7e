use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::path::PathBuf;

/// Token issuance and verification settings.
///
/// Supplying `--jwt-hmac-secret` selects the symmetric (HS256) profile;
/// otherwise `--jwt-private-key-path` is required and the service signs
/// RS256 tokens and publishes a JWKS document.
#[derive(Clone)]
pub struct Options {
    pub private_key_path: Option<PathBuf>,
    pub jwks_path: Option<PathBuf>,
    pub jwks_url: Option<String>,
    pub hmac_secret: Option<SecretString>,
    pub issuer: String,
    pub audience: String,
    pub realm: String,
    pub kid: String,
    pub ttl_seconds: i64,
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("jwt-private-key-path")
                .long("jwt-private-key-path")
                .help("PKCS8/PKCS1 RSA private key (PEM) used to sign tokens")
                .env("KTEETH_JWT_PRIVATE_KEY_PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("jwt-jwks-path")
                .long("jwt-jwks-path")
                .help("JWKS document to serve at /.well-known/jwks.json (default: derived from the private key)")
                .env("KTEETH_JWT_JWKS_PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("jwt-jwks-url")
                .long("jwt-jwks-url")
                .help("Remote JWKS endpoint for token verification (default: verify against the local key)")
                .env("KTEETH_JWT_JWKS_URL"),
        )
        .arg(
            Arg::new("jwt-hmac-secret")
                .long("jwt-hmac-secret")
                .help("Shared HS256 secret; selects the symmetric signing profile")
                .env("KTEETH_JWT_HMAC_SECRET"),
        )
        .arg(
            Arg::new("jwt-issuer")
                .long("jwt-issuer")
                .help("Issuer claim for minted tokens")
                .env("KTEETH_JWT_ISSUER")
                .default_value("http://localhost:8080/"),
        )
        .arg(
            Arg::new("jwt-audience")
                .long("jwt-audience")
                .help("Audience claim for minted tokens")
                .env("KTEETH_JWT_AUDIENCE")
                .default_value("http://localhost:8080/hello"),
        )
        .arg(
            Arg::new("jwt-realm")
                .long("jwt-realm")
                .help("Realm advertised in authentication challenges")
                .env("KTEETH_JWT_REALM")
                .default_value("Access to protected routes"),
        )
        .arg(
            Arg::new("jwt-kid")
                .long("jwt-kid")
                .help("Key id published with the JWKS and embedded in token headers")
                .env("KTEETH_JWT_KID")
                .default_value("kteeth-signing-key"),
        )
        .arg(
            Arg::new("jwt-ttl-seconds")
                .long("jwt-ttl-seconds")
                .help("Token lifetime in seconds")
                .env("KTEETH_JWT_TTL_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(i64)),
        )
}

impl Options {
    /// Resolve token options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if neither a private key nor an HMAC secret is
    /// configured.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let private_key_path = matches.get_one::<PathBuf>("jwt-private-key-path").cloned();
        let hmac_secret = matches
            .get_one::<String>("jwt-hmac-secret")
            .cloned()
            .map(SecretString::from);

        if private_key_path.is_none() && hmac_secret.is_none() {
            return Err(anyhow!(
                "missing required argument: --jwt-private-key-path or --jwt-hmac-secret"
            ));
        }

        let get = |name: &str| -> Result<String> {
            matches
                .get_one::<String>(name)
                .cloned()
                .ok_or_else(|| anyhow!("missing required argument: --{name}"))
        };

        Ok(Self {
            private_key_path,
            jwks_path: matches.get_one::<PathBuf>("jwt-jwks-path").cloned(),
            jwks_url: matches.get_one::<String>("jwt-jwks-url").cloned(),
            hmac_secret,
            issuer: get("jwt-issuer")?,
            audience: get("jwt-audience")?,
            realm: get("jwt-realm")?,
            kid: get("jwt-kid")?,
            ttl_seconds: matches
                .get_one::<i64>("jwt-ttl-seconds")
                .copied()
                .unwrap_or(60),
        })
    }
}
