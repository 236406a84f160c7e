use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

/// OAuth client settings. The bridge is only enabled when both client id
/// and secret are present.
#[derive(Clone)]
pub struct Options {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("oauth-client-id")
                .long("oauth-client-id")
                .help("OAuth client id")
                .env("GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new("oauth-client-secret")
                .long("oauth-client-secret")
                .help("OAuth client secret")
                .env("GOOGLE_CLIENT_SECRET"),
        )
        .arg(
            Arg::new("oauth-redirect-url")
                .long("oauth-redirect-url")
                .help("Redirect URL registered with the OAuth provider")
                .env("KTEETH_OAUTH_REDIRECT_URL")
                .default_value("http://localhost:8080/callback"),
        )
}

impl Options {
    /// Resolve OAuth options; `None` when the client is not configured.
    ///
    /// # Errors
    /// Returns an error if the redirect URL argument is somehow absent.
    pub fn parse(matches: &ArgMatches) -> Result<Option<Self>> {
        let client_id = matches.get_one::<String>("oauth-client-id").cloned();
        let client_secret = matches.get_one::<String>("oauth-client-secret").cloned();

        let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
            return Ok(None);
        };

        let redirect_url = matches
            .get_one::<String>("oauth-redirect-url")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --oauth-redirect-url"))?;

        Ok(Some(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
            redirect_url,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_client_credentials() {
        temp_env::with_vars(
            [
                ("GOOGLE_CLIENT_ID", None::<&str>),
                ("GOOGLE_CLIENT_SECRET", None),
            ],
            || {
                let matches = with_args(Command::new("kteeth")).get_matches_from(vec!["kteeth"]);
                assert!(Options::parse(&matches).unwrap().is_none());
            },
        );
    }

    #[test]
    fn enabled_from_environment() {
        temp_env::with_vars(
            [
                ("GOOGLE_CLIENT_ID", Some("client-id")),
                ("GOOGLE_CLIENT_SECRET", Some("client-secret")),
            ],
            || {
                let matches = with_args(Command::new("kteeth")).get_matches_from(vec!["kteeth"]);
                let options = Options::parse(&matches).unwrap().unwrap();
                assert_eq!(options.client_id, "client-id");
                assert_eq!(options.redirect_url, "http://localhost:8080/callback");
            },
        );
    }
}
