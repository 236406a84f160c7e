use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

/// Session and static-credential settings.
#[derive(Clone)]
pub struct Options {
    pub session_ttl_seconds: u64,
    pub basic_user: String,
    pub basic_password: SecretString,
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Server-side session TTL in seconds")
                .env("KTEETH_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("basic-user")
                .long("basic-user")
                .help("Username accepted by the basic and form schemes")
                .env("KTEETH_BASIC_USER")
                .default_value("ddd"),
        )
        .arg(
            Arg::new("basic-password")
                .long("basic-password")
                .help("Password accepted by the basic and form schemes")
                .env("KTEETH_BASIC_PASSWORD")
                .default_value("ddd"),
        )
}

impl Options {
    /// Resolve session/credential options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is somehow absent.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let basic_user = matches
            .get_one::<String>("basic-user")
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --basic-user"))?;
        let basic_password = matches
            .get_one::<String>("basic-password")
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --basic-password"))?;

        Ok(Self {
            session_ttl_seconds: matches
                .get_one::<u64>("session-ttl-seconds")
                .copied()
                .unwrap_or(43200),
            basic_user,
            basic_password: SecretString::from(basic_password),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn default_credentials() {
        temp_env::with_vars(
            [
                ("KTEETH_BASIC_USER", None::<&str>),
                ("KTEETH_BASIC_PASSWORD", None),
                ("KTEETH_SESSION_TTL_SECONDS", None),
            ],
            || {
                let matches = with_args(Command::new("kteeth")).get_matches_from(vec!["kteeth"]);
                let options = Options::parse(&matches).unwrap();
                assert_eq!(options.basic_user, "ddd");
                assert_eq!(options.basic_password.expose_secret(), "ddd");
                assert_eq!(options.session_ttl_seconds, 43200);
            },
        );
    }
}
