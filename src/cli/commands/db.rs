use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

/// Database connection settings resolved from CLI/environment.
#[derive(Clone)]
pub struct Options {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: SecretString,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("db-host")
                .long("db-host")
                .help("Database host")
                .env("DB_HOST")
                .default_value("localhost"),
        )
        .arg(
            Arg::new("db-port")
                .long("db-port")
                .help("Database port")
                .env("DB_PORT")
                .default_value("3306")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("db-name")
                .long("db-name")
                .help("Database name")
                .env("DB_NAME")
                .default_value("kteeth"),
        )
        .arg(
            Arg::new("db-user")
                .long("db-user")
                .help("Database user")
                .env("DB_USER")
                .default_value("root"),
        )
        .arg(
            Arg::new("db-password")
                .long("db-password")
                .help("Database password")
                .env("DB_PASSWORD")
                .default_value("root"),
        )
        .arg(
            Arg::new("db-max-connections")
                .long("db-max-connections")
                .help("Connection pool upper bound")
                .env("KTEETH_DB_MAX_CONNECTIONS")
                .default_value("10")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("db-min-connections")
                .long("db-min-connections")
                .help("Connections kept idle in the pool")
                .env("KTEETH_DB_MIN_CONNECTIONS")
                .default_value("2")
                .value_parser(clap::value_parser!(u32)),
        )
}

impl Options {
    /// Resolve database options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is somehow absent.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get = |name: &str| -> Result<String> {
            matches
                .get_one::<String>(name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{name}"))
        };

        Ok(Self {
            host: get("db-host")?,
            port: matches.get_one::<u16>("db-port").copied().unwrap_or(3306),
            name: get("db-name")?,
            user: get("db-user")?,
            password: SecretString::from(get("db-password")?),
            max_connections: matches
                .get_one::<u32>("db-max-connections")
                .copied()
                .unwrap_or(10),
            min_connections: matches
                .get_one::<u32>("db-min-connections")
                .copied()
                .unwrap_or(2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn base_command() -> Command {
        with_args(Command::new("kteeth"))
    }

    #[test]
    fn defaults_match_documented_values() {
        temp_env::with_vars(
            [
                ("DB_HOST", None::<&str>),
                ("DB_PORT", None),
                ("DB_NAME", None),
                ("DB_USER", None),
                ("DB_PASSWORD", None),
            ],
            || {
                let matches = base_command().get_matches_from(vec!["kteeth"]);
                let options = Options::parse(&matches).unwrap();
                assert_eq!(options.host, "localhost");
                assert_eq!(options.port, 3306);
                assert_eq!(options.name, "kteeth");
                assert_eq!(options.user, "root");
                assert_eq!(options.password.expose_secret(), "root");
                assert_eq!(options.max_connections, 10);
                assert_eq!(options.min_connections, 2);
            },
        );
    }

    #[test]
    fn env_overrides_defaults() {
        temp_env::with_vars(
            [
                ("DB_HOST", Some("db.internal")),
                ("DB_PORT", Some("3307")),
                ("DB_NAME", Some("accounts")),
            ],
            || {
                let matches = base_command().get_matches_from(vec!["kteeth"]);
                let options = Options::parse(&matches).unwrap();
                assert_eq!(options.host, "db.internal");
                assert_eq!(options.port, 3307);
                assert_eq!(options.name, "accounts");
            },
        );
    }
}
