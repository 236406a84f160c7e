use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub mod auth;
pub mod db;
pub mod jwt;
pub mod logging;
pub mod oauth;

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("kteeth")
        .about("Demo HTTP backend with session, JWT and OAuth authentication")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("KTEETH_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = logging::with_args(command);
    let command = db::with_args(command);
    let command = jwt::with_args(command);
    let command = auth::with_args(command);
    oauth::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "kteeth");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Demo HTTP backend with session, JWT and OAuth authentication"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_port_default() {
        let command = new();
        let matches = command.get_matches_from(vec!["kteeth"]);
        assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
    }

    #[test]
    fn test_port_from_env() {
        temp_env::with_vars([("KTEETH_PORT", Some("443"))], || {
            let command = new();
            let matches = command.get_matches_from(vec!["kteeth"]);
            assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
        });
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("KTEETH_LOG_LEVEL", Some(level))], || {
                let command = new();
                let matches = command.get_matches_from(vec!["kteeth"]);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("KTEETH_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["kteeth".to_string()];
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let command = new();
                let matches = command.get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }
}
