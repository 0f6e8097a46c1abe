pub mod logging;
pub mod session;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_STATE_FILE: &str = "state-file";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";
pub const ARG_REFRESH_TIMEOUT: &str = "refresh-timeout";
pub const ARG_PERMISSION_TIMEOUT: &str = "permission-timeout";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("jank-console")
        .about("Jank blog console session and access control")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_API_URL)
                .short('u')
                .long("api-url")
                .help("Base URL of the blog API, example: https://blog.example.com")
                .env("JANK_API_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_STATE_FILE)
                .long("state-file")
                .help("File holding the persisted session")
                .env("JANK_STATE_FILE")
                .default_value(".jank-console.json")
                .global(true),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long("request-timeout")
                .help("Timeout in seconds for every API call")
                .env("JANK_REQUEST_TIMEOUT")
                .default_value("30")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TIMEOUT)
                .long("refresh-timeout")
                .help("Timeout in seconds for a session refresh")
                .env("JANK_REFRESH_TIMEOUT")
                .default_value("15")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_PERMISSION_TIMEOUT)
                .long("permission-timeout")
                .help("Timeout in seconds for a permission check")
                .env("JANK_PERMISSION_TIMEOUT")
                .default_value("10")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        );

    let command = session::with_subcommands(command);
    logging::with_args(command)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "jank-console");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Jank blog console session and access control".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_global_args() {
        temp_env::with_vars(
            [
                ("JANK_API_URL", None::<&str>),
                ("JANK_STATE_FILE", None),
                ("JANK_REFRESH_TIMEOUT", None),
            ],
            || {
                let matches = new().get_matches_from(vec![
                    "jank-console",
                    "--api-url",
                    "https://blog.jank.dev",
                    "--refresh-timeout",
                    "5",
                    "status",
                ]);

                assert_eq!(
                    matches.get_one::<String>(ARG_API_URL).cloned(),
                    Some("https://blog.jank.dev".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(ARG_STATE_FILE).cloned(),
                    Some(".jank-console.json".to_string())
                );
                assert_eq!(matches.get_one::<u64>(ARG_REQUEST_TIMEOUT).copied(), Some(30));
                assert_eq!(matches.get_one::<u64>(ARG_REFRESH_TIMEOUT).copied(), Some(5));
                assert_eq!(
                    matches.get_one::<u64>(ARG_PERMISSION_TIMEOUT).copied(),
                    Some(10)
                );
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("JANK_API_URL", Some("http://127.0.0.1:9010")),
                ("JANK_STATE_FILE", Some("/tmp/jank-state.json")),
                ("JANK_PERMISSION_TIMEOUT", Some("3")),
                ("JANK_LOG_LEVEL", Some("info")),
                ("JANK_LOG_JSON", Some("true")),
            ],
            || {
                let matches = new().get_matches_from(vec!["jank-console", "status"]);

                assert_eq!(
                    matches.get_one::<String>(ARG_API_URL).cloned(),
                    Some("http://127.0.0.1:9010".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(ARG_STATE_FILE).cloned(),
                    Some("/tmp/jank-state.json".to_string())
                );
                assert_eq!(
                    matches.get_one::<u64>(ARG_PERMISSION_TIMEOUT).copied(),
                    Some(3)
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
                assert!(matches.get_flag(logging::ARG_LOG_JSON));
            },
        );
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        temp_env::with_vars([("JANK_REQUEST_TIMEOUT", None::<&str>)], || {
            let result = new().try_get_matches_from(vec![
                "jank-console",
                "--request-timeout",
                "0",
                "status",
            ]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("JANK_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["jank-console", "status"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(u8::try_from(index).unwrap())
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            temp_env::with_vars([("JANK_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["jank-console".to_string(), "status".to_string()];

                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(u8::try_from(index).unwrap())
                );
            });
        }
    }
}
