use clap::{Arg, Command};

pub const CMD_LOGIN: &str = "login";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_STATUS: &str = "status";
pub const CMD_NAVIGATE: &str = "navigate";
pub const CMD_REQUEST: &str = "request";

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_ROUTE: &str = "route";
pub const ARG_METHOD: &str = "method";
pub const ARG_PATH: &str = "path";
pub const ARG_DATA: &str = "data";
pub const ARG_QUERY: &str = "query";

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(
            Command::new(CMD_LOGIN)
                .about("Sign in and cache the user profile")
                .arg(
                    Arg::new(ARG_EMAIL)
                        .short('e')
                        .long("email")
                        .help("Account email")
                        .env("JANK_EMAIL")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_PASSWORD)
                        .short('p')
                        .long("password")
                        .help("Account password")
                        .env("JANK_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                ),
        )
        .subcommand(Command::new(CMD_LOGOUT).about("Sign out and clear the stored session"))
        .subcommand(Command::new(CMD_STATUS).about("Show the stored session"))
        .subcommand(
            Command::new(CMD_NAVIGATE)
                .about("Run the route guard for a console route")
                .arg(
                    Arg::new(ARG_ROUTE)
                        .help("Console route, example: /console/posts")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(CMD_REQUEST)
                .about("Send an authorized API call")
                .arg(
                    Arg::new(ARG_METHOD)
                        .help("HTTP method")
                        .required(true)
                        .value_parser(["GET", "POST", "PUT", "DELETE", "get", "post", "put", "delete"]),
                )
                .arg(
                    Arg::new(ARG_PATH)
                        .help("API path, example: /api/v1/post/list")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_DATA)
                        .short('d')
                        .long("data")
                        .help("JSON request body"),
                )
                .arg(
                    Arg::new(ARG_QUERY)
                        .short('q')
                        .long("query")
                        .help("Query parameter as key=value, may be repeated")
                        .action(clap::ArgAction::Append),
                ),
        )
}
