//! Maps parsed command-line arguments to actions.

use crate::cli::{
    actions::{login, navigate, request, Action},
    commands::{self, session},
    globals::GlobalArgs,
};
use anyhow::{anyhow, bail, Context, Result};
use reqwest::Method;
use secrecy::SecretString;
use serde_json::Value;
use std::time::Duration;

/// Collect the settings shared by every subcommand.
///
/// # Errors
/// Returns an error if the API URL is missing.
pub fn globals(matches: &clap::ArgMatches) -> Result<GlobalArgs> {
    let api_url = matches
        .get_one::<String>(commands::ARG_API_URL)
        .cloned()
        .context("missing required argument: --api-url (or JANK_API_URL)")?;
    let state_file = matches
        .get_one::<String>(commands::ARG_STATE_FILE)
        .cloned()
        .unwrap_or_else(|| ".jank-console.json".to_string());

    let mut globals = GlobalArgs::new(api_url, state_file);

    let seconds = |id: &str| matches.get_one::<u64>(id).copied().map(Duration::from_secs);
    if let Some(timeout) = seconds(commands::ARG_REQUEST_TIMEOUT) {
        globals.request_timeout = timeout;
    }
    if let Some(timeout) = seconds(commands::ARG_REFRESH_TIMEOUT) {
        globals.refresh_timeout = timeout;
    }
    if let Some(timeout) = seconds(commands::ARG_PERMISSION_TIMEOUT) {
        globals.permission_timeout = timeout;
    }

    Ok(globals)
}

/// Map the selected subcommand to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((session::CMD_LOGIN, sub)) => {
            let email = sub
                .get_one::<String>(session::ARG_EMAIL)
                .cloned()
                .context("missing required argument: --email")?;
            let password = sub
                .get_one::<String>(session::ARG_PASSWORD)
                .cloned()
                .map(SecretString::from)
                .context("missing required argument: --password")?;

            Ok(Action::Login(login::Args { email, password }))
        }
        Some((session::CMD_LOGOUT, _)) => Ok(Action::Logout),
        Some((session::CMD_STATUS, _)) => Ok(Action::Status),
        Some((session::CMD_NAVIGATE, sub)) => {
            let route = sub
                .get_one::<String>(session::ARG_ROUTE)
                .cloned()
                .context("missing required argument: <route>")?;

            Ok(Action::Navigate(navigate::Args { route }))
        }
        Some((session::CMD_REQUEST, sub)) => {
            let method = sub
                .get_one::<String>(session::ARG_METHOD)
                .context("missing required argument: <method>")?;
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|err| anyhow!("invalid method {method}: {err}"))?;

            let path = sub
                .get_one::<String>(session::ARG_PATH)
                .cloned()
                .context("missing required argument: <path>")?;

            let body = sub
                .get_one::<String>(session::ARG_DATA)
                .map(|raw| serde_json::from_str::<Value>(raw))
                .transpose()
                .context("--data is not valid JSON")?;

            let query = sub
                .get_many::<String>(session::ARG_QUERY)
                .into_iter()
                .flatten()
                .map(|pair| parse_query_pair(pair))
                .collect::<Result<Vec<_>>>()?;

            Ok(Action::Request(request::Args {
                method,
                path,
                body,
                query,
            }))
        }
        Some((name, _)) => bail!("unknown command: {name}"),
        None => bail!("no command given"),
    }
}

fn parse_query_pair(pair: &str) -> Result<(String, String)> {
    let (key, value) = pair
        .split_once('=')
        .with_context(|| format!("query parameter {pair} is not key=value"))?;
    if key.trim().is_empty() {
        bail!("query parameter {pair} has an empty key");
    }
    Ok((key.trim().to_string(), value.to_string()))
}
