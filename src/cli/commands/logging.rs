use clap::{builder::ValueParser, Arg, ArgAction, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_JSON: &str = "log-json";

/// Log levels by verbosity; the index is the `-v` count or the numeric level.
const LEVELS: [(&str, Level); 5] = [
    ("error", Level::ERROR),
    ("warn", Level::WARN),
    ("info", Level::INFO),
    ("debug", Level::DEBUG),
    ("trace", Level::TRACE),
];

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_level)
}

/// Accepts a level name or its index in [`LEVELS`].
fn parse_level(level: &str) -> Result<u8, String> {
    let level = level.trim();
    let position = match level.parse::<usize>() {
        Ok(index) => (index < LEVELS.len()).then_some(index),
        Err(_) => LEVELS
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(level)),
    };

    position
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| {
            let names: Vec<&str> = LEVELS.iter().map(|(name, _)| *name).collect();
            format!("invalid log level {level:?}, expected one of: {}", names.join(", "))
        })
}

/// Level to enable for a verbosity; `None` keeps the default `error` filter.
#[must_use]
pub fn level_for(verbosity: u8) -> Option<Level> {
    if verbosity == 0 {
        return None;
    }
    let index = usize::from(verbosity).min(LEVELS.len() - 1);
    Some(LEVELS[index].1)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("JANK_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .arg(
            Arg::new(ARG_LOG_JSON)
                .long("log-json")
                .help("Emit logs as JSON lines on stderr")
                .env("JANK_LOG_JSON")
                .global(true)
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0), None);
        assert_eq!(level_for(1), Some(Level::WARN));
        assert_eq!(level_for(3), Some(Level::DEBUG));
        assert_eq!(level_for(u8::MAX), Some(Level::TRACE));
    }

    #[test]
    fn level_names_and_indexes_agree() {
        assert_eq!(parse_level("error"), Ok(0));
        assert_eq!(parse_level("DEBUG"), Ok(3));
        assert_eq!(parse_level(" 4 "), Ok(4));
        assert_eq!(level_for(parse_level("info").unwrap_or(0)), Some(Level::INFO));
        assert_eq!(level_for(parse_level("error").unwrap_or(0)), None);
    }

    #[test]
    fn unknown_level_lists_the_valid_names() {
        let err = parse_level("loud").unwrap_err();
        assert!(err.contains("error, warn, info, debug, trace"), "{err}");
        assert!(parse_level("5").is_err());
    }
}
