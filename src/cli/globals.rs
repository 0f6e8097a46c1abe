use crate::api::ConsoleConfig;
use std::{path::PathBuf, time::Duration};

/// Settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalArgs {
    pub api_url: String,
    pub state_file: PathBuf,
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
    pub permission_timeout: Duration,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String, state_file: impl Into<PathBuf>) -> Self {
        let defaults = ConsoleConfig::new(api_url);
        Self {
            api_url: defaults.api_base_url,
            state_file: state_file.into(),
            request_timeout: defaults.request_timeout,
            refresh_timeout: defaults.refresh_timeout,
            permission_timeout: defaults.permission_timeout,
        }
    }

    #[must_use]
    pub fn config(&self) -> ConsoleConfig {
        ConsoleConfig {
            api_base_url: self.api_url.clone(),
            request_timeout: self.request_timeout,
            refresh_timeout: self.refresh_timeout,
            permission_timeout: self.permission_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DEFAULT_PERMISSION_TIMEOUT, DEFAULT_REFRESH_TIMEOUT};

    #[test]
    fn test_global_args() {
        let mut args = GlobalArgs::new("https://blog.jank.dev".to_string(), ".jank-console.json");
        assert_eq!(args.api_url, "https://blog.jank.dev");
        assert_eq!(args.refresh_timeout, DEFAULT_REFRESH_TIMEOUT);

        args.permission_timeout = Duration::from_secs(2);
        let config = args.config();
        assert_eq!(config.api_base_url, "https://blog.jank.dev");
        assert_eq!(config.permission_timeout, Duration::from_secs(2));
        assert_ne!(config.permission_timeout, DEFAULT_PERMISSION_TIMEOUT);
    }
}
