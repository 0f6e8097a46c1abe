//! Runtime configuration for the API client. Values normally come from the CLI
//! (flags or `JANK_*` environment variables) and are public; never put secrets here.

use super::ApiError;
use std::time::Duration;
use url::Url;

/// Default timeout for every HTTP call, matching the web console's client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound for a refresh exchange before it counts as a refresh failure.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);
/// Upper bound for a permission check before the route guard denies.
pub const DEFAULT_PERMISSION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
    pub permission_timeout: Duration,
}

impl ConsoleConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            permission_timeout: DEFAULT_PERMISSION_TIMEOUT,
        }
    }

    /// Checks that the base URL is an absolute http(s) URL with a host.
    ///
    /// # Errors
    /// Returns `ApiError::Config` when the URL cannot be used.
    pub fn validate(&self) -> Result<Url, ApiError> {
        let raw = self.api_base_url.trim();
        if raw.is_empty() {
            return Err(ApiError::Config("API base URL is not configured.".to_string()));
        }

        let url = Url::parse(raw)
            .map_err(|err| ApiError::Config(format!("Invalid API base URL {raw}: {err}")))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ApiError::Config(format!(
                    "Invalid API base URL: unsupported scheme {scheme}"
                )))
            }
        }

        if url.host().is_none() {
            return Err(ApiError::Config(
                "Invalid API base URL: no host specified".to_string(),
            ));
        }

        Ok(url)
    }

    /// Joins `path` onto the base URL, keeping any path prefix the base carries.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.api_base_url.trim().trim_end_matches('/');
        let path = path.trim();

        if base.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", base, path.trim_start_matches('/'))
        }
    }
}
