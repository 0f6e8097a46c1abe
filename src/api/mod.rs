//! API gateway for the platform.
//!
//! [`ApiClient`] is the single entry point for outgoing calls. It reads the current
//! access token from the [`SessionManager`] for every call, so a refreshed token is
//! visible to the very next request. A 401 on a call that was not retried yet is
//! handed to the [`RefreshCoordinator`]; the caller only sees the eventual outcome.
//! Network failures and every other status are returned unchanged.

mod config;
mod errors;
pub mod refresh;
pub mod transport;

pub use config::{
    ConsoleConfig, DEFAULT_PERMISSION_TIMEOUT, DEFAULT_REFRESH_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
pub use errors::ApiError;
pub use refresh::{RefreshBackend, RefreshCoordinator};
pub use transport::HttpTransport;

use crate::{
    navigation::{Navigator, Redirect},
    session::{SessionManager, TokenPair, TokenPayload, UserProfile},
};
use errors::sanitize_body;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const LOGIN_ENDPOINT: &str = "/api/v1/user/login";
pub const LOGOUT_ENDPOINT: &str = "/api/v1/user/logout";
pub const REFRESH_TOKEN_ENDPOINT: &str = "/api/v1/user/refresh-token";
pub const PROFILE_ENDPOINT: &str = "/api/v1/user/profile";

/// An outgoing call, captured so it can be replayed after a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `body` as the JSON payload.
    ///
    /// # Errors
    /// Returns `ApiError::Serialization` if `body` cannot be encoded.
    pub fn json<B: Serialize>(self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|err| ApiError::Serialization(format!("Failed to encode request: {err}")))?;
        Ok(self.with_json(value))
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// True once the call has been re-issued after a 401.
    #[must_use]
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn into_retry(mut self) -> Self {
        self.retried = true;
        self
    }
}

/// Platform response envelope: `{data, requestId, timeStamp}`.
#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: StatusCode,
    body: Value,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Keeps 2xx responses and turns everything else into an error.
    ///
    /// # Errors
    /// Returns `ApiError::Unauthorized` for 401 and `ApiError::Http` for any other
    /// non-2xx status.
    pub fn into_result(self) -> Result<Self, ApiError> {
        if self.status.is_success() {
            return Ok(self);
        }

        let message = error_message(&self.body);
        if self.status == StatusCode::UNAUTHORIZED {
            Err(ApiError::Unauthorized(message))
        } else {
            Err(ApiError::Http {
                status: self.status,
                message,
            })
        }
    }

    /// Decodes the envelope's `data` field.
    ///
    /// # Errors
    /// Returns `ApiError::Parse` if the body is not an envelope, has no data or the
    /// data does not match `T`.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let envelope: Envelope<T> = serde_json::from_value(self.body)
            .map_err(|err| ApiError::Parse(format!("Failed to parse response: {err}")))?;
        envelope
            .data
            .ok_or_else(|| ApiError::Parse("Response has no data".to_string()))
    }
}

fn error_message(body: &Value) -> String {
    match body {
        Value::Null => sanitize_body(""),
        Value::String(text) => sanitize_body(text),
        Value::Object(fields) => ["msg", "message", "error"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map_or_else(|| sanitize_body(&body.to_string()), sanitize_body),
        other => sanitize_body(&other.to_string()),
    }
}

/// Client for the platform API, shared by every console feature.
#[derive(Clone, Debug)]
pub struct ApiClient {
    transport: Arc<HttpTransport>,
    session: SessionManager,
    navigator: Arc<dyn Navigator>,
    coordinator: RefreshCoordinator<HttpTransport>,
}

impl ApiClient {
    /// Builds a client bound to `session`; redirects go to `navigator`.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the configuration is unusable.
    pub fn new(
        config: &ConsoleConfig,
        session: SessionManager,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let transport = Arc::new(HttpTransport::new(config)?);
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&transport),
            session.clone(),
            Arc::clone(&navigator),
            config.refresh_timeout,
        );

        Ok(Self {
            transport,
            session,
            navigator,
            coordinator,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        self.transport.config()
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator<HttpTransport> {
        &self.coordinator
    }

    /// Sends `request` with the current access token.
    ///
    /// # Errors
    /// Returns transport errors unchanged, `ApiError::Http` for non-2xx statuses and
    /// the refresh outcome when a 401 could not be recovered.
    #[instrument(skip_all, fields(method = %request.method(), path = %request.path()))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let access_token = self.session.access_token();
        let response = self.transport.execute(&request, access_token.as_ref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED && !request.is_retried() {
            debug!("Access token rejected; recovering session");
            return self.coordinator.recover(request, access_token).await;
        }

        response.into_result()
    }

    /// GETs `path` and decodes the envelope data.
    ///
    /// # Errors
    /// Returns an error if the call fails or the data does not decode.
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.into_data()
    }

    /// POSTs `body` to `path` and decodes the envelope data.
    ///
    /// # Errors
    /// Returns an error if the call fails or the data does not decode.
    pub async fn post_data<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).json(body)?).await?.into_data()
    }

    /// Signs in with email and password, stores the token pair and caches the
    /// profile.
    ///
    /// A 401 here means bad credentials and is never treated as an expired session.
    ///
    /// # Errors
    /// Returns an error if the credentials are rejected, the tokens cannot be
    /// persisted or the profile cannot be loaded.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::post(LOGIN_ENDPOINT)
            .with_json(json!({ "email": email, "password": password.expose_secret() }));

        let payload: TokenPayload = self
            .transport
            .execute(&request, None)
            .await?
            .into_result()?
            .into_data()?;

        self.session.login(TokenPair::from(payload))?;
        info!("Signed in");

        self.fetch_profile().await
    }

    /// Loads the signed-in user's profile and caches it for the route guard.
    ///
    /// # Errors
    /// Returns an error if the call fails or the profile cannot be cached.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let profile: UserProfile = self.get_data(PROFILE_ENDPOINT).await?;
        self.session.cache_profile(&profile)?;
        Ok(profile)
    }

    /// Signs out. The server call is best effort; the local session is always
    /// cleared and a redirect to login is emitted.
    ///
    /// # Errors
    /// Returns an error only if the local session cannot be cleared from storage.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        if let Some(access_token) = self.session.access_token() {
            let request = ApiRequest::post(LOGOUT_ENDPOINT);
            match self.transport.execute(&request, Some(&access_token)).await {
                Ok(response) => {
                    if let Err(err) = response.into_result() {
                        warn!("Server rejected logout: {err}");
                    }
                }
                Err(err) => warn!("Logout call failed: {err}"),
            }
        }

        let cleared = self.session.logout();
        self.navigator.redirect(Redirect::login());
        cleared?;

        info!("Signed out");
        Ok(())
    }
}
