//! HTTP transport for the platform API.
//!
//! The transport owns the reqwest client, builds URLs from the configured base and
//! sends one request at a time. It never interprets a 401; deciding what an
//! authorization failure means is the job of [`super::ApiClient`] and the refresh
//! coordinator. Every request carries a fresh `X-Request-ID` so server logs can be
//! correlated with console logs.

use super::{
    errors::map_request_error, refresh::RefreshBackend, ApiError, ApiRequest, ApiResponse,
    ConsoleConfig, REFRESH_TOKEN_ENDPOINT,
};
use crate::{
    session::{TokenPair, TokenPayload},
    APP_USER_AGENT,
};
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use ulid::Ulid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    config: ConsoleConfig,
}

impl HttpTransport {
    /// Builds a transport for the configured API base.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ConsoleConfig) -> Result<Self, ApiError> {
        config.validate()?;

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ApiError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Sends `request`, attaching `access_token` as a bearer credential when given.
    ///
    /// Any HTTP status is returned as a response; only network failures are errors.
    ///
    /// # Errors
    /// Returns `ApiError::Transport` or `ApiError::Timeout` when no response arrives.
    #[instrument(
        skip(self, request, access_token),
        fields(method = %request.method(), path = %request.path(), retried = request.is_retried())
    )]
    pub async fn execute(
        &self,
        request: &ApiRequest,
        access_token: Option<&SecretString>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.config.endpoint(request.path());
        let request_id = Ulid::new().to_string();

        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .header(REQUEST_ID_HEADER, &request_id);

        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }

        if let Some(token) = access_token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_request_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_request_error)?;

        debug!(%status, request_id, "Response received");

        Ok(ApiResponse::new(status, parse_body(text)))
    }

    /// Exchanges a refresh token for a new pair.
    ///
    /// This call is never intercepted: a 401 here means the refresh token itself was
    /// rejected.
    ///
    /// # Errors
    /// Returns an error if the exchange fails for any reason or the response has no
    /// token pair.
    #[instrument(skip_all)]
    pub async fn refresh_exchange(&self, refresh_token: &SecretString) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::new(Method::POST, REFRESH_TOKEN_ENDPOINT)
            .with_json(json!({ "refresh_token": refresh_token.expose_secret() }));

        let payload: TokenPayload = self.execute(&request, None).await?.into_result()?.into_data()?;

        Ok(payload.into())
    }
}

impl RefreshBackend for HttpTransport {
    async fn exchange(&self, refresh_token: SecretString) -> Result<TokenPair, ApiError> {
        self.refresh_exchange(&refresh_token).await
    }

    async fn replay(
        &self,
        request: ApiRequest,
        access_token: SecretString,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(&request, Some(&access_token))
            .await?
            .into_result()
    }
}

fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text))
}
