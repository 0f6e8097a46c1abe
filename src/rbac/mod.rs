//! Permission oracle client.
//!
//! The platform's RBAC service answers whether a subject may perform an action on a
//! resource. The client holds no state and caches nothing; every question is a
//! fresh request through the [`ApiClient`], so it carries the bearer credential and
//! benefits from refresh recovery like any other call.

use crate::api::{ApiClient, ApiError};
use serde::{Deserialize, Serialize};
use std::{fmt, future::Future};
use tracing::{debug, instrument};

pub const CHECK_PERMISSION_ENDPOINT: &str = "/api/v1/rbac/check-permission";

/// Action half of a permission, as stored by the RBAC service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "*")]
    All,
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "access")]
    Access,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::All => "*",
            Action::Get => "GET",
            Action::Post => "POST",
            Action::Put => "PUT",
            Action::Delete => "DELETE",
            Action::Access => "access",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionQuery {
    #[serde(rename = "user_id")]
    pub subject_id: String,
    pub resource: String,
    pub action: Action,
}

impl PermissionQuery {
    pub fn new(subject_id: impl Into<String>, resource: impl Into<String>, action: Action) -> Self {
        Self {
            subject_id: subject_id.into(),
            resource: resource.into(),
            action,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PermissionDecision {
    pub allowed: bool,
}

/// Answers permission questions for the route guard.
pub trait PermissionOracle: Send + Sync {
    fn check(
        &self,
        query: &PermissionQuery,
    ) -> impl Future<Output = Result<PermissionDecision, ApiError>> + Send;
}

/// Oracle backed by `POST /api/v1/rbac/check-permission`.
#[derive(Debug, Clone)]
pub struct HttpPermissionOracle {
    client: ApiClient,
}

impl HttpPermissionOracle {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl PermissionOracle for HttpPermissionOracle {
    #[instrument(skip_all, fields(resource = %query.resource, action = %query.action))]
    async fn check(&self, query: &PermissionQuery) -> Result<PermissionDecision, ApiError> {
        let decision: PermissionDecision =
            self.client.post_data(CHECK_PERMISSION_ENDPOINT, query).await?;
        debug!(allowed = decision.allowed, "Permission checked");
        Ok(decision)
    }
}
