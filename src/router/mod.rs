//! Route guard for console navigation.
//!
//! Before a protected route is entered the guard runs two stages in a fixed order:
//!
//! 1. Session check: a signed-out session redirects to login immediately.
//! 2. Permission check: for each permission the route declares, the oracle is asked
//!    about the subject from the cached profile.
//!
//! The guard fails closed. A missing profile, an oracle error, a slow oracle and an
//! explicit denial all redirect to login. Nothing is memoized, so running the guard
//! twice asks the same questions twice.

pub mod routes;

use crate::{
    navigation::Redirect,
    rbac::{Action, PermissionOracle, PermissionQuery},
    session::SessionManager,
};
use std::{fmt, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

pub use routes::{console_routes, find_route};

/// Resource the console-access check is made against.
pub const CONSOLE_RESOURCE: &str = "/console";

/// Access requirements of one console route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub path: String,
    pub public: bool,
    pub require_console_access: bool,
    pub permission: Option<(String, Action)>,
}

impl RouteRule {
    /// A route anyone may open.
    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            public: true,
            require_console_access: false,
            permission: None,
        }
    }

    /// A route that needs a signed-in session.
    pub fn protected(path: impl Into<String>) -> Self {
        Self {
            public: false,
            ..Self::public(path)
        }
    }

    #[must_use]
    pub fn with_console_access(mut self) -> Self {
        self.require_console_access = true;
        self
    }

    #[must_use]
    pub fn with_permission(mut self, resource: impl Into<String>, action: Action) -> Self {
        self.permission = Some((resource.into(), action));
        self
    }

    /// Permissions checked in stage 2, in order.
    #[must_use]
    pub fn required_permissions(&self) -> Vec<(String, Action)> {
        let mut required = Vec::new();
        if self.require_console_access {
            required.push((CONSOLE_RESOURCE.to_string(), Action::Get));
        }
        if let Some(permission) = &self.permission {
            required.push(permission.clone());
        }
        required
    }
}

/// Outcome of a guarded navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(Redirect),
}

impl Navigation {
    #[must_use]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Navigation::Proceed)
    }
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Navigation::Proceed => f.write_str("proceed"),
            Navigation::Redirect(redirect) => write!(f, "redirect {redirect}"),
        }
    }
}

#[derive(Debug)]
pub struct RouteGuard<O> {
    session: SessionManager,
    oracle: O,
    permission_timeout: Duration,
}

impl<O: PermissionOracle> RouteGuard<O> {
    pub fn new(session: SessionManager, oracle: O, permission_timeout: Duration) -> Self {
        Self {
            session,
            oracle,
            permission_timeout,
        }
    }

    /// Decides whether navigation to `rule` may proceed.
    #[instrument(skip_all, fields(route = %rule.path))]
    pub async fn authorize(&self, rule: &RouteRule) -> Navigation {
        if rule.public {
            return Navigation::Proceed;
        }

        if !self.session.is_authenticated() {
            info!("Not signed in");
            return deny();
        }

        let required = rule.required_permissions();
        if required.is_empty() {
            return Navigation::Proceed;
        }

        let Some(profile) = self.session.cached_profile() else {
            warn!("No cached profile to check permissions for");
            return deny();
        };

        for (resource, action) in required {
            let query = PermissionQuery::new(profile.id.clone(), resource, action);
            if !self.is_allowed(&query).await {
                return deny();
            }
        }

        debug!("Navigation allowed");
        Navigation::Proceed
    }

    async fn is_allowed(&self, query: &PermissionQuery) -> bool {
        match timeout(self.permission_timeout, self.oracle.check(query)).await {
            Ok(Ok(decision)) => {
                if !decision.allowed {
                    info!(resource = %query.resource, action = %query.action, "Permission denied");
                }
                decision.allowed
            }
            Ok(Err(err)) => {
                warn!(resource = %query.resource, "Permission check failed: {err}");
                false
            }
            Err(_) => {
                warn!(
                    resource = %query.resource,
                    "Permission check exceeded {}s",
                    self.permission_timeout.as_secs_f64()
                );
                false
            }
        }
    }
}

fn deny() -> Navigation {
    Navigation::Redirect(Redirect::login())
}
