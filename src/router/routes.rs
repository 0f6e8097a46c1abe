//! Console route table.

use super::RouteRule;
use crate::{navigation::LOGIN_ROUTE, rbac::Action};

pub const REGISTER_ROUTE: &str = "/console/register";
pub const CONSOLE_ROOT: &str = "/console";

/// Every route the console knows, with its access requirements.
#[must_use]
pub fn console_routes() -> Vec<RouteRule> {
    vec![
        RouteRule::public(LOGIN_ROUTE),
        RouteRule::public(REGISTER_ROUTE),
        RouteRule::protected(CONSOLE_ROOT).with_console_access(),
        RouteRule::protected("/console/users")
            .with_console_access()
            .with_permission("/api/users/*", Action::Get),
        RouteRule::protected("/console/rbac")
            .with_console_access()
            .with_permission("/api/rbac/*", Action::Get),
        RouteRule::protected("/console/themes")
            .with_console_access()
            .with_permission("/api/themes/*", Action::Get),
        RouteRule::protected("/console/plugins")
            .with_console_access()
            .with_permission("/api/plugins/*", Action::Get),
        RouteRule::protected("/console/posts")
            .with_console_access()
            .with_permission("/api/posts/*", Action::Get),
        RouteRule::protected("/console/categories")
            .with_console_access()
            .with_permission("/api/categories/*", Action::Get),
        RouteRule::protected("/console/system")
            .with_console_access()
            .with_permission("/api/system/*", Action::Get),
        RouteRule::protected("/console/profile"),
        RouteRule::protected("/console/posts/editor"),
    ]
}

/// Looks up a route by path. A single trailing slash is ignored.
#[must_use]
pub fn find_route(path: &str) -> Option<RouteRule> {
    let path = path.trim();
    let path = if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    };

    console_routes().into_iter().find(|rule| rule.path == path)
}
