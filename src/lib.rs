//! Session and authorization layer for the Jank blog console.
//!
//! The crate keeps the console's credentials in a persisted [`session::SessionManager`],
//! decorates every outgoing call through [`api::ApiClient`], recovers from expired
//! access tokens with a single-flight [`api::refresh::RefreshCoordinator`], and gates
//! console routes with the fail-closed [`router::RouteGuard`].

pub mod api;
pub mod cli;
pub mod navigation;
pub mod rbac;
pub mod router;
pub mod session;
pub mod storage;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse, ConsoleConfig};
pub use navigation::{ChannelNavigator, Navigator, Redirect};
pub use rbac::{Action, HttpPermissionOracle, PermissionDecision, PermissionOracle, PermissionQuery};
pub use router::{Navigation, RouteGuard, RouteRule};
pub use session::{SessionManager, TokenPair, UserProfile};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
