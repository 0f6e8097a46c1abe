//! Redirect signalling.
//!
//! When the session cannot be recovered the console must leave whatever it is doing
//! and go back to the login route. Library code never performs that navigation
//! itself; it hands a [`Redirect`] to a [`Navigator`] and carries on failing the
//! affected calls.

use std::fmt;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Login route of the console.
pub const LOGIN_ROUTE: &str = "/console/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

impl Redirect {
    #[must_use]
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    #[must_use]
    pub fn login() -> Self {
        Self::to(LOGIN_ROUTE)
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Receiver of terminal redirect signals.
pub trait Navigator: Send + Sync + fmt::Debug {
    fn redirect(&self, redirect: Redirect);
}

/// Forwards redirects to an unbounded channel drained by the application.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<Redirect>,
}

impl ChannelNavigator {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Redirect>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn redirect(&self, redirect: Redirect) {
        info!(location = %redirect, "Redirecting");
        if self.tx.send(redirect).is_err() {
            warn!("Redirect dropped: no receiver is listening");
        }
    }
}
