use crate::{
    api::ApiClient,
    cli::globals::GlobalArgs,
    navigation::{ChannelNavigator, Redirect},
    session::SessionManager,
    storage::FileStorage,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Session, API client and redirect channel for one command run.
#[derive(Debug)]
pub struct Console {
    pub client: ApiClient,
    redirects: mpsc::UnboundedReceiver<Redirect>,
}

impl Console {
    /// Loads the persisted session and builds the API client.
    ///
    /// # Errors
    /// Returns an error if the API configuration is invalid.
    pub fn open(globals: &GlobalArgs) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(&globals.state_file));
        debug!(state_file = %globals.state_file.display(), "Loading session");

        let session = SessionManager::init(storage);
        let (navigator, redirects) = ChannelNavigator::new();
        let client = ApiClient::new(&globals.config(), session, Arc::new(navigator))
            .context("invalid API configuration")?;

        Ok(Self { client, redirects })
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        self.client.session()
    }

    /// Drains pending redirect signals, returning the ones received.
    pub fn take_redirects(&mut self) -> Vec<Redirect> {
        let mut received = Vec::new();
        while let Ok(redirect) = self.redirects.try_recv() {
            received.push(redirect);
        }
        received
    }

    /// Prints redirect signals received while the command ran.
    pub fn report_redirects(&mut self) {
        for redirect in self.take_redirects() {
            println!("redirect {redirect}");
        }
    }
}
