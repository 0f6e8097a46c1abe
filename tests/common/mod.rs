#![allow(dead_code)]

use jank_console::{
    storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_INFO_KEY},
    ApiClient, ChannelNavigator, ConsoleConfig, MemoryStorage, Redirect, SessionManager,
};
use serde_json::{json, Value};
use std::{net::TcpListener, sync::Arc, time::Duration};
use tokio::sync::mpsc;

pub const PROFILE: &str = r#"{"id":7,"email":"editor@jank.dev","nickname":"editor","role":"editor"}"#;

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

pub struct Harness {
    pub client: ApiClient,
    pub session: SessionManager,
    pub storage: Arc<MemoryStorage>,
    pub redirects: mpsc::UnboundedReceiver<Redirect>,
}

impl Harness {
    pub fn signed_in(base_url: &str) -> Self {
        Self::with_entries(
            base_url,
            &[
                (ACCESS_TOKEN_KEY, "a1"),
                (REFRESH_TOKEN_KEY, "r1"),
                (USER_INFO_KEY, PROFILE),
            ],
        )
    }

    pub fn signed_out(base_url: &str) -> Self {
        Self::with_entries(base_url, &[])
    }

    pub fn with_entries(base_url: &str, entries: &[(&str, &str)]) -> Self {
        let storage = Arc::new(MemoryStorage::with_entries(entries.iter().copied()));
        let session = SessionManager::init(storage.clone());
        let (navigator, redirects) = ChannelNavigator::new();

        let mut config = ConsoleConfig::new(base_url);
        config.request_timeout = Duration::from_secs(5);
        config.refresh_timeout = Duration::from_secs(5);
        config.permission_timeout = Duration::from_secs(5);

        let client = ApiClient::new(&config, session.clone(), Arc::new(navigator))
            .expect("client should build");

        Self {
            client,
            session,
            storage,
            redirects,
        }
    }

    pub fn take_redirects(&mut self) -> Vec<Redirect> {
        let mut received = Vec::new();
        while let Ok(redirect) = self.redirects.try_recv() {
            received.push(redirect);
        }
        received
    }
}

/// Wraps `data` in the platform response envelope.
pub fn envelope(data: Value) -> Value {
    json!({
        "data": data,
        "requestId": "01J00000000000000000000000",
        "timeStamp": 1_700_000_000
    })
}
