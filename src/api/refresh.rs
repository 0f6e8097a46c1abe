//! Single-flight recovery from expired access tokens.
//!
//! Any number of calls can fail with a 401 at roughly the same time. The
//! coordinator makes sure exactly one refresh exchange runs for all of them:
//!
//! 1. A failed call is marked as retried and admitted under the state lock. If no
//!    refresh is running, the call becomes the first entry of a fresh queue and a
//!    refresh task is spawned. Otherwise it is appended to the running queue.
//! 2. The refresh task exchanges the stored refresh token, bounded by the configured
//!    deadline.
//! 3. On success the new pair is stored in the session, the queue is taken and the
//!    coordinator goes back to idle. Every queued call is then replayed with the new
//!    access token, one after the other in arrival order, and its handle settled with
//!    the outcome.
//! 4. On failure the session is cleared, one redirect to login is emitted and every
//!    queued call is rejected.
//!
//! Each queued call owns a oneshot sender and is settled exactly once. The refresh
//! task runs detached from every caller; a dropped caller only loses its own result.
//! A 401 on a call sent with an access token that has since been rotated is replayed
//! directly with the current token and never starts a new exchange.

use super::{ApiError, ApiRequest, ApiResponse};
use crate::{
    navigation::{Navigator, Redirect},
    session::{SessionManager, TokenPair},
};
use secrecy::SecretString;
use std::{
    collections::VecDeque,
    fmt,
    future::Future,
    mem,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{sync::oneshot, time::timeout};
use tracing::{debug, error, info, instrument, warn};

/// Network operations the coordinator needs to recover a call.
pub trait RefreshBackend: Send + Sync + 'static {
    /// Exchanges `refresh_token` for a new pair.
    fn exchange(
        &self,
        refresh_token: SecretString,
    ) -> impl Future<Output = Result<TokenPair, ApiError>> + Send;

    /// Re-issues `request` with `access_token`. A 401 on the replay is an error.
    fn replay(
        &self,
        request: ApiRequest,
        access_token: SecretString,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;
}

type Settlement = Result<ApiResponse, ApiError>;

struct QueuedCall {
    request: ApiRequest,
    handle: oneshot::Sender<Settlement>,
}

impl QueuedCall {
    fn settle(self, outcome: Settlement) {
        if self.handle.send(outcome).is_err() {
            debug!(path = %self.request.path(), "Caller went away before its call settled");
        }
    }
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    queue: VecDeque<QueuedCall>,
    exchanges: u64,
}

enum Admission {
    Replay(ApiRequest, SecretString),
    Queued(oneshot::Receiver<Settlement>),
}

pub struct RefreshCoordinator<B> {
    backend: Arc<B>,
    session: SessionManager,
    navigator: Arc<dyn Navigator>,
    refresh_timeout: Duration,
    state: Arc<Mutex<RefreshState>>,
}

impl<B> Clone for RefreshCoordinator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session: self.session.clone(),
            navigator: Arc::clone(&self.navigator),
            refresh_timeout: self.refresh_timeout,
            state: Arc::clone(&self.state),
        }
    }
}

impl<B> fmt::Debug for RefreshCoordinator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .field("pending", &self.pending())
            .field("refresh_timeout", &self.refresh_timeout)
            .finish_non_exhaustive()
    }
}

impl<B> RefreshCoordinator<B> {
    pub fn new(
        backend: Arc<B>,
        session: SessionManager,
        navigator: Arc<dyn Navigator>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            session,
            navigator,
            refresh_timeout,
            state: Arc::new(Mutex::new(RefreshState::default())),
        }
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of calls waiting for the running refresh.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Number of refresh exchanges started since creation.
    #[must_use]
    pub fn exchanges(&self) -> u64 {
        self.lock().exchanges
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: RefreshBackend> RefreshCoordinator<B> {
    /// Recovers a call that failed with 401.
    ///
    /// `sent_with` is the access token the call carried, if any. The returned
    /// result is the outcome of the single replay, or the refresh failure.
    ///
    /// # Errors
    /// Returns the replay's error, `ApiError::RefreshFailed` when the exchange failed,
    /// or `ApiError::RefreshAbandoned` if the refresh task ended without settling.
    #[instrument(skip_all, fields(path = %request.path()))]
    pub async fn recover(
        &self,
        request: ApiRequest,
        sent_with: Option<SecretString>,
    ) -> Result<ApiResponse, ApiError> {
        if request.is_retried() {
            return Err(ApiError::Unauthorized(
                "credential rejected after retry".to_string(),
            ));
        }

        match self.admit(request.into_retry(), sent_with.as_ref()) {
            Admission::Replay(request, current) => {
                debug!("Credential was rotated while the call was in flight; replaying");
                self.backend.replay(request, current).await
            }
            Admission::Queued(rx) => rx.await.unwrap_or(Err(ApiError::RefreshAbandoned)),
        }
    }

    // The idle check, the rotation check and the enqueue all happen under one lock.
    fn admit(&self, request: ApiRequest, sent_with: Option<&SecretString>) -> Admission {
        let mut state = self.lock();

        if !state.refreshing {
            if let Some(current) = self.session.access_token() {
                let rotated =
                    sent_with.map_or(true, |sent| !self.session.is_current_access_token(sent));
                if rotated {
                    return Admission::Replay(request, current);
                }
            }
        }

        let (handle, rx) = oneshot::channel();
        state.queue.push_back(QueuedCall { request, handle });

        if state.refreshing {
            debug!(pending = state.queue.len(), "Refresh in progress; call queued");
        } else {
            state.refreshing = true;
            state.exchanges += 1;
            drop(state);
            self.spawn_refresh();
        }

        Admission::Queued(rx)
    }

    fn spawn_refresh(&self) {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.run_refresh().await });
    }

    async fn run_refresh(self) {
        match self.exchange().await {
            Ok(pair) => {
                let access_token = pair.access_token().clone();
                if let Err(err) = self.session.refresh_tokens(pair) {
                    warn!("Refreshed tokens could not be persisted: {err}");
                }

                let queue = self.finish();
                info!(replays = queue.len(), "Session refreshed");

                for call in queue {
                    let outcome = self
                        .backend
                        .replay(call.request.clone(), access_token.clone())
                        .await;
                    call.settle(outcome);
                }
            }
            Err(err) => {
                error!("Session refresh failed: {err}");

                if let Err(err) = self.session.clear_auth() {
                    warn!("Failed to clear persisted credentials: {err}");
                }
                if let Err(err) = self.session.clear_profile() {
                    warn!("Failed to clear cached profile: {err}");
                }

                let queue = self.finish();
                self.navigator.redirect(Redirect::login());

                let reason = err.to_string();
                for call in queue {
                    call.settle(Err(ApiError::RefreshFailed(reason.clone())));
                }
            }
        }
    }

    async fn exchange(&self) -> Result<TokenPair, ApiError> {
        let Some(refresh_token) = self.session.refresh_token() else {
            return Err(ApiError::RefreshFailed("no refresh token is stored".to_string()));
        };

        match timeout(self.refresh_timeout, self.backend.exchange(refresh_token)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ApiError::Timeout(format!(
                "refresh exchange exceeded {}s",
                self.refresh_timeout.as_secs_f64()
            ))),
        }
    }

    fn finish(&self) -> VecDeque<QueuedCall> {
        let mut state = self.lock();
        state.refreshing = false;
        mem::take(&mut state.queue)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        navigation::ChannelNavigator,
        storage::{MemoryStorage, Storage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_INFO_KEY},
    };
    use reqwest::{Method, StatusCode};
    use secrecy::ExposeSecret;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{mpsc, Notify};

    /// Backend whose exchange blocks until released and which records replays.
    #[derive(Default)]
    struct FakeBackend {
        gate: Notify,
        exchanges: AtomicUsize,
        fail_exchange: bool,
        hang_exchange: bool,
        replays: Mutex<Vec<(String, String)>>,
    }

    impl FakeBackend {
        fn replays(&self) -> Vec<(String, String)> {
            self.replays.lock().unwrap().clone()
        }
    }

    impl RefreshBackend for FakeBackend {
        async fn exchange(&self, refresh_token: SecretString) -> Result<TokenPair, ApiError> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            if self.hang_exchange {
                std::future::pending::<()>().await;
            }
            self.gate.notified().await;
            if self.fail_exchange || refresh_token.expose_secret() != "r1" {
                return Err(ApiError::Unauthorized("refresh token revoked".to_string()));
            }
            Ok(TokenPair::new("a2", "r2"))
        }

        async fn replay(
            &self,
            request: ApiRequest,
            access_token: SecretString,
        ) -> Result<ApiResponse, ApiError> {
            assert!(request.is_retried());
            self.replays.lock().unwrap().push((
                request.path().to_string(),
                access_token.expose_secret().to_string(),
            ));
            Ok(ApiResponse::new(
                StatusCode::OK,
                json!({ "data": { "path": request.path() } }),
            ))
        }
    }

    fn signed_in_session() -> (SessionManager, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::with_entries([
            (ACCESS_TOKEN_KEY, "a1"),
            (REFRESH_TOKEN_KEY, "r1"),
            (USER_INFO_KEY, r#"{"id":"1"}"#),
        ]));
        (SessionManager::init(storage.clone()), storage)
    }

    fn coordinator(
        backend: FakeBackend,
        session: &SessionManager,
    ) -> (
        RefreshCoordinator<FakeBackend>,
        Arc<FakeBackend>,
        mpsc::UnboundedReceiver<Redirect>,
    ) {
        let backend = Arc::new(backend);
        let (navigator, rx) = ChannelNavigator::new();
        let coordinator = RefreshCoordinator::new(
            backend.clone(),
            session.clone(),
            Arc::new(navigator),
            Duration::from_secs(5),
        );
        (coordinator, backend, rx)
    }

    fn old_token() -> Option<SecretString> {
        Some(SecretString::from("a1".to_string()))
    }

    async fn wait_for_pending(coordinator: &RefreshCoordinator<FakeBackend>, expected: usize) {
        while coordinator.pending() < expected {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn concurrent_failures_share_one_exchange_and_replay_in_order() {
        let (session, _) = signed_in_session();
        let (coordinator, backend, mut redirects) = coordinator(FakeBackend::default(), &session);

        let mut calls = Vec::new();
        for path in ["/api/v1/post/list", "/api/v1/category/list", "/api/v1/user/list"] {
            let task_coordinator = coordinator.clone();
            calls.push(tokio::spawn(async move {
                task_coordinator
                    .recover(ApiRequest::new(Method::GET, path), old_token())
                    .await
            }));
            wait_for_pending(&coordinator, calls.len()).await;
        }

        assert!(coordinator.is_refreshing());
        backend.gate.notify_one();

        for call in calls {
            let response = call.await.unwrap().unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(backend.exchanges.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.exchanges(), 1);
        assert_eq!(
            backend.replays(),
            vec![
                ("/api/v1/post/list".to_string(), "a2".to_string()),
                ("/api/v1/category/list".to_string(), "a2".to_string()),
                ("/api/v1/user/list".to_string(), "a2".to_string()),
            ]
        );
        assert_eq!(session.access_token().unwrap().expose_secret(), "a2");
        assert_eq!(session.refresh_token().unwrap().expose_secret(), "r2");
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);
        assert!(redirects.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_exchange_rejects_everyone_and_redirects_once() {
        let (session, storage) = signed_in_session();
        let backend = FakeBackend {
            fail_exchange: true,
            ..FakeBackend::default()
        };
        let (coordinator, backend, mut redirects) = coordinator(backend, &session);

        let mut calls = Vec::new();
        for index in 0..4 {
            let task_coordinator = coordinator.clone();
            calls.push(tokio::spawn(async move {
                task_coordinator
                    .recover(
                        ApiRequest::new(Method::GET, format!("/api/v1/post/get?id={index}")),
                        old_token(),
                    )
                    .await
            }));
            wait_for_pending(&coordinator, calls.len()).await;
        }
        backend.gate.notify_one();

        for call in calls {
            let outcome = call.await.unwrap();
            assert!(matches!(outcome, Err(ApiError::RefreshFailed(_))));
        }

        assert_eq!(backend.exchanges.load(Ordering::SeqCst), 1);
        assert!(backend.replays().is_empty());
        assert!(!session.is_authenticated());
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(storage.get(USER_INFO_KEY), None);
        assert_eq!(redirects.try_recv().ok(), Some(Redirect::login()));
        assert!(redirects.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_without_exchange() {
        let storage = Arc::new(MemoryStorage::new());
        let session = SessionManager::init(storage);
        let (coordinator, backend, mut redirects) = coordinator(FakeBackend::default(), &session);

        let outcome = coordinator
            .recover(ApiRequest::new(Method::GET, "/api/v1/user/profile"), None)
            .await;

        assert!(matches!(outcome, Err(ApiError::RefreshFailed(_))));
        assert_eq!(backend.exchanges.load(Ordering::SeqCst), 0);
        assert_eq!(redirects.try_recv().ok(), Some(Redirect::login()));
    }

    #[tokio::test]
    async fn rotated_credential_is_replayed_without_exchange() {
        let (session, _) = signed_in_session();
        session.refresh_tokens(TokenPair::new("a3", "r3")).unwrap();
        let (coordinator, backend, _redirects) = coordinator(FakeBackend::default(), &session);

        let response = coordinator
            .recover(ApiRequest::new(Method::GET, "/api/v1/theme/get"), old_token())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(backend.exchanges.load(Ordering::SeqCst), 0);
        assert_eq!(
            backend.replays(),
            vec![("/api/v1/theme/get".to_string(), "a3".to_string())]
        );
    }

    #[tokio::test]
    async fn retried_call_is_never_recovered_twice() {
        let (session, _) = signed_in_session();
        let (coordinator, backend, _redirects) = coordinator(FakeBackend::default(), &session);

        let request = ApiRequest::new(Method::GET, "/api/v1/plugin/list").into_retry();
        let outcome = coordinator.recover(request, old_token()).await;

        assert!(matches!(outcome, Err(ApiError::Unauthorized(_))));
        assert_eq!(backend.exchanges.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_exchange_times_out_as_refresh_failure() {
        let (session, _) = signed_in_session();
        let backend = FakeBackend {
            hang_exchange: true,
            ..FakeBackend::default()
        };
        let (coordinator, _backend, mut redirects) = coordinator(backend, &session);

        let outcome = coordinator
            .recover(ApiRequest::new(Method::GET, "/api/v1/post/list"), old_token())
            .await;

        assert!(matches!(outcome, Err(ApiError::RefreshFailed(message)) if message.contains("exceeded")));
        assert!(!session.is_authenticated());
        assert_eq!(redirects.try_recv().ok(), Some(Redirect::login()));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn dropped_caller_does_not_stall_the_queue() {
        let (session, _) = signed_in_session();
        let (coordinator, backend, _redirects) = coordinator(FakeBackend::default(), &session);

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .recover(ApiRequest::new(Method::GET, "/api/v1/post/list"), old_token())
                    .await
            })
        };
        wait_for_pending(&coordinator, 1).await;

        let second = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .recover(ApiRequest::new(Method::GET, "/api/v1/category/list"), old_token())
                    .await
            })
        };
        wait_for_pending(&coordinator, 2).await;

        first.abort();
        backend.gate.notify_one();

        let response = second.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(backend.replays().len(), 2);
    }
}
