use std::{
    mem,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::{
    ClientError, ClientResult,
    auth::{Envelope, RefreshBody, RefreshData, StoredSession},
    config::ApiConfig,
    routes::{self, EndpointAccess, classify},
    token_store::TokenStore,
    transport::{HttpRequest, HttpResponse, HttpTransport, Method},
};

/// Observes refresh outcomes that change the session.
/// Called while the client's state lock is held, so callbacks are
/// ordered with every other session change. Implementations must not call
/// back into the client.
pub trait SessionListener: Send + Sync {
    /// The session ended because a refresh was rejected.
    fn session_expired(&self, reason: &str);

    fn session_refreshed(&self, _session: &StoredSession) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
    LoggedOut,
}

enum WaitOutcome {
    Refreshed(String),
    Failed(String),
}

enum Phase {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<WaitOutcome>>,
    },
    LoggedOut,
}

struct ClientState {
    session: Option<StoredSession>,
    phase: Phase,
}

enum RefreshTrigger<'a> {
    /// A protected call came back 401 after being sent with this token.
    Rejected(Option<&'a str>),
    /// Silent restore at startup; always refreshes.
    Restore,
}

enum NextStep {
    Use(String),
    Wait(oneshot::Receiver<WaitOutcome>),
    Refresh(Option<String>),
}

struct Target {
    url: String,
    access: EndpointAccess,
}

/// HTTP client that attaches the bearer token and transparently recovers
/// from an expired access token.
///
/// At most one refresh call is in flight at a time: callers that hit a 401
/// while a refresh is running queue up and are all resolved with its
/// outcome.
pub struct SessionClient<H, S>
where
    H: HttpTransport,
    S: TokenStore,
{
    base_url: String,
    transport: H,
    store: S,
    state: Mutex<ClientState>,
    listener: Option<Arc<dyn SessionListener>>,
}

impl<H, S> SessionClient<H, S>
where
    H: HttpTransport,
    S: TokenStore + Send + Sync,
{
    pub fn new(config: &ApiConfig, transport: H, store: S) -> ClientResult<Self> {
        config.validate()?;

        Ok(Self {
            base_url: config.normalized_base_url(),
            transport,
            store,
            state: Mutex::new(ClientState {
                session: None,
                phase: Phase::Idle,
            }),
            listener: None,
        })
    }

    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> Option<StoredSession> {
        self.lock_state().session.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock_state()
            .session
            .as_ref()
            .map(|session| session.credentials.access.clone())
    }

    pub fn refresh_phase(&self) -> RefreshPhase {
        match self.lock_state().phase {
            Phase::Idle => RefreshPhase::Idle,
            Phase::Refreshing { .. } => RefreshPhase::Refreshing,
            Phase::LoggedOut => RefreshPhase::LoggedOut,
        }
    }

    /// Persists a freshly issued session and makes it the active one.
    pub fn install_session(&self, session: StoredSession) -> ClientResult<()> {
        let mut state = self.lock_state();
        self.store.save(&session)?;
        state.session = Some(session);
        if !matches!(state.phase, Phase::Refreshing { .. }) {
            state.phase = Phase::Idle;
        }
        Ok(())
    }

    /// Loads whatever the token store holds into memory without touching
    /// the network.
    pub fn adopt_stored_session(&self) -> ClientResult<Option<StoredSession>> {
        let stored = self.store.load()?;
        let mut state = self.lock_state();
        state.session = stored.clone();
        if stored.is_some() && !matches!(state.phase, Phase::Refreshing { .. }) {
            state.phase = Phase::Idle;
        }
        Ok(stored)
    }

    /// Drops the session from memory and from the token store. Never fails;
    /// a store error is logged and the in-memory session is gone regardless.
    pub fn clear_session(&self) -> Option<StoredSession> {
        let mut state = self.lock_state();
        let previous = state.session.take();
        if let Err(err) = self.store.clear() {
            log::error!("failed to clear token store: {:?}", err.display_chain());
        }
        if !matches!(state.phase, Phase::Refreshing { .. }) {
            state.phase = Phase::LoggedOut;
        }
        previous
    }

    /// Runs `f` on the current session while holding the state lock.
    pub fn with_session<R>(&self, f: impl FnOnce(Option<&StoredSession>) -> R) -> R {
        let state = self.lock_state();
        f(state.session.as_ref())
    }

    /// Mints a new access token from the stored refresh token.
    pub async fn refresh_now(&self) -> ClientResult<String> {
        self.recover_access_token(RefreshTrigger::Restore).await
    }

    pub async fn get<T>(&self, endpoint: &str) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::Get, endpoint, None).await
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::Post, endpoint, Some(body)).await
    }

    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::Put, endpoint, Some(body)).await
    }

    pub async fn patch<B, T>(&self, endpoint: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::Patch, endpoint, Some(body)).await
    }

    pub async fn delete<T>(&self, endpoint: &str) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::Delete, endpoint, None).await
    }

    pub async fn request<T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.send(method, endpoint, body).await?.json()
    }

    /// Sends one call through the refresh protocol and returns the raw
    /// successful response. Non-2xx outcomes become [`ClientError::Api`].
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> ClientResult<HttpResponse> {
        let target = self.resolve(method, endpoint);

        let sent_with = match target.access {
            EndpointAccess::Public => None,
            EndpointAccess::Protected => {
                let token = self.access_token();
                if token.is_none() {
                    log::warn!("sending {method} {endpoint} without credentials");
                }
                token
            }
        };

        let response = self
            .transport
            .send(build_request(
                method,
                &target.url,
                body.clone(),
                sent_with.as_deref(),
            ))
            .await?;

        if !response.is_unauthorized() || target.access.is_public() {
            return into_result(response);
        }

        log::debug!("{method} {endpoint} was rejected with 401; recovering session");
        let token = self
            .recover_access_token(RefreshTrigger::Rejected(sent_with.as_deref()))
            .await?;

        log::debug!("retrying {method} {endpoint} with refreshed token");
        let retry = self
            .transport
            .send(build_request(method, &target.url, body, Some(&token)))
            .await?;
        into_result(retry)
    }

    async fn recover_access_token(&self, trigger: RefreshTrigger<'_>) -> ClientResult<String> {
        loop {
            match self.next_step(&trigger)? {
                NextStep::Use(token) => return Ok(token),
                NextStep::Wait(receiver) => match receiver.await {
                    Ok(WaitOutcome::Refreshed(token)) => return Ok(token),
                    Ok(WaitOutcome::Failed(reason)) => {
                        return Err(ClientError::SessionExpired { reason });
                    }
                    Err(_) => {
                        log::debug!("in-flight refresh was abandoned; re-entering refresh");
                        continue;
                    }
                },
                NextStep::Refresh(refresh_token) => {
                    return self.run_refresh(refresh_token).await;
                }
            }
        }
    }

    /// Decides, under the state lock, whether this caller uses a newer
    /// token, queues behind the running refresh, or becomes the refresher.
    fn next_step(&self, trigger: &RefreshTrigger<'_>) -> ClientResult<NextStep> {
        let mut state = self.lock_state();
        let ClientState { session, phase } = &mut *state;

        match phase {
            Phase::LoggedOut => Err(ClientError::SessionExpired {
                reason: "session has been logged out".to_owned(),
            }),
            Phase::Refreshing { waiters } => {
                let (sender, receiver) = oneshot::channel();
                waiters.push(sender);
                log::trace!("queued behind in-flight refresh ({} waiting)", waiters.len());
                Ok(NextStep::Wait(receiver))
            }
            Phase::Idle => {
                if let (RefreshTrigger::Rejected(sent_with), Some(current)) =
                    (trigger, session.as_ref())
                {
                    if *sent_with != Some(current.credentials.access.as_str()) {
                        return Ok(NextStep::Use(current.credentials.access.clone()));
                    }
                }

                *phase = Phase::Refreshing {
                    waiters: Vec::new(),
                };
                Ok(NextStep::Refresh(
                    session
                        .as_ref()
                        .map(|current| current.credentials.refresh.clone()),
                ))
            }
        }
    }

    async fn run_refresh(&self, refresh_token: Option<String>) -> ClientResult<String> {
        let guard = AbandonGuard {
            state: &self.state,
            armed: true,
        };

        log::debug!("refreshing access token");
        let outcome = match refresh_token.as_deref() {
            Some(token) => self
                .call_refresh_endpoint(token)
                .await
                .map_err(|err| refresh_failure_reason(&err)),
            None => Err("no refresh token available".to_owned()),
        };

        guard.disarm();
        self.settle(refresh_token.as_deref(), outcome)
            .map_err(|reason| ClientError::SessionExpired { reason })
    }

    async fn call_refresh_endpoint(&self, refresh_token: &str) -> ClientResult<RefreshData> {
        let body = serde_json::to_value(RefreshBody {
            refresh: refresh_token,
        })?;
        let request =
            HttpRequest::new(Method::Post, self.url_for(routes::REFRESH)).with_json(body);
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(ClientError::Api {
                status: response.status,
                message: response.error_message(),
            });
        }

        let envelope: Envelope<RefreshData> = response.json()?;
        match envelope.data {
            Some(data) if envelope.success && !data.access.is_empty() => Ok(data),
            _ => Err(ClientError::message(
                envelope
                    .message
                    .unwrap_or_else(|| "invalid refresh response".to_owned()),
            )),
        }
    }

    /// Applies the refresh outcome and drains the waiter queue exactly once.
    fn settle(
        &self,
        refreshed_with: Option<&str>,
        outcome: Result<RefreshData, String>,
    ) -> Result<String, String> {
        let (waiters, result) = {
            let mut state = self.lock_state();
            let waiters = match mem::replace(&mut state.phase, Phase::Idle) {
                Phase::Refreshing { waiters } => waiters,
                Phase::Idle | Phase::LoggedOut => Vec::new(),
            };

            let still_current = state
                .session
                .as_ref()
                .map(|session| session.credentials.refresh.as_str())
                == refreshed_with;

            let result = if still_current {
                match outcome {
                    Ok(data) => {
                        let access = data.access;
                        if let Some(session) = state.session.as_mut() {
                            session.credentials.access = access.clone();
                            if let Some(rotated) = data.refresh.filter(|token| !token.is_empty()) {
                                session.credentials.refresh = rotated;
                            }
                            if let Err(err) = self.store.save(session) {
                                log::warn!(
                                    "failed to persist refreshed access token: {:?}",
                                    err.display_chain()
                                );
                            }
                            if let Some(listener) = &self.listener {
                                listener.session_refreshed(session);
                            }
                        }
                        log::debug!("access token refreshed ({} queued callers)", waiters.len());
                        Ok(access)
                    }
                    Err(reason) => {
                        state.session = None;
                        if let Err(err) = self.store.clear() {
                            log::error!(
                                "failed to clear token store after refresh failure: {:?}",
                                err.display_chain()
                            );
                        }
                        state.phase = Phase::LoggedOut;
                        log::error!("session expired, forcing logout: {reason}");
                        if let Some(listener) = &self.listener {
                            listener.session_expired(&reason);
                        }
                        Err(reason)
                    }
                }
            } else {
                match state.session.as_ref() {
                    Some(session) => Ok(session.credentials.access.clone()),
                    None => {
                        state.phase = Phase::LoggedOut;
                        Err("session ended while refreshing".to_owned())
                    }
                }
            };

            (waiters, result)
        };

        for waiter in waiters {
            let outcome = match &result {
                Ok(token) => WaitOutcome::Refreshed(token.clone()),
                Err(reason) => WaitOutcome::Failed(reason.clone()),
            };
            // A dropped receiver belongs to a caller that gave up waiting.
            let _ = waiter.send(outcome);
        }

        result
    }

    fn resolve(&self, method: Method, endpoint: &str) -> Target {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return match endpoint.strip_prefix(self.base_url.as_str()) {
                Some(rest) if rest.is_empty() || rest.starts_with(['/', '?']) => Target {
                    url: endpoint.to_owned(),
                    access: classify(method, rest),
                },
                // Credentials never leave for a foreign host.
                _ => Target {
                    url: endpoint.to_owned(),
                    access: EndpointAccess::Public,
                },
            };
        }

        Target {
            url: self.url_for(endpoint),
            access: classify(method, endpoint),
        }
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.base_url)
        } else {
            format!("{}/{endpoint}", self.base_url)
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        lock_client_state(&self.state)
    }
}

/// Returns the phase to idle if the refresher is dropped mid-flight, which
/// wakes every waiter so one of them can take over the refresh.
struct AbandonGuard<'a> {
    state: &'a Mutex<ClientState>,
    armed: bool,
}

impl AbandonGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock_client_state(self.state);
        if matches!(state.phase, Phase::Refreshing { .. }) {
            log::debug!("refresh owner dropped before completion");
            state.phase = Phase::Idle;
        }
    }
}

fn lock_client_state(state: &Mutex<ClientState>) -> MutexGuard<'_, ClientState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn build_request(
    method: Method,
    url: &str,
    body: Option<Value>,
    access_token: Option<&str>,
) -> HttpRequest {
    let mut request = HttpRequest::new(method, url);
    if let Some(token) = access_token {
        request.set_header("Authorization", format!("Bearer {token}"));
    }
    if let Some(body) = body {
        request = request.with_json(body);
    }
    request
}

fn into_result(response: HttpResponse) -> ClientResult<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ClientError::Api {
            status: response.status,
            message: response.error_message(),
        })
    }
}

fn refresh_failure_reason(err: &ClientError) -> String {
    match err {
        ClientError::Api { message, .. } => message.clone(),
        other => other.display_chain().to_string(),
    }
}
