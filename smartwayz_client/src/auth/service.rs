use std::sync::Arc;

use serde_json::Value;
use smartwayz_core::{Role, UserProfile};
use tokio::sync::watch;

use super::types::{
    Envelope, LoginBody, LoginData, RefreshBody, RegistrationForm, SessionState, StoredSession,
};
use crate::{
    ClientError, ClientResult,
    config::ApiConfig,
    routes,
    session_client::{SessionClient, SessionListener},
    token_store::TokenStore,
    transport::HttpTransport,
};

/// Holds the published session state and follows refresh outcomes reported
/// by the session client.
struct SessionCell {
    sender: watch::Sender<SessionState>,
}

impl SessionCell {
    fn publish(&self, state: SessionState) {
        self.sender.send_replace(state);
    }
}

impl SessionListener for SessionCell {
    fn session_expired(&self, reason: &str) {
        log::warn!("signed out after failed refresh: {reason}");
        self.publish(SessionState::anonymous());
    }

    fn session_refreshed(&self, session: &StoredSession) {
        self.publish(SessionState::authenticated(session.clone()));
    }
}

/// Owns the user-facing session lifecycle: restore at startup, login,
/// registration and logout.
pub struct AuthSessionManager<H, S>
where
    H: HttpTransport,
    S: TokenStore + Send + Sync,
{
    client: Arc<SessionClient<H, S>>,
    cell: Arc<SessionCell>,
}

impl<H, S> AuthSessionManager<H, S>
where
    H: HttpTransport,
    S: TokenStore + Send + Sync,
{
    pub fn new(config: &ApiConfig, transport: H, store: S) -> ClientResult<Self> {
        let (sender, _) = watch::channel(SessionState::loading());
        let cell = Arc::new(SessionCell { sender });
        let client = SessionClient::new(config, transport, store)?.with_listener(cell.clone());

        Ok(Self {
            client: Arc::new(client),
            cell,
        })
    }

    pub fn client(&self) -> Arc<SessionClient<H, S>> {
        Arc::clone(&self.client)
    }

    pub fn session(&self) -> SessionState {
        self.cell.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.cell.sender.subscribe()
    }

    /// The session client, but only while someone is signed in.
    pub fn require_authenticated(&self) -> ClientResult<Arc<SessionClient<H, S>>> {
        if self.session().is_authenticated() {
            Ok(self.client())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }

    /// Silently restores the stored session by minting a fresh access
    /// token. Ends in `Authenticated` or `Anonymous`, never in an error.
    pub async fn restore(&self) -> SessionState {
        self.cell.publish(SessionState::loading());

        match self.client.adopt_stored_session() {
            Ok(Some(_)) => {}
            Ok(None) => {
                log::debug!("no stored session to restore");
                self.publish_current();
                return self.session();
            }
            Err(err) => {
                log::warn!("failed to read stored session: {:?}", err.display_chain());
                self.client.clear_session();
                self.publish_current();
                return self.session();
            }
        }

        match self.client.refresh_now().await {
            Ok(_) => {
                if let Some(session) = self.client.session() {
                    log::info!("restored session for user {}", user_label(&session));
                }
            }
            Err(err) => log::info!("stored session could not be restored: {err}"),
        }
        self.publish_current();

        self.session()
    }

    pub async fn login(&self, email: &str, password: &str, role: Role) -> ClientResult<UserProfile> {
        let email = email.trim().to_lowercase();
        let body = LoginBody {
            email: &email,
            password,
        };

        let envelope: Envelope<LoginData> =
            match self.client.post(routes::login_path(role), &body).await {
                Ok(envelope) => envelope,
                Err(ClientError::Api { message, .. }) => {
                    return Err(ClientError::AuthenticationFailed { message });
                }
                Err(err) => return Err(err),
            };

        if !envelope.success {
            return Err(ClientError::AuthenticationFailed {
                message: envelope.message.unwrap_or_else(|| "Login failed".to_owned()),
            });
        }
        let Some(data) = envelope.data else {
            return Err(ClientError::AuthenticationFailed {
                message: "login response carried no tokens".to_owned(),
            });
        };

        let session = StoredSession::new(data.tokens, Some(data.user.clone()));
        self.client.install_session(session)?;
        self.publish_current();
        log::info!("signed in as {} user {}", data.user.role, data.user.id);

        Ok(data.user)
    }

    /// Creates a citizen account. Does not sign the new account in.
    pub async fn register(&self, form: &RegistrationForm) -> ClientResult<String> {
        form.validate()?;
        let form = form.normalized();

        match self
            .client
            .post::<_, Envelope<Value>>(routes::CITIZENS, &form)
            .await
        {
            Ok(envelope) => {
                log::info!("registered citizen account");
                Ok(envelope
                    .message
                    .unwrap_or_else(|| "Registration successful".to_owned()))
            }
            Err(ClientError::Api { status: 400, message }) => Err(ClientError::Validation {
                messages: message.split("; ").map(str::to_owned).collect(),
            }),
            Err(err) => Err(err),
        }
    }

    /// Publishes whatever session the client holds right now. Runs under the
    /// client's state lock, so it cannot overtake a later change.
    fn publish_current(&self) {
        self.client.with_session(|session| {
            self.cell.publish(match session {
                Some(session) => SessionState::authenticated(session.clone()),
                None => SessionState::anonymous(),
            })
        });
    }

    /// Ends the session locally, then tells the backend. Always succeeds.
    pub async fn logout(&self) {
        let previous = self.client.clear_session();
        self.publish_current();

        let Some(previous) = previous else {
            log::debug!("logout with no active session");
            return;
        };

        let body = RefreshBody {
            refresh: &previous.credentials.refresh,
        };
        match self.client.post::<_, Value>(routes::LOGOUT, &body).await {
            Ok(_) => log::info!("signed out"),
            Err(err) => log::warn!(
                "backend logout failed, local session already cleared: {:?}",
                err.display_chain()
            ),
        }
    }
}

fn user_label(session: &StoredSession) -> String {
    session
        .user
        .as_ref()
        .map(|user| user.id.to_string())
        .unwrap_or_else(|| "<unknown>".to_owned())
}
