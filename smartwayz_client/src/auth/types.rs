use serde::{Deserialize, Serialize};
use smartwayz_core::UserProfile;

use crate::{ClientError, ClientResult};

/// Access/refresh tokens minted together by a login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// What the token store persists between runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub credentials: CredentialPair,
    pub user: Option<UserProfile>,
}

impl StoredSession {
    pub fn new(credentials: CredentialPair, user: Option<UserProfile>) -> Self {
        Self { credentials, user }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Authenticated,
    Anonymous,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub user: Option<UserProfile>,
    pub credentials: Option<CredentialPair>,
}

impl SessionState {
    pub fn loading() -> Self {
        Self {
            status: SessionStatus::Loading,
            user: None,
            credentials: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            user: None,
            credentials: None,
        }
    }

    pub fn authenticated(session: StoredSession) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            user: session.user,
            credentials: Some(session.credentials),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("confirm_password", &"<redacted>")
            .finish()
    }
}

pub const MIN_PASSWORD_LEN: usize = 8;

impl RegistrationForm {
    /// Mirrors the backend serializer so obvious mistakes never leave the
    /// device.
    pub fn validate(&self) -> ClientResult<()> {
        let mut messages = Vec::new();
        if self.name.trim().is_empty() {
            messages.push("name: This field is required.".to_owned());
        }
        if self.email.trim().is_empty() {
            messages.push("email: This field is required.".to_owned());
        } else if !self.email.contains('@') {
            messages.push("email: Enter a valid email address.".to_owned());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            messages.push(format!(
                "password: Ensure this field has at least {MIN_PASSWORD_LEN} characters."
            ));
        }
        if self.password != self.confirm_password {
            messages.push("confirm_password: Passwords do not match.".to_owned());
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation { messages })
        }
    }

    pub(crate) fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            email: self.email.trim().to_lowercase(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct RefreshBody<'a> {
    pub refresh: &'a str,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct LoginData {
    pub user: UserProfile,
    pub tokens: CredentialPair,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RefreshData {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
