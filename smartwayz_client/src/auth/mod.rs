mod service;
mod types;

pub use service::AuthSessionManager;
pub use types::{
    CredentialPair, MIN_PASSWORD_LEN, RegistrationForm, SessionState, SessionStatus,
    StoredSession,
};
pub(crate) use types::{Envelope, RefreshBody, RefreshData};
