use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use keyring::Entry;
use serde::{Deserialize, Serialize};
use smartwayz_core::UserProfile;

use crate::{
    ClientResult,
    auth::{CredentialPair, StoredSession},
};

const ACCESS_SLOT: &str = "access_token";
const REFRESH_SLOT: &str = "refresh_token";
const USER_SLOT: &str = "user";

/// Durable home of the credential pair and the signed-in profile.
///
/// A missing refresh token means "no session"; absence is never an error.
pub trait TokenStore {
    fn load(&self) -> ClientResult<Option<StoredSession>>;
    fn save(&self, session: &StoredSession) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

impl<T> TokenStore for Box<T>
where
    T: TokenStore + ?Sized,
{
    fn load(&self) -> ClientResult<Option<StoredSession>> {
        (**self).load()
    }

    fn save(&self, session: &StoredSession) -> ClientResult<()> {
        (**self).save(session)
    }

    fn clear(&self) -> ClientResult<()> {
        (**self).clear()
    }
}

impl<T> TokenStore for Arc<T>
where
    T: TokenStore + ?Sized,
{
    fn load(&self) -> ClientResult<Option<StoredSession>> {
        (**self).load()
    }

    fn save(&self, session: &StoredSession) -> ClientResult<()> {
        (**self).save(session)
    }

    fn clear(&self) -> ClientResult<()> {
        (**self).clear()
    }
}

#[derive(Clone, Debug)]
pub struct KeyringTokenStore {
    service: String,
    account_prefix: String,
}

impl KeyringTokenStore {
    pub fn new(service: impl Into<String>, account_prefix: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account_prefix: account_prefix.into(),
        }
    }

    fn account_for_slot(&self, slot: &str) -> String {
        format!("{}:{slot}", self.account_prefix)
    }

    fn entry_for_slot(&self, slot: &str) -> ClientResult<Entry> {
        Ok(Entry::new(&self.service, &self.account_for_slot(slot))?)
    }

    fn read_slot(&self, slot: &str) -> ClientResult<Option<String>> {
        match self.entry_for_slot(slot)?.get_password() {
            Ok(raw) => Ok(Some(raw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_slot(&self, slot: &str, value: &str) -> ClientResult<()> {
        self.entry_for_slot(slot)?.set_password(value)?;
        Ok(())
    }

    fn delete_slot(&self, slot: &str) -> ClientResult<()> {
        match self.entry_for_slot(slot)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> ClientResult<Option<StoredSession>> {
        let Some(refresh) = self.read_slot(REFRESH_SLOT)? else {
            return Ok(None);
        };
        let Some(access) = self.read_slot(ACCESS_SLOT)? else {
            log::warn!("keyring holds a refresh token without an access token; ignoring it");
            return Ok(None);
        };
        let user = match self.read_slot(USER_SLOT)? {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };

        Ok(Some(StoredSession::new(
            CredentialPair::new(access, refresh),
            user,
        )))
    }

    fn save(&self, session: &StoredSession) -> ClientResult<()> {
        // Refresh goes last so a reader never sees it without its access token.
        self.write_slot(ACCESS_SLOT, &session.credentials.access)?;
        match &session.user {
            Some(user) => self.write_slot(USER_SLOT, &serde_json::to_string(user)?)?,
            None => self.delete_slot(USER_SLOT)?,
        }
        self.write_slot(REFRESH_SLOT, &session.credentials.refresh)
    }

    fn clear(&self) -> ClientResult<()> {
        self.delete_slot(REFRESH_SLOT)?;
        self.delete_slot(ACCESS_SLOT)?;
        self.delete_slot(USER_SLOT)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileSlots {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
}

/// Token store backed by a single JSON document, for hosts without an OS
/// keyring. Writes go to a sibling temp file that is renamed into place.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "tokens".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> ClientResult<Option<StoredSession>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let slots: FileSlots = serde_json::from_str(&raw)?;

        match (slots.access_token, slots.refresh_token) {
            (Some(access), Some(refresh)) => Ok(Some(StoredSession::new(
                CredentialPair::new(access, refresh),
                slots.user,
            ))),
            _ => Ok(None),
        }
    }

    fn save(&self, session: &StoredSession) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let slots = FileSlots {
            access_token: Some(session.credentials.access.clone()),
            refresh_token: Some(session.credentials.refresh.clone()),
            user: session.user.clone(),
        };
        let raw = serde_json::to_vec_pretty(&slots)?;

        let temp_path = self.temp_path();
        {
            let mut file = open_private(&temp_path)?;
            file.write_all(&raw)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: Mutex<Option<StoredSession>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<StoredSession>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> ClientResult<Option<StoredSession>> {
        Ok(self.slot().clone())
    }

    fn save(&self, session: &StoredSession) -> ClientResult<()> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use smartwayz_core::{Role, UserId, UserProfile};

    use super::{FileTokenStore, MemoryTokenStore, TokenStore};
    use crate::auth::{CredentialPair, StoredSession};

    fn sample_session() -> StoredSession {
        StoredSession::new(
            CredentialPair::new("access-1", "refresh-1"),
            Some(UserProfile {
                id: UserId(12),
                email: "juan@example.com".to_string(),
                role: Role::Citizen,
                name: Some("Juan".to_string()),
                authority_name: None,
            }),
        )
    }

    #[test]
    fn memory_store_round_trip_and_clear() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.load().expect("load"), None);

        store.save(&sample_session()).expect("save");
        assert_eq!(store.load().expect("load"), Some(sample_session()));

        store.clear().expect("clear");
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("nested").join("tokens.json"));

        assert_eq!(store.load().expect("missing file is no session"), None);

        store.save(&sample_session()).expect("save");
        assert_eq!(store.load().expect("load"), Some(sample_session()));
        assert!(!dir.path().join("nested").join("tokens.json.tmp").exists());

        store.clear().expect("clear");
        assert_eq!(store.load().expect("load"), None);
        store.clear().expect("clearing twice is fine");
    }

    #[test]
    fn file_store_without_refresh_slot_is_no_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, r#"{"access_token":"orphan","user":null}"#).expect("write");

        let store = FileTokenStore::new(path);
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn save_overwrites_previous_session_wholesale() {
        let store = MemoryTokenStore::with_session(sample_session());
        let replacement = StoredSession::new(CredentialPair::new("access-2", "refresh-2"), None);

        store.save(&replacement).expect("save");
        assert_eq!(store.load().expect("load"), Some(replacement));
    }
}
