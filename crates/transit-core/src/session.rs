use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::secure_storage::{SecureKey, SecureStorage, SecureStorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Passenger,
    Controller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Passenger => "PASSENGER",
            Role::Controller => "CONTROLLER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn can_send_notifications(&self) -> bool {
        matches!(self, Role::Controller)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASSENGER" => Ok(Role::Passenger),
            "CONTROLLER" => Ok(Role::Controller),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: i64,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Authenticated context handed to every gateway call.
///
/// Created on sign-in and dropped on sign-out; nothing reads identity or
/// token from ambient state.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    token: String,
}

impl Session {
    pub fn new(identity: Identity, token: impl Into<String>) -> Self {
        Self {
            identity,
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> i64 {
        self.identity.id
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Signed in as user {0} but no access token is stored")]
    MissingToken(i64),
    #[error(transparent)]
    SecureStorage(#[from] SecureStorageError),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    identity: Identity,
    /// Only present when the keyring could not hold the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// Persists the session between runs: identity as JSON in the data dir,
/// token in the OS keyring (falling back to the JSON file).
pub struct SessionStore {
    path: PathBuf,
    use_keyring: bool,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            path: data_dir.as_ref().join("session.json"),
            use_keyring: true,
        }
    }

    /// Keep the token in the session file instead of the OS keyring
    pub fn without_keyring(mut self) -> Self {
        self.use_keyring = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sign_in(&self, session: &Session) -> Result<(), SessionError> {
        let mut stored = StoredSession {
            identity: session.identity.clone(),
            token: None,
        };

        if self.use_keyring {
            // `set` reads the token back, so a store that silently drops it also lands here
            if let Err(e) = SecureStorage::set(SecureKey::AccessToken, session.token()) {
                warn!("Keyring unavailable, storing token in session file: {}", e);
                stored.token = Some(session.token().to_string());
            }
        } else {
            stored.token = Some(session.token().to_string());
        }

        self.write(&stored)?;
        debug!(user_id = session.user_id(), "session stored");
        Ok(())
    }

    /// `Ok(None)` when nobody is signed in.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let Some(stored) = self.read()? else {
            return Ok(None);
        };

        let token = match stored.token {
            Some(token) => token,
            None if self.use_keyring => match SecureStorage::get(SecureKey::AccessToken) {
                Ok(token) => token,
                Err(SecureStorageError::KeyNotFound(_)) => {
                    return Err(SessionError::MissingToken(stored.identity.id))
                }
                Err(e) => return Err(e.into()),
            },
            None => return Err(SessionError::MissingToken(stored.identity.id)),
        };

        Ok(Some(Session::new(stored.identity, token)))
    }

    pub fn identity(&self) -> Result<Option<Identity>, SessionError> {
        Ok(self.read()?.map(|stored| stored.identity))
    }

    pub fn is_signed_in(&self) -> bool {
        self.path.exists()
    }

    pub fn sign_out(&self) -> Result<(), SessionError> {
        if self.use_keyring {
            if let Err(e) = SecureStorage::delete(SecureKey::AccessToken) {
                warn!("Failed to remove token from keyring: {}", e);
            }
        }
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn read(&self) -> Result<Option<StoredSession>, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn write(&self, stored: &StoredSession) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(stored)?;
        fs::write(&self.path, json).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn controller() -> Identity {
        Identity {
            id: 5,
            role: Role::Controller,
            display_name: Some("Inspector Gadget".to_string()),
        }
    }

    #[test]
    fn test_sign_in_and_load() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).without_keyring();

        assert!(store.load().unwrap().is_none());
        assert!(!store.is_signed_in());

        let session = Session::new(controller(), "token-abc");
        store.sign_in(&session).unwrap();

        assert!(store.is_signed_in());
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.token(), "token-abc");
    }

    #[test]
    fn test_sign_in_and_load_with_keyring_enabled() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        let session = Session::new(controller(), "token-from-login");
        store.sign_in(&session).unwrap();

        // Whichever backend holds the token, the next run gets it back
        let loaded = store.load().unwrap();
        assert_eq!(loaded, Some(session));

        store.sign_out().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_sign_out_clears() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).without_keyring();

        store.sign_in(&Session::new(controller(), "t")).unwrap();
        store.sign_out().unwrap();

        assert!(!store.is_signed_in());
        assert!(store.load().unwrap().is_none());
        // Signing out twice is fine
        store.sign_out().unwrap();
    }

    #[test]
    fn test_identity_without_token_is_an_error() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).without_keyring();
        std::fs::write(
            store.path(),
            r#"{"identity": {"id": 9, "role": "PASSENGER"}}"#,
        )
        .unwrap();

        assert!(matches!(store.load(), Err(SessionError::MissingToken(9))));
        assert_eq!(store.identity().unwrap().unwrap().role, Role::Passenger);
    }

    #[test]
    fn test_debug_redacts_token() {
        let session = Session::new(controller(), "super-secret");
        let debug = format!("{:?}", session);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("controller".parse::<Role>(), Ok(Role::Controller));
        assert_eq!(" PASSENGER ".parse::<Role>(), Ok(Role::Passenger));
        assert!("driver".parse::<Role>().is_err());
        assert!(Role::Controller.can_send_notifications());
        assert!(!Role::Passenger.can_send_notifications());
    }
}
