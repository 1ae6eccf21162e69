//! OS keyring access for the API bearer token.
//!
//! Only the macOS Keychain backend is compiled in. Elsewhere keyring falls
//! back to a mock store that forgets every write, which `set` detects so the
//! session store can keep the token in its own file instead.

use keyring::Entry;
use std::fmt;

const SERVICE_NAME: &str = "com.transit.client";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureKey {
    AccessToken,
}

impl SecureKey {
    fn key_name(&self) -> &'static str {
        match self {
            SecureKey::AccessToken => "access_token",
        }
    }
}

impl fmt::Display for SecureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecureStorageError {
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Key not found: {0}")]
    KeyNotFound(SecureKey),

    /// The backend accepted the write but a fresh read did not return it
    /// (keyring's in-memory mock store on platforms without a native backend).
    #[error("Keyring did not keep {0}")]
    NotPersisted(SecureKey),
}

pub struct SecureStorage;

impl SecureStorage {
    /// Write `value` and read it back through a new entry.
    pub fn set(key: SecureKey, value: &str) -> Result<(), SecureStorageError> {
        Entry::new(SERVICE_NAME, key.key_name())?.set_password(value)?;
        match Self::get(key) {
            Ok(stored) if stored == value => Ok(()),
            Ok(_) | Err(SecureStorageError::KeyNotFound(_)) => {
                Err(SecureStorageError::NotPersisted(key))
            }
            Err(e) => Err(e),
        }
    }

    pub fn get(key: SecureKey) -> Result<String, SecureStorageError> {
        let entry = Entry::new(SERVICE_NAME, key.key_name())?;
        match entry.get_password() {
            Ok(value) => Ok(value),
            Err(keyring::Error::NoEntry) => Err(SecureStorageError::KeyNotFound(key)),
            Err(e) => Err(SecureStorageError::Keyring(e)),
        }
    }

    /// Removing a missing entry succeeds.
    pub fn delete(key: SecureKey) -> Result<(), SecureStorageError> {
        let entry = Entry::new(SERVICE_NAME, key.key_name())?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SecureStorageError::Keyring(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires an OS keychain
    fn test_access_token_roundtrip() {
        let key = SecureKey::AccessToken;
        SecureStorage::delete(key).unwrap();
        assert!(matches!(
            SecureStorage::get(key),
            Err(SecureStorageError::KeyNotFound(_))
        ));

        SecureStorage::set(key, "eyJhbGciOiJIUzI1NiJ9.test").unwrap();
        assert_eq!(SecureStorage::get(key).unwrap(), "eyJhbGciOiJIUzI1NiJ9.test");

        SecureStorage::delete(key).unwrap();
    }

    #[test]
    fn test_key_names() {
        assert_eq!(SecureKey::AccessToken.to_string(), "access_token");
        assert_eq!(
            SecureStorageError::NotPersisted(SecureKey::AccessToken).to_string(),
            "Keyring did not keep access_token"
        );
    }
}
