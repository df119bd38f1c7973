use std::fmt;
use std::sync::{PoisonError, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::MzutilError;

use super::SecretStore;

/// Stores values in the OS credential vault (macOS Keychain, Windows
/// Credential Manager, or on Linux the Secret Service with a keyutils cache)
/// as base64 strings under `(service, key)`. Entries outlive the session.
#[derive(Debug)]
pub struct KeychainStore {
    service: String,
    lock: RwLock<()>,
}

impl KeychainStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            lock: RwLock::new(()),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, MzutilError> {
        keyring::Entry::new(&self.service, key).map_err(|e| MzutilError::Vault(e.to_string()))
    }
}

impl fmt::Display for KeychainStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeychainStore({})", self.service)
    }
}

impl SecretStore for KeychainStore {
    fn read_raw(&self, key: &str) -> Result<Vec<u8>, MzutilError> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        let encoded = self
            .entry(key)?
            .get_password()
            .map_err(|e| vault_error(key, e))?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| MzutilError::Serialization(format!("Bad base64 in vault entry '{key}': {e}")))
    }

    fn write_raw(&self, key: &str, value: &[u8]) -> Result<(), MzutilError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let encoded = STANDARD.encode(value);
        self.entry(key)?
            .set_password(&encoded)
            .map_err(|e| vault_error(key, e))
    }

    fn delete(&self, key: &str) -> Result<(), MzutilError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(vault_error(key, e)),
        }
    }
}

fn vault_error(key: &str, err: keyring::Error) -> MzutilError {
    match err {
        keyring::Error::NoEntry => MzutilError::NotFound(key.to_string()),
        other => MzutilError::Vault(other.to_string()),
    }
}
