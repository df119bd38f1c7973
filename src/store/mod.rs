pub mod file;
pub mod keychain;
pub mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::MzutilError;

pub use file::FileStore;
pub use keychain::KeychainStore;
pub use memory::MemoryStore;

/// Key/value persistence for secrets. Values are opaque bytes to the store.
///
/// Implementations must guard their own critical sections so that concurrent
/// readers never observe a partially written value.
pub trait SecretStore: Send + Sync + std::fmt::Display {
    /// Read the raw value stored under `key`, or `NotFound`.
    fn read_raw(&self, key: &str) -> Result<Vec<u8>, MzutilError>;

    /// Replace the value stored under `key`.
    fn write_raw(&self, key: &str, value: &[u8]) -> Result<(), MzutilError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), MzutilError>;
}

/// Typed JSON access on top of any [`SecretStore`].
pub trait SecretStoreExt {
    fn read_value<T: DeserializeOwned>(&self, key: &str) -> Result<T, MzutilError>;
    fn write_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), MzutilError>;
}

impl<S: SecretStore + ?Sized> SecretStoreExt for S {
    fn read_value<T: DeserializeOwned>(&self, key: &str) -> Result<T, MzutilError> {
        let raw = self.read_raw(key)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    fn write_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), MzutilError> {
        let raw = serde_json::to_vec(value)?;
        self.write_raw(key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn typed_access_through_trait_object() {
        let store: Box<dyn SecretStore> = Box::new(MemoryStore::new());
        let value = Sample {
            name: "pots".into(),
            count: 3,
        };
        store.write_value("sample", &value).unwrap();
        let loaded: Sample = store.read_value("sample").unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn read_value_rejects_wrong_shape() {
        let store = MemoryStore::new();
        store.write_raw("sample", b"[1,2,3]").unwrap();
        let err = store.read_value::<Sample>("sample").unwrap_err();
        assert_eq!(err.code(), "serialization_error");
    }
}
