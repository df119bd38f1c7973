use std::fmt;
use std::fs::{self, Metadata, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::MzutilError;

use super::SecretStore;

pub const DIR_MODE: u32 = 0o700;
pub const FILE_MODE: u32 = 0o600;

/// Stores each value as `<key>.json` in a private directory.
///
/// The directory must be `0700` and every regular file in it `0600`; any
/// deviation fails the operation with `PermissionsInvalid`. Keys are trusted
/// constants and must not come from user input.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    /// Store rooted at `~/<dir_name>`.
    pub fn in_home(dir_name: &str) -> Result<Self, MzutilError> {
        let home = dirs::home_dir().ok_or_else(|| {
            MzutilError::IoError(std::io::Error::new(
                ErrorKind::NotFound,
                "Cannot determine home directory",
            ))
        })?;
        Ok(Self::at(home.join(dir_name)))
    }

    /// Store rooted at an explicit directory (created on first write).
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> Result<PathBuf, MzutilError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(MzutilError::BadConfig(format!(
                "Invalid secret store key '{key}'"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    fn verify_dir(&self) -> Result<(), MzutilError> {
        let meta = match fs::metadata(&self.dir) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MzutilError::NotFound(self.dir.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if !meta.is_dir() {
            return Err(MzutilError::IoError(std::io::Error::new(
                ErrorKind::Other,
                format!("{} is not a directory", self.dir.display()),
            )));
        }

        if !mode_is(&meta, DIR_MODE) {
            return Err(MzutilError::PermissionsInvalid(self.dir.display().to_string()));
        }

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_file() && !mode_is(&meta, FILE_MODE) {
                return Err(MzutilError::PermissionsInvalid(
                    entry.path().display().to_string(),
                ));
            }
        }

        Ok(())
    }

    fn create_dir(&self) -> Result<(), MzutilError> {
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder.create(&self.dir)?;
        tracing::debug!(dir = %self.dir.display(), "Created secret store directory");
        Ok(())
    }
}

impl fmt::Display for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileStore({})", self.dir.display())
    }
}

impl SecretStore for FileStore {
    fn read_raw(&self, key: &str) -> Result<Vec<u8>, MzutilError> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        self.verify_dir()?;

        let path = self.value_path(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(MzutilError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn write_raw(&self, key: &str, value: &[u8]) -> Result<(), MzutilError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        match self.verify_dir() {
            Err(MzutilError::NotFound(_)) => self.create_dir()?,
            other => other?,
        }

        let path = self.value_path(key)?;
        let tmp_path = self.dir.join(format!("{key}.json.tmp"));

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }
        let mut file = options.open(&tmp_path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(FILE_MODE))?;
        }
        file.write_all(value)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), MzutilError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        match self.verify_dir() {
            Err(MzutilError::NotFound(_)) => return Ok(()),
            other => other?,
        }

        match fs::remove_file(self.value_path(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn mode_is(meta: &Metadata, expected: u32) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777 == expected
}

#[cfg(not(unix))]
fn mode_is(_meta: &Metadata, _expected: u32) -> bool {
    true
}
