use std::collections::BTreeMap;
use std::fs::{remove_file, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{ClientError, ClientResult};
use crate::session::persistence::SessionStorage;
use serde_json::{from_str as deserialize_state, to_string as serialize_state};

/// Stores the session as a small JSON object in a single file.
#[derive(Clone)]
pub struct FileStorage {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage").field("path", &self.path).finish()
    }
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Arc::new(path.as_ref().to_path_buf()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> ClientResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let mut file = File::open(&*self.path)
            .map_err(|err| ClientError::Storage(format!("Failed to open session file: {err}")))?;
        let mut buffer = String::new();
        file.read_to_string(&mut buffer)
            .map_err(|err| ClientError::Storage(format!("Failed to read session file: {err}")))?;

        if buffer.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        deserialize_state(&buffer)
            .map_err(|err| ClientError::Storage(format!("Failed to parse session file: {err}")))
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> ClientResult<()> {
        if values.is_empty() {
            if self.path.exists() {
                remove_file(&*self.path).map_err(|err| {
                    ClientError::Storage(format!("Failed to remove session file: {err}"))
                })?;
            }
            return Ok(());
        }

        let serialized = serialize_state(values).map_err(|err| {
            ClientError::Storage(format!("Failed to serialize session for persistence: {err}"))
        })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                ClientError::Storage(format!("Failed to create session directory: {err}"))
            })?;
        }
        let mut file = File::create(&*self.path).map_err(|err| {
            ClientError::Storage(format!("Failed to create session file: {err}"))
        })?;
        file.write_all(serialized.as_bytes())
            .map_err(|err| ClientError::Storage(format!("Failed to write session file: {err}")))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}
