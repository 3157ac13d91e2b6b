//! Profile persistence.
//!
//! A profile is stored as one JSON blob under one stable, versioned key.
//! Anything that fails to decode or carries another version is discarded and
//! the caller falls back to [`ThresholdProfile::FALLBACK`]; there is no
//! migration between versions.

use crate::profile::{ThresholdProfile, PROFILE_VERSION};
use crate::{NodshakeError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const KEY_PREFIX: &str = "gesture_threshold_profile";

/// Key the current profile version is stored under.
pub fn profile_key() -> String {
    format!("{}_v{}", KEY_PREFIX, PROFILE_VERSION)
}

/// Keys written by earlier releases. Deleted on load.
pub fn legacy_profile_keys() -> Vec<String> {
    let mut keys = vec![KEY_PREFIX.to_string()];
    keys.extend((1..PROFILE_VERSION).map(|v| format!("{}_v{}", KEY_PREFIX, v)));
    keys
}

/// Byte-blob key/value storage for profiles.
pub trait ProfileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()>;
    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store, for tests and hosts without a writable disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryProfileStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl ProfileStore for MemoryProfileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl ProfileStore for FileProfileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Decode a stored blob, rejecting other schema versions.
pub fn decode_profile(bytes: &[u8]) -> Result<ThresholdProfile> {
    let profile: ThresholdProfile = serde_json::from_slice(bytes)?;
    if profile.version != PROFILE_VERSION {
        return Err(NodshakeError::ProfileVersionMismatch {
            found: profile.version,
            expected: PROFILE_VERSION,
        });
    }
    Ok(profile.sanitize())
}

/// Load the stored profile.
///
/// Legacy keys are deleted first. Returns `None` when nothing usable is
/// stored; an undecodable or mismatched blob is removed so the next launch
/// starts clean. Storage errors are logged, never propagated.
pub fn load_profile(store: &mut dyn ProfileStore) -> Option<ThresholdProfile> {
    for key in legacy_profile_keys() {
        if let Err(e) = store.remove(&key) {
            log::warn!("Failed to delete legacy profile key {}: {}", key, e);
        }
    }

    let key = profile_key();
    let bytes = match store.read(&key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("Failed to read stored profile: {}", e);
            return None;
        }
    };

    match decode_profile(&bytes) {
        Ok(profile) => Some(profile),
        Err(e) => {
            log::warn!("Discarding stored profile: {}", e);
            if let Err(e) = store.remove(&key) {
                log::warn!("Failed to delete stored profile: {}", e);
            }
            None
        }
    }
}

/// Sanitize and persist a profile; returns what was written.
pub fn save_profile(store: &mut dyn ProfileStore, profile: &ThresholdProfile) -> Result<ThresholdProfile> {
    let sanitized = profile.sanitize();
    let bytes = serde_json::to_vec(&sanitized)?;
    store.write(&profile_key(), &bytes)?;
    Ok(sanitized)
}

pub fn clear_profile(store: &mut dyn ProfileStore) -> Result<()> {
    store.remove(&profile_key())?;
    for key in legacy_profile_keys() {
        store.remove(&key)?;
    }
    Ok(())
}
