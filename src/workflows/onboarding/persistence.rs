use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::domain::{Draft, WizardStep};

pub const DEFAULT_NAMESPACE: &str = "onboarding";

/// Durable key-value storage for the draft and the current step.
pub trait PersistenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl PersistenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.entries.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().map_err(poisoned)?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().map_err(poisoned)?;
        guard.remove(key);
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("store mutex poisoned".to_string())
}

/// One file per key under a root directory. Writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file_name}.json"))
    }
}

impl PersistenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("saved draft is unreadable: {0}")]
    CorruptDraft(#[source] serde_json::Error),
    #[error("saved step '{0}' is not a wizard step")]
    CorruptStep(String),
    #[error("draft could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Draft and step as last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSnapshot {
    pub draft: Draft,
    pub step: WizardStep,
}

/// Reads and writes one wizard session under a key namespace.
#[derive(Debug)]
pub struct DraftPersistence<S> {
    store: Arc<S>,
    draft_key: String,
    step_key: String,
}

impl<S> DraftPersistence<S>
where
    S: PersistenceStore,
{
    pub fn new(store: Arc<S>, namespace: &str) -> Self {
        Self {
            store,
            draft_key: format!("{namespace}.draft"),
            step_key: format!("{namespace}.step"),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn draft_key(&self) -> &str {
        &self.draft_key
    }

    pub fn step_key(&self) -> &str {
        &self.step_key
    }

    /// Returns `None` when nothing was saved. Preview/uploading slots come back settled.
    pub fn load(&self) -> Result<Option<DraftSnapshot>, PersistenceError> {
        let draft_raw = self.store.get(&self.draft_key)?;
        let step_raw = self.store.get(&self.step_key)?;

        if draft_raw.is_none() && step_raw.is_none() {
            return Ok(None);
        }

        let mut draft = match draft_raw {
            Some(raw) => {
                serde_json::from_str::<Draft>(&raw).map_err(PersistenceError::CorruptDraft)?
            }
            None => Draft::default(),
        };
        let step = match step_raw {
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(WizardStep::from_number)
                .ok_or(PersistenceError::CorruptStep(raw))?,
            None => WizardStep::FIRST,
        };

        draft.identification.documents.settle_in_flight();
        debug!(key = %self.draft_key, step = step.number(), "draft rehydrated");

        Ok(Some(DraftSnapshot { draft, step }))
    }

    pub fn save(&self, draft: &Draft, step: WizardStep) -> Result<(), PersistenceError> {
        let serialized = serde_json::to_string(draft).map_err(PersistenceError::Serialize)?;
        self.store.set(&self.draft_key, &serialized)?;
        self.store.set(&self.step_key, &step.number().to_string())?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.store.remove(&self.draft_key)?;
        self.store.remove(&self.step_key)?;
        Ok(())
    }
}
