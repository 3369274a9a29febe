use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::CliError;
use crate::models::ThreadId;

/// How long persisted session state outlives the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    /// Gone when the process exits (a browser tab's lifetime).
    Tab,
    /// Survives restarts.
    Durable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current_thread: ThreadId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_count: Option<usize>,
}

pub trait SessionStore: fmt::Debug + Send {
    fn scope(&self) -> StoreScope;
    fn load(&self) -> SessionSnapshot;
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), CliError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: SessionSnapshot,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn scope(&self) -> StoreScope {
        StoreScope::Tab
    }

    fn load(&self) -> SessionSnapshot {
        self.snapshot
    }

    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), CliError> {
        self.snapshot = *snapshot;
        Ok(())
    }
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn for_profile(profile: &str) -> Result<Self, CliError> {
        let base = dirs::data_local_dir().ok_or_else(|| {
            CliError::Generic("Could not resolve data directory for this OS.".to_string())
        })?;
        Ok(Self::new(
            base.join("resumax").join(format!("session-{profile}.json")),
        ))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SessionStore for FileStore {
    fn scope(&self) -> StoreScope {
        StoreScope::Durable
    }

    fn load(&self) -> SessionSnapshot {
        let Ok(text) = fs::read_to_string(&self.path) else {
            return SessionSnapshot::default();
        };
        serde_json::from_str(&text).unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "ignoring unreadable session file");
            SessionSnapshot::default()
        })
    }

    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), CliError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(snapshot)?)?;
        Ok(())
    }
}

/// The session pointer plus the cached thread count, written through to a store.
#[derive(Debug)]
pub struct Session {
    snapshot: SessionSnapshot,
    store: Box<dyn SessionStore>,
}

impl Session {
    pub fn restore(store: Box<dyn SessionStore>) -> Self {
        let snapshot = store.load();
        Self { snapshot, store }
    }

    pub fn in_memory() -> Self {
        Self::restore(Box::new(MemoryStore::new()))
    }

    pub fn pointer(&self) -> ThreadId {
        self.snapshot.current_thread
    }

    pub fn thread_count(&self) -> Option<usize> {
        self.snapshot.thread_count
    }

    pub fn scope(&self) -> StoreScope {
        self.store.scope()
    }

    pub fn set_pointer(&mut self, id: ThreadId) {
        if self.snapshot.current_thread != id {
            self.snapshot.current_thread = id;
            self.persist();
        }
    }

    pub fn set_thread_count(&mut self, count: usize) {
        if self.snapshot.thread_count != Some(count) {
            self.snapshot.thread_count = Some(count);
            self.persist();
        }
    }

    fn persist(&mut self) {
        if let Err(err) = self.store.save(&self.snapshot) {
            tracing::warn!(error = %err, "failed to persist session state");
        }
    }
}
