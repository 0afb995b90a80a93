use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use reagent_core::AgentError;

use crate::state::TurnState;

/// Durable-state boundary, keyed by session id. One owner at a time per
/// session: the executor loads before a turn and saves after it.
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<TurnState>, AgentError>;
    async fn save(&self, session_id: &str, state: &TurnState) -> Result<(), AgentError>;
}

/// Default backend when no durable store is configured.
#[derive(Default, Clone)]
pub struct InMemoryCheckpointer {
    inner: Arc<RwLock<HashMap<String, TurnState>>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CheckpointStore for InMemoryCheckpointer {
    async fn load(&self, session_id: &str) -> Result<Option<TurnState>, AgentError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| AgentError::CheckpointFailed("lock".into()))?;
        Ok(guard.get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, state: &TurnState) -> Result<(), AgentError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| AgentError::CheckpointFailed("lock".into()))?;
        guard.insert(session_id.to_string(), state.clone());
        Ok(())
    }
}

/// Durable backend: one JSON document per session under `base_dir`.
#[derive(Clone, Debug)]
pub struct FileCheckpointer {
    base_dir: PathBuf,
}

impl FileCheckpointer {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn sanitize_session_id(session_id: &str) -> String {
        let mut out = String::with_capacity(session_id.len());
        for ch in session_id.chars() {
            match ch {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
                c if c.is_control() => {}
                c => out.push(c),
            }
        }
        let trimmed = out.trim_matches(|c: char| c == '.' || c.is_whitespace() || c == '_');
        if trimmed.is_empty() {
            let mut hasher = DefaultHasher::new();
            session_id.hash(&mut hasher);
            return format!("session-{:08x}", hasher.finish());
        }
        trimmed.to_string()
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.json", Self::sanitize_session_id(session_id)))
    }
}

#[async_trait::async_trait]
impl CheckpointStore for FileCheckpointer {
    async fn load(&self, session_id: &str) -> Result<Option<TurnState>, AgentError> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .map_err(|err| AgentError::CheckpointFailed(err.to_string()))?;
        let state = serde_json::from_str(&raw)?;
        Ok(Some(state))
    }

    async fn save(&self, session_id: &str, state: &TurnState) -> Result<(), AgentError> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|err| AgentError::CheckpointFailed(err.to_string()))?;
        let encoded = serde_json::to_string_pretty(state)?;
        fs::write(self.session_path(session_id), encoded)
            .map_err(|err| AgentError::CheckpointFailed(err.to_string()))
    }
}
