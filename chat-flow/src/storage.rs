use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    error::{FlowError, Result},
    session::Session,
};

/// Durable store for sessions. Only the serializable subset of a session is
/// kept (`answers`, `transcript`, `current_step_id`, `history`); transient
/// flags are skipped by the session's serde shape and come back at their
/// defaults on load.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage. Volatile; useful for tests
/// and for running without any configured storage directory.
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}

/// File-backed implementation of SessionStorage: one JSON document per
/// session under a fixed directory. This models the durable client-local
/// store sessions survive reloads in.
pub struct FileSessionStorage {
    dir: PathBuf,
}

impl FileSessionStorage {
    /// Opens (and creates if needed) the storage directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| FlowError::Storage(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        let path = self.path_for(&session.id);
        let blob = serde_json::to_vec_pretty(&session)
            .map_err(|e| FlowError::Storage(format!("serialize session {}: {e}", session.id)))?;
        tokio::fs::write(&path, blob)
            .await
            .map_err(|e| FlowError::Storage(format!("write {}: {e}", path.display())))
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        let path = self.path_for(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let session = serde_json::from_slice(&bytes)
                    .map_err(|e| FlowError::Storage(format!("parse {}: {e}", path.display())))?;
                Ok(Some(session))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FlowError::Storage(format!("read {}: {e}", path.display()))),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FlowError::Storage(format!("delete {}: {e}", path.display()))),
        }
    }
}
