//! Session store interface and an in-process implementation.

use super::{handle::SessionHandle, id::SessionId, record::SessionRecord};
use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// Operations consumed from the external session store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Invalidate `previous` and allocate a new identity.
    async fn regenerate(&self, previous: &SessionId) -> Result<SessionId, StoreError>;

    /// Persist a record under its id.
    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<SessionId, SessionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn load(&self, id: &SessionId) -> Option<SessionRecord> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    /// Handle to an existing session, or to a new guest session when `id`
    /// is absent or unknown.
    pub fn open(self: &Arc<Self>, id: Option<&SessionId>) -> SessionHandle {
        let record = id.and_then(|id| self.load(id)).unwrap_or_else(|| {
            let record = SessionRecord::new(SessionId::new());
            self.records.insert(record.id, record.clone());
            record
        });
        SessionHandle::new(record, self.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn regenerate(&self, previous: &SessionId) -> Result<SessionId, StoreError> {
        self.records.remove(previous);
        let id = SessionId::new();
        self.records.insert(id, SessionRecord::new(id));
        trace!(previous = %previous, session_id = %id, "Regenerated session");
        Ok(id)
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }
}
