//! Handle to the externally managed session record of one request.

use super::{id::SessionId, record::SessionRecord, store::SessionStore};
use crate::error::StoreError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// The session attached to a request by the session store layer.
///
/// Clones share the same record; the lock is never held across an await.
#[derive(Clone)]
pub struct SessionHandle {
    record: Arc<Mutex<SessionRecord>>,
    store: Arc<dyn SessionStore>,
}

impl SessionHandle {
    pub fn new(record: SessionRecord, store: Arc<dyn SessionStore>) -> Self {
        Self {
            record: Arc::new(Mutex::new(record)),
            store,
        }
    }

    pub fn id(&self) -> SessionId {
        self.record.lock().id
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> SessionRecord {
        self.record.lock().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&SessionRecord) -> R) -> R {
        f(&*self.record.lock())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut SessionRecord) -> R) -> R {
        f(&mut *self.record.lock())
    }

    /// Replace the identity and reset the record to a guest under the new id.
    pub async fn regenerate(&self) -> Result<SessionId, StoreError> {
        let previous = self.id();
        let id = self.store.regenerate(&previous).await?;
        *self.record.lock() = SessionRecord::new(id);
        Ok(id)
    }

    /// Persist the current record.
    pub async fn save(&self) -> Result<(), StoreError> {
        let snapshot = self.snapshot();
        self.store.save(&snapshot).await
    }

    /// Persist `record` and, only once the store accepted it, make it the
    /// current record. A failed save leaves the current record untouched.
    pub async fn commit(&self, record: SessionRecord) -> Result<(), StoreError> {
        self.store.save(&record).await?;
        *self.record.lock() = record;
        Ok(())
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("record", &*self.record.lock())
            .finish_non_exhaustive()
    }
}
