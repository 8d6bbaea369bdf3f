//! Per-user pairing state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use subburn_models::{FileLocation, Session, Slot, UserId};

/// Mutex-guarded map from user to their in-progress session.
///
/// Clones share the same map. Every operation holds the lock for its whole
/// read-modify-write, so concurrent submissions for one user never lose a slot
/// and a completed session is handed off exactly once.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<UserId, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Session>> {
        // The map holds plain data; a panic elsewhere cannot leave it half-updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of a user's session.
    pub fn get(&self, user_id: UserId) -> Option<Session> {
        self.lock().get(&user_id).cloned()
    }

    /// Fill or overwrite one slot, creating the session if needed.
    /// Returns the session as it stands after the write.
    pub fn upsert_slot(&self, user_id: UserId, slot: Slot, location: FileLocation) -> Session {
        let mut sessions = self.lock();
        let session = sessions
            .entry(user_id)
            .or_insert_with(|| Session::new(user_id));
        session.set(slot, location);
        session.clone()
    }

    /// Remove and return the session only if both slots are filled.
    pub fn take_if_complete(&self, user_id: UserId) -> Option<Session> {
        let mut sessions = self.lock();
        if sessions.get(&user_id).is_some_and(Session::is_complete) {
            sessions.remove(&user_id)
        } else {
            None
        }
    }

    /// Drop a user's session, if any.
    pub fn clear(&self, user_id: UserId) {
        self.lock().remove(&user_id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
