use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::entry::EntryVariant;

/// Exclusive access to one user's draft slot. Dropping it releases the lock.
pub type DraftGuard = OwnedMutexGuard<Option<EntryVariant>>;

/// In-progress entries keyed by user id, for the lifetime of the process.
///
/// Each user gets their own mutex so a read-modify-write of one draft
/// (including the backend submission) never blocks another user's command.
/// The outer map lock is held only while a slot is looked up or inserted.
#[derive(Default)]
pub struct DraftStore {
    slots: RwLock<HashMap<String, Arc<Mutex<Option<EntryVariant>>>>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the user's slot, creating an empty one on first use.
    pub async fn lock(&self, user_id: &str) -> DraftGuard {
        self.slot(user_id).await.lock_owned().await
    }

    pub async fn snapshot(&self, user_id: &str) -> Option<EntryVariant> {
        let slot = self.slots.read().await.get(user_id).cloned()?;
        let draft = slot.lock().await;
        draft.clone()
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    async fn slot(&self, user_id: &str) -> Arc<Mutex<Option<EntryVariant>>> {
        if let Some(slot) = self.slots.read().await.get(user_id) {
            return slot.clone();
        }
        let mut slots = self.slots.write().await;
        slots.entry(user_id.to_owned()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use super::DraftStore;
    use crate::domain::entry::{Entry, EntryKind, EntryVariant};

    fn face(title: &str) -> EntryVariant {
        EntryVariant::new(EntryKind::Face, Entry::new("author", title, Utc::now()))
    }

    #[tokio::test]
    async fn first_lock_creates_an_empty_slot() {
        let store = DraftStore::new();
        assert!(store.lock("U1").await.is_none());
        assert_eq!(store.len().await, 1);
        assert_eq!(store.snapshot("U2").await, None);
    }

    #[tokio::test]
    async fn new_draft_overwrites_previous_one() {
        let store = DraftStore::new();
        *store.lock("U1").await = Some(face("first"));
        *store.lock("U1").await = Some(face("second"));

        let draft = store.snapshot("U1").await.expect("draft stored");
        assert_eq!(draft.entry().title, "second");
    }

    #[tokio::test]
    async fn other_users_are_not_blocked_by_a_held_lock() {
        let store = DraftStore::new();
        let _held = store.lock("U1").await;

        let other = tokio::time::timeout(Duration::from_millis(200), store.lock("U2")).await;
        assert!(other.is_ok(), "U2 must not wait on U1's draft");
    }

    #[tokio::test]
    async fn same_user_updates_are_serialized() {
        let store = Arc::new(DraftStore::new());
        *store.lock("U1").await = Some(face(""));

        let mut tasks = Vec::new();
        for index in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let mut guard = store.lock("U1").await;
                let draft = guard.as_mut().expect("draft present");
                let mut title = draft.entry().title.clone();
                tokio::task::yield_now().await;
                title.push_str(&format!("{},", index % 10));
                draft.set_title(title);
            }));
        }
        for task in tasks {
            task.await.expect("task completes");
        }

        let draft = store.snapshot("U1").await.expect("draft present");
        assert_eq!(draft.entry().title.matches(',').count(), 16);
    }
}
