//! Per-user conversation drafts with expiry.
//!
//! A draft holds the answers collected so far in a multi-message exchange
//! (for example "describe the task", then "title it"). Drafts live in
//! process memory only and are keyed by chat and user, so the same person
//! can run separate drafts in separate chats.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Identifies one user in one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftKey {
    pub chat_id: i64,
    pub user_id: i64,
}

impl DraftKey {
    pub fn new(chat_id: i64, user_id: i64) -> Self {
        Self { chat_id, user_id }
    }
}

struct Entry<D> {
    draft: D,
    touched: Instant,
}

/// Keyed in-memory drafts that expire `ttl` after their last update.
pub struct DraftRegistry<D> {
    drafts: DashMap<DraftKey, Entry<D>>,
    ttl: Duration,
}

impl<D: Clone> DraftRegistry<D> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            drafts: DashMap::new(),
            ttl,
        }
    }

    /// Current draft, removing it first if it has expired.
    pub fn get(&self, key: &DraftKey) -> Option<D> {
        let expired = match self.drafts.get(key) {
            Some(entry) if entry.touched.elapsed() < self.ttl => {
                return Some(entry.draft.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!("Draft for {:?} expired", key);
            self.drafts.remove(key);
        }
        None
    }

    pub fn contains(&self, key: &DraftKey) -> bool {
        self.get(key).is_some()
    }

    /// Store `draft` and restart its expiry clock.
    pub fn insert(&self, key: DraftKey, draft: D) {
        self.drafts.insert(
            key,
            Entry {
                draft,
                touched: Instant::now(),
            },
        );
    }

    pub fn remove(&self, key: &DraftKey) -> Option<D> {
        self.drafts.remove(key).map(|(_, entry)| entry.draft)
    }

    /// Drop every expired draft, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.drafts.len();
        self.drafts
            .retain(|_, entry| entry.touched.elapsed() < self.ttl);
        let purged = before.saturating_sub(self.drafts.len());
        if purged > 0 {
            debug!("Purged {} expired draft(s)", purged);
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drafts_are_per_chat_and_user() {
        let drafts = DraftRegistry::new(Duration::from_secs(60));
        drafts.insert(DraftKey::new(1, 10), "one");

        assert_eq!(drafts.get(&DraftKey::new(1, 10)), Some("one"));
        assert_eq!(drafts.get(&DraftKey::new(2, 10)), None);
        assert_eq!(drafts.get(&DraftKey::new(1, 11)), None);

        assert_eq!(drafts.remove(&DraftKey::new(1, 10)), Some("one"));
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_expired_draft_is_absent_and_removed() {
        let drafts = DraftRegistry::new(Duration::ZERO);
        let key = DraftKey::new(1, 10);
        drafts.insert(key, 5u32);

        assert!(!drafts.contains(&key));
        assert_eq!(drafts.len(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let stale = DraftRegistry::new(Duration::ZERO);
        stale.insert(DraftKey::new(1, 1), ());
        stale.insert(DraftKey::new(1, 2), ());
        assert_eq!(stale.purge_expired(), 2);

        let fresh = DraftRegistry::new(Duration::from_secs(60));
        fresh.insert(DraftKey::new(1, 1), ());
        assert_eq!(fresh.purge_expired(), 0);
        assert_eq!(fresh.len(), 1);
    }
}
