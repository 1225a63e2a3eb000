//! In-memory user store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use liff_auth_sdk::{StoreError, User, UserId, UserStore};
use parking_lot::RwLock;

/// `UserStore` backed by a map, with a switch to simulate an outage.
pub struct InMemoryUserStore {
    users: RwLock<BTreeMap<UserId, User>>,
    available: AtomicBool,
    lookups: AtomicUsize,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
            lookups: AtomicUsize::new(0),
        }
    }
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        for user in users {
            store.insert(user);
        }
        store
    }

    /// Insert or replace a user, returning the previous record.
    pub fn insert(&self, user: User) -> Option<User> {
        self.users.write().insert(user.id, user)
    }

    pub fn remove(&self, id: UserId) -> Option<User> {
        self.users.write().remove(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Number of lookups served so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store offline".to_owned()))
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_one(&self, field: &str, value: &str) -> Result<Option<User>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.field(field) == Some(value))
            .cloned())
    }

    async fn find_by_key(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.ensure_available()?;
        Ok(self.users.read().get(&id).cloned())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn store() -> InMemoryUserStore {
        InMemoryUserStore::with_users([
            User::new(7).with_field("liff_id", "U123"),
            User::new(8).with_field("liff_id", "U456"),
        ])
    }

    #[tokio::test]
    async fn find_one_matches_field_value() {
        let store = store();

        let user = store.find_one("liff_id", "U456").await.unwrap();
        assert_eq!(user.map(|u| u.id), Some(8));
        assert!(store.find_one("liff_id", "U999").await.unwrap().is_none());
        assert!(store.find_one("line_id", "U123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_key_returns_record() {
        let store = store();

        assert_eq!(store.find_by_key(7).await.unwrap().map(|u| u.id), Some(7));
        assert!(store.find_by_key(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = store();
        store.set_available(false);

        let err = store.find_by_key(7).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.lookups(), 1);
    }

    #[test]
    fn insert_and_remove() {
        let store = InMemoryUserStore::new();
        assert!(store.is_empty());

        assert!(store.insert(User::new(1)).is_none());
        assert!(store.insert(User::new(1).with_field("name", "a")).is_some());
        assert_eq!(store.len(), 1);
        assert!(store.remove(1).is_some());
        assert!(store.is_empty());
    }
}
