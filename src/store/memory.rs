use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{StoreError, UserStore};
use crate::model::{User, UserPatch};

/// In-process store keyed by user id. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn all(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.read().values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        self.users.write().insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn with_any_interest(&self, interests: &[String]) -> Result<Vec<User>, StoreError> {
        Ok(self
            .users
            .read()
            .values()
            .filter(|user| user.interests.iter().any(|i| interests.contains(i)))
            .cloned()
            .collect())
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write();
        Ok(users.get_mut(id).map(|user| {
            patch.apply(user);
            user.clone()
        }))
    }
}
