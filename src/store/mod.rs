//! Document store access for the `users` collection.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{User, UserPatch};

pub mod memory;
pub mod mongo;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("Failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn all(&self) -> Result<Vec<User>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    /// Users whose interests overlap `interests`.
    async fn with_any_interest(&self, interests: &[String]) -> Result<Vec<User>, StoreError>;

    /// Applies `patch` and returns the updated user, or `None` if `id` is gone.
    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>, StoreError>;
}
