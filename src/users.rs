//! Operations on user profiles. Each one is a thin wrapper over a single
//! store query or mutation plus the validation it needs.

use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    error::AppError,
    model::{parse_id, validate_interests, NewUser, User, UserPatch},
    store::UserStore,
};

pub struct Users {
    store: Arc<dyn UserStore>,
}

impl Users {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.store.all().await?)
    }

    pub async fn get(&self, id: &str) -> Result<User, AppError> {
        let id = parse_id(id)?;
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        if let Err(e) = new_user.validate() {
            warn!("Rejected user <{}>: {e}", new_user.name);
            return Err(e.into());
        }

        let user = new_user.into_user(ObjectId::new().to_hex(), Utc::now());
        self.store.insert(&user).await?;
        info!("Inserted user {} <{}>", user.id, user.name);

        Ok(user)
    }

    /// Users sharing at least one interest with `id`, never `id` itself.
    pub async fn find_matches(&self, id: &str) -> Result<Vec<User>, AppError> {
        let user = self.get(id).await?;
        if user.interests.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches = self.store.with_any_interest(&user.interests).await?;
        matches.retain(|other| other.id != user.id);
        Ok(matches)
    }

    pub async fn make_visible(&self, id: &str, others: &[String]) -> Result<User, AppError> {
        check_ids(others)?;
        let mut user = self.get(id).await?;
        user.reveal_to(others);
        self.save_visibility(user).await
    }

    pub async fn make_invisible(&self, id: &str, others: &[String]) -> Result<User, AppError> {
        check_ids(others)?;
        let mut user = self.get(id).await?;
        user.hide_from(others);
        self.save_visibility(user).await
    }

    /// Flips the blanket anonymity flag and returns the stored value.
    pub async fn toggle_anonymous(&self, id: &str) -> Result<bool, AppError> {
        let mut user = self.get(id).await?;
        let anonymous = user.toggle_anonymous();
        let patch = UserPatch {
            anonymous: Some(anonymous),
            ..UserPatch::default()
        };
        self.apply(&user.id, patch).await?;
        Ok(anonymous)
    }

    pub async fn set_interests(&self, id: &str, interests: Vec<String>) -> Result<User, AppError> {
        validate_interests(&interests)?;
        let id = parse_id(id)?;
        let patch = UserPatch {
            interests: Some(interests),
            ..UserPatch::default()
        };
        self.apply(id, patch).await
    }

    async fn save_visibility(&self, mut user: User) -> Result<User, AppError> {
        user.dedup_visibility();
        let patch = UserPatch {
            users_visibility: Some(user.users_visibility),
            ..UserPatch::default()
        };
        self.apply(&user.id, patch).await
    }

    async fn apply(&self, id: &str, patch: UserPatch) -> Result<User, AppError> {
        self.store
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }
}

fn check_ids(ids: &[String]) -> Result<(), AppError> {
    for id in ids {
        parse_id(id)?;
    }
    Ok(())
}
