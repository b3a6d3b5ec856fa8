use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Error, NewUser, User, UserDirectory, USER_STATUS_ACTIVE};

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change a stored user's role. Returns false if the user does not exist.
    pub async fn set_role(&self, id: Uuid, role: &str) -> bool {
        self.update(id, |user| user.user_role = role.to_string()).await
    }

    /// Change a stored user's status. Returns false if the user does not exist.
    pub async fn set_status(&self, id: Uuid, status: i32) -> bool {
        self.update(id, |user| user.user_status = status).await
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.users.write().await.remove(&id).is_some()
    }

    async fn update(&self, id: Uuid, apply: impl FnOnce(&mut User)) -> bool {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return false;
        };
        apply(user);
        user.updated_at = Some(Utc::now());
        true
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, Error> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, Error> {
        let mut users = self.users.write().await;
        if users.values().any(|user| user.email == new_user.email) {
            return Err(Error::Conflict);
        }

        let user = User {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            updated_at: None,
            email: new_user.email,
            password_hash: new_user.password_hash,
            user_status: USER_STATUS_ACTIVE,
            user_role: new_user.user_role.as_str().to_string(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }
}
