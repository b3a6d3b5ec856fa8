use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Error, RefreshStore};
use crate::auth::clock::{Clock, SystemClock};

struct Entry {
    token: String,
    expires_at: i64,
}

impl Entry {
    const fn is_live(&self, now: i64) -> bool {
        now <= self.expires_at
    }
}

/// Process-local store for tests and single-instance deployments.
///
/// Expiry is judged with the same [`Clock`] the session layer uses.
pub struct MemoryRefreshStore {
    entries: RwLock<HashMap<Uuid, Entry>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryRefreshStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl MemoryRefreshStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RefreshStore for MemoryRefreshStore {
    async fn put(&self, subject: Uuid, token: &str, expires_at: i64) -> Result<(), Error> {
        let entry = Entry {
            token: token.to_string(),
            expires_at,
        };
        self.entries.write().await.insert(subject, entry);
        Ok(())
    }

    async fn get(&self, subject: Uuid) -> Result<Option<String>, Error> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let found = entries
            .get(&subject)
            .map(|entry| (entry.is_live(now), entry.token.clone()));
        match found {
            Some((true, token)) => Ok(Some(token)),
            Some((false, _)) => {
                entries.remove(&subject);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, subject: Uuid) -> Result<(), Error> {
        self.entries.write().await.remove(&subject);
        Ok(())
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }
}
