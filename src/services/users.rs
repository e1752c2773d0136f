//! Staff directory with a short-lived cache.
//!
//! Every authorization check goes through this service, so the users
//! worksheet is cached for a minute. When a refresh fails the stale
//! copy is served instead of locking everyone out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::core::error::AppResult;
use crate::google::sheets::SheetsClient;
use crate::models::user::{Role, User};

const CACHE_TTL: Duration = Duration::from_secs(60);

struct Cache {
    users: Vec<User>,
    fetched_at: Instant,
}

pub struct UserService {
    sheets: Arc<SheetsClient>,
    ttl: Duration,
    cache: Mutex<Option<Cache>>,
}

impl UserService {
    pub fn new(sheets: Arc<SheetsClient>) -> Self {
        Self::with_ttl(sheets, CACHE_TTL)
    }

    pub fn with_ttl(sheets: Arc<SheetsClient>, ttl: Duration) -> Self {
        Self { sheets, ttl, cache: Mutex::new(None) }
    }

    /// Current staff list: the cached copy when fresh, a refetch
    /// otherwise, the stale copy when the refetch fails.
    pub async fn get_all(&self) -> Vec<User> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return cached.users.clone();
            }
        }
        match self.sheets.list_users().await {
            Ok(users) => {
                *cache = Some(Cache { users: users.clone(), fetched_at: Instant::now() });
                users
            }
            Err(err) => {
                log::error!("failed to refresh users worksheet: {err}");
                cache.as_ref().map(|c| c.users.clone()).unwrap_or_default()
            }
        }
    }

    pub async fn get(&self, telegram_id: i64) -> Option<User> {
        self.get_all().await.into_iter().find(|u| u.telegram_id == telegram_id)
    }

    pub async fn has_role(&self, telegram_id: i64, roles: &[Role]) -> bool {
        self.get(telegram_id).await.map(|u| roles.contains(&u.role)).unwrap_or(false)
    }

    pub async fn add(&self, user: &User) -> AppResult<()> {
        self.sheets.add_user(user).await?;
        self.invalidate().await;
        Ok(())
    }

    pub async fn delete(&self, telegram_id: i64) -> AppResult<bool> {
        let deleted = self.sheets.delete_user(telegram_id).await?;
        if deleted {
            self.invalidate().await;
        }
        Ok(deleted)
    }

    pub async fn rename(&self, telegram_id: i64, name: &str) -> AppResult<bool> {
        let renamed = self.sheets.update_user_name(telegram_id, name).await?;
        if renamed {
            self.invalidate().await;
        }
        Ok(renamed)
    }

    async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}
