//! Analysis storage.
//!
//! `AnalysisStore` is the seam between the HTTP layer and persistence. The
//! only implementation is `MemStorage`, which lives for the process lifetime;
//! a durable backend would implement the same trait and map its failures to
//! `StoreError`.

use crate::models::{AnalysisRecord, NewAnalysis, NewUser, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Store a new analysis under the next sequential id.
    async fn create_analysis(&self, analysis: NewAnalysis) -> Result<AnalysisRecord, StoreError>;

    /// Look up an analysis. `Ok(None)` is a normal outcome.
    async fn get_analysis(&self, id: i64) -> Result<Option<AnalysisRecord>, StoreError>;

    /// All analyses owned by `user_id`, in ascending id order.
    async fn get_analyses_for_user(&self, user_id: i64)
        -> Result<Vec<AnalysisRecord>, StoreError>;

    /// Number of stored analyses.
    async fn analysis_count(&self) -> Result<usize, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Exact, case-sensitive username match.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}

struct Tables {
    users: BTreeMap<i64, User>,
    analyses: BTreeMap<i64, AnalysisRecord>,
    next_user_id: i64,
    next_analysis_id: i64,
}

/// In-memory store.
///
/// Id issuance and insertion happen under a single write lock, so concurrent
/// requests on the multi-threaded runtime never observe duplicate or skipped
/// ids.
pub struct MemStorage {
    tables: RwLock<Tables>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                users: BTreeMap::new(),
                analyses: BTreeMap::new(),
                next_user_id: 1,
                next_analysis_id: 1,
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("analysis store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("analysis store lock poisoned".to_string()))
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisStore for MemStorage {
    async fn create_analysis(&self, analysis: NewAnalysis) -> Result<AnalysisRecord, StoreError> {
        let mut tables = self.write()?;
        let id = tables.next_analysis_id;
        tables.next_analysis_id += 1;

        let record = AnalysisRecord::new(id, analysis, Utc::now());
        tables.analyses.insert(id, record.clone());

        tracing::debug!(analysis_id = id, guest = record.is_guest(), "Stored analysis");
        Ok(record)
    }

    async fn get_analysis(&self, id: i64) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(self.read()?.analyses.get(&id).cloned())
    }

    async fn get_analyses_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        Ok(self
            .read()?
            .analyses
            .values()
            .filter(|record| record.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn analysis_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.analyses.len())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }

        let id = tables.next_user_id;
        tables.next_user_id += 1;

        let user = User {
            id,
            username: user.username,
            password: user.password,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}
