//! Application state

use std::path::PathBuf;
use std::sync::Arc;

use td_core::task::{FileTaskStore, TaskService, TaskStore};

use crate::auth::UserStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    tasks: TaskService,
    users: UserStore,
}

impl AppState {
    /// Create a new AppState with the given data directory
    pub async fn new(data_dir: PathBuf) -> td_core::Result<Self> {
        let task_store = Arc::new(FileTaskStore::new(data_dir.join("tasks.json")).await?);
        let users = UserStore::new(data_dir.join("auth"))
            .await
            .map_err(|err| td_core::Error::Storage(err.to_string()))?;

        Ok(Self::with_stores(task_store, users))
    }

    /// Build state from preconstructed stores (used by tests)
    pub fn with_stores(task_store: Arc<dyn TaskStore>, users: UserStore) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                tasks: TaskService::new(task_store),
                users,
            }),
        }
    }

    /// Get reference to the task lifecycle service
    pub fn tasks(&self) -> &TaskService {
        &self.inner.tasks
    }

    /// Get reference to the user store
    pub fn user_store(&self) -> &UserStore {
        &self.inner.users
    }
}
