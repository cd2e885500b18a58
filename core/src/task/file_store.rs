//! File-based task storage implementation
//!
//! Stores tasks as JSON in a file on disk, mirroring every write through an
//! in-memory cache.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::model::{NewTask, Task, TaskId};
use super::query::{TaskFilter, TaskOrder};
use super::repository::TaskStore;
use crate::{Error, Result};

struct TableState {
    rows: HashMap<TaskId, Task>,
    next_id: TaskId,
}

/// File-based task store using JSON
pub struct FileTaskStore {
    /// Path to the JSON file
    path: PathBuf,
    /// In-memory cache of tasks
    state: RwLock<TableState>,
}

impl FileTaskStore {
    /// Create a new FileTaskStore
    ///
    /// If the file doesn't exist, it will be created on first write. The id
    /// counter resumes above the highest id found on disk.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows: HashMap<TaskId, Task> = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            let tasks: Vec<Task> = serde_json::from_str(&content)?;
            tasks.into_iter().map(|t| (t.id, t)).collect()
        } else {
            HashMap::new()
        };
        let next_id = rows.keys().max().copied().unwrap_or(0) + 1;

        Ok(Self {
            path,
            state: RwLock::new(TableState { rows, next_id }),
        })
    }

    /// Persist the cache to disk
    async fn persist(&self) -> Result<()> {
        let state = self.state.read().await;
        let mut tasks: Vec<&Task> = state.rows.values().collect();
        tasks.sort_by_key(|task| task.id);
        let content = serde_json::to_string_pretty(&tasks)?;
        drop(state);

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn insert(&self, new: NewTask) -> Result<Task> {
        let task = {
            let mut state = self.state.write().await;
            let id = state.next_id;
            state.next_id += 1;
            let task = Task {
                id,
                title: new.title,
                description: new.description,
                is_done: false,
                priority: new.priority,
                owner_id: new.owner_id,
                created_at: Utc::now(),
                deleted_at: None,
            };
            state.rows.insert(id, task.clone());
            task
        };
        self.persist().await?;
        Ok(task)
    }

    async fn get(&self, id: TaskId, include_deleted: bool) -> Result<Option<Task>> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .get(&id)
            .filter(|task| include_deleted || !task.is_deleted())
            .cloned())
    }

    async fn query_page(
        &self,
        filter: &TaskFilter,
        order: TaskOrder,
        skip: usize,
        take: usize,
    ) -> Result<(Vec<Task>, usize)> {
        let state = self.state.read().await;
        let mut matches: Vec<Task> = state
            .rows
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        matches.sort_by(|a, b| order.compare(a, b));
        let total = matches.len();
        let page = matches.into_iter().skip(skip).take(take).collect();
        Ok((page, total))
    }

    async fn save(&self, task: Task) -> Result<Task> {
        {
            let mut state = self.state.write().await;
            if !state.rows.contains_key(&task.id) {
                return Err(Error::TaskNotFound(task.id.to_string()));
            }
            state.rows.insert(task.id, task.clone());
        }
        self.persist().await?;
        Ok(task)
    }

    async fn soft_delete(&self, id: TaskId) -> Result<Task> {
        let (task, changed) = {
            let mut state = self.state.write().await;
            let task = state
                .rows
                .get_mut(&id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            let changed = task.deleted_at.is_none();
            if changed {
                task.deleted_at = Some(Utc::now());
            }
            (task.clone(), changed)
        };
        if changed {
            self.persist().await?;
        }
        Ok(task)
    }

    async fn restore(&self, id: TaskId) -> Result<Task> {
        let task = {
            let mut state = self.state.write().await;
            let task = state
                .rows
                .get_mut(&id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            task.deleted_at = None;
            task.clone()
        };
        self.persist().await?;
        Ok(task)
    }

    async fn hard_delete(&self, id: TaskId) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state
                .rows
                .remove(&id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        }
        self.persist().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn create_test_store() -> (FileTaskStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");
        let store = FileTaskStore::new(&path).await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_get_task() {
        let (store, _temp) = create_test_store().await;

        let created = store
            .insert(NewTask::new("Test task", 1).with_description("A test description"))
            .await
            .unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.title, "Test task");
        assert_eq!(created.description, Some("A test description".to_string()));

        let retrieved = store.get(created.id, false).await.unwrap();
        assert!(retrieved.is_some());

        let non_existent = store.get(999, false).await.unwrap();
        assert!(non_existent.is_none());
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");

        let task_id;

        // Create store and add a soft-deleted task
        {
            let store = FileTaskStore::new(&path).await.unwrap();
            let task = store
                .insert(NewTask::new("Persistent task", 4).with_priority(3))
                .await
                .unwrap();
            task_id = task.id;
            store.soft_delete(task_id).await.unwrap();
        }

        // New instance sees the same data, including the deletion marker
        {
            let store = FileTaskStore::new(&path).await.unwrap();
            assert!(store.get(task_id, false).await.unwrap().is_none());
            let task = store.get(task_id, true).await.unwrap().unwrap();
            assert_eq!(task.title, "Persistent task");
            assert_eq!(task.priority, 3);
            assert_eq!(task.owner_id, 4);
            assert!(task.deleted_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_id_counter_resumes_after_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");

        {
            let store = FileTaskStore::new(&path).await.unwrap();
            store.insert(NewTask::new("One", 1)).await.unwrap();
            store.insert(NewTask::new("Two", 1)).await.unwrap();
        }

        let store = FileTaskStore::new(&path).await.unwrap();
        let third = store.insert(NewTask::new("Three", 1)).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_hard_delete_removes_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");

        let task_id = {
            let store = FileTaskStore::new(&path).await.unwrap();
            let task = store.insert(NewTask::new("Doomed", 1)).await.unwrap();
            store.hard_delete(task.id).await.unwrap();
            task.id
        };

        let store = FileTaskStore::new(&path).await.unwrap();
        assert!(store.get(task_id, true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_nonexistent_task() {
        let (store, _temp) = create_test_store().await;

        let task = store.insert(NewTask::new("Test task", 1)).await.unwrap();
        store.hard_delete(task.id).await.unwrap();

        let result = store.save(task).await;
        assert!(result.is_err());
        match result.unwrap_err() {
            Error::TaskNotFound(_) => {}
            e => panic!("Expected TaskNotFound error, got: {:?}", e),
        }
    }
}
