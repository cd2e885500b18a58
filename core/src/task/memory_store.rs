//! In-memory task storage
//!
//! Keeps the whole table behind a `RwLock`. Serves as the test double for
//! the store contract and for ephemeral deployments.

use std::collections::HashMap;

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

pub struct InMemoryTaskStore {
    state: RwLock<TableState>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TableState {
                rows: HashMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, new: NewTask) -> Result<Task> {
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
        let mut state = self.state.write().await;
        if !state.rows.contains_key(&task.id) {
            return Err(Error::TaskNotFound(task.id.to_string()));
        }
        state.rows.insert(task.id, task.clone());
        Ok(task)
    }

    async fn soft_delete(&self, id: TaskId) -> Result<Task> {
        let mut state = self.state.write().await;
        let task = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        if task.deleted_at.is_none() {
            task.deleted_at = Some(Utc::now());
        }
        Ok(task.clone())
    }

    async fn restore(&self, id: TaskId) -> Result<Task> {
        let mut state = self.state.write().await;
        let task = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        task.deleted_at = None;
        Ok(task.clone())
    }

    async fn hard_delete(&self, id: TaskId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .rows
            .remove(&id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::query::{SortField, SortOrder};

    #[tokio::test]
    async fn test_insert_assigns_monotonic_ids() {
        let store = InMemoryTaskStore::new();

        let first = store.insert(NewTask::new("First", 1)).await.unwrap();
        let second = store.insert(NewTask::new("Second", 1)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(!first.is_done);
        assert!(first.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_get_respects_soft_delete_visibility() {
        let store = InMemoryTaskStore::new();
        let task = store.insert(NewTask::new("Hidden", 1)).await.unwrap();
        store.soft_delete(task.id).await.unwrap();

        assert!(store.get(task.id, false).await.unwrap().is_none());
        let found = store.get(task.id, true).await.unwrap().unwrap();
        assert!(found.deleted_at.is_some());
    }

    #[tokio::test]
    async fn test_soft_delete_is_noop_when_already_deleted() {
        let store = InMemoryTaskStore::new();
        let task = store.insert(NewTask::new("Once", 1)).await.unwrap();

        let first = store.soft_delete(task.id).await.unwrap();
        let marker = first.deleted_at;
        let second = store.soft_delete(task.id).await.unwrap();

        assert_eq!(second.deleted_at, marker);
    }

    #[tokio::test]
    async fn test_restore_clears_marker() {
        let store = InMemoryTaskStore::new();
        let task = store.insert(NewTask::new("Back", 1)).await.unwrap();
        store.soft_delete(task.id).await.unwrap();

        let restored = store.restore(task.id).await.unwrap();
        assert!(restored.deleted_at.is_none());
        assert!(store.get(task.id, false).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_hard_delete_removes_row() {
        let store = InMemoryTaskStore::new();
        let task = store.insert(NewTask::new("Gone", 1)).await.unwrap();

        store.hard_delete(task.id).await.unwrap();
        assert!(store.get(task.id, true).await.unwrap().is_none());

        let again = store.hard_delete(task.id).await;
        assert!(matches!(again, Err(Error::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn test_save_unknown_task_fails() {
        let store = InMemoryTaskStore::new();
        let mut task = store.insert(NewTask::new("Known", 1)).await.unwrap();
        store.hard_delete(task.id).await.unwrap();

        task.title = "Too late".to_string();
        let result = store.save(task).await;
        assert!(matches!(result, Err(Error::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn test_query_page_windows_and_counts() {
        let store = InMemoryTaskStore::new();
        for i in 0..5 {
            store
                .insert(NewTask::new(format!("Task {}", i), 1))
                .await
                .unwrap();
        }

        let order = TaskOrder {
            by: SortField::Title,
            direction: SortOrder::Asc,
        };
        let (page, total) = store
            .query_page(&TaskFilter::default(), order, 2, 2)
            .await
            .unwrap();

        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title, "Task 2");
        assert_eq!(page[1].title, "Task 3");
    }
}
