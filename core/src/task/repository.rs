//! Task store contract
//!
//! Defines the interface for task persistence operations.

use async_trait::async_trait;

use super::model::{NewTask, Task, TaskId};
use super::query::{TaskFilter, TaskOrder};
use crate::Result;

/// Storage interface for task records
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task, assigning its id and creation timestamp
    async fn insert(&self, new: NewTask) -> Result<Task>;

    /// Get a task by id; `include_deleted` also returns soft-deleted rows
    async fn get(&self, id: TaskId, include_deleted: bool) -> Result<Option<Task>>;

    /// Fetch one ordered page of matching tasks plus the total match count
    async fn query_page(
        &self,
        filter: &TaskFilter,
        order: TaskOrder,
        skip: usize,
        take: usize,
    ) -> Result<(Vec<Task>, usize)>;

    /// Persist changes to an existing task
    async fn save(&self, task: Task) -> Result<Task>;

    /// Set the soft-delete marker; succeeds without change if already set
    async fn soft_delete(&self, id: TaskId) -> Result<Task>;

    /// Clear the soft-delete marker
    async fn restore(&self, id: TaskId) -> Result<Task>;

    /// Physically remove the record; irreversible
    async fn hard_delete(&self, id: TaskId) -> Result<()>;
}
