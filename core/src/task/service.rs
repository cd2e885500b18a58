//! Task lifecycle service
//!
//! Enforces ownership and role rules and drives the task state machine
//! (active -> soft-deleted -> restored or purged) over a [`TaskStore`].
//! Each operation is a single read-check-write against the store; there are
//! no row locks, so concurrent updates to one task resolve last-write-wins.

use std::sync::Arc;

use super::model::{NewTask, Task, TaskId, TaskPatch};
use super::query::{Page, PageMeta, TaskFilter, TaskQuery};
use super::repository::TaskStore;
use crate::principal::{Principal, Role};
use crate::{Error, Result};

/// Authorization-aware task lifecycle engine
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Create a new active task owned by the principal
    pub async fn create(
        &self,
        principal: &Principal,
        title: impl Into<String>,
        description: Option<String>,
        priority: Option<i32>,
    ) -> Result<Task> {
        let mut new = NewTask::new(title, principal.id);
        if let Some(description) = description {
            new = new.with_description(description);
        }
        if let Some(priority) = priority {
            new = new.with_priority(priority);
        }
        let task = self.store.insert(new).await?;
        tracing::debug!("Created task {} for user {}", task.id, task.owner_id);
        Ok(task)
    }

    /// Fetch a task by id
    ///
    /// Soft-deleted tasks are hidden unless `include_deleted` is set.
    pub async fn get(&self, id: TaskId, include_deleted: bool) -> Result<Task> {
        self.store
            .get(id, include_deleted)
            .await?
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    /// Fetch a task the principal is allowed to act on
    ///
    /// Non-owners with the plain user role get `TaskNotFound` rather than
    /// `Forbidden`: the existence of other users' tasks is never revealed.
    pub async fn get_authorized(&self, principal: &Principal, id: TaskId) -> Result<Task> {
        let task = self.get(id, false).await?;
        if principal.role == Role::User && task.owner_id != principal.id {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        Ok(task)
    }

    /// Apply a partial update; fields absent from the patch are unchanged
    pub async fn update(
        &self,
        principal: &Principal,
        id: TaskId,
        patch: TaskPatch,
    ) -> Result<Task> {
        let mut task = self.get_authorized(principal, id).await?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = Some(description);
        }
        if let Some(is_done) = patch.is_done {
            task.is_done = is_done;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        self.store.save(task).await
    }

    /// Soft-delete a task the principal may act on
    pub async fn remove(&self, principal: &Principal, id: TaskId) -> Result<()> {
        let task = self.get_authorized(principal, id).await?;
        self.store.soft_delete(task.id).await?;
        tracing::debug!("Soft-deleted task {}", id);
        Ok(())
    }

    /// Bring a soft-deleted task back to the active state
    ///
    /// Restores by id alone, without an ownership or role check; any caller
    /// who can reach this operation may restore any soft-deleted task.
    pub async fn restore(&self, id: TaskId) -> Result<Task> {
        let task = self.get(id, true).await?;
        if !task.is_deleted() {
            return Err(Error::InvalidState(format!("Task {} is not deleted", id)));
        }
        let task = self.store.restore(task.id).await?;
        tracing::debug!("Restored task {}", id);
        Ok(task)
    }

    /// Physically remove a task; admin-only and irreversible
    pub async fn permanently_remove(&self, principal: &Principal, id: TaskId) -> Result<()> {
        let task = self.get(id, true).await?;
        if principal.role != Role::Admin {
            return Err(Error::Forbidden(
                "Only admins may permanently remove tasks".to_string(),
            ));
        }
        self.store.hard_delete(task.id).await?;
        tracing::info!("Purged task {} (actor {})", id, principal.id);
        Ok(())
    }

    /// List active tasks visible to the principal
    ///
    /// Users see only their own tasks; admins see everything.
    pub async fn find_active(
        &self,
        principal: &Principal,
        query: &TaskQuery,
    ) -> Result<Page<Task>> {
        let (page, limit) = query.window();
        let skip = (page - 1) * limit;

        let mut filter = TaskFilter {
            is_done: query.is_done,
            search: query.search.clone(),
            ..TaskFilter::default()
        };
        if principal.role == Role::User {
            filter.owner_id = Some(principal.id);
        }

        let (items, total) = self
            .store
            .query_page(&filter, query.order(), skip, limit)
            .await?;
        Ok(Page {
            data: items,
            meta: PageMeta::new(total, page, limit),
        })
    }

    /// List the caller's soft-deleted tasks
    ///
    /// Always scoped to the caller's own tasks, admins included. The page
    /// window is applied before the deleted-only filter, so the returned
    /// totals count the deleted rows within the window rather than all
    /// deleted rows.
    pub async fn find_deleted(
        &self,
        principal: &Principal,
        query: &TaskQuery,
    ) -> Result<Page<Task>> {
        let (page, limit) = query.window();
        let skip = (page - 1) * limit;

        let filter = TaskFilter {
            owner_id: Some(principal.id),
            search: query.search.clone(),
            include_deleted: true,
            ..TaskFilter::default()
        };

        let (items, _) = self
            .store
            .query_page(&filter, query.order(), skip, limit)
            .await?;
        let deleted: Vec<Task> = items.into_iter().filter(Task::is_deleted).collect();
        let total = deleted.len();
        Ok(Page {
            data: deleted,
            meta: PageMeta::new(total, page, limit),
        })
    }
}
