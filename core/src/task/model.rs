//! Task model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::principal::UserId;

/// Surrogate key assigned by the store at insert time
pub type TaskId = i64;

/// Lifecycle state derived from the soft-delete marker
///
/// Never persisted: the marker itself is the single source of truth, so the
/// state cannot drift out of sync with it. A purged task has no state; its
/// record no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    SoftDeleted,
}

/// A task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub is_done: bool,
    pub priority: i32,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Lifecycle state computed from `deleted_at`
    pub fn state(&self) -> LifecycleState {
        if self.deleted_at.is_some() {
            LifecycleState::SoftDeleted
        } else {
            LifecycleState::Active
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Payload for creating a task
///
/// The store assigns `id` and `created_at`; new tasks always start active
/// and not done.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: i32,
    pub owner_id: UserId,
}

impl NewTask {
    /// Create a new task payload with the given title and owner
    pub fn new(title: impl Into<String>, owner_id: UserId) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: 1,
            owner_id,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Partial update: fields left `None` are unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_done: Option<bool>,
    #[serde(default)]
    pub priority: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_defaults() {
        let new = NewTask::new("Test task", 7);
        assert_eq!(new.title, "Test task");
        assert_eq!(new.owner_id, 7);
        assert_eq!(new.priority, 1);
        assert!(new.description.is_none());
    }

    #[test]
    fn test_new_task_builders() {
        let new = NewTask::new("Test task", 7)
            .with_description("A description")
            .with_priority(3);
        assert_eq!(new.description, Some("A description".to_string()));
        assert_eq!(new.priority, 3);
    }

    #[test]
    fn test_state_is_derived_from_marker() {
        let mut task = Task {
            id: 1,
            title: "Test task".to_string(),
            description: None,
            is_done: false,
            priority: 1,
            owner_id: 7,
            created_at: Utc::now(),
            deleted_at: None,
        };
        assert_eq!(task.state(), LifecycleState::Active);
        assert!(!task.is_deleted());

        task.deleted_at = Some(Utc::now());
        assert_eq!(task.state(), LifecycleState::SoftDeleted);
        assert!(task.is_deleted());
    }
}
