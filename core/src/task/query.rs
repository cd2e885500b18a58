//! Task query engine
//!
//! Filter predicates, sort-field mapping, and pagination math shared by the
//! listing operations and the store implementations.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::model::Task;
use crate::principal::UserId;

/// Hard cap on page size
pub const MAX_PAGE_LIMIT: usize = 100;

/// Page size applied when the caller does not pick one
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Sort fields accepted by the listing operations
///
/// A closed allow-list mapped to comparators in [`TaskOrder::compare`];
/// caller input never reaches the store as a raw field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    Title,
    IsDone,
}

impl Default for SortField {
    fn default() -> Self {
        Self::CreatedAt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Desc
    }
}

/// Ordering applied to a task listing
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskOrder {
    pub by: SortField,
    pub direction: SortOrder,
}

impl TaskOrder {
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = match self.by {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::IsDone => a.is_done.cmp(&b.is_done),
        };
        match self.direction {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Listing parameters for the task query engine
#[derive(Debug, Clone)]
pub struct TaskQuery {
    /// 1-based page number
    pub page: usize,
    pub limit: usize,
    pub is_done: Option<bool>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            is_done: None,
            search: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl TaskQuery {
    /// Effective page and limit with bounds applied (page >= 1, limit 1..=100)
    pub fn window(&self) -> (usize, usize) {
        (self.page.max(1), self.limit.clamp(1, MAX_PAGE_LIMIT))
    }

    pub fn order(&self) -> TaskOrder {
        TaskOrder {
            by: self.sort_by,
            direction: self.sort_order,
        }
    }
}

/// Row predicate compiled from a query plus the caller's visibility scope
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub owner_id: Option<UserId>,
    pub is_done: Option<bool>,
    /// Case-insensitive substring match on the title
    pub search: Option<String>,
    pub include_deleted: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if !self.include_deleted && task.is_deleted() {
            return false;
        }
        if let Some(owner_id) = self.owner_id {
            if task.owner_id != owner_id {
                return false;
            }
        }
        if let Some(is_done) = self.is_done {
            if task.is_done != is_done {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !task.title.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Pagination metadata returned alongside a page of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageMeta {
    pub fn new(total: usize, page: usize, limit: usize) -> Self {
        let total_pages = total.div_ceil(limit);
        Self {
            total,
            page,
            limit,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}
