//! Task module
//!
//! Task-related types and logic: the entity model, the store contract and
//! its implementations, the lifecycle service, and the query engine.

mod file_store;
mod memory_store;
mod model;
mod query;
mod repository;
mod service;

pub use file_store::FileTaskStore;
pub use memory_store::InMemoryTaskStore;
pub use model::*;
pub use query::*;
pub use repository::TaskStore;
pub use service::TaskService;
