//! Core library for TaskDeck
//!
//! This crate contains the core business logic, including:
//! - The task lifecycle engine (ownership checks, soft delete, restore, purge)
//! - The filtered/paginated task query engine
//! - The task store contract with in-memory and file-backed implementations

pub mod error;
pub mod principal;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
