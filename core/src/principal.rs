//! Authenticated principal and role model
//!
//! A `Principal` is produced by the authenticator boundary; the core trusts
//! it completely and performs no credential checks of its own.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Surrogate key for user accounts
pub type UserId = i64;

/// Role carried by an authenticated principal
///
/// A closed enumeration: `Admin` may act on any task, `User` only on tasks
/// it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(Error::InvalidInput(format!(
                "Unsupported role '{}'",
                value
            ))),
        }
    }
}

/// An authenticated actor: identity plus role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Principal with the plain user role
    pub fn user(id: UserId) -> Self {
        Self::new(id, Role::User)
    }

    /// Principal with the admin role
    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }
}
