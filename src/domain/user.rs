//! The actor on whose behalf an operation runs.

use serde::{Deserialize, Serialize};

/// Name used when the transport layer runs without authentication
pub const LOGIN_NOT_REQUIRED: &str = "login_not_required";

/// A user as handed to the orchestrator by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Whether the user may perform write operations
    pub authorized: bool,

    /// Display name, recorded in published events
    pub name: String,
}

impl User {
    /// An authenticated user
    pub fn authorized(name: impl Into<String>) -> Self {
        Self {
            authorized: true,
            name: name.into(),
        }
    }

    /// The pass-through user used when login is not required
    pub fn login_not_required() -> Self {
        Self::authorized(LOGIN_NOT_REQUIRED)
    }
}
