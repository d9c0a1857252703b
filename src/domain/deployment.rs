//! Deployment tokens.
//!
//! A deployment is created by the deploy-initiation path and stored as the
//! value of every lock entry it holds. The orchestrator never interprets it
//! beyond identity and display.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One in-flight deploy operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Unique identifier for this deployment
    pub id: Uuid,

    /// Stack being deployed
    pub stack: String,

    /// Region within the stack
    pub region: String,

    /// Name of the user who started it
    pub user: String,

    /// When the deployment was requested
    pub started_at: DateTime<Utc>,
}

impl Deployment {
    /// Create a new deployment token with a fresh id
    pub fn new(stack: impl Into<String>, region: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stack: stack.into(),
            region: region.into(),
            user: user.into(),
            started_at: Utc::now(),
        }
    }

    /// Lock name for a stack region: `"<stack>:<region>"`
    pub fn lock_name(stack: &str, region: &str) -> String {
        format!("{}:{}", stack, region)
    }

    /// Resource names this deployment must hold while it runs
    pub fn lock_names(&self) -> Vec<String> {
        vec![Self::lock_name(&self.stack, &self.region)]
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({}, by {})", self.stack, self.region, self.id, self.user)
    }
}
