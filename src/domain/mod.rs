//! Domain types for the dreadnot orchestrator.
//!
//! This module contains the core data structures:
//! - Deployment: Identity held against locked resource names
//! - Events: Named, payload-bearing notifications for observers
//! - User: The actor performing an operation

pub mod deployment;
pub mod events;
pub mod user;

// Re-export commonly used types
pub use deployment::Deployment;
pub use events::{DomainEvent, WarningPayload, WARNING_REMOVED, WARNING_SET};
pub use user::User;
