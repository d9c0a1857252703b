//! Core orchestration logic.
//!
//! This module contains:
//! - EventBus: In-process domain event fan-out
//! - LockTable: All-or-nothing resource locks
//! - MutationQueue: Single-concurrency FIFO for shared-state writes
//! - WarningStore: The persisted warning banner
//! - StackRegistry: Cache of stack collaborators
//! - Orchestrator: Composes the above

pub mod error;
pub mod event_bus;
pub mod lock_table;
pub mod mutation_queue;
pub mod orchestrator;
pub mod registry;
pub mod warning;

// Re-export commonly used types
pub use error::{LockConflict, OrchestratorError, StartupError};
pub use event_bus::{EventBus, EventHandler, SubscriptionId, ALL_EVENTS};
pub use lock_table::LockTable;
pub use mutation_queue::{Completion, MutationQueue};
pub use orchestrator::{Details, Orchestrator, Summary};
pub use registry::StackRegistry;
pub use warning::{FileWarningPersistence, WarningPersistence, WarningStore};
