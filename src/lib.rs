//! dreadnot - Deployment orchestrator
//!
//! Coordinates deployments across a set of named stacks: prevents
//! conflicting concurrent deployments, serializes writes to shared
//! operational state, and publishes a live stream of domain events.
//!
//! # Architecture
//!
//! - Lock table: all-or-nothing resource locks held by deployments
//! - Mutation queue: one-at-a-time FIFO for shared-state writes
//! - Warning store: the operator-visible warning banner
//! - Stack registry: one collaborator per configured stack
//! - Event bus: in-process fan-out consumed by the transport layer
//!
//! # Modules
//!
//! - `config`: Configuration loading
//! - `core`: Orchestration logic (Orchestrator, LockTable, MutationQueue, ...)
//! - `domain`: Data structures (Deployment, DomainEvent, User)
//! - `stack`: Stack collaborator interface and default implementation
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Bring every stack online and report
//! dreadnot --config dreadnot.yaml check
//!
//! # Set the warning banner
//! dreadnot warning set "Deploys frozen for release" --user alice
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod stack;

// Re-export main types at crate root for convenience
pub use config::{Config, StackConfig};
pub use crate::core::{EventBus, LockConflict, Orchestrator, OrchestratorError, StartupError};
pub use domain::{Deployment, DomainEvent, User, WarningPayload};
pub use stack::{ConfiguredStackFactory, Stack, StackContext, StackFactory};
