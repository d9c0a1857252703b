//! Stack collaborator interface.
//!
//! A stack is one independently deployable target environment. The
//! orchestrator only needs three completion-signaling operations from it;
//! how a stack actually deploys is its own business.

pub mod configured;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::core::{EventBus, LockTable};

pub use configured::{ConfiguredStack, ConfiguredStackFactory, RegionStatus, StackDetails, StackStatus};

/// Trait for stack collaborators
#[async_trait]
pub trait Stack: Send + Sync {
    /// Stack name, unique within the configuration
    fn name(&self) -> &str;

    /// Prepare the stack before the system accepts traffic
    async fn init(&self) -> Result<()>;

    /// Per-stack summary for the details view
    async fn details(&self) -> Result<Value>;

    /// Per-stack running status
    async fn running_status(&self) -> Result<Value>;
}

/// Shared orchestrator state handed to every stack on construction
#[derive(Clone)]
pub struct StackContext {
    pub config: Arc<Config>,
    pub locks: Arc<LockTable>,
    /// Stacks publish their own deployment events here
    pub events: EventBus,
}

/// Builds stack collaborators for the registry
pub trait StackFactory: Send + Sync {
    fn create(&self, name: &str, context: &StackContext) -> Arc<dyn Stack>;
}

impl<F> StackFactory for F
where
    F: Fn(&str, &StackContext) -> Arc<dyn Stack> + Send + Sync,
{
    fn create(&self, name: &str, context: &StackContext) -> Arc<dyn Stack> {
        self(name, context)
    }
}
