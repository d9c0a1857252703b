//! Default stack backed by its configuration slice.
//!
//! Reports what the configuration says about the stack and which of its
//! regions are currently locked by a deployment.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use crate::config::StackConfig;
use crate::domain::Deployment;

use super::{Stack, StackContext, StackFactory};

/// Summary shown in the details view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackDetails {
    pub name: String,
    pub description: Option<String>,
    pub regions: Vec<String>,
}

/// Running status of one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStatus {
    pub region: String,
    pub running: bool,
    pub deployment: Option<Deployment>,
}

/// Running status of a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackStatus {
    pub name: String,
    pub regions: Vec<RegionStatus>,
}

/// Stack driven entirely by configuration
pub struct ConfiguredStack {
    name: String,
    config: StackConfig,
    context: StackContext,
}

impl ConfiguredStack {
    pub fn new(name: impl Into<String>, context: StackContext) -> Self {
        let name = name.into();
        let config = context.config.stacks.get(&name).cloned().unwrap_or_default();
        Self {
            name,
            config,
            context,
        }
    }

    /// Typed details, before conversion for the orchestrator
    pub fn stack_details(&self) -> StackDetails {
        StackDetails {
            name: self.name.clone(),
            description: self.config.description.clone(),
            regions: self.config.regions.clone(),
        }
    }

    /// Typed status, before conversion for the orchestrator
    pub fn stack_status(&self) -> StackStatus {
        let regions = self
            .config
            .regions
            .iter()
            .map(|region| {
                let deployment = self
                    .context
                    .locks
                    .holder(&Deployment::lock_name(&self.name, region));
                RegionStatus {
                    region: region.clone(),
                    running: deployment.is_some(),
                    deployment,
                }
            })
            .collect();

        StackStatus {
            name: self.name.clone(),
            regions,
        }
    }
}

#[async_trait]
impl Stack for ConfiguredStack {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self) -> Result<()> {
        let log_dir = self.context.config.stack_log_dir(&self.name);
        fs::create_dir_all(&log_dir)
            .await
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        info!(stack = %self.name, regions = self.config.regions.len(), "Stack initialized");
        Ok(())
    }

    async fn details(&self) -> Result<Value> {
        serde_json::to_value(self.stack_details()).context("Failed to serialize stack details")
    }

    async fn running_status(&self) -> Result<Value> {
        let status = self.stack_status();
        debug!(stack = %self.name, "Reporting running status");
        serde_json::to_value(status).context("Failed to serialize stack status")
    }
}

/// Factory producing `ConfiguredStack`s
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredStackFactory;

impl StackFactory for ConfiguredStackFactory {
    fn create(&self, name: &str, context: &StackContext) -> Arc<dyn Stack> {
        Arc::new(ConfiguredStack::new(name, context.clone()))
    }
}
