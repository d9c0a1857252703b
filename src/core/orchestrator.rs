//! Main orchestrator for deployment coordination.
//!
//! Composes the lock table, mutation queue, warning store and stack
//! registry, and republishes resulting domain events on the event bus for
//! the transport layer to relay.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs::DirBuilder;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::domain::{Deployment, DomainEvent, User, WarningPayload, WARNING_REMOVED, WARNING_SET};
use crate::stack::{Stack, StackContext, StackFactory};

use super::error::{LockConflict, OrchestratorError, StartupError};
use super::event_bus::EventBus;
use super::lock_table::LockTable;
use super::mutation_queue::MutationQueue;
use super::registry::StackRegistry;
use super::warning::{FileWarningPersistence, WarningPersistence, WarningStore};

/// Summary of this orchestrator instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Environment name
    pub name: String,
}

/// Details of every configured stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Details {
    /// Environment name
    pub name: String,

    /// Per-stack details, in configured stack order
    pub stacks: Vec<Value>,
}

/// Deployment orchestrator
pub struct Orchestrator {
    config: Arc<Config>,
    locks: Arc<LockTable>,
    events: EventBus,
    queue: MutationQueue,
    warning: Arc<WarningStore>,
    registry: StackRegistry,
}

impl Orchestrator {
    /// Create an orchestrator persisting the warning under `data_root`
    pub fn new(config: Config, factory: Arc<dyn StackFactory>) -> Self {
        let persistence = Arc::new(FileWarningPersistence::new(config.warning_path()));
        Self::with_persistence(config, factory, persistence)
    }

    /// Create an orchestrator with an explicit warning persistence backend
    pub fn with_persistence(
        config: Config,
        factory: Arc<dyn StackFactory>,
        persistence: Arc<dyn WarningPersistence>,
    ) -> Self {
        info!(config = ?config, "Using config");

        let config = Arc::new(config);
        let locks = Arc::new(LockTable::new());
        let events = EventBus::new();

        let context = StackContext {
            config: Arc::clone(&config),
            locks: Arc::clone(&locks),
            events: events.clone(),
        };

        Self {
            config,
            locks,
            events,
            queue: MutationQueue::new(),
            warning: Arc::new(WarningStore::new(persistence)),
            registry: StackRegistry::new(factory, context),
        }
    }

    /// Bring the system online.
    ///
    /// Creates the data directory, loads the warning, then initializes every
    /// configured stack concurrently. The first failure aborts startup.
    #[instrument(skip(self), fields(data_root = %self.config.data_root.display()))]
    pub async fn init(&self) -> Result<(), StartupError> {
        let data_root = &self.config.data_root;
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);
        builder
            .create(data_root)
            .await
            .map_err(|source| StartupError::DataDir {
                path: data_root.clone(),
                source,
            })?;

        let text = self.warning.load().await.map_err(StartupError::WarningLoad)?;
        if text.is_empty() {
            info!("No warning set");
        } else {
            warn!(%text, "Warning set");
        }

        let names = self.config.stack_names();
        self.fan_out(&names, |stack| async move { stack.init().await })
            .await
            .map_err(|(stack, source)| {
                error!(%stack, error = %source, "Stack failed to initialize");
                StartupError::StackInit { stack, source }
            })?;

        info!(stacks = names.len(), "Startup complete");
        Ok(())
    }

    /// Configuration this orchestrator was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Instance name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Event bus carrying warning and stack events
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Lock `names` for `deployment`, all or nothing
    pub fn lock<S: AsRef<str>>(&self, names: &[S], deployment: &Deployment) -> Result<(), LockConflict> {
        self.locks.lock(names, deployment)
    }

    /// Release `names` regardless of which deployment holds them
    pub fn unlock<S: AsRef<str>>(&self, names: &[S]) {
        self.locks.unlock(names)
    }

    /// Snapshot of the current locks
    pub fn locks(&self) -> HashMap<String, Deployment> {
        self.locks.snapshot()
    }

    /// Current warning (empty when none is set)
    pub fn warning(&self) -> String {
        self.warning.current()
    }

    /// Set or clear (with an empty `text`) the warning.
    ///
    /// The write is serialized with every other warning write. The in-memory
    /// warning and the published event only change once the write succeeds.
    #[instrument(skip(self, user, text), fields(user = %user.name))]
    pub async fn set_warning(&self, user: &User, text: &str) -> Result<(), OrchestratorError> {
        let warning = Arc::clone(&self.warning);
        let events = self.events.clone();
        let username = user.name.clone();
        let text = text.to_string();

        self.queue
            .enqueue(async move {
                let previous = warning
                    .persist(&text)
                    .await
                    .map_err(OrchestratorError::Persistence)?;

                if text.is_empty() {
                    info!("Warning cleared");
                    publish_warning(
                        &events,
                        WARNING_REMOVED,
                        WarningPayload {
                            text: previous,
                            username,
                        },
                    );
                } else {
                    warn!(%text, "Warning set");
                    publish_warning(&events, WARNING_SET, WarningPayload { text, username });
                }

                Ok::<(), OrchestratorError>(())
            })
            .await?
    }

    /// Initialized stack named `name`
    pub fn get_stack(&self, name: &str) -> Result<Arc<dyn Stack>, OrchestratorError> {
        self.registry.lookup(name)
    }

    /// Summary of this instance
    pub fn summary(&self) -> Summary {
        Summary {
            name: self.config.env.clone(),
        }
    }

    /// Details of every configured stack, in configured order
    #[instrument(skip(self))]
    pub async fn details(&self) -> Result<Details, OrchestratorError> {
        let names = self.config.stack_names();
        let stacks = self
            .fan_out(&names, |stack| async move { stack.details().await })
            .await
            .map_err(|(stack, source)| OrchestratorError::Stack { stack, source })?;

        Ok(Details {
            name: self.config.env.clone(),
            stacks,
        })
    }

    /// Running status of every configured stack, in configured order
    #[instrument(skip(self))]
    pub async fn running_status(&self) -> Result<Vec<Value>, OrchestratorError> {
        let names = self.config.stack_names();
        self.fan_out(&names, |stack| async move { stack.running_status().await })
            .await
            .map_err(|(stack, source)| OrchestratorError::Stack { stack, source })
    }

    /// Run `op` against every named stack concurrently.
    ///
    /// Results are placed by position in `names`. The first failure to
    /// arrive is returned immediately; calls already started keep running
    /// detached and their results are discarded.
    async fn fan_out<F, Fut, T>(
        &self,
        names: &[String],
        op: F,
    ) -> Result<Vec<T>, (String, anyhow::Error)>
    where
        F: Fn(Arc<dyn Stack>) -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut pending: FuturesUnordered<_> = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let handle = tokio::spawn(op(self.registry.get(name)));
                let name = name.clone();
                async move { (index, name, handle.await) }
            })
            .collect();

        let mut results: Vec<Option<T>> = names.iter().map(|_| None).collect();

        while let Some((index, name, joined)) = pending.next().await {
            match joined {
                Ok(Ok(value)) => results[index] = Some(value),
                Ok(Err(e)) => return Err((name, e)),
                Err(e) => return Err((name, anyhow::anyhow!("Stack task panicked: {}", e))),
            }
        }

        Ok(results.into_iter().flatten().collect())
    }
}

fn publish_warning(events: &EventBus, name: &str, payload: WarningPayload) {
    match DomainEvent::with_payload(name, &payload) {
        Ok(event) => events.publish_event(event),
        Err(e) => error!(event = name, error = %e, "Failed to encode warning event"),
    }
}
