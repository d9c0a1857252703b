//! Lazily populated cache of stack collaborators.
//!
//! `get` constructs a stack on first access and caches it for the life of
//! the process. `lookup` only returns stacks that already exist: a name in
//! the configuration is not queryable until startup has created it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::stack::{Stack, StackContext, StackFactory};

use super::error::OrchestratorError;

/// Owns every stack collaborator
pub struct StackRegistry {
    factory: Arc<dyn StackFactory>,
    context: StackContext,
    stacks: Mutex<HashMap<String, Arc<dyn Stack>>>,
}

impl StackRegistry {
    pub fn new(factory: Arc<dyn StackFactory>, context: StackContext) -> Self {
        Self {
            factory,
            context,
            stacks: Mutex::new(HashMap::new()),
        }
    }

    /// Cached stack for `name`, constructing it on first access
    pub fn get(&self, name: &str) -> Arc<dyn Stack> {
        let mut stacks = self.stacks.lock().unwrap_or_else(PoisonError::into_inner);

        let stack = stacks.entry(name.to_string()).or_insert_with(|| {
            debug!(stack = %name, "Creating stack");
            self.factory.create(name, &self.context)
        });

        Arc::clone(stack)
    }

    /// Cached stack for `name`, without constructing it
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Stack>, OrchestratorError> {
        self.stacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| OrchestratorError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::config::Config;
    use crate::core::{EventBus, LockTable};

    struct NamedStack(String);

    #[async_trait]
    impl Stack for NamedStack {
        fn name(&self) -> &str {
            &self.0
        }

        async fn init(&self) -> Result<()> {
            Ok(())
        }

        async fn details(&self) -> Result<Value> {
            Ok(json!({ "name": self.0 }))
        }

        async fn running_status(&self) -> Result<Value> {
            Ok(json!([]))
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    impl StackFactory for CountingFactory {
        fn create(&self, name: &str, _context: &StackContext) -> Arc<dyn Stack> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Arc::new(NamedStack(name.to_string()))
        }
    }

    fn registry(factory: Arc<CountingFactory>) -> StackRegistry {
        let context = StackContext {
            config: Arc::new(Config::default()),
            locks: Arc::new(LockTable::new()),
            events: EventBus::new(),
        };
        StackRegistry::new(factory, context)
    }

    #[test]
    fn test_get_constructs_once() {
        let factory = Arc::new(CountingFactory::default());
        let registry = registry(Arc::clone(&factory));

        let first = registry.get("api");
        let second = registry.get("api");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(first.name(), "api");
    }

    #[test]
    fn test_lookup_requires_prior_get() {
        let registry = registry(Arc::new(CountingFactory::default()));

        assert!(matches!(
            registry.lookup("api"),
            Err(OrchestratorError::NotFound(name)) if name == "api"
        ));

        registry.get("api");
        assert_eq!(registry.lookup("api").unwrap().name(), "api");
    }
}
