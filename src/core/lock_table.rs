//! Mutual-exclusion table mapping resource names to deployments.
//!
//! Acquisition is all-or-nothing across the requested names and runs in a
//! single critical section. Release is name-addressed and unconditional.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::domain::Deployment;

use super::error::LockConflict;

/// Resource locks held by in-flight deployments
#[derive(Debug, Default)]
pub struct LockTable {
    locks: Mutex<HashMap<String, Deployment>>,
}

impl LockTable {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every name in `names` for `deployment`.
    ///
    /// If any name is already held, returns a conflict naming the first
    /// held name's current holder and locks nothing.
    pub fn lock<S: AsRef<str>>(&self, names: &[S], deployment: &Deployment) -> Result<(), LockConflict> {
        debug_assert!(!names.is_empty(), "lock requires at least one name");

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((name, holder)) = names
            .iter()
            .find_map(|n| locks.get(n.as_ref()).map(|holder| (n.as_ref(), holder)))
        {
            debug!(%name, holder = %holder, "Lock conflict");
            return Err(LockConflict {
                name: name.to_string(),
                holder: holder.clone(),
            });
        }

        for name in names {
            locks.insert(name.as_ref().to_string(), deployment.clone());
        }

        info!(deployment = %deployment, count = names.len(), "Locks acquired");
        Ok(())
    }

    /// Release every name in `names`, whoever holds it.
    ///
    /// Ownership is not checked: only a deployment's own completion path is
    /// expected to call this. Names with no entry are ignored.
    pub fn unlock<S: AsRef<str>>(&self, names: &[S]) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        for name in names {
            if let Some(holder) = locks.remove(name.as_ref()) {
                debug!(name = name.as_ref(), holder = %holder, "Lock released");
            }
        }
    }

    /// Current holder of `name`, if any
    pub fn holder(&self, name: &str) -> Option<Deployment> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Whether `name` is currently held
    pub fn is_locked(&self, name: &str) -> bool {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Copy of every current lock entry
    pub fn snapshot(&self) -> HashMap<String, Deployment> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of names currently held
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no name is held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
