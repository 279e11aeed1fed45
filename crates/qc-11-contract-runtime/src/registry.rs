//! # Contract Registry
//!
//! Maps application ids to their dispatchers. Built before execution and
//! shared read-only by every worker.

use crate::errors::Trap;
use crate::ports::outbound::{Contract, FnContract};
use crate::session::{ResponseBuffer, Session};
use shared_types::{AppId, StatusCode};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Registered applications.
#[derive(Clone, Default)]
pub struct ContractRegistry {
    contracts: HashMap<AppId, Arc<dyn Contract>>,
}

impl ContractRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatcher, returning the one it replaced.
    pub fn register(
        &mut self,
        app: AppId,
        contract: impl Contract + 'static,
    ) -> Option<Arc<dyn Contract>> {
        self.contracts.insert(app, Arc::new(contract))
    }

    /// Register a closure as a dispatcher.
    pub fn register_fn<F>(&mut self, app: AppId, dispatch: F) -> Option<Arc<dyn Contract>>
    where
        F: Fn(&mut Session<'_>, &str, &mut ResponseBuffer) -> Result<StatusCode, Trap>
            + Send
            + Sync
            + 'static,
    {
        self.register(app, FnContract(dispatch))
    }

    /// Dispatcher for `app`.
    #[must_use]
    pub fn get(&self, app: AppId) -> Option<Arc<dyn Contract>> {
        self.contracts.get(&app).cloned()
    }

    /// Returns true if `app` is registered.
    #[must_use]
    pub fn contains(&self, app: AppId) -> bool {
        self.contracts.contains_key(&app)
    }

    /// Number of registered applications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl fmt::Debug for ContractRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut apps: Vec<_> = self.contracts.keys().collect();
        apps.sort();
        f.debug_struct("ContractRegistry").field("apps", &apps).finish()
    }
}
