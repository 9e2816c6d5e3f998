//! Shutdown-phase release of acquired resources
//!
//! Readers that acquire something needing explicit release (a secret-store
//! login, for instance) register a hook here. The owner of the registry runs
//! the hooks once, during an orderly shutdown.

use crate::error::{DataError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// A resource release action run at shutdown
#[async_trait]
pub trait CleanupHook: Send + Sync {
    /// Short description used in logs
    fn name(&self) -> String;

    async fn run(&self) -> Result<()>;
}

/// Ordered collection of cleanup hooks
#[derive(Default)]
pub struct Cleanup {
    hooks: Mutex<Vec<Arc<dyn CleanupHook>>>,
}

impl Cleanup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, hook: impl CleanupHook + 'static) {
        debug!("Registering cleanup hook: {}", hook.name());
        self.lock().push(Arc::new(hook));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run every registered hook, most recently registered first
    ///
    /// Hooks are removed as they run, so a second call does nothing. A failing
    /// hook does not stop the others; all failures are returned.
    pub async fn run(&self) -> Vec<DataError> {
        let hooks: Vec<_> = std::mem::take(&mut *self.lock());
        let mut errors = Vec::new();

        for hook in hooks.into_iter().rev() {
            debug!("Running cleanup hook: {}", hook.name());
            if let Err(e) = hook.run().await {
                warn!("Cleanup hook {} failed: {}", hook.name(), e);
                errors.push(e);
            }
        }
        errors
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn CleanupHook>>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cleanup").field("hooks", &self.len()).finish()
    }
}
