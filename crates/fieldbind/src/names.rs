//! Lazily resolved named objects, shared across a field tree.
//!
//! Each name gets its own [`OnceCell`]. The registry map is locked only long
//! enough to fetch or insert the cell, so two paths racing on the same name
//! run the initializer at most once, while different names never wait on each
//! other's initializers. A failed initializer leaves the cell empty and the
//! next resolution tries again.

use crate::error::{BindError, Result};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

type Shared = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct NameRegistry {
    slots: Mutex<HashMap<String, Arc<OnceCell<Shared>>>>,
}

impl fmt::Debug for NameRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = match self.slots.lock() {
            Ok(slots) => slots.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("NameRegistry").field("names", &names).finish()
    }
}

impl NameRegistry {
    fn slot(&self, name: &str) -> Result<Arc<OnceCell<Shared>>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| BindError::NameResolution("registry lock poisoned".to_string()))?;
        Ok(slots.entry(name.to_string()).or_default().clone())
    }

    /// Returns the object registered under `name`, building it with `init` on
    /// first use.
    pub fn resolve<T, F>(&self, name: &str, init: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T>,
    {
        let cell = self.slot(name)?;
        let shared = cell.get_or_try_init(|| {
            debug!(name, "Resolving named object");
            init().map(|value| Arc::new(value) as Shared)
        })?;
        shared.clone().downcast::<T>().map_err(|_| {
            BindError::NameResolution(format!("{} holds a value of another type", name))
        })
    }

    /// Whether `name` has been resolved successfully.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.slots
            .lock()
            .map(|slots| slots.get(name).is_some_and(|cell| cell.get().is_some()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn initializes_once_under_contention() {
        let registry = Arc::new(NameRegistry::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry
                        .resolve("catalog", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(vec!["a".to_string(), "b".to_string()])
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<Arc<Vec<String>>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn failed_init_can_be_retried() {
        let registry = NameRegistry::default();
        let first: Result<Arc<u32>> =
            registry.resolve("n", || Err(BindError::NameResolution("not yet".into())));
        assert!(first.is_err());
        assert!(!registry.is_resolved("n"));
        assert_eq!(*registry.resolve("n", || Ok(7u32)).unwrap(), 7);
        assert!(registry.is_resolved("n"));
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let registry = NameRegistry::default();
        registry.resolve("n", || Ok(7u32)).unwrap();
        let wrong: Result<Arc<String>> = registry.resolve("n", || Ok(String::new()));
        assert!(matches!(wrong, Err(BindError::NameResolution(_))));
    }
}
