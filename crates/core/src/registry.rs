//! Type-indexed provider registry (spec.md §4.1).
//!
//! One `Registry<T>` instance per provider kind (scanner, content hasher,
//! perceptual hasher, metadata reader, OCR, classifier). Factories are
//! looked up by name; `add` replaces a prior factory for the same name.
//! Populated once during bootstrap, then read-only: `create`/`names` take
//! a read lock so concurrent lookups never block each other once no more
//! `add` calls are in flight.

use crate::error::{FoError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type Factory<T> = Arc<dyn Fn() -> Result<Box<T>> + Send + Sync>;

pub struct Registry<T: ?Sized> {
    factories: RwLock<HashMap<String, Factory<T>>>,
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`. A second call with the same name
    /// replaces the prior factory.
    pub fn add<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<T>> + Send + Sync + 'static,
    {
        let mut guard = self.factories.write().expect("registry lock poisoned");
        guard.insert(name.into(), Arc::new(factory));
    }

    /// Create a new instance for `name`. Returns `Ok(None)` when the name
    /// is unknown; a factory error surfaces unchanged.
    pub fn create(&self, name: &str) -> Result<Option<Box<T>>> {
        let guard = self.factories.read().expect("registry lock poisoned");
        match guard.get(name) {
            Some(factory) => Ok(Some(factory()?)),
            None => Ok(None),
        }
    }

    /// Create a new instance for `name`, or `NotFound` if it is unknown.
    /// Convenience for construction-time resolution (spec.md §7: "the
    /// Engine constructor fails with NotFound if a named provider is
    /// absent at construction time").
    pub fn require(&self, name: &str) -> Result<Box<T>> {
        self.create(name)?
            .ok_or_else(|| FoError::NotFound(format!("provider {name:?} not registered")))
    }

    pub fn names(&self) -> Vec<String> {
        let guard = self.factories.read().expect("registry lock poisoned");
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Hello;
    impl Greeter for Hello {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn create_unknown_returns_none() {
        let reg: Registry<dyn Greeter> = Registry::new();
        assert!(reg.create("nope").unwrap().is_none());
        assert!(reg.names().is_empty());
    }

    #[test]
    fn second_add_replaces_factory() {
        let reg: Registry<dyn Greeter> = Registry::new();
        reg.add("g", || Ok(Box::new(Hello)));
        assert_eq!(reg.create("g").unwrap().unwrap().greet(), "hello");

        struct Bye;
        impl Greeter for Bye {
            fn greet(&self) -> String {
                "bye".into()
            }
        }
        reg.add("g", || Ok(Box::new(Bye)));
        assert_eq!(reg.create("g").unwrap().unwrap().greet(), "bye");
        assert_eq!(reg.names(), vec!["g".to_string()]);
    }

    #[test]
    fn factory_error_surfaces_unchanged() {
        let reg: Registry<dyn Greeter> = Registry::new();
        reg.add("broken", || Err(FoError::Provider("boom".into())));
        let result = reg.create("broken");
        assert!(matches!(result, Err(FoError::Provider(_))));
    }
}
