//! Registry of motor SDK backends.
//!
//! Provides a `SdkRegistry` struct for registering and creating SDK backend
//! factories by name. The registry is constructed at startup and passed
//! around explicitly.

use crate::drivers::register_all_backends;
use servo_common::hal::driver::{HalError, MotorSdk, SdkFactory};
use std::collections::HashMap;

/// Registry of available SDK backends.
pub struct SdkRegistry {
    factories: HashMap<&'static str, SdkFactory>,
}

impl SdkRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in backend.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        register_all_backends(&mut registry);
        registry
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: SdkFactory) {
        if self.factories.contains_key(name) {
            panic!("SDK backend '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<SdkFactory> {
        self.factories.get(name).copied()
    }

    /// Create a backend instance by name.
    ///
    /// # Errors
    /// Returns `HalError::DriverNotFound` if no backend with the given name is registered.
    pub fn create(&self, name: &str) -> Result<Box<dyn MotorSdk>, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered backend names, sorted.
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for SdkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulatedSdk;

    fn create_test_sdk() -> Box<dyn MotorSdk> {
        Box::new(SimulatedSdk::new().with_nodes_per_port(1))
    }

    #[test]
    fn registry_register_and_create() {
        let mut reg = SdkRegistry::new();
        reg.register("test_sdk", create_test_sdk);

        let sdk = reg.create("test_sdk").expect("should create");
        assert_eq!(sdk.name(), "simulation");
    }

    #[test]
    fn registry_backend_not_found() {
        let reg = SdkRegistry::new();
        let result = reg.create("nonexistent");
        assert!(matches!(result, Err(HalError::DriverNotFound(_))));
    }

    #[test]
    fn registry_list_sorted() {
        let mut reg = SdkRegistry::new();
        reg.register("beta", create_test_sdk);
        reg.register("alpha", create_test_sdk);
        assert_eq!(reg.list(), vec!["alpha", "beta"]);
    }

    #[test]
    fn builtin_registry_has_simulation() {
        let reg = SdkRegistry::with_builtin();
        assert_eq!(reg.list(), vec!["simulation"]);
        assert!(reg.create("simulation").is_ok());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = SdkRegistry::new();
        reg.register("dup", create_test_sdk);
        reg.register("dup", create_test_sdk);
    }
}
