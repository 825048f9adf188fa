//! Static environment registry
//!
//! Lets environment crates register a factory once at startup so that
//! runners can build planning environments from a configured `env_id`.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;

use tracing::warn;

use crate::env::Environment;

/// Factory building an environment for a given training seat and seed
pub type EnvFactory = fn(training_agent: usize, seed: u64) -> Box<dyn Environment>;

/// Thread-safe registry mapping env_id to factory functions
static REGISTRY: Lazy<Mutex<HashMap<String, EnvFactory>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn registry() -> std::sync::MutexGuard<'static, HashMap<String, EnvFactory>> {
    // A panic while holding the lock cannot leave the map half-written.
    REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Register an environment with the global registry.
///
/// Registering the same `env_id` twice replaces the earlier factory.
pub fn register_env(env_id: String, factory: EnvFactory) {
    let mut registry = registry();
    if registry.contains_key(&env_id) {
        warn!(env_id = %env_id, "Overriding existing environment registration");
    }
    registry.insert(env_id, factory);
}

/// Create an environment by env_id.
///
/// Returns `None` if nothing is registered under `env_id`.
pub fn create_env(env_id: &str, training_agent: usize, seed: u64) -> Option<Box<dyn Environment>> {
    let factory = registry().get(env_id).copied();
    match factory {
        Some(factory) => Some(factory(training_agent, seed)),
        None => {
            warn!(env_id = %env_id, "Attempted to create unregistered environment");
            None
        }
    }
}

/// List all registered environment ids
pub fn list_registered_envs() -> Vec<String> {
    let mut ids: Vec<String> = registry().keys().cloned().collect();
    ids.sort();
    ids
}

/// Check if an environment is registered
pub fn is_registered(env_id: &str) -> bool {
    registry().contains_key(env_id)
}

/// Clear all registered environments (mainly for testing)
pub fn clear_registry() {
    registry().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Action, EnvError, StateKey, StepResult};
    use crate::metadata::EnvMetadata;
    use crate::test_utils::REGISTRY_TEST_MUTEX;

    #[derive(Debug)]
    struct CounterEnv {
        seat: usize,
        counter: u8,
    }

    impl Environment for CounterEnv {
        fn env_id(&self) -> &str {
            "counter"
        }

        fn metadata(&self) -> EnvMetadata {
            EnvMetadata::new("counter", "Counter").with_actions(["Noop", "Inc"])
        }

        fn num_actions(&self) -> usize {
            2
        }

        fn training_agent(&self) -> usize {
            self.seat
        }

        fn reset(&mut self, state: &StateKey) -> Result<Vec<u8>, EnvError> {
            self.restore_state(state)?;
            Ok(vec![self.counter])
        }

        fn act(&mut self, _obs: &[u8]) -> Result<Vec<Action>, EnvError> {
            Ok(vec![0; 3])
        }

        fn step(&mut self, actions: &[Action]) -> Result<StepResult, EnvError> {
            self.counter += actions.iter().sum::<u8>();
            Ok(StepResult {
                obs: vec![self.counter],
                rewards: [0.0; 4],
                done: self.counter >= 3,
                info: 0,
            })
        }

        fn serialize_state(&self) -> StateKey {
            StateKey::new(vec![self.counter])
        }

        fn restore_state(&mut self, state: &StateKey) -> Result<(), EnvError> {
            match state.as_bytes() {
                [c] => {
                    self.counter = *c;
                    Ok(())
                }
                other => Err(EnvError::Decoding(format!("bad length {}", other.len()))),
            }
        }
    }

    fn counter_factory(seat: usize, _seed: u64) -> Box<dyn Environment> {
        Box::new(CounterEnv { seat, counter: 0 })
    }

    #[test]
    fn test_register_and_create() {
        let _guard = REGISTRY_TEST_MUTEX.lock().unwrap();
        clear_registry();

        register_env("counter".to_string(), counter_factory);
        assert!(is_registered("counter"));
        assert_eq!(list_registered_envs(), vec!["counter".to_string()]);

        let env = create_env("counter", 2, 0).expect("registered");
        assert_eq!(env.env_id(), "counter");
        assert_eq!(env.training_agent(), 2);

        clear_registry();
    }

    #[test]
    fn test_create_unregistered_returns_none() {
        let _guard = REGISTRY_TEST_MUTEX.lock().unwrap();
        clear_registry();

        assert!(create_env("missing", 0, 0).is_none());
        assert!(!is_registered("missing"));
    }

    #[test]
    fn test_reregistration_overrides() {
        let _guard = REGISTRY_TEST_MUTEX.lock().unwrap();
        clear_registry();

        register_env("counter".to_string(), counter_factory);
        register_env("counter".to_string(), counter_factory);
        assert_eq!(list_registered_envs().len(), 1);

        clear_registry();
    }
}
