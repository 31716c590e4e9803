use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Key under which a failed call stashes its [`ApiError`]
pub const ERROR_KEY: &str = "error";

/// Arbitrary state carried along with a client-side navigation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState(Map<String, Value>);

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(error: &ApiError) -> Self {
        let mut state = Self::new();
        state.insert(ERROR_KEY, error);
        state
    }

    pub fn insert<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.0.insert(key.to_string(), value);
            }
            Err(e) => tracing::warn!("Dropping navigation state '{}': {}", key, e),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Typed read; a missing key and a value of the wrong shape both give `None`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.0.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!("Navigation state '{}' has unexpected shape: {}", key, e);
                None
            }
        }
    }
}

impl From<Map<String, Value>> for NavigationState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
