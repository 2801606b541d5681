//! Per-request context and shared application data.
//!
//! A [`RequestContext`] is created by the dispatcher for every request and
//! dropped when the response has been produced. Middleware writes derived
//! values into it (for example the authenticated `user_id`) and handlers read
//! them back by name.

use crate::ids::RequestId;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Failure to read a value from the [`RequestContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// Nothing was stored under `key`
    Missing { key: String },
    /// A value exists but does not deserialize into the requested type
    Type { key: String, message: String },
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::Missing { key } => write!(f, "context key '{key}' was never set"),
            ContextError::Type { key, message } => {
                write!(f, "context key '{key}' has an unexpected type: {message}")
            }
        }
    }
}

impl std::error::Error for ContextError {}

/// Request-scoped key/value store.
///
/// Owned by exactly one in-flight request; it is never shared across requests.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    request_id: RequestId,
    route_pattern: Option<Arc<str>>,
    values: HashMap<String, Value>,
}

impl RequestContext {
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            route_pattern: None,
            values: HashMap::new(),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Pattern of the route being served, once the dispatcher has resolved it.
    #[must_use]
    pub fn route_pattern(&self) -> Option<&str> {
        self.route_pattern.as_deref()
    }

    pub(crate) fn set_route_pattern(&mut self, pattern: Arc<str>) {
        self.route_pattern = Some(pattern);
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// [`ContextError::Missing`] when the key was never set.
    pub fn get(&self, key: &str) -> Result<&Value, ContextError> {
        self.values.get(key).ok_or_else(|| ContextError::Missing {
            key: key.to_string(),
        })
    }

    /// Read and deserialize the value stored under `key`.
    ///
    /// # Errors
    ///
    /// [`ContextError::Missing`] when the key was never set,
    /// [`ContextError::Type`] when the value has a different shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, ContextError> {
        let value = self.get(key)?;
        T::deserialize(value).map_err(|e| ContextError::Type {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Opaque application data handed to every handler.
///
/// The router core never inspects or locks it; the stored type decides its
/// own concurrency discipline (e.g. a `DashMap` or a connection pool).
#[derive(Clone)]
pub struct AppData(Arc<dyn Any + Send + Sync>);

impl AppData {
    pub fn new<T: Any + Send + Sync>(data: T) -> Self {
        Self(Arc::new(data))
    }

    pub fn from_arc<T: Any + Send + Sync>(data: Arc<T>) -> Self {
        Self(data)
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for AppData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppData(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_key_is_an_error() {
        let ctx = RequestContext::new(RequestId::new());
        assert_eq!(
            ctx.get("user_id"),
            Err(ContextError::Missing {
                key: "user_id".into()
            })
        );
    }

    #[test]
    fn test_set_then_get_as() {
        let mut ctx = RequestContext::new(RequestId::new());
        ctx.set("user_id", 7);
        ctx.set("user", json!({"name": "ada"}));
        assert_eq!(ctx.get_as::<i64>("user_id").unwrap(), 7);
        assert_eq!(ctx.get("user").unwrap()["name"], "ada");
        assert!(matches!(
            ctx.get_as::<String>("user_id"),
            Err(ContextError::Type { .. })
        ));
    }

    #[test]
    fn test_app_data_downcast() {
        let data = AppData::new(41_u32);
        assert_eq!(data.downcast_ref::<u32>(), Some(&41));
        assert!(data.downcast_ref::<String>().is_none());
    }
}
