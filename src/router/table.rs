//! Per-router route table.
//!
//! Entries are kept in registration order and resolved linearly; the first
//! entry whose pattern and method both match wins.

use http::Method;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use super::pattern::{PathParams, PathPattern, PatternError};
use super::route::{Handler, Route};

/// Errors raised while registering a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The pattern failed to compile
    Pattern(PatternError),
    /// Another route with the same method and shape is already registered
    Conflict {
        method: Method,
        pattern: String,
        existing: String,
    },
    /// Declared handler parameters differ from the pattern's placeholders
    ParamMismatch {
        pattern: String,
        declared: Vec<String>,
        actual: Vec<String>,
    },
    /// A mount prefix may only contain literal segments
    InvalidPrefix { prefix: String },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Pattern(e) => write!(f, "{e}"),
            RouteError::Conflict {
                method,
                pattern,
                existing,
            } => write!(
                f,
                "{method} {pattern} conflicts with already registered {method} {existing}"
            ),
            RouteError::ParamMismatch {
                pattern,
                declared,
                actual,
            } => write!(
                f,
                "route '{pattern}' declares parameters {declared:?} but the pattern captures {actual:?}"
            ),
            RouteError::InvalidPrefix { prefix } => {
                write!(f, "router prefix '{prefix}' must be a static path")
            }
        }
    }
}

impl std::error::Error for RouteError {}

impl From<PatternError> for RouteError {
    fn from(e: PatternError) -> Self {
        RouteError::Pattern(e)
    }
}

/// A registered route with its compiled pattern.
#[derive(Clone)]
pub struct RouteEntry {
    pub method: Method,
    pub pattern: PathPattern,
    pub handler: Arc<dyn Handler>,
    pub requires: Arc<[String]>,
    pub name: Option<String>,
    shape: String,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("requires", &self.requires)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A successful lookup.
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub params: PathParams,
}

/// Outcome of resolving a request against one table.
pub enum Resolution<'a> {
    Matched(RouteMatch<'a>),
    /// Some pattern matched the path, but under other methods
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

#[derive(Default, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and append `route`, mounted under `prefix`.
    ///
    /// # Errors
    ///
    /// Fails when the pattern does not compile, when declared parameters
    /// disagree with the pattern, or when the method and shape are taken.
    pub fn register(&mut self, route: Route, prefix: &PathPattern) -> Result<(), RouteError> {
        let own = PathPattern::parse(&route.pattern)?;

        if let Some(declared) = &route.declared_params {
            let declared_set: BTreeSet<&str> = declared.iter().map(String::as_str).collect();
            let actual_set: BTreeSet<&str> = own.param_names().collect();
            if declared_set != actual_set || declared_set.len() != declared.len() {
                return Err(RouteError::ParamMismatch {
                    pattern: route.pattern.clone(),
                    declared: declared.clone(),
                    actual: own.param_names().map(str::to_string).collect(),
                });
            }
        }

        let pattern = own.prefixed(prefix);
        let shape = pattern.shape();

        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.method == route.method && e.shape == shape)
        {
            return Err(RouteError::Conflict {
                method: route.method,
                pattern: pattern.as_str().to_string(),
                existing: existing.pattern.as_str().to_string(),
            });
        }

        info!(
            method = %route.method,
            pattern = %pattern,
            shape = %shape,
            "Registered route"
        );

        self.entries.push(RouteEntry {
            method: route.method,
            pattern,
            handler: route.handler,
            requires: route.requires.into(),
            name: route.name,
            shape,
        });
        Ok(())
    }

    /// Resolve `path` for `method`.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let mut allowed: Vec<Method> = Vec::new();
        for entry in &self.entries {
            let Some(params) = entry.pattern.matches(path) else {
                continue;
            };
            if entry.method == *method {
                return Resolution::Matched(RouteMatch { entry, params });
            }
            if !allowed.contains(&entry.method) {
                allowed.push(entry.method.clone());
            }
        }
        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
