//! Path pattern compilation and matching.
//!
//! A pattern is compiled once at registration into a list of [`Segment`]s.
//! Both placeholder spellings seen in route declarations are accepted and
//! normalised to the same segment kind:
//!
//! - `<name>` and `{name}` capture exactly one path segment
//! - `<*name>` and `{*name}` capture the rest of the path (last segment only)
//!
//! Empty segments are ignored on both sides, so `/users/` and `/users` are the
//! same path. Captured values are returned verbatim; no decoding or type
//! coercion happens here.

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maximum number of path parameters before heap allocation.
/// Most routes have ≤4 path params (e.g., /users/{id}/posts/{post_id}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the compiled pattern
/// (known at startup); values are per-request data copied from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

static PARAM_NAME: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid parameter name regex")
});

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment byte-for-byte
    Literal(String),
    /// Captures one path segment under the given name
    Param(Arc<str>),
    /// Captures the remaining path (joined with `/`) under the given name
    CatchAll(Arc<str>),
}

/// Errors raised while compiling a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Patterns must be absolute
    MissingLeadingSlash { pattern: String },
    /// Placeholder name is empty or not an identifier
    InvalidParamName { pattern: String, name: String },
    /// A placeholder shares its segment with literal text (`file.<ext>`)
    PartialPlaceholder { pattern: String, segment: String },
    /// The same name is captured twice
    DuplicateParam { pattern: String, name: String },
    /// A catch-all is followed by more segments
    CatchAllNotLast { pattern: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::MissingLeadingSlash { pattern } => {
                write!(f, "route pattern '{pattern}' must start with '/'")
            }
            PatternError::InvalidParamName { pattern, name } => {
                write!(f, "route pattern '{pattern}': invalid parameter name '{name}'")
            }
            PatternError::PartialPlaceholder { pattern, segment } => write!(
                f,
                "route pattern '{pattern}': segment '{segment}' mixes a placeholder with literal text"
            ),
            PatternError::DuplicateParam { pattern, name } => {
                write!(f, "route pattern '{pattern}': parameter '{name}' is declared twice")
            }
            PatternError::CatchAllNotLast { pattern } => write!(
                f,
                "route pattern '{pattern}': a catch-all parameter must be the last segment"
            ),
        }
    }
}

impl std::error::Error for PatternError {}

/// Path parameters captured by a successful match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(ParamVec);

impl PathParams {
    #[must_use]
    pub fn new() -> Self {
        Self(ParamVec::new())
    }

    pub fn push(&mut self, name: Arc<str>, value: String) {
        self.0.push((name, value));
    }

    /// Get a parameter by name.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert to a HashMap.
    /// Note: This allocates - use get() in hot paths instead
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern such as `/users/<id>/posts/{post_id}`.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] when the pattern is not absolute, a
    /// placeholder is malformed or repeated, or a catch-all is not last.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash {
                pattern: raw.to_string(),
            });
        }

        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut seen: Vec<&str> = Vec::new();

        for (idx, part) in parts.iter().enumerate() {
            let placeholder = part
                .strip_prefix('<')
                .and_then(|p| p.strip_suffix('>'))
                .or_else(|| part.strip_prefix('{').and_then(|p| p.strip_suffix('}')));

            let Some(inner) = placeholder else {
                if part.contains(['<', '>', '{', '}']) {
                    return Err(PatternError::PartialPlaceholder {
                        pattern: raw.to_string(),
                        segment: (*part).to_string(),
                    });
                }
                segments.push(Segment::Literal((*part).to_string()));
                continue;
            };

            let (catch_all, name) = match inner.strip_prefix('*') {
                Some(name) => (true, name),
                None => (false, inner),
            };

            if !PARAM_NAME.is_match(name) {
                return Err(PatternError::InvalidParamName {
                    pattern: raw.to_string(),
                    name: name.to_string(),
                });
            }
            if seen.contains(&name) {
                return Err(PatternError::DuplicateParam {
                    pattern: raw.to_string(),
                    name: name.to_string(),
                });
            }
            seen.push(name);

            if catch_all {
                if idx + 1 != parts.len() {
                    return Err(PatternError::CatchAllNotLast {
                        pattern: raw.to_string(),
                    });
                }
                segments.push(Segment::CatchAll(Arc::from(name)));
            } else {
                segments.push(Segment::Param(Arc::from(name)));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The empty pattern `/`, matching only the root path.
    #[must_use]
    pub fn root() -> Self {
        Self {
            raw: "/".to_string(),
            segments: Vec::new(),
        }
    }

    /// The pattern as it was declared.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names captured by this pattern, in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(n) | Segment::CatchAll(n) => Some(n.as_ref()),
            Segment::Literal(_) => None,
        })
    }

    /// Canonical form with placeholder names erased, e.g. `/users/{}/posts`.
    ///
    /// Two patterns with the same shape match exactly the same set of paths.
    #[must_use]
    pub fn shape(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::with_capacity(self.raw.len());
        for seg in &self.segments {
            out.push('/');
            match seg {
                Segment::Literal(l) => out.push_str(l),
                Segment::Param(_) => out.push_str("{}"),
                Segment::CatchAll(_) => out.push_str("{*}"),
            }
        }
        out
    }

    /// Prepend literal prefix segments (used for router mount prefixes).
    #[must_use]
    pub fn prefixed(&self, prefix: &PathPattern) -> PathPattern {
        let mut segments = prefix.segments.clone();
        segments.extend(self.segments.iter().cloned());
        let raw = if prefix.segments.is_empty() {
            self.raw.clone()
        } else {
            format!("{}{}", prefix.raw.trim_end_matches('/'), self.raw)
        };
        PathPattern { raw, segments }
    }

    /// `true` when every segment is a literal.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Match a request path, returning the captured parameters.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        let mut params = PathParams::new();

        for seg in &self.segments {
            match seg {
                Segment::Literal(lit) => {
                    if parts.next()? != lit {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.next()?;
                    params.push(Arc::clone(name), value.to_string());
                }
                Segment::CatchAll(name) => {
                    let rest: Vec<&str> = parts.by_ref().collect();
                    if rest.is_empty() {
                        return None;
                    }
                    params.push(Arc::clone(name), rest.join("/"));
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
