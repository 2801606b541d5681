//! Route descriptors and the handler contract.

use crate::context::{AppData, ContextError, RequestContext};
use crate::dispatcher::{IntoResponse, Request, Response};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use super::pattern::PathParams;

/// Failure returned by a handler.
///
/// `BadRequest` is reported to the client as-is; every other variant is
/// logged and masked behind a generic 500.
#[derive(Debug)]
pub enum HandlerError {
    /// A required context value was missing or had the wrong type
    Context(ContextError),
    /// The handler asked for application data that was never configured
    MissingAppData,
    /// The handler asked for a path parameter its pattern does not capture
    UnknownParam(String),
    /// The client sent something unusable (400 with this message)
    BadRequest(String),
    /// Anything else
    Internal(anyhow::Error),
}

impl HandlerError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        HandlerError::BadRequest(message.into())
    }

    /// Status code this failure is reported with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Context(e) => write!(f, "{e}"),
            HandlerError::MissingAppData => f.write_str("application data is not configured"),
            HandlerError::UnknownParam(name) => {
                write!(f, "route pattern has no path parameter '{name}'")
            }
            HandlerError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            HandlerError::Internal(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<ContextError> for HandlerError {
    fn from(e: ContextError) -> Self {
        HandlerError::Context(e)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(e: anyhow::Error) -> Self {
        HandlerError::Internal(e)
    }
}

/// Everything a handler may read for one request.
pub struct HandlerInput<'a> {
    request: &'a Request,
    params: &'a PathParams,
    context: &'a RequestContext,
    app_data: Option<&'a AppData>,
}

impl<'a> HandlerInput<'a> {
    #[must_use]
    pub fn new(
        request: &'a Request,
        params: &'a PathParams,
        context: &'a RequestContext,
        app_data: Option<&'a AppData>,
    ) -> Self {
        Self {
            request,
            params,
            context,
            app_data,
        }
    }

    #[must_use]
    pub fn request(&self) -> &'a Request {
        self.request
    }

    #[must_use]
    pub fn params(&self) -> &'a PathParams {
        self.params
    }

    #[must_use]
    pub fn context(&self) -> &'a RequestContext {
        self.context
    }

    /// A path parameter captured by the route pattern.
    ///
    /// # Errors
    ///
    /// `UnknownParam` when the pattern has no such parameter; that is a
    /// route definition bug and is reported as a 500.
    pub fn param(&self, name: &str) -> Result<&'a str, HandlerError> {
        self.params
            .get(name)
            .ok_or_else(|| HandlerError::UnknownParam(name.to_string()))
    }

    /// A path parameter parsed with `FromStr`.
    ///
    /// # Errors
    ///
    /// `UnknownParam` when the pattern has no such parameter, `BadRequest`
    /// when the value does not parse.
    pub fn param_as<T: FromStr>(&self, name: &str) -> Result<T, HandlerError> {
        let raw = self.param(name)?;
        raw.parse::<T>().map_err(|_| {
            HandlerError::bad_request(format!("path parameter '{name}' has an invalid value"))
        })
    }

    /// A value injected into the request context by middleware.
    ///
    /// # Errors
    ///
    /// `Context` when the key is missing or has a different type.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        Ok(self.context.get_as::<T>(name)?)
    }

    /// The request body decoded as JSON.
    ///
    /// # Errors
    ///
    /// `BadRequest` when the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        self.request
            .json::<T>()
            .map_err(|e| HandlerError::bad_request(format!("invalid JSON body: {e}")))
    }

    /// Shared application data of type `T`.
    ///
    /// # Errors
    ///
    /// `MissingAppData` when none is configured or it has another type.
    pub fn app_data<T: Any>(&self) -> Result<&'a T, HandlerError> {
        self.app_data
            .and_then(AppData::downcast_ref::<T>)
            .ok_or(HandlerError::MissingAppData)
    }
}

/// The terminal callable of a route.
pub trait Handler: Send + Sync {
    fn call(&self, input: &HandlerInput<'_>) -> Result<Response, HandlerError>;
}

/// Adapter turning a closure or fn item into a [`Handler`].
pub struct FnHandler<F, R> {
    f: F,
    _marker: PhantomData<fn() -> R>,
}

impl<F, R> Handler for FnHandler<F, R>
where
    F: Fn(&HandlerInput<'_>) -> Result<R, HandlerError> + Send + Sync,
    R: IntoResponse,
{
    fn call(&self, input: &HandlerInput<'_>) -> Result<Response, HandlerError> {
        (self.f)(input).map(IntoResponse::into_response)
    }
}

/// Wrap a closure as a shareable handler.
pub fn handler_fn<F, R>(f: F) -> Arc<dyn Handler>
where
    F: Fn(&HandlerInput<'_>) -> Result<R, HandlerError> + Send + Sync + 'static,
    R: IntoResponse + 'static,
{
    Arc::new(FnHandler {
        f,
        _marker: PhantomData,
    })
}

/// A route descriptor: method, pattern and handler, plus optional declarations.
///
/// Descriptors are cheap to build; the pattern is compiled when the route is
/// registered on a [`Router`](super::Router).
#[derive(Clone)]
pub struct Route {
    pub(crate) method: Method,
    pub(crate) pattern: String,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) declared_params: Option<Vec<String>>,
    pub(crate) requires: Vec<String>,
    pub(crate) name: Option<String>,
}

impl Route {
    #[must_use]
    pub fn new(method: Method, pattern: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            handler,
            declared_params: None,
            requires: Vec::new(),
            name: None,
        }
    }

    /// Declare the path parameter names the handler expects.
    ///
    /// Registration fails unless this set equals the pattern's parameter set.
    #[must_use]
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared_params = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Declare context keys that must be present before the handler runs.
    #[must_use]
    pub fn requires<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Human-readable name used in logs and route dumps.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("declared_params", &self.declared_params)
            .field("requires", &self.requires)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

macro_rules! method_routes {
    ($($fn_name:ident => $method:ident),+ $(,)?) => {
        $(
            #[doc = concat!("Build a `", stringify!($method), "` route for `pattern`.")]
            pub fn $fn_name<F, R>(pattern: &str, handler: F) -> Route
            where
                F: Fn(&HandlerInput<'_>) -> Result<R, HandlerError> + Send + Sync + 'static,
                R: IntoResponse + 'static,
            {
                Route::new(Method::$method, pattern, handler_fn(handler))
            }
        )+
    };
}

method_routes! {
    get => GET,
    post => POST,
    put => PUT,
    patch => PATCH,
    delete => DELETE,
    head => HEAD,
    options => OPTIONS,
}
