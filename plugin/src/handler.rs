//! Method handlers and per-service method tables.

use async_trait::async_trait;
use errors::ServiceError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A single RPC method.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, params: Value) -> Result<Value, ServiceError>;
}

/// Named handlers belonging to one service.
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: BTreeMap<String, Arc<dyn Handler>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `handler` under `name`, replacing any previous entry.
    pub fn with(mut self, name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.methods.insert(name.into(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Handler>> {
        self.methods.get(name)
    }

    /// Method names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.methods.keys()).finish()
    }
}

/// Decodes request parameters into `P`.
///
/// Absent parameters arrive as `null`; when `P` rejects `null` they are
/// retried as an empty object so requests whose fields are all optional can
/// omit them entirely.
pub fn decode_params<P: DeserializeOwned>(params: Value) -> Result<P, ServiceError> {
    if params.is_null() {
        if let Ok(p) = serde_json::from_value(Value::Null) {
            return Ok(p);
        }
        return serde_json::from_value(Value::Object(serde_json::Map::new()))
            .map_err(|e| ServiceError::invalid_request(format!("invalid parameters: {e}")));
    }
    serde_json::from_value(params)
        .map_err(|e| ServiceError::invalid_request(format!("invalid parameters: {e}")))
}

struct Typed<F, P, R> {
    f: F,
    _types: PhantomData<fn(P) -> R>,
}

#[async_trait]
impl<F, Fut, P, R> Handler for Typed<F, P, R>
where
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, ServiceError>> + Send,
    P: DeserializeOwned + Send,
    R: Serialize + Send,
{
    async fn call(&self, params: Value) -> Result<Value, ServiceError> {
        let request: P = decode_params(params)?;
        let reply = (self.f)(request).await?;
        serde_json::to_value(reply).map_err(|e| ServiceError::internal("encoding reply", e))
    }
}

/// Wraps an async function over typed parameters and results as a
/// [`Handler`].
///
/// # M-CANONICAL-DOCS
///
/// ## Usage
/// ```rust,no_run
/// use errors::ServiceError;
/// use plugin::{MethodTable, handler};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Greet {
///     name: String,
/// }
///
/// let table = MethodTable::new().with(
///     "Greet",
///     handler::typed(|req: Greet| async move {
///         Ok::<_, ServiceError>(format!("hello, {}", req.name))
///     }),
/// );
/// ```
pub fn typed<F, Fut, P, R>(f: F) -> Arc<dyn Handler>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ServiceError>> + Send + 'static,
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
{
    Arc::new(Typed {
        f,
        _types: PhantomData,
    })
}

struct NoParams<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, R> Handler for NoParams<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, ServiceError>> + Send,
    R: Serialize + Send,
{
    async fn call(&self, params: Value) -> Result<Value, ServiceError> {
        match &params {
            Value::Null => {}
            Value::Object(m) if m.is_empty() => {}
            Value::Array(a) if a.is_empty() => {}
            _ => {
                return Err(ServiceError::invalid_request(
                    "method does not take parameters",
                ));
            }
        }
        let reply = (self.f)().await?;
        serde_json::to_value(reply).map_err(|e| ServiceError::internal("encoding reply", e))
    }
}

/// Wraps an async function that takes no parameters. Accepts absent,
/// empty-object and empty-array parameters.
pub fn no_params<F, Fut, R>(f: F) -> Arc<dyn Handler>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ServiceError>> + Send + 'static,
    R: Serialize + Send + 'static,
{
    Arc::new(NoParams { f })
}
