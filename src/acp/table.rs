//! Per-role method tables.
//!
//! A [`MethodTable`] maps a method name to a route that validates the raw
//! params against the method's [`Params`] type and then calls the typed
//! handler. [`RoleDispatcher`] pairs a table with the role implementation and
//! is what gets installed on the [`Connection`](crate::rpc::Connection).

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::acp::schema::Params;
use crate::rpc::connection::{HandlerFuture, MessageHandler};
use crate::rpc::error::RequestError;

type Route<R> = Box<dyn Fn(Arc<R>, Value) -> HandlerFuture + Send + Sync>;

/// Static method-name → route mapping for one role.
pub struct MethodTable<R> {
    routes: BTreeMap<&'static str, Route<R>>,
}

impl<R: Send + Sync + 'static> MethodTable<R> {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }

    /// Register a typed route for `method`.
    ///
    /// Params are validated into `P` before `handler` runs; a validation
    /// failure becomes `Invalid params` without invoking the handler. The
    /// handler's output is serialized as the result.
    #[must_use]
    pub fn route<P, T, F, Fut>(mut self, method: &'static str, handler: F) -> Self
    where
        P: Params + Send + 'static,
        T: Serialize,
        F: Fn(Arc<R>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        let route: Route<R> = Box::new(move |role: Arc<R>, raw: Value| -> HandlerFuture {
            match validate::<P>(raw) {
                Err(err) => Box::pin(async move { Err(err) }),
                Ok(params) => {
                    let fut = handler(role, params);
                    Box::pin(async move {
                        let output = fut.await?;
                        serde_json::to_value(output).map_err(|e| {
                            RequestError::internal_error(Some(format!(
                                "failed to serialise result: {e}"
                            )))
                        })
                    })
                }
            }
        });
        self.routes.insert(method, route);
        self
    }

    /// Whether `method` has a route.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.routes.contains_key(method)
    }

    /// Registered method names in sorted order.
    pub fn methods(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.keys().copied()
    }

    fn call(&self, role: Arc<R>, method: &str, params: Value) -> HandlerFuture {
        match self.routes.get(method) {
            Some(route) => route(role, params),
            None => {
                debug!(method, "acp dispatch: method not found");
                let err = RequestError::method_not_found(Some(method.to_owned()));
                Box::pin(async move { Err(err) })
            }
        }
    }
}

impl<R: Send + Sync + 'static> Default for MethodTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// A role implementation bound to its method table.
pub struct RoleDispatcher<R> {
    role: Arc<R>,
    table: MethodTable<R>,
}

impl<R: Send + Sync + 'static> RoleDispatcher<R> {
    /// Bind `role` to `table`.
    #[must_use]
    pub fn new(role: Arc<R>, table: MethodTable<R>) -> Self {
        Self { role, table }
    }

    /// The bound table.
    #[must_use]
    pub fn table(&self) -> &MethodTable<R> {
        &self.table
    }
}

impl<R: Send + Sync + 'static> MessageHandler for RoleDispatcher<R> {
    fn handle(&self, method: &str, params: Value) -> HandlerFuture {
        self.table.call(Arc::clone(&self.role), method, params)
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

/// Validate raw params into `P`.
///
/// All missing required fields are reported together. The details string is
/// a pretty-printed error tree: `_errors` at the root holds object-level
/// problems, and each failing field gets its own `{ "_errors": [...] }`.
///
/// # Errors
///
/// Returns `Invalid params` describing every violation found.
pub fn validate<P: Params>(params: Value) -> Result<P, RequestError> {
    let Value::Object(fields) = &params else {
        return Err(invalid_params(
            vec![format!("Expected object, received {}", json_kind(&params))],
            Map::new(),
        ));
    };

    let mut missing = Map::new();
    for name in P::REQUIRED {
        if fields.get(*name).map_or(true, Value::is_null) {
            missing.insert((*name).to_owned(), json!({ "_errors": ["Required"] }));
        }
    }
    if !missing.is_empty() {
        return Err(invalid_params(Vec::new(), missing));
    }

    serde_json::from_value(params).map_err(|e| invalid_params(vec![e.to_string()], Map::new()))
}

fn invalid_params(root: Vec<String>, mut fields: Map<String, Value>) -> RequestError {
    fields.insert("_errors".into(), json!(root));
    let details = serde_json::to_string_pretty(&Value::Object(fields))
        .unwrap_or_else(|_| "invalid params".to_owned());
    RequestError::invalid_params(Some(details))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
