use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_core::future::BoxFuture;

use crate::value::Value;

/// Outcome of a call: the returned value, or the thrown reason.
pub type CallResult = Result<Value, Value>;

/// Future returned by every function call.
pub type CallFuture = BoxFuture<'static, CallResult>;

type Body = dyn Fn(Vec<Value>) -> CallFuture + Send + Sync;

/// A callable value with a declared arity.
///
/// Every call is asynchronous. Local functions and proxies for remote
/// functions share this type, so imports can be passed around and
/// compared like any other value.
#[derive(Clone)]
pub struct Function {
    inner: Arc<FunctionInner>,
}

struct FunctionInner {
    arity: usize,
    body: Box<Body>,
}

impl Function {
    /// Wrap an async body.
    pub fn new<F, Fut>(arity: usize, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallResult> + Send + 'static,
    {
        Self {
            inner: Arc::new(FunctionInner {
                arity,
                body: Box::new(move |args| Box::pin(body(args))),
            }),
        }
    }

    /// Wrap a body that completes immediately.
    pub fn from_fn<F>(arity: usize, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> CallResult + Send + Sync + 'static,
    {
        Self::new(arity, move |args| std::future::ready(body(args)))
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.inner.arity
    }

    pub fn call(&self, args: Vec<Value>) -> CallFuture {
        (self.inner.body)(args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Address of the shared body. Stable while any clone is alive.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[function/{}]", self.inner.arity)
    }
}
