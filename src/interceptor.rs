//! The interceptor contract.
//!
//! An interceptor observes entry and exit of an instrumented method without
//! altering its behavior. Concrete recording logic (what gets written to a
//! trace) lives with the caller; this module only fixes the shape of the
//! observation.

use std::fmt;

use crate::method::MethodKey;
use crate::runtime::InstanceState;

/// A runtime argument value, rendered into the small vocabulary a trace
/// recorder can store. Bind-variable setters feed these through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Large binary arguments are recorded by length only.
    Blob(usize),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Null => write!(f, "null"),
            ArgValue::Bool(v) => write!(f, "{v}"),
            ArgValue::Int(v) => write!(f, "{v}"),
            ArgValue::Float(v) => write!(f, "{v}"),
            ArgValue::Text(v) => write!(f, "{v}"),
            ArgValue::Blob(len) => write!(f, "<blob:{len}b>"),
        }
    }
}

/// How an instrumented call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Returned,
    Failed(String),
}

impl CallOutcome {
    pub fn is_err(&self) -> bool {
        matches!(self, CallOutcome::Failed(_))
    }
}

/// Everything an interceptor may observe about one call.
pub struct Invocation<'a> {
    /// Fully-qualified name of the instrumented class.
    pub class: &'a str,
    /// The concrete method being entered or left.
    pub method: &'a MethodKey,
    /// Rendered argument values, in declaration order.
    pub args: &'a [ArgValue],
    /// The target instance's synthetic fields.
    pub state: &'a InstanceState,
}

/// Entry/exit hook around an instrumented method.
///
/// `after` runs on both the success and the error path; implementations must
/// not assume a matching return value exists. Interceptors are shared across
/// threads and across every overload they are bound to, so any state beyond
/// the per-instance [`InstanceState`] must be internally synchronized.
pub trait Interceptor: Send + Sync {
    fn before(&self, call: &Invocation<'_>);
    fn after(&self, call: &Invocation<'_>, outcome: &CallOutcome);
}
