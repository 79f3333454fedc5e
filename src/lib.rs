//! # trace-weave
//!
//! Load-time trace instrumentation weaving for third-party database driver classes.
//!
//! This crate implements the descriptor side of a tracing agent: given a class
//! the tracer does not own (a driver's prepared-statement wrapper, say), it
//! decides which methods get which interceptor, shares one interceptor
//! instance across a whole overload family, declares hidden per-instance state
//! fields for interceptors to stash context in, and guards interceptors
//! against re-firing when an instrumented call internally re-enters another
//! instrumented call. The actual binary rewriting is delegated to a pluggable
//! backend.
//!
//! ## Features
//!
//! - **Fail-soft weaving**: a method absent on the installed driver version is
//!   a recorded diagnostic, not an error; a class that cannot be woven is left
//!   untouched and the host keeps loading
//! - **Overload families**: structurally different setters with one semantic
//!   role share a single interceptor slot and its captured state
//! - **Synthetic per-instance fields**: instance-scoped context carriers with
//!   generated accessors and per-instance initializers
//! - **Reentrancy scopes**: before/after logic fires exactly once per
//!   outermost entry, with per-thread depth tracking
//! - **Pluggable backend**: bring your own rewriting machinery behind the
//!   [`RewriteBackend`] trait, or use the in-memory proxy backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trace_weave::prelude::*;
//!
//! let backend = MemoryBackend::new().with_class(reflected_shape);
//! let mut weaver = Weaver::new(backend, WeaveConfig::default());
//! weaver.register(Box::new(PreparedStatementModifier::new(
//!     "oracle.jdbc.driver.OraclePreparedStatementWrapper",
//!     execute_interceptors,
//!     bind_interceptor,
//! )));
//!
//! // Called by the host for every newly-observed class.
//! match weaver.transform("oracle.jdbc.driver.OraclePreparedStatementWrapper") {
//!     WeaveOutcome::Woven(class) => install(class),
//!     WeaveOutcome::Unchanged => {}
//! }
//! ```
//!
//! ## Error handling
//!
//! | Error | Scope of the abort |
//! |-------|--------------------|
//! | [`WeaveError::MethodNotFound`] | one method binding; recorded as a miss |
//! | [`WeaveError::FieldCollision`] | one synthetic field |
//! | [`WeaveError::Emit`] | the whole pass for that class |
//! | [`WeaveError::SlotReference`] | the whole pass; configuration bug |
//!
//! Whatever aborts, [`Weaver::transform`] itself never fails: an aborted pass
//! returns [`WeaveOutcome::Unchanged`] and the original class stays in place.

mod backend;
mod class;
mod config;
mod error;
mod field;
mod interceptor;
mod method;
mod modifier;
mod runtime;
mod scope;
mod statement;
mod table;

pub use backend::{ClassShape, MemoryBackend, RewriteBackend};
pub use class::InstrumentClass;
pub use config::WeaveConfig;
pub use error::{Result, WeaveError};
pub use field::{Initializer, SlotValue, StateField};
pub use interceptor::{ArgValue, CallOutcome, Interceptor, Invocation};
pub use method::{MethodKey, MethodSignature, OperationSpec};
pub use modifier::{bind_family, Modifier, WeaveOutcome, Weaver};
pub use runtime::{InstanceState, WovenClass};
pub use scope::{guarded, Guarded, Scope};
pub use statement::{
    bind_variable_set_methods, BindValueMap, InterceptorFactory, PreparedStatementModifier,
    BIND_VALUE_FIELD, DATABASE_INFO_FIELD, JDBC_SCOPE, SQL_FIELD,
};
pub use table::{AttachmentTable, SlotId};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ArgValue, CallOutcome, ClassShape, InstanceState, Interceptor, Invocation, MemoryBackend,
        MethodKey, MethodSignature, Modifier, OperationSpec, PreparedStatementModifier, Scope,
        StateField, WeaveConfig, WeaveOutcome, Weaver, WovenClass,
    };
}
