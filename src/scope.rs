//! Reentrancy scopes.
//!
//! A [`Scope`] is a named, process-wide reentrancy boundary. When a guarded
//! operation internally calls another operation guarded under the same scope
//! (a driver's `execute` delegating to its own `executeQuery`), only the
//! outermost boundary should be observed; the inner entry is a transparent
//! pass-through.
//!
//! The depth counter is kept per OS thread via `thread_local!`. The whole
//! dispatch path is synchronous with no suspension points, so thread identity
//! equals call-chain identity. Two threads driving the same logical operation
//! on different instances never suppress each other's before/after firing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::interceptor::{CallOutcome, Interceptor, Invocation};

static NEXT_SCOPE_ID: AtomicUsize = AtomicUsize::new(0);

static REGISTRY: Lazy<Mutex<HashMap<String, Arc<Scope>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

thread_local! {
    static DEPTHS: RefCell<HashMap<usize, u32>> = RefCell::new(HashMap::new());
}

/// A named reentrancy scope. One instance exists per name for the lifetime of
/// the process; every interceptor guarded under the same name coordinates
/// through the same instance.
#[derive(Debug)]
pub struct Scope {
    name: String,
    id: usize,
}

impl Scope {
    /// Fetch or create the scope registered under `name`.
    pub fn named(name: &str) -> Arc<Scope> {
        let mut registry = REGISTRY.lock().expect("scope registry poisoned");
        registry
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Scope {
                    name: name.to_string(),
                    id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
                })
            })
            .clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Increment this thread's depth and return the new value. A return of 1
    /// means this entry crossed the outermost boundary.
    pub fn enter(&self) -> u32 {
        DEPTHS.with(|depths| {
            let mut depths = depths.borrow_mut();
            let depth = depths.entry(self.id).or_insert(0);
            *depth += 1;
            *depth
        })
    }

    /// Decrement this thread's depth and return the new value. A return of
    /// `Some(0)` means the outermost boundary was just left. A leave with no
    /// matching enter returns `None`: the depth stays at zero and the stray
    /// exit is logged rather than wrapping.
    pub fn leave(&self) -> Option<u32> {
        DEPTHS.with(|depths| {
            let mut depths = depths.borrow_mut();
            let depth = depths.entry(self.id).or_insert(0);
            if *depth == 0 {
                tracing::warn!(scope = %self.name, "leave without matching enter");
                return None;
            }
            *depth -= 1;
            Some(*depth)
        })
    }

    /// Current depth on the calling thread.
    pub fn depth(&self) -> u32 {
        DEPTHS.with(|depths| depths.borrow().get(&self.id).copied().unwrap_or(0))
    }
}

/// Wraps an interceptor so its before/after logic fires exactly once per
/// outermost entry into `scope`, no matter how deeply guarded calls nest.
pub struct Guarded {
    scope: Arc<Scope>,
    inner: Arc<dyn Interceptor>,
}

impl Guarded {
    pub fn new(scope: Arc<Scope>, inner: Arc<dyn Interceptor>) -> Self {
        Self { scope, inner }
    }
}

/// Convenience wrapper returning the guarded interceptor as a trait object.
pub fn guarded(scope: Arc<Scope>, inner: Arc<dyn Interceptor>) -> Arc<dyn Interceptor> {
    Arc::new(Guarded::new(scope, inner))
}

impl Interceptor for Guarded {
    fn before(&self, call: &Invocation<'_>) {
        if self.scope.enter() == 1 {
            self.inner.before(call);
        }
    }

    // The decrement is unconditional: the dispatcher invokes `after` on the
    // error path too, so depth always returns to zero. A stray `after` with
    // no matching `before` must not fire the inner after-logic, which is why
    // the already-idle case is distinguished from leaving the boundary.
    fn after(&self, call: &Invocation<'_>, outcome: &CallOutcome) {
        if self.scope.leave() == Some(0) {
            self.inner.after(call, outcome);
        }
    }
}
