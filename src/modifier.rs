//! Orchestration: modifiers and the weaver entry point.
//!
//! A [`Modifier`] declares everything to change about one target class. The
//! [`Weaver`] is what the instrumentation host calls with each newly-observed
//! class name: it runs the registered modifier, hands the populated
//! descriptor to the backend, and fails soft. A class that cannot be woven is
//! simply left unchanged; instrumentation problems must never stop the host
//! application from loading.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::RewriteBackend;
use crate::class::InstrumentClass;
use crate::config::WeaveConfig;
use crate::error::Result;
use crate::interceptor::Interceptor;
use crate::method::MethodKey;
use crate::runtime::WovenClass;
use crate::table::SlotId;

/// Declares the instrumentation of one target class.
pub trait Modifier: Send + Sync {
    /// Fully-qualified name of the class this modifier targets.
    fn target_class(&self) -> &str;

    /// Populate the per-pass descriptor. Returning an error aborts the pass
    /// for this class; nothing is committed.
    fn modify(&self, class: &mut InstrumentClass, config: &WeaveConfig) -> Result<()>;
}

/// Result of offering one class to the weaver.
#[derive(Debug)]
pub enum WeaveOutcome {
    /// The class was targeted and successfully rewoven.
    Woven(WovenClass),
    /// The class is not targeted, or its pass aborted and it was left as-is.
    Unchanged,
}

impl WeaveOutcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, WeaveOutcome::Unchanged)
    }

    pub fn woven(self) -> Option<WovenClass> {
        match self {
            WeaveOutcome::Woven(class) => Some(class),
            WeaveOutcome::Unchanged => None,
        }
    }
}

/// The engine's entry point, owning the backend and the registered modifiers.
pub struct Weaver<B: RewriteBackend> {
    backend: B,
    config: WeaveConfig,
    modifiers: HashMap<String, Box<dyn Modifier>>,
}

impl<B: RewriteBackend> Weaver<B> {
    pub fn new(backend: B, config: WeaveConfig) -> Self {
        Self {
            backend,
            config,
            modifiers: HashMap::new(),
        }
    }

    /// Register a modifier under its target class name.
    pub fn register(&mut self, modifier: Box<dyn Modifier>) {
        self.modifiers
            .insert(modifier.target_class().to_string(), modifier);
    }

    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// Class names this weaver would modify.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.modifiers.keys().map(String::as_str)
    }

    /// Offer a newly-observed class to the engine.
    ///
    /// Any failure inside the pass is logged and swallowed; the caller gets
    /// [`WeaveOutcome::Unchanged`] and keeps the original class.
    pub fn transform(&self, class_name: &str) -> WeaveOutcome {
        let Some(modifier) = self.modifiers.get(class_name) else {
            return WeaveOutcome::Unchanged;
        };

        tracing::info!(class = class_name, "weaving");

        match self.run_pass(modifier.as_ref(), class_name) {
            Ok(woven) => {
                tracing::info!(
                    class = class_name,
                    bindings = woven.binding_count(),
                    fields = woven.fields().len(),
                    misses = woven.misses().len(),
                    "weave complete"
                );
                WeaveOutcome::Woven(woven)
            }
            Err(e) => {
                tracing::warn!(class = class_name, error = %e, "weave failed, class left unchanged");
                WeaveOutcome::Unchanged
            }
        }
    }

    fn run_pass(&self, modifier: &dyn Modifier, class_name: &str) -> Result<WovenClass> {
        let shape = self.backend.get_class(class_name)?;
        let mut class = InstrumentClass::new(shape);
        modifier.modify(&mut class, &self.config)?;
        self.backend.emit(class)
    }
}

/// Bind a declared overload family to one shared interceptor slot.
///
/// The first key present on the class gets a fresh slot; every later present
/// key reuses it, so the whole family shares one interceptor instance.
/// Absent keys are recorded as misses and skipped: a driver release exposing
/// only part of the family is expected, not an error. Returns the shared
/// slot, or `None` when no key in the family resolved.
pub fn bind_family(
    class: &mut InstrumentClass,
    family: &[MethodKey],
    interceptor: Arc<dyn Interceptor>,
) -> Result<Option<SlotId>> {
    let mut shared: Option<SlotId> = None;
    for key in family {
        let bound = match shared {
            None => class
                .add_interceptor(key, interceptor.clone())
                .map(|slot| {
                    shared = Some(slot);
                }),
            Some(slot) => class.reuse_interceptor(key, slot),
        };
        match bound {
            Ok(()) => {}
            Err(e) if e.is_resolution_miss() => class.record_miss(key.clone()),
            Err(e) => return Err(e),
        }
    }
    Ok(shared)
}
