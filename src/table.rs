//! The interception attachment table.
//!
//! Maps each resolved [`MethodKey`] to an interceptor slot. A fresh `bind`
//! allocates a slot; `bind_reuse` points another key at an existing slot so a
//! whole overload family shares one interceptor instance and whatever state
//! it accumulates. Methods that could not be resolved on the installed driver
//! version are recorded as misses, not errors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, WeaveError};
use crate::interceptor::Interceptor;
use crate::method::MethodKey;

/// Identifier of one interceptor slot within a single weaving pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-pass table of interceptor bindings for one class.
#[derive(Default)]
pub struct AttachmentTable {
    slots: Vec<Arc<dyn Interceptor>>,
    bindings: HashMap<MethodKey, SlotId>,
    misses: Vec<MethodKey>,
}

impl AttachmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new interceptor slot to `key`.
    pub fn bind(
        &mut self,
        class: &str,
        key: MethodKey,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<SlotId> {
        if self.bindings.contains_key(&key) {
            return Err(WeaveError::DuplicateBinding {
                class: class.to_string(),
                key,
            });
        }
        let slot = SlotId(self.slots.len() as u32);
        self.slots.push(interceptor);
        self.bindings.insert(key, slot);
        Ok(slot)
    }

    /// Bind `key` to a slot produced by an earlier [`bind`](Self::bind) in
    /// this pass. Referencing a slot that was never allocated is a
    /// configuration bug and fatal.
    pub fn bind_reuse(&mut self, class: &str, key: MethodKey, slot: SlotId) -> Result<()> {
        if slot.0 as usize >= self.slots.len() {
            return Err(WeaveError::SlotReference { slot });
        }
        if self.bindings.contains_key(&key) {
            return Err(WeaveError::DuplicateBinding {
                class: class.to_string(),
                key,
            });
        }
        self.bindings.insert(key, slot);
        Ok(())
    }

    /// Record a method that was declared but absent on this driver version.
    pub fn record_miss(&mut self, key: MethodKey) {
        tracing::trace!(method = %key, "declared method absent, skipping binding");
        self.misses.push(key);
    }

    /// The slot bound to `key`, if any.
    pub fn slot_of(&self, key: &MethodKey) -> Option<SlotId> {
        self.bindings.get(key).copied()
    }

    /// The interceptor bound to `key`, if any.
    pub fn interceptor_for(&self, key: &MethodKey) -> Option<&Arc<dyn Interceptor>> {
        self.slot_of(key).map(|slot| &self.slots[slot.0 as usize])
    }

    /// Number of distinct interceptor instances held by this table.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of bound method keys.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn misses(&self) -> &[MethodKey] {
        &self.misses
    }
}

impl fmt::Debug for AttachmentTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentTable")
            .field("slots", &self.slots.len())
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .field("misses", &self.misses)
            .finish()
    }
}
