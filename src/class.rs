//! The per-pass class descriptor.
//!
//! Exactly one [`InstrumentClass`] is live per modification pass. It combines
//! the reflected [`ClassShape`] with the attachment table and the synthetic
//! fields declared so far, and enforces the per-operation error contract:
//! absent methods fail with a recoverable miss, accessor collisions reject a
//! single field, and slot misuse is fatal.

use std::sync::Arc;

use crate::backend::ClassShape;
use crate::error::{Result, WeaveError};
use crate::field::StateField;
use crate::interceptor::Interceptor;
use crate::method::{MethodKey, OperationSpec};
use crate::runtime::WovenClass;
use crate::table::{AttachmentTable, SlotId};

pub struct InstrumentClass {
    shape: ClassShape,
    table: AttachmentTable,
    fields: Vec<StateField>,
}

impl InstrumentClass {
    pub fn new(shape: ClassShape) -> Self {
        Self {
            shape,
            table: AttachmentTable::new(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.shape.name()
    }

    pub fn shape(&self) -> &ClassShape {
        &self.shape
    }

    /// Resolve an operation spec against this class's reflected methods.
    pub fn resolve(&self, spec: &OperationSpec) -> Vec<MethodKey> {
        spec.resolve(self.shape.methods())
    }

    /// Bind a fresh interceptor slot to one concrete method.
    ///
    /// Fails with [`WeaveError::MethodNotFound`] when the installed driver
    /// version lacks the method; callers record the miss and continue.
    pub fn add_interceptor(
        &mut self,
        key: &MethodKey,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<SlotId> {
        if !self.shape.has_method(key) {
            return Err(self.method_not_found(key));
        }
        self.table.bind(self.shape.name(), key.clone(), interceptor)
    }

    /// Point another method at an existing slot so both overloads share one
    /// interceptor instance.
    pub fn reuse_interceptor(&mut self, key: &MethodKey, slot: SlotId) -> Result<()> {
        if !self.shape.has_method(key) {
            return Err(self.method_not_found(key));
        }
        self.table.bind_reuse(self.shape.name(), key.clone(), slot)
    }

    /// Declare a synthetic per-instance field.
    ///
    /// Rejected with [`WeaveError::FieldCollision`] when the field or either
    /// accessor name already exists on the class or was declared by an
    /// earlier injection; the rest of the pass is unaffected.
    pub fn add_synthetic_field(&mut self, field: StateField) -> Result<()> {
        for member in field.member_names() {
            if self.shape.has_member(member) || self.declares(member) {
                return Err(WeaveError::FieldCollision {
                    class: self.shape.name().to_string(),
                    member: member.to_string(),
                });
            }
        }
        self.fields.push(field);
        Ok(())
    }

    /// Record that a declared method is absent on this version.
    pub fn record_miss(&mut self, key: MethodKey) {
        self.table.record_miss(key);
    }

    pub fn table(&self) -> &AttachmentTable {
        &self.table
    }

    pub fn fields(&self) -> &[StateField] {
        &self.fields
    }

    pub(crate) fn into_woven(self) -> WovenClass {
        WovenClass::new(self.shape.name().to_string(), self.fields, self.table)
    }

    fn declares(&self, member: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.member_names().contains(&member))
    }

    fn method_not_found(&self, key: &MethodKey) -> WeaveError {
        WeaveError::MethodNotFound {
            class: self.shape.name().to_string(),
            key: key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ClassShape;
    use crate::interceptor::{CallOutcome, Invocation};
    use crate::method::MethodSignature;

    struct Noop;

    impl Interceptor for Noop {
        fn before(&self, _call: &Invocation<'_>) {}
        fn after(&self, _call: &Invocation<'_>, _outcome: &CallOutcome) {}
    }

    fn statement_class() -> InstrumentClass {
        InstrumentClass::new(
            ClassShape::new("test.PreparedStatement")
                .with_method(MethodSignature::new("execute", Vec::<&str>::new(), "boolean"))
                .with_method(MethodSignature::new("setInt", ["int", "int"], "void"))
                .with_member("__getSql"),
        )
    }

    #[test]
    fn test_absent_method_is_a_miss_error() {
        let mut class = statement_class();
        let err = class
            .add_interceptor(&MethodKey::new("setLong", ["int", "long"]), Arc::new(Noop))
            .unwrap_err();
        assert!(err.is_resolution_miss());
        assert_eq!(class.table().binding_count(), 0);
    }

    #[test]
    fn test_present_method_binds() {
        let mut class = statement_class();
        let slot = class
            .add_interceptor(&MethodKey::nullary("execute"), Arc::new(Noop))
            .unwrap();
        assert_eq!(class.table().slot_of(&MethodKey::nullary("execute")), Some(slot));
    }

    #[test]
    fn test_field_collision_with_existing_member() {
        let mut class = statement_class();
        let err = class
            .add_synthetic_field(StateField::new(
                "__sql",
                "__setSql",
                "__getSql",
                "java.lang.Object",
            ))
            .unwrap_err();
        assert!(matches!(err, WeaveError::FieldCollision { member, .. } if member == "__getSql"));
        assert!(class.fields().is_empty());
    }

    #[test]
    fn test_field_collision_with_earlier_injection() {
        let mut class = statement_class();
        class
            .add_synthetic_field(StateField::new(
                "__databaseInfo",
                "__setDatabaseInfo",
                "__getDatabaseInfo",
                "java.lang.Object",
            ))
            .unwrap();
        let err = class
            .add_synthetic_field(StateField::new(
                "__databaseInfo",
                "__setDbInfo",
                "__getDbInfo",
                "java.lang.Object",
            ))
            .unwrap_err();
        assert!(matches!(err, WeaveError::FieldCollision { .. }));
        assert_eq!(class.fields().len(), 1);
    }
}
