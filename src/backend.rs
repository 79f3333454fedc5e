//! The rewrite-backend seam.
//!
//! The engine never parses or patches a binary itself. It reflects a class
//! through [`RewriteBackend::get_class`], builds a descriptor-level plan, and
//! asks the backend to materialize it with [`RewriteBackend::emit`]. A real
//! bytecode-patching backend would return rewritten bytes; the in-crate
//! [`MemoryBackend`] is a proxy-style substitute that keeps the woven plan
//! itself as the modified form.

use std::collections::HashMap;

use crate::class::InstrumentClass;
use crate::error::{Result, WeaveError};
use crate::method::MethodSignature;
use crate::runtime::WovenClass;

/// The reflected surface of one target class: every candidate method with
/// its signature, plus the names of all existing members (methods and
/// fields), used for synthetic-field collision checks.
#[derive(Debug, Clone)]
pub struct ClassShape {
    name: String,
    methods: Vec<MethodSignature>,
    members: Vec<String>,
}

impl ClassShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Declare one reflected method. Declaration order is preserved and is
    /// the order resolution reports overloads in.
    pub fn with_method(mut self, sig: MethodSignature) -> Self {
        self.members.push(sig.key.name().to_string());
        self.methods.push(sig);
        self
    }

    /// Declare a non-method member (an existing field or accessor).
    pub fn with_member(mut self, name: impl Into<String>) -> Self {
        self.members.push(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `listCandidateMethods` reflection surface.
    pub fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }

    pub(crate) fn has_method(&self, key: &crate::method::MethodKey) -> bool {
        self.methods.iter().any(|sig| sig.key == *key)
    }
}

/// What the engine asks of the host's rewriting machinery.
pub trait RewriteBackend {
    /// Reflect the named class. Fails with [`WeaveError::ClassNotFound`] when
    /// the backend has no such class.
    fn get_class(&self, name: &str) -> Result<ClassShape>;

    /// Materialize a fully-populated descriptor into the modified class
    /// form. Failure aborts the pass; the class stays untouched.
    fn emit(&self, class: InstrumentClass) -> Result<WovenClass>;
}

/// In-memory backend over statically-declared class shapes.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    classes: HashMap<String, ClassShape>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, shape: ClassShape) -> Self {
        self.register(shape);
        self
    }

    pub fn register(&mut self, shape: ClassShape) {
        self.classes.insert(shape.name().to_string(), shape);
    }
}

impl RewriteBackend for MemoryBackend {
    fn get_class(&self, name: &str) -> Result<ClassShape> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| WeaveError::ClassNotFound {
                class: name.to_string(),
            })
    }

    fn emit(&self, class: InstrumentClass) -> Result<WovenClass> {
        Ok(class.into_woven())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_class_is_reported() {
        let backend = MemoryBackend::new();
        let err = backend.get_class("oracle.jdbc.driver.Missing").unwrap_err();
        assert!(matches!(err, WeaveError::ClassNotFound { .. }));
    }

    #[test]
    fn test_shape_tracks_methods_and_members() {
        let shape = ClassShape::new("test.Stmt")
            .with_method(MethodSignature::new("execute", Vec::<&str>::new(), "boolean"))
            .with_member("connection");

        assert!(shape.has_member("execute"));
        assert!(shape.has_member("connection"));
        assert!(!shape.has_member("__sql"));
        assert_eq!(shape.methods().len(), 1);
    }
}
