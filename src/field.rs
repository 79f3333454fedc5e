//! Synthetic trace-field declarations.
//!
//! A [`StateField`] describes one hidden per-instance slot added to a target
//! class so interceptors can stash context (the SQL text, accumulated bind
//! values) across calls on the same instance. The declaration carries the
//! accessor names a rewrite backend would generate and, optionally, an
//! initializer that produces a fresh value for every instance.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Boxed value stored in a synthetic field slot.
pub type SlotValue = Box<dyn Any + Send>;

/// Factory run once per target instance to seed a field slot.
pub type Initializer = Arc<dyn Fn() -> SlotValue + Send + Sync>;

/// Declaration of one synthetic per-instance field.
#[derive(Clone)]
pub struct StateField {
    name: String,
    setter: String,
    getter: String,
    value_type: String,
    initializer: Option<Initializer>,
}

impl StateField {
    /// Declare a field with explicit accessor names and a semantic value
    /// type. The slot reads as empty until an interceptor first sets it.
    pub fn new(
        name: impl Into<String>,
        setter: impl Into<String>,
        getter: impl Into<String>,
        value_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            setter: setter.into(),
            getter: getter.into(),
            value_type: value_type.into(),
            initializer: None,
        }
    }

    /// Attach an initializer. The factory runs once per target instance, so
    /// every instance observes its own value; sharing one map across pooled
    /// connections would corrupt captured state.
    pub fn with_initializer<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(move || Box::new(factory()) as SlotValue));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn setter(&self) -> &str {
        &self.setter
    }

    pub fn getter(&self) -> &str {
        &self.getter
    }

    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    /// Run the initializer, if any, producing this instance's seed value.
    pub(crate) fn initial_value(&self) -> Option<SlotValue> {
        self.initializer.as_ref().map(|factory| factory())
    }

    /// Accessor names this field would add to the class, for collision
    /// checks against existing members.
    pub(crate) fn member_names(&self) -> [&str; 3] {
        [&self.name, &self.setter, &self.getter]
    }
}

impl fmt::Debug for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateField")
            .field("name", &self.name)
            .field("setter", &self.setter)
            .field("getter", &self.getter)
            .field("value_type", &self.value_type)
            .field("has_initializer", &self.initializer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_uninitialized_field_has_no_seed() {
        let field = StateField::new("__sql", "__setSql", "__getSql", "java.lang.Object");
        assert!(field.initial_value().is_none());
    }

    #[test]
    fn test_initializer_yields_distinct_instances() {
        let field = StateField::new("__bindValue", "__setBindValue", "__getBindValue", "java.util.Map")
            .with_initializer(HashMap::<u32, String>::new);

        let mut first = field.initial_value().unwrap();
        let second = field.initial_value().unwrap();

        let first_map = first.downcast_mut::<HashMap<u32, String>>().unwrap();
        first_map.insert(1, "abc".to_string());

        let second_map = second.downcast_ref::<HashMap<u32, String>>().unwrap();
        assert!(second_map.is_empty());
    }

    #[test]
    fn test_member_names_cover_all_accessors() {
        let field = StateField::new("__sql", "__setSql", "__getSql", "java.lang.Object");
        assert_eq!(field.member_names(), ["__sql", "__setSql", "__getSql"]);
    }
}
