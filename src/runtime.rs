//! Post-emit artifacts: the woven class description and per-instance state.
//!
//! Rust cannot append fields to a foreign type, so the synthetic fields a
//! backend would inject are modeled as an out-of-band side table: the host
//! owns one [`InstanceState`] per target instance and passes it to
//! [`WovenClass::invoke`] around every instrumented call. Two instances never
//! observe each other's values because they never share an `InstanceState`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::field::{SlotValue, StateField};
use crate::interceptor::{ArgValue, CallOutcome, Invocation};
use crate::method::MethodKey;
use crate::table::{AttachmentTable, SlotId};

/// The modified-type description produced by a completed pass: which methods
/// are intercepted by which slots, and which synthetic fields exist.
pub struct WovenClass {
    target: String,
    fields: Vec<StateField>,
    table: AttachmentTable,
}

impl WovenClass {
    pub(crate) fn new(target: String, fields: Vec<StateField>, table: AttachmentTable) -> Self {
        Self {
            target,
            fields,
            table,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn fields(&self) -> &[StateField] {
        &self.fields
    }

    /// Slot bound to `key`, if the method was instrumented.
    pub fn slot_of(&self, key: &MethodKey) -> Option<SlotId> {
        self.table.slot_of(key)
    }

    /// Methods declared for instrumentation but absent on the installed
    /// driver version.
    pub fn misses(&self) -> &[MethodKey] {
        self.table.misses()
    }

    pub fn binding_count(&self) -> usize {
        self.table.binding_count()
    }

    /// Build the synthetic-field state for one new target instance. Field
    /// initializers run here, once per instance, so no two instances ever
    /// share an initialized value.
    pub fn new_state(&self) -> InstanceState {
        InstanceState::for_fields(&self.fields)
    }

    /// Dispatch one call through its interceptor, if any.
    ///
    /// The after-phase runs on both paths, so a guarded interceptor's depth
    /// counter always returns to zero even when `body` fails.
    pub fn invoke<R, E, F>(
        &self,
        state: &InstanceState,
        key: &MethodKey,
        args: &[ArgValue],
        body: F,
    ) -> std::result::Result<R, E>
    where
        E: fmt::Display,
        F: FnOnce() -> std::result::Result<R, E>,
    {
        let Some(interceptor) = self.table.interceptor_for(key) else {
            return body();
        };

        let call = Invocation {
            class: &self.target,
            method: key,
            args,
            state,
        };

        interceptor.before(&call);
        let result = body();
        let outcome = match &result {
            Ok(_) => CallOutcome::Returned,
            Err(e) => CallOutcome::Failed(e.to_string()),
        };
        interceptor.after(&call, &outcome);
        result
    }
}

impl fmt::Debug for WovenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WovenClass")
            .field("target", &self.target)
            .field("fields", &self.fields)
            .field("table", &self.table)
            .finish()
    }
}

/// Synthetic fields of one target instance.
///
/// This is the stable surface interceptor authors read and write. Slots exist
/// only for declared fields; a getter on a never-set, uninitialized field
/// yields `None`, matching an injected field that is still null.
pub struct InstanceState {
    slots: Mutex<HashMap<String, Option<SlotValue>>>,
}

impl InstanceState {
    /// State with no declared fields. Useful for tests and for classes that
    /// only intercept methods.
    pub fn empty() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn for_fields(fields: &[StateField]) -> Self {
        let slots = fields
            .iter()
            .map(|field| (field.name().to_string(), field.initial_value()))
            .collect();
        Self {
            slots: Mutex::new(slots),
        }
    }

    /// Set a field. Returns `false` when no such field was declared, in
    /// which case nothing is stored.
    pub fn set<T: Any + Send>(&self, field: &str, value: T) -> bool {
        let mut slots = self.slots.lock().expect("state lock poisoned");
        match slots.get_mut(field) {
            Some(slot) => {
                *slot = Some(Box::new(value));
                true
            }
            None => {
                tracing::debug!(field, "set on undeclared synthetic field ignored");
                false
            }
        }
    }

    /// Clone the current value of a field.
    pub fn get<T: Any + Clone>(&self, field: &str) -> Option<T> {
        let slots = self.slots.lock().expect("state lock poisoned");
        slots
            .get(field)
            .and_then(|slot| slot.as_ref())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Mutate a field's current value in place. Returns `None` when the
    /// field is undeclared, unset, or holds a different type.
    pub fn update<T, R, F>(&self, field: &str, f: F) -> Option<R>
    where
        T: Any + Send,
        F: FnOnce(&mut T) -> R,
    {
        let mut slots = self.slots.lock().expect("state lock poisoned");
        slots
            .get_mut(field)
            .and_then(|slot| slot.as_mut())
            .and_then(|value| value.downcast_mut::<T>())
            .map(f)
    }

    /// Whether the field currently holds a value.
    pub fn is_set(&self, field: &str) -> bool {
        let slots = self.slots.lock().expect("state lock poisoned");
        slots.get(field).map(Option::is_some).unwrap_or(false)
    }
}

impl fmt::Debug for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock().expect("state lock poisoned");
        let mut set: Vec<&String> = slots
            .iter()
            .filter(|(_, v)| v.is_some())
            .map(|(k, _)| k)
            .collect();
        set.sort();
        f.debug_struct("InstanceState").field("set", &set).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sql_field() -> StateField {
        StateField::new("__sql", "__setSql", "__getSql", "java.lang.Object")
    }

    fn bind_field() -> StateField {
        StateField::new(
            "__bindValue",
            "__setBindValue",
            "__getBindValue",
            "java.util.Map",
        )
        .with_initializer(HashMap::<u32, String>::new)
    }

    #[test]
    fn test_getter_is_empty_until_first_set() {
        let state = InstanceState::for_fields(&[sql_field()]);
        assert!(!state.is_set("__sql"));
        assert_eq!(state.get::<String>("__sql"), None);

        assert!(state.set("__sql", "SELECT 1 FROM dual".to_string()));
        assert_eq!(
            state.get::<String>("__sql"),
            Some("SELECT 1 FROM dual".to_string())
        );
    }

    #[test]
    fn test_initializer_seeds_each_instance_separately() {
        let fields = [bind_field()];
        let first = InstanceState::for_fields(&fields);
        let second = InstanceState::for_fields(&fields);

        first.update("__bindValue", |map: &mut HashMap<u32, String>| {
            map.insert(1, "42".to_string());
        });

        assert_eq!(
            first.get::<HashMap<u32, String>>("__bindValue").unwrap().len(),
            1
        );
        assert!(second
            .get::<HashMap<u32, String>>("__bindValue")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_undeclared_field_is_ignored() {
        let state = InstanceState::for_fields(&[sql_field()]);
        assert!(!state.set("__databaseInfo", "x".to_string()));
        assert_eq!(state.get::<String>("__databaseInfo"), None);
    }

    #[test]
    fn test_wrong_type_reads_as_none() {
        let state = InstanceState::for_fields(&[sql_field()]);
        state.set("__sql", "SELECT 1".to_string());
        assert_eq!(state.get::<i64>("__sql"), None);
    }

    #[test]
    fn test_failing_body_still_closes_guarded_scope() {
        use crate::interceptor::Interceptor;
        use crate::scope::{guarded, Scope};
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        #[derive(Default)]
        struct Counting {
            befores: AtomicU32,
            afters: AtomicU32,
            failures: AtomicU32,
        }

        impl Interceptor for Counting {
            fn before(&self, _call: &Invocation<'_>) {
                self.befores.fetch_add(1, Ordering::SeqCst);
            }

            fn after(&self, _call: &Invocation<'_>, outcome: &CallOutcome) {
                self.afters.fetch_add(1, Ordering::SeqCst);
                if outcome.is_err() {
                    self.failures.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let scope = Scope::named("scope-invoke-failure");
        let counts = Arc::new(Counting::default());

        let execute = MethodKey::nullary("execute");
        let execute_query = MethodKey::nullary("executeQuery");
        let mut table = AttachmentTable::new();
        table
            .bind("test.Stmt", execute.clone(), guarded(scope.clone(), counts.clone()))
            .unwrap();
        table
            .bind(
                "test.Stmt",
                execute_query.clone(),
                guarded(scope.clone(), counts.clone()),
            )
            .unwrap();
        let woven = WovenClass::new("test.Stmt".to_string(), Vec::new(), table);

        // The driver's execute delegates to executeQuery, which fails; the
        // error propagates through both instrumented frames.
        let state = woven.new_state();
        let result: std::result::Result<(), String> = woven.invoke(&state, &execute, &[], || {
            woven.invoke(&state, &execute_query, &[], || {
                Err("ORA-00942: table or view does not exist".to_string())
            })
        });

        assert!(result.is_err());
        assert_eq!(scope.depth(), 0);
        assert_eq!(counts.befores.load(Ordering::SeqCst), 1);
        assert_eq!(counts.afters.load(Ordering::SeqCst), 1);
        assert_eq!(counts.failures.load(Ordering::SeqCst), 1);
    }
}
