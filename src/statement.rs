//! The prepared-statement wrapper modifier.
//!
//! Weaves a driver's prepared-statement wrapper class: the `execute` family
//! is guarded under the shared JDBC scope so a driver-internal `execute` →
//! `executeQuery` delegation is observed once, synthetic fields carry the
//! SQL text and accumulated bind values per instance, and the whole
//! bind-variable setter family shares a single interceptor slot so every
//! overload feeds one per-instance record.
//!
//! Interceptor bodies (what actually gets written to a trace) are supplied
//! by the caller; this module only declares the weaving plan.

use std::collections::HashMap;
use std::sync::Arc;

use crate::class::InstrumentClass;
use crate::config::WeaveConfig;
use crate::error::{Result, WeaveError};
use crate::field::StateField;
use crate::interceptor::Interceptor;
use crate::method::{MethodKey, OperationSpec};
use crate::modifier::{bind_family, Modifier};
use crate::scope::{guarded, Scope};

/// Scope shared by every JDBC-level interceptor in the process.
pub const JDBC_SCOPE: &str = "jdbc";

/// Synthetic field carrying connection metadata.
pub const DATABASE_INFO_FIELD: &str = "__databaseInfo";
/// Synthetic field carrying the statement's SQL text.
pub const SQL_FIELD: &str = "__sql";
/// Synthetic field accumulating bound parameter values by position.
pub const BIND_VALUE_FIELD: &str = "__bindValue";

/// Produces one interceptor instance per intercepted execute method.
pub type InterceptorFactory = Arc<dyn Fn() -> Arc<dyn Interceptor> + Send + Sync>;

/// Per-instance record of bound parameter values, capped at the
/// [`WeaveConfig::max_bind_values`] the modifier was woven with. The cap
/// keeps statements with thousands of placeholders from ballooning trace
/// payloads; the map enforces it so interceptor bodies do not have to.
#[derive(Debug, Clone)]
pub struct BindValueMap {
    limit: usize,
    values: HashMap<u32, String>,
}

impl BindValueMap {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            values: HashMap::new(),
        }
    }

    /// Record one bound value. Rebinding an already-recorded position always
    /// succeeds; a new position past the cap is dropped. Returns whether the
    /// value was kept.
    pub fn bind(&mut self, position: u32, value: String) -> bool {
        if self.values.contains_key(&position) || self.values.len() < self.limit {
            self.values.insert(position, value);
            true
        } else {
            tracing::trace!(position, limit = self.limit, "bind value dropped, cap reached");
            false
        }
    }

    pub fn get(&self, position: u32) -> Option<&str> {
        self.values.get(&position).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The JDBC bind-variable setter family: one logical "a parameter was bound"
/// operation spread over one overload per value type. Driver releases expose
/// varying subsets; absent members resolve to recorded misses.
pub fn bind_variable_set_methods() -> Vec<MethodKey> {
    vec![
        MethodKey::new("setBoolean", ["int", "boolean"]),
        MethodKey::new("setByte", ["int", "byte"]),
        MethodKey::new("setShort", ["int", "short"]),
        MethodKey::new("setInt", ["int", "int"]),
        MethodKey::new("setLong", ["int", "long"]),
        MethodKey::new("setFloat", ["int", "float"]),
        MethodKey::new("setDouble", ["int", "double"]),
        MethodKey::new("setBigDecimal", ["int", "java.math.BigDecimal"]),
        MethodKey::new("setString", ["int", "java.lang.String"]),
        MethodKey::new("setBytes", ["int", "byte[]"]),
        MethodKey::new("setDate", ["int", "java.sql.Date"]),
        MethodKey::new("setTime", ["int", "java.sql.Time"]),
        MethodKey::new("setTimestamp", ["int", "java.sql.Timestamp"]),
        MethodKey::new("setObject", ["int", "java.lang.Object"]),
        MethodKey::new("setNull", ["int", "int"]),
    ]
}

/// Modifier for one driver's prepared-statement wrapper class.
pub struct PreparedStatementModifier {
    target: String,
    execute_interceptors: InterceptorFactory,
    bind_interceptor: Arc<dyn Interceptor>,
}

impl PreparedStatementModifier {
    /// `execute_interceptors` is called once per intercepted execute method;
    /// `bind_interceptor` is the single instance shared by the whole
    /// bind-variable setter family.
    pub fn new(
        target: impl Into<String>,
        execute_interceptors: InterceptorFactory,
        bind_interceptor: Arc<dyn Interceptor>,
    ) -> Self {
        Self {
            target: target.into(),
            execute_interceptors,
            bind_interceptor,
        }
    }

    fn inject_field(&self, class: &mut InstrumentClass, field: StateField) -> Result<()> {
        match class.add_synthetic_field(field) {
            Ok(()) => Ok(()),
            Err(WeaveError::FieldCollision { class: name, member }) => {
                tracing::debug!(class = name, member, "synthetic field collides, skipping this field");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl Modifier for PreparedStatementModifier {
    fn target_class(&self) -> &str {
        &self.target
    }

    fn modify(&self, class: &mut InstrumentClass, config: &WeaveConfig) -> Result<()> {
        let scope = Scope::named(JDBC_SCOPE);

        for name in ["execute", "executeQuery", "executeUpdate"] {
            let resolved = class.resolve(&OperationSpec::named(name));
            if resolved.is_empty() {
                class.record_miss(MethodKey::nullary(name));
                continue;
            }
            for key in resolved {
                let interceptor = guarded(scope.clone(), (self.execute_interceptors)());
                class.add_interceptor(&key, interceptor)?;
            }
        }

        self.inject_field(
            class,
            StateField::new(
                DATABASE_INFO_FIELD,
                "__setDatabaseInfo",
                "__getDatabaseInfo",
                "java.lang.Object",
            ),
        )?;
        if config.capture_statements {
            self.inject_field(
                class,
                StateField::new(SQL_FIELD, "__setSql", "__getSql", "java.lang.Object"),
            )?;
        }

        if config.capture_bind_values {
            let cap = config.max_bind_values;
            self.inject_field(
                class,
                StateField::new(
                    BIND_VALUE_FIELD,
                    "__setBindValue",
                    "__getBindValue",
                    "java.util.Map",
                )
                .with_initializer(move || BindValueMap::new(cap)),
            )?;

            let interceptor = guarded(scope.clone(), self.bind_interceptor.clone());
            bind_family(class, &bind_variable_set_methods(), interceptor)?;
        }

        Ok(())
    }
}
