//! Basic example showing how to weave a driver's prepared-statement wrapper.
//!
//! Run with: cargo run --example basic

use std::sync::Arc;

use trace_weave::prelude::*;
use trace_weave::{BindValueMap, BIND_VALUE_FIELD};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs the outer boundary of every execute call.
struct ExecuteLogger;

impl Interceptor for ExecuteLogger {
    fn before(&self, call: &Invocation<'_>) {
        tracing::info!(class = call.class, method = %call.method, "execute entered");
    }

    fn after(&self, call: &Invocation<'_>, outcome: &CallOutcome) {
        let bound_values = call
            .state
            .get::<BindValueMap>(BIND_VALUE_FIELD)
            .map(|map| map.len())
            .unwrap_or(0);
        tracing::info!(
            method = %call.method,
            failed = outcome.is_err(),
            bound_values,
            "execute left"
        );
    }
}

/// Accumulates bound parameters into the instance's bind-value map.
struct BindLogger;

impl Interceptor for BindLogger {
    fn before(&self, call: &Invocation<'_>) {
        if let [ArgValue::Int(position), value] = call.args {
            let position = *position as u32;
            let rendered = value.to_string();
            call.state.update(BIND_VALUE_FIELD, |map: &mut BindValueMap| {
                map.bind(position, rendered);
            });
        }
    }

    fn after(&self, _call: &Invocation<'_>, _outcome: &CallOutcome) {}
}

fn main() {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,trace_weave=trace".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // The reflected shape of the class we are targeting. A real host would
    // obtain this from its rewrite backend; note the missing setLong, which
    // this driver version does not expose.
    let target = "oracle.jdbc.driver.OraclePreparedStatementWrapper";
    let shape = ClassShape::new(target)
        .with_method(MethodSignature::new("execute", Vec::<&str>::new(), "boolean"))
        .with_method(MethodSignature::new(
            "executeQuery",
            Vec::<&str>::new(),
            "java.sql.ResultSet",
        ))
        .with_method(MethodSignature::new("setInt", ["int", "int"], "void"))
        .with_method(MethodSignature::new(
            "setString",
            ["int", "java.lang.String"],
            "void",
        ));

    let mut weaver = Weaver::new(
        MemoryBackend::new().with_class(shape),
        WeaveConfig::development(),
    );
    weaver.register(Box::new(PreparedStatementModifier::new(
        target,
        Arc::new(|| -> Arc<dyn Interceptor> { Arc::new(ExecuteLogger) }),
        Arc::new(BindLogger),
    )));

    let woven = match weaver.transform(target) {
        WeaveOutcome::Woven(class) => class,
        WeaveOutcome::Unchanged => {
            tracing::warn!("target was not woven");
            return;
        }
    };

    // One state per statement instance; two statements never share values.
    let statement = woven.new_state();

    let set_int = MethodKey::new("setInt", ["int", "int"]);
    let set_string = MethodKey::new("setString", ["int", "java.lang.String"]);
    let execute = MethodKey::nullary("execute");
    let execute_query = MethodKey::nullary("executeQuery");

    woven
        .invoke(
            &statement,
            &set_int,
            &[ArgValue::Int(1), ArgValue::Int(42)],
            || Ok::<(), String>(()),
        )
        .ok();
    woven
        .invoke(
            &statement,
            &set_string,
            &[ArgValue::Int(2), ArgValue::Text("scott".into())],
            || Ok::<(), String>(()),
        )
        .ok();

    // The driver's execute delegates to its own executeQuery internally;
    // the shared JDBC scope makes sure only the outer boundary is logged.
    woven
        .invoke(&statement, &execute, &[], || {
            woven.invoke(&statement, &execute_query, &[], || Ok::<(), String>(()))
        })
        .ok();
}
