use std::time::Duration;

use realmlink_codec::{inspect, ErrorValue, Function, Object, Value};
use realmlink_connection::{Connection, ConnectionConfig};
use realmlink_transport::realm_pair;

use crate::cmd::{parse_duration, DemoArgs};
use crate::exit::{connection_error, io_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_calls, CallRecord, OutputFormat};

const HOST_ORIGIN: &str = "realm://host";
const GUEST_ORIGIN: &str = "realm://guest";

pub fn run(args: DemoArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;

    let calls = runtime.block_on(exchange(args.a, args.b, timeout))?;
    print_calls(&calls, format);

    if calls.iter().any(|call| call.outcome == "timeout") {
        return Ok(FAILURE);
    }
    Ok(SUCCESS)
}

fn host_exports() -> Value {
    let add = Function::from_fn(2, |args| {
        let a = args.first().and_then(Value::as_f64).unwrap_or(f64::NAN);
        let b = args.get(1).and_then(Value::as_f64).unwrap_or(f64::NAN);
        Ok(Value::from(a + b))
    });
    let divide = Function::from_fn(2, |args| {
        let a = args.first().and_then(Value::as_f64).unwrap_or(f64::NAN);
        let b = args.get(1).and_then(Value::as_f64).unwrap_or(f64::NAN);
        if b == 0.0 {
            return Err(Value::error(
                ErrorValue::new("division by zero").with("dividend", a),
            ));
        }
        Ok(Value::from(a / b))
    });
    let describe = Function::from_fn(1, |args| {
        let value = args.into_iter().next().unwrap_or(Value::Undefined);
        Ok(Value::string(format!("{} {}", value.kind(), inspect(&value))))
    });

    Value::object(
        Object::new()
            .with("name", "host")
            .with("add", add)
            .with("divide", divide)
            .with("describe", describe),
    )
}

async fn exchange(a: f64, b: f64, timeout: Duration) -> CliResult<Vec<CallRecord>> {
    let (host_port, guest_port) = realm_pair(HOST_ORIGIN, GUEST_ORIGIN);
    let (host_in, host_out) = host_port.split();
    let (guest_in, guest_out) = guest_port.split();
    let config = ConnectionConfig::default()
        .with_handshake_timeout(timeout)
        .with_call_timeout(timeout);

    let host = Connection::builder(host_in, host_out, GUEST_ORIGIN)
        .exports(host_exports())
        .config(config.clone())
        .open();
    let guest = Connection::builder(guest_in, guest_out, HOST_ORIGIN)
        .config(config)
        .open();
    let (host, guest) = tokio::join!(host, guest);
    let host = host.map_err(|err| connection_error("host handshake failed", err))?;
    let guest = guest.map_err(|err| connection_error("guest handshake failed", err))?;
    tracing::info!(imports = %inspect(guest.imports()), "guest connected");

    let sample = Value::map([(Value::from("answer"), Value::from(42))]);
    let plan = [
        ("add", vec![Value::from(a), Value::from(b)]),
        ("divide", vec![Value::from(a), Value::from(b)]),
        ("describe", vec![sample]),
    ];

    let mut calls = Vec::with_capacity(plan.len());
    for (name, args) in plan {
        let function = guest
            .imports()
            .get(name)
            .and_then(Value::as_function)
            .cloned()
            .ok_or_else(|| CliError::new(FAILURE, format!("host does not export {name}")))?;
        let rendered = args.iter().map(inspect).collect::<Vec<_>>().join(", ");
        let (outcome, result) = match function.call(args).await {
            Ok(value) => ("ok", inspect(&value)),
            Err(reason) if is_timeout(&reason) => ("timeout", inspect(&reason)),
            Err(reason) => ("error", inspect(&reason)),
        };
        calls.push(CallRecord {
            function: name.to_string(),
            args: rendered,
            outcome,
            result,
        });
    }

    guest.close();
    host.close();
    Ok(calls)
}

fn is_timeout(reason: &Value) -> bool {
    reason
        .as_error()
        .is_some_and(|error| error.message().contains("timed out"))
}
