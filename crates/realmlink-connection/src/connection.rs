use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;
use realmlink_codec::{
    identity_reviver, inspect, CallResult, Codec, ErrorValue, Function, FunctionBinder, Reviver,
    TypeRegistry, Value,
};
use realmlink_transport::{MessageInput, MessageOutput};
use serde_json::Value as Json;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};
use crate::message::{FunctionApply, FunctionReturn, Message};
use crate::references::{new_key, ReferenceTable};

/// Message carried by the error value a call rejects with once the
/// connection is closed.
pub const CLOSED_MESSAGE: &str = "connection closed";

fn error_value(message: impl Into<String>) -> Value {
    Value::error(ErrorValue::new(message))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// State shared by the connection handle, its listener, proxies and
/// in-flight calls.
struct Shared {
    me: Weak<Shared>,
    codec: Codec,
    output: Box<dyn MessageOutput>,
    output_origin: String,
    reviver: Reviver,
    config: ConnectionConfig,
    table: Mutex<ReferenceTable>,
    errors: broadcast::Sender<Arc<ConnectionError>>,
}

impl Shared {
    fn table(&self) -> MutexGuard<'_, ReferenceTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.table().is_closed()
    }

    fn post(&self, message: &Message) -> Result<()> {
        let bytes = message.to_bytes()?;
        self.post_bytes(message.kind(), bytes)
    }

    fn post_bytes(&self, kind: &str, bytes: Bytes) -> Result<()> {
        debug!(
            kind,
            bytes = bytes.len(),
            destination = %self.output.origin(),
            "posting message"
        );
        self.output.post_message(bytes, &self.output_origin)?;
        Ok(())
    }

    /// Surface an error that has no caller to return to.
    fn report(&self, error: ConnectionError) {
        warn!(error = %error, "connection error");
        // No subscribers is fine: nobody is listening for errors.
        let _ = self.errors.send(Arc::new(error));
    }

    fn decode(&self, code: &Json) -> Result<Value> {
        Ok(self.codec.decode(code, Some(self), self.reviver.as_ref())?)
    }

    fn shutdown(&self) -> bool {
        let pending = {
            let mut table = self.table();
            if table.is_closed() {
                return false;
            }
            table.close()
        };
        debug!(pending = pending.len(), "connection closed");
        for call in pending {
            let _ = call.send(Err(error_value(CLOSED_MESSAGE)));
        }
        true
    }

    fn handle(&self, bytes: &[u8]) -> Result<()> {
        let message = Message::from_slice(bytes)?;
        debug!(kind = message.kind(), bytes = bytes.len(), "received message");
        match message {
            Message::Apply(apply) => self.handle_apply(apply),
            Message::Return(ret) => self.handle_return(ret),
            Message::Value(code) => {
                // Repeated handshake exports land here.
                let value = self.decode(&code)?;
                debug!(value = %inspect(&value), "discarding value message");
                Ok(())
            }
        }
    }

    fn handle_apply(&self, apply: FunctionApply) -> Result<()> {
        let FunctionApply {
            function_key,
            args,
            return_value_key,
        } = apply;

        let prepared = self
            .table()
            .function(&function_key)
            .ok_or(ConnectionError::UnknownFunction(function_key))
            .and_then(|function| Ok((function, self.decode(&args)?)));
        let (function, args) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                // The caller still gets its one return.
                self.send_return(return_value_key, Err(error_value(err.to_string())));
                return Err(err);
            }
        };
        let args = match args {
            Value::Array(items) => items.to_vec(),
            other => vec![other],
        };

        // The call runs in its own task so a panic stays contained. A call
        // in flight must not keep the connection alive, hence the weak handle.
        let me = self.me.clone();
        let call = tokio::spawn(async move { function.call(args).await });
        tokio::spawn(async move {
            let outcome = call.await;
            let Some(shared) = me.upgrade() else {
                return;
            };
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    let message = if err.is_panic() {
                        panic_message(err.into_panic())
                    } else {
                        "call cancelled".to_string()
                    };
                    let error = ConnectionError::FunctionPanicked(message);
                    let reason = error_value(error.to_string());
                    shared.report(error);
                    Err(reason)
                }
            };
            shared.send_return(return_value_key, outcome);
        });
        Ok(())
    }

    fn send_return(&self, return_value_key: String, outcome: CallResult) {
        if self.is_closed() {
            debug!(key = %return_value_key, "dropping return for closed connection");
            return;
        }

        let encoded = match &outcome {
            Ok(value) => self
                .codec
                .encode_without_references(value)
                .map(|code| FunctionReturn::value(&return_value_key, code)),
            Err(reason) => self
                .codec
                .encode_without_references(reason)
                .map(|code| FunctionReturn::reason(&return_value_key, code)),
        };
        let ret = match encoded {
            Ok(ret) => ret,
            Err(err) => {
                let reason = error_value(err.to_string());
                self.report(err.into());
                match self.codec.encode_without_references(&reason) {
                    Ok(code) => FunctionReturn::reason(&return_value_key, code),
                    Err(err) => return self.report(err.into()),
                }
            }
        };

        if let Err(err) = self.post(&Message::Return(ret)) {
            self.report(err);
        }
    }

    fn handle_return(&self, ret: FunctionReturn) -> Result<()> {
        let key = ret.return_value_key.clone();
        let call = self
            .table()
            .take_pending(&key)
            .ok_or_else(|| ConnectionError::UnknownReturn(key.clone()))?;

        let decoded = ret.into_outcome().and_then(|outcome| match outcome {
            Ok(code) => self.decode(&code).map(Ok),
            Err(code) => self.decode(&code).map(Err),
        });
        match decoded {
            Ok(outcome) => {
                if call.send(outcome).is_err() {
                    debug!(key = %key, "caller stopped waiting");
                }
                Ok(())
            }
            Err(err) => {
                // Settle the call so the caller does not wait forever.
                let _ = call.send(Err(error_value(err.to_string())));
                Err(err)
            }
        }
    }

    /// Remove a pending call whose caller gave up.
    fn abandon(&self, return_value_key: &str) {
        self.table().take_pending(return_value_key);
    }
}

impl FunctionBinder for Shared {
    fn export_function(&self, function: &Function) -> String {
        self.table().export(function)
    }

    fn import_function(&self, key: &str, arity: usize) -> Function {
        let me = self.me.clone();
        let function_key = key.to_string();
        self.table()
            .import(key, || proxy(me, function_key, arity))
    }
}

/// Local stand-in for the remote function behind `function_key`.
fn proxy(shared: Weak<Shared>, function_key: String, arity: usize) -> Function {
    Function::new(arity, move |args: Vec<Value>| {
        call_remote(shared.clone(), function_key.clone(), args)
    })
}

async fn call_remote(shared: Weak<Shared>, function_key: String, args: Vec<Value>) -> CallResult {
    let closed = || error_value(CLOSED_MESSAGE);
    let Some(connection) = shared.upgrade() else {
        return Err(closed());
    };

    let args = match connection.codec.encode_without_references(&Value::from(args)) {
        Ok(args) => args,
        Err(err) => {
            let reason = error_value(err.to_string());
            connection.report(err.into());
            return Err(reason);
        }
    };

    let return_value_key = new_key();
    let (tx, rx) = oneshot::channel();
    if connection
        .table()
        .insert_pending(return_value_key.clone(), tx)
        .is_err()
    {
        return Err(closed());
    }

    let apply = Message::Apply(FunctionApply {
        function_key,
        args,
        return_value_key: return_value_key.clone(),
    });
    if let Err(err) = connection.post(&apply) {
        connection.abandon(&return_value_key);
        let reason = error_value(err.to_string());
        connection.report(err);
        return Err(reason);
    }

    let call_timeout = connection.config.call_timeout;
    drop(connection);

    let received = match call_timeout {
        Some(limit) => match tokio::time::timeout(limit, rx).await {
            Ok(received) => received,
            Err(_) => {
                if let Some(connection) = shared.upgrade() {
                    connection.abandon(&return_value_key);
                }
                return Err(error_value(format!("call timed out after {limit:?}")));
            }
        },
        None => rx.await,
    };
    // A dropped sender means the table was torn down.
    received.unwrap_or_else(|_| Err(closed()))
}

async fn listen<I: MessageInput>(shared: Arc<Shared>, mut input: I) {
    while let Some(bytes) = input.recv().await {
        if shared.is_closed() {
            break;
        }
        if let Err(err) = shared.handle(&bytes) {
            shared.report(err);
        }
    }
    if shared.shutdown() {
        debug!("input ended");
    }
}

/// Builder for a [`Connection`].
pub struct ConnectionBuilder<I, O> {
    input: I,
    output: O,
    output_origin: String,
    exports: Value,
    reviver: Reviver,
    registry: Option<Arc<TypeRegistry>>,
    config: ConnectionConfig,
}

impl<I: MessageInput, O: MessageOutput> ConnectionBuilder<I, O> {
    /// Value offered to the remote realm. Defaults to undefined.
    pub fn exports(mut self, exports: impl Into<Value>) -> Self {
        self.exports = exports.into();
        self
    }

    /// Post-decode transform applied to every decoded value.
    pub fn reviver(mut self, reviver: Reviver) -> Self {
        self.reviver = reviver;
        self
    }

    /// Type registry for both directions. Defaults to the standard one.
    pub fn registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the handshake and start listening.
    ///
    /// Resolves once the remote exports have been received and decoded.
    pub async fn open(self) -> Result<Connection> {
        let Self {
            mut input,
            output,
            output_origin,
            exports,
            reviver,
            registry,
            config,
        } = self;

        let codec = registry.map(Codec::new).unwrap_or_default();
        let (errors, _) = broadcast::channel(config.error_capacity.max(1));
        let handshake_timeout = config.handshake_timeout;
        let shared = Arc::new_cyclic(|me| Shared {
            me: me.clone(),
            codec,
            output: Box::new(output),
            output_origin,
            reviver,
            config,
            table: Mutex::new(ReferenceTable::default()),
            errors,
        });

        let code = shared.codec.encode(&exports, Some(shared.as_ref()))?;
        let exports_message = Message::Value(code).to_bytes()?;
        debug!(exports = %inspect(&exports), "posting exports");
        shared.post_bytes("exports", exports_message.clone())?;

        let received = match handshake_timeout {
            Some(limit) => tokio::time::timeout(limit, input.recv())
                .await
                .map_err(|_| ConnectionError::HandshakeTimeout(limit))?,
            None => input.recv().await,
        };
        let bytes = received.ok_or(ConnectionError::HandshakeInterrupted)?;
        let code: Json = serde_json::from_slice(&bytes)?;
        let imports = shared.decode(&code)?;
        debug!(imports = %inspect(&imports), "handshake received");

        // The first post may have gone out before the remote was listening.
        shared.post_bytes("exports", exports_message)?;

        let listener = tokio::spawn(listen(Arc::clone(&shared), input));
        Ok(Connection {
            shared,
            imports,
            listener,
        })
    }
}

/// An open link to another realm.
///
/// Dropping the connection closes it.
pub struct Connection {
    shared: Arc<Shared>,
    imports: Value,
    listener: JoinHandle<()>,
}

impl Connection {
    pub fn builder<I: MessageInput, O: MessageOutput>(
        input: I,
        output: O,
        output_origin: impl Into<String>,
    ) -> ConnectionBuilder<I, O> {
        ConnectionBuilder {
            input,
            output,
            output_origin: output_origin.into(),
            exports: Value::Undefined,
            reviver: identity_reviver(),
            registry: None,
            config: ConnectionConfig::default(),
        }
    }

    /// The remote realm's exports.
    pub fn imports(&self) -> &Value {
        &self.imports
    }

    /// Subscribe to errors raised while handling inbound messages.
    ///
    /// Only errors raised after subscribing are delivered.
    pub fn errors(&self) -> broadcast::Receiver<Arc<ConnectionError>> {
        self.shared.errors.subscribe()
    }

    /// Stop processing inbound messages and reject calls still in flight.
    /// Idempotent.
    pub fn close(&self) {
        self.shared.shutdown();
        self.listener.abort();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Calls made through imported functions still awaiting a return.
    pub fn pending_calls(&self) -> usize {
        self.shared.table().pending_len()
    }

    /// Exported functions and imported proxies held by the table.
    pub fn known_functions(&self) -> usize {
        self.shared.table().function_len()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("output_origin", &self.shared.output_origin)
            .field("imports", &inspect(&self.imports))
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Open a connection with the default reviver, registry and configuration.
pub async fn open<I: MessageInput, O: MessageOutput>(
    exports: impl Into<Value>,
    input: I,
    output: O,
    output_origin: impl Into<String>,
) -> Result<Connection> {
    Connection::builder(input, output, output_origin)
        .exports(exports)
        .open()
        .await
}
