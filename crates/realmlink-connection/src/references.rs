//! The keyed-reference table.
//!
//! Exported functions, imported proxies and pending calls are reachable
//! only through random keys. Function entries live until the connection
//! closes; a pending entry is removed when its return arrives.

use std::collections::HashMap;

use rand::Rng;
use realmlink_codec::{CallResult, Function};
use tokio::sync::oneshot;

const KEY_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Fresh unforgeable key: 128 random bits in base 36.
pub fn new_key() -> String {
    let mut n: u128 = rand::thread_rng().gen();
    let mut digits = Vec::with_capacity(25);
    loop {
        digits.push(KEY_ALPHABET[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Sender half of a call waiting for its return.
pub(crate) type PendingCall = oneshot::Sender<CallResult>;

enum Reference {
    Function(Function),
    Pending(PendingCall),
}

#[derive(Default)]
pub(crate) struct ReferenceTable {
    references: HashMap<String, Reference>,
    // Function identity to key. Entries in `references` keep the functions
    // alive, so an identity cannot be reused while it is mapped here.
    function_keys: HashMap<usize, String>,
    closed: bool,
}

impl ReferenceTable {
    /// Key for a local function, assigned on first export.
    pub fn export(&mut self, function: &Function) -> String {
        if let Some(key) = self.function_keys.get(&function.identity()) {
            return key.clone();
        }
        let key = new_key();
        if !self.closed {
            self.function_keys.insert(function.identity(), key.clone());
            self.references
                .insert(key.clone(), Reference::Function(function.clone()));
        }
        key
    }

    /// Function stored under `key`, exported or imported.
    pub fn function(&self, key: &str) -> Option<Function> {
        match self.references.get(key) {
            Some(Reference::Function(function)) => Some(function.clone()),
            _ => None,
        }
    }

    /// Function for `key`, building and remembering a proxy the first time.
    pub fn import(&mut self, key: &str, make_proxy: impl FnOnce() -> Function) -> Function {
        if let Some(function) = self.function(key) {
            return function;
        }
        let proxy = make_proxy();
        if !self.closed && !self.references.contains_key(key) {
            self.function_keys.insert(proxy.identity(), key.to_string());
            self.references
                .insert(key.to_string(), Reference::Function(proxy.clone()));
        }
        proxy
    }

    /// Register a pending call. Hands the sender back if the table is closed.
    pub fn insert_pending(&mut self, key: String, call: PendingCall) -> Result<(), PendingCall> {
        if self.closed {
            return Err(call);
        }
        self.references.insert(key, Reference::Pending(call));
        Ok(())
    }

    /// Remove and return the pending call under `key`.
    pub fn take_pending(&mut self, key: &str) -> Option<PendingCall> {
        match self.references.remove(key) {
            Some(Reference::Pending(call)) => Some(call),
            Some(other) => {
                self.references.insert(key.to_string(), other);
                None
            }
            None => None,
        }
    }

    /// Drop every entry and return the calls still waiting.
    pub fn close(&mut self) -> Vec<PendingCall> {
        self.closed = true;
        self.function_keys.clear();
        self.references
            .drain()
            .filter_map(|(_, reference)| match reference {
                Reference::Pending(call) => Some(call),
                Reference::Function(_) => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pending_len(&self) -> usize {
        self.references
            .values()
            .filter(|reference| matches!(reference, Reference::Pending(_)))
            .count()
    }

    pub fn function_len(&self) -> usize {
        self.references.len() - self.pending_len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use realmlink_codec::Value;

    use super::*;

    fn noop() -> Function {
        Function::from_fn(0, |_| Ok(Value::Undefined))
    }

    #[test]
    fn keys_are_base36_and_distinct() {
        let keys: HashSet<String> = (0..1000).map(|_| new_key()).collect();
        assert_eq!(keys.len(), 1000);
        for key in &keys {
            assert!(key.len() <= 25);
            assert!(key.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
        }
    }

    #[test]
    fn export_is_stable_per_function() {
        let mut table = ReferenceTable::default();
        let f = noop();
        let g = noop();

        let first = table.export(&f);
        assert_eq!(table.export(&f.clone()), first);
        assert_ne!(table.export(&g), first);
        assert!(table.function(&first).unwrap().ptr_eq(&f));
        assert_eq!(table.function_len(), 2);
    }

    #[test]
    fn import_reuses_proxy() {
        let mut table = ReferenceTable::default();
        let first = table.import("k", noop);
        let second = table.import("k", || panic!("proxy built twice"));
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn pending_is_one_shot() {
        let mut table = ReferenceTable::default();
        let (tx, _rx) = oneshot::channel();
        table.insert_pending("r".to_string(), tx).unwrap();
        assert_eq!(table.pending_len(), 1);

        assert!(table.take_pending("r").is_some());
        assert!(table.take_pending("r").is_none());
    }

    #[test]
    fn take_pending_leaves_functions_alone() {
        let mut table = ReferenceTable::default();
        let key = table.export(&noop());
        assert!(table.take_pending(&key).is_none());
        assert!(table.function(&key).is_some());
    }

    #[tokio::test]
    async fn close_hands_back_pending_calls() {
        let mut table = ReferenceTable::default();
        table.export(&noop());
        let (tx, rx) = oneshot::channel();
        table.insert_pending("r".to_string(), tx).unwrap();

        let pending = table.close();
        assert_eq!(pending.len(), 1);
        assert_eq!(table.function_len(), 0);
        assert!(table.is_closed());

        for call in pending {
            let _ = call.send(Err(Value::from("closed")));
        }
        assert_eq!(rx.await.unwrap(), Err(Value::from("closed")));

        let (tx, _rx) = oneshot::channel();
        assert!(table.insert_pending("late".to_string(), tx).is_err());
    }
}
