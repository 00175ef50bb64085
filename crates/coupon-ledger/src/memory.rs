use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{btree_map, BTreeMap};
use std::iter::Peekable;
use std::ops::Bound;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cursor::Cursor;
use crate::error::LedgerError;
use crate::traits::{HistoryIter, KeyModification, KeyValue, LedgerStub, StateIter, TxTimestamp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct VersionedValue {
    value: Vec<u8>,
    /// Height of the commit that last wrote the key.
    version: u64,
}

/// Committed world state plus the change history of every key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    height: u64,
    entries: BTreeMap<String, VersionedValue>,
    history: BTreeMap<String, Vec<KeyModification>>,
}

impl LedgerSnapshot {
    /// Number of commits applied so far.
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry.value.as_slice()))
    }

    pub fn history_for(&self, key: &str) -> &[KeyModification] {
        self.history.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn version(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.version)
    }

    fn versions_in<'a>(
        &'a self,
        start: &'a str,
        end: &'a str,
    ) -> impl Iterator<Item = (&'a str, u64)> + 'a {
        bounded(&self.entries, start, end).map(|(key, entry)| (key.as_str(), entry.version))
    }
}

/// `[start, end)` over a string-keyed map; empty when `start >= end`.
fn bounded<'a, 'k, V>(
    map: &'a BTreeMap<String, V>,
    start: &'k str,
    end: &'k str,
) -> btree_map::Range<'a, String, V> {
    let end = if end < start { start } else { end };
    map.range::<str, _>((Bound::Included(start), Bound::Excluded(end)))
}

/// Result of a successful commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_id: String,
    pub height: u64,
    pub writes: usize,
}

/// In-memory ledger host for tests, the CLI, and embedding.
///
/// Every invocation runs in a [`Transaction`] over the snapshot taken when
/// it began. At commit the transaction's point reads and range reads are
/// re-checked against the live state; any change made by a transaction
/// that committed in between rejects the commit with
/// [`LedgerError::Conflict`].
pub struct InMemoryLedger {
    state: RwLock<Arc<LedgerSnapshot>>,
    cursors: Arc<AtomicUsize>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::from_snapshot(LedgerSnapshot::default())
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: RwLock::new(Arc::new(snapshot)),
            cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Copy of the committed state.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        Ok(self.current("snapshot")?.as_ref().clone())
    }

    /// Begin a transaction stamped with the current wall-clock time.
    pub fn begin(&self) -> Result<Transaction<'_>, LedgerError> {
        self.begin_at(TxTimestamp::now())
    }

    pub fn begin_at(&self, timestamp: TxTimestamp) -> Result<Transaction<'_>, LedgerError> {
        let snapshot = self.current("begin")?;
        let tx_id = uuid::Uuid::now_v7().simple().to_string();
        debug!(tx_id = %tx_id, height = snapshot.height, "transaction started");
        Ok(Transaction {
            ledger: self,
            tx_id,
            timestamp,
            snapshot,
            writes: BTreeMap::new(),
            reads: RefCell::new(BTreeMap::new()),
            ranges: RefCell::new(Vec::new()),
            finished: false,
        })
    }

    /// Committed value of `key`, outside any transaction.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let state = self.current("get")?;
        Ok(state.entries.get(key).map(|entry| entry.value.clone()))
    }

    pub fn height(&self) -> Result<u64, LedgerError> {
        Ok(self.current("height")?.height)
    }

    /// Range and history cursors currently held open.
    pub fn open_cursors(&self) -> usize {
        self.cursors.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn current(&self, op: &'static str) -> Result<Arc<LedgerSnapshot>, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|_| LedgerError::io(op, "", "ledger read lock poisoned"))?;
        Ok(Arc::clone(&state))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("open_cursors", &self.open_cursors())
            .finish()
    }
}

/// One invocation's view of the ledger.
///
/// Reads see the snapshot plus this transaction's own staged writes;
/// history only reflects committed changes. Dropping a transaction without
/// calling [`Transaction::commit`] discards every staged write.
pub struct Transaction<'l> {
    ledger: &'l InMemoryLedger,
    tx_id: String,
    timestamp: TxTimestamp,
    snapshot: Arc<LedgerSnapshot>,
    /// `None` stages a delete.
    writes: BTreeMap<String, Option<Vec<u8>>>,
    reads: RefCell<BTreeMap<String, Option<u64>>>,
    ranges: RefCell<Vec<(String, String)>>,
    finished: bool,
}

impl Transaction<'_> {
    /// Number of keys with a staged write.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Validate the read set against the live state and apply all staged
    /// writes as one unit.
    pub fn commit(mut self) -> Result<TxReceipt, LedgerError> {
        let mut guard = self
            .ledger
            .state
            .write()
            .map_err(|_| LedgerError::io("commit", self.tx_id.as_str(), "ledger write lock poisoned"))?;

        self.validate(&guard)?;

        self.snapshot = Arc::default();
        let writes = std::mem::take(&mut self.writes);
        let state = Arc::make_mut(&mut guard);
        state.height += 1;
        let height = state.height;

        for (key, write) in &writes {
            match write {
                Some(value) => {
                    state.entries.insert(
                        key.clone(),
                        VersionedValue {
                            value: value.clone(),
                            version: height,
                        },
                    );
                    state.history.entry(key.clone()).or_default().push(KeyModification {
                        tx_id: self.tx_id.clone(),
                        value: value.clone(),
                        timestamp: self.timestamp,
                        is_delete: false,
                    });
                }
                None => {
                    if state.entries.remove(key).is_some() {
                        state.history.entry(key.clone()).or_default().push(KeyModification {
                            tx_id: self.tx_id.clone(),
                            value: Vec::new(),
                            timestamp: self.timestamp,
                            is_delete: true,
                        });
                    }
                }
            }
        }

        self.finished = true;
        debug!(tx_id = %self.tx_id, height, writes = writes.len(), "transaction committed");
        Ok(TxReceipt {
            tx_id: self.tx_id.clone(),
            height,
            writes: writes.len(),
        })
    }

    fn validate(&self, live: &LedgerSnapshot) -> Result<(), LedgerError> {
        for (key, seen) in self.reads.borrow().iter() {
            if live.version(key) != *seen {
                return Err(LedgerError::Conflict { key: key.clone() });
            }
        }

        for (start, end) in self.ranges.borrow().iter() {
            let mut before = self.snapshot.versions_in(start, end);
            let mut after = live.versions_in(start, end);
            loop {
                match (before.next(), after.next()) {
                    (None, None) => break,
                    (b, a) if b == a => continue,
                    (b, a) => {
                        let key = b.or(a).map(|(k, _)| k.to_string()).unwrap_or_else(|| start.clone());
                        return Err(LedgerError::Conflict { key });
                    }
                }
            }
        }

        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(tx_id = %self.tx_id, "transaction discarded");
        }
    }
}

impl LedgerStub for Transaction<'_> {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn tx_timestamp(&self) -> TxTimestamp {
        self.timestamp
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        if let Some(staged) = self.writes.get(key) {
            return Ok(staged.clone());
        }
        let entry = self.snapshot.entries.get(key);
        self.reads
            .borrow_mut()
            .entry(key.to_string())
            .or_insert(entry.map(|e| e.version));
        Ok(entry.map(|e| e.value.clone()))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::io("put", key, "empty key"));
        }
        self.writes.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::io("delete", key, "empty key"));
        }
        self.writes.insert(key.to_string(), None);
        Ok(())
    }

    fn get_state_by_range(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError> {
        self.ranges
            .borrow_mut()
            .push((start.to_string(), end.to_string()));
        let merged = Merged {
            committed: bounded(&self.snapshot.entries, start, end).peekable(),
            staged: bounded(&self.writes, start, end).peekable(),
        };
        Ok(Box::new(Cursor::open(merged, &self.ledger.cursors)))
    }

    fn get_history_for_key(&self, key: &str) -> Result<HistoryIter<'_>, LedgerError> {
        let changes = self
            .snapshot
            .history_for(key)
            .iter()
            .cloned()
            .map(Ok::<_, LedgerError>);
        Ok(Box::new(Cursor::open(changes, &self.ledger.cursors)))
    }
}

/// Committed entries overlaid with staged writes, in key order.
struct Merged<'a> {
    committed: Peekable<btree_map::Range<'a, String, VersionedValue>>,
    staged: Peekable<btree_map::Range<'a, String, Option<Vec<u8>>>>,
}

impl Iterator for Merged<'_> {
    type Item = Result<KeyValue, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let order = match (self.committed.peek(), self.staged.peek()) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((c, _)), Some((s, _))) => c.cmp(s),
            };

            if order == Ordering::Less {
                let (key, entry) = self.committed.next()?;
                return Some(Ok(KeyValue {
                    key: key.clone(),
                    value: entry.value.clone(),
                }));
            }
            if order == Ordering::Equal {
                self.committed.next();
            }
            if let Some((key, Some(value))) = self.staged.next() {
                return Some(Ok(KeyValue {
                    key: key.clone(),
                    value: value.clone(),
                }));
            }
        }
    }
}
