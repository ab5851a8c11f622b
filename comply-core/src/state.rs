//! Per-client state: the only mutable shared resource in the harness.
//!
//! Each client identity observes an isolated [`ClientState`]. The store is
//! partitioned by identity, so calls from different clients never contend;
//! concurrent calls from the same client serialize their read-modify-write
//! on that client's record. Entries are created lazily and never evicted —
//! the harness runs short, bounded test sessions.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

/// Initial value of the mutable special-number resource.
pub const INITIAL_SPECIAL_NUMBER: i64 = 42;

/// Files present in every fresh per-client virtual filesystem.
pub const SEED_FILES: &[(&str, &str)] = &[
    ("/readme.txt", "Initial readme content"),
    ("/watched.txt", "Initial watched content"),
    ("/test/static.txt", "Static test file content"),
];

/// Mutable state observed by exactly one client identity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientState {
    /// Gates the trigonometric tools; off until the client enables it.
    pub trig_allowed: bool,
    /// Value served by the special-number resource.
    pub special_number: i64,
    /// Isolated virtual filesystem, keyed by absolute path.
    pub files: BTreeMap<String, String>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            trig_allowed: false,
            special_number: INITIAL_SPECIAL_NUMBER,
            files: SEED_FILES
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
        }
    }
}

/// Identity-keyed store of [`ClientState`] records.
#[derive(Debug, Default)]
pub struct StateStore {
    clients: Mutex<HashMap<String, Arc<Mutex<ClientState>>>>,
}

impl StateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state record for `client_id`, creating a fresh default
    /// record on first reference. Idempotent: the same identity always maps
    /// to the same record.
    pub fn get_or_create(&self, client_id: &str) -> Arc<Mutex<ClientState>> {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            clients
                .entry(client_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(ClientState::default()))),
        )
    }

    /// Runs `f` with exclusive access to `client_id`'s state.
    ///
    /// The per-client lock is held only for the duration of `f`; callers must
    /// not block inside it.
    pub fn with_state<R>(&self, client_id: &str, f: impl FnOnce(&mut ClientState) -> R) -> R {
        let state = self.get_or_create(client_id);
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Number of client identities seen so far.
    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether any client identity has been seen.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
