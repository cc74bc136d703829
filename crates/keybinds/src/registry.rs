//! Binding storage keyed by [`KeyName`].
//!
//! The registry itself is not synchronised; [`crate::Keybinds`] owns it behind
//! a dedicated lock. Every operation is total: unknown handles and keys are
//! no-ops, never errors.

use std::{
    collections::HashMap,
    fmt,
    num::NonZeroU64,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use keyname::{EventKind, KeyName};

/// Handles issued so far across every registry in the process.
static ISSUED: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier for one registered binding.
///
/// Handles start at 1, increase monotonically and are never reused within a
/// process, so a stale handle can never alias a newer binding.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(NonZeroU64);

impl Handle {
    /// Issue a fresh, process-unique handle.
    fn issue() -> Self {
        Self(NonZeroU64::MIN.saturating_add(ISSUED.fetch_add(1, Ordering::Relaxed)))
    }

    /// Recover a handle from its raw boundary form. Zero is never valid.
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// The raw boundary form handed to scripts.
    pub const fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered callback for one key, optionally restricted to one event kind.
pub struct Binding<C> {
    /// Key this binding listens on.
    key: KeyName,
    /// `None` matches every event kind.
    filter: Option<EventKind>,
    /// Script-owned callable; released when the last reference drops.
    callback: C,
    /// Identity used for deregistration.
    handle: Handle,
}

impl<C> Binding<C> {
    /// Key this binding listens on.
    pub fn key(&self) -> KeyName {
        self.key
    }

    /// Event kind filter, if any.
    pub fn filter(&self) -> Option<EventKind> {
        self.filter
    }

    /// Registration handle.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The stored callable.
    pub fn callback(&self) -> &C {
        &self.callback
    }

    /// True if this binding fires for `kind`.
    pub fn matches(&self, kind: EventKind) -> bool {
        self.filter.is_none_or(|f| f == kind)
    }
}

impl<C> fmt::Debug for Binding<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("filter", &self.filter)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Multi-map from key to bindings in insertion order.
pub struct Registry<C> {
    /// Bindings per key, oldest first. Keys with no bindings are pruned.
    by_key: HashMap<KeyName, Vec<Arc<Binding<C>>>>,
    /// Handle → key, so removal by handle touches a single bucket.
    keys: HashMap<Handle, KeyName>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            by_key: HashMap::new(),
            keys: HashMap::new(),
        }
    }
}

impl<C> Registry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding for `key` and return its fresh handle.
    pub fn insert(&mut self, key: KeyName, filter: Option<EventKind>, callback: C) -> Handle {
        let handle = Handle::issue();
        self.by_key.entry(key).or_default().push(Arc::new(Binding {
            key,
            filter,
            callback,
            handle,
        }));
        self.keys.insert(handle, key);
        handle
    }

    /// Remove the binding for `handle`. Returns it so the caller controls
    /// where the callable is released.
    pub fn remove_by_handle(&mut self, handle: Handle) -> Option<Arc<Binding<C>>> {
        let key = self.keys.remove(&handle)?;
        let bucket = self.by_key.get_mut(&key)?;
        let pos = bucket.iter().position(|b| b.handle == handle)?;
        let removed = bucket.remove(pos);
        if bucket.is_empty() {
            self.by_key.remove(&key);
        }
        Some(removed)
    }

    /// Remove every binding for `key`.
    pub fn remove_by_key(&mut self, key: KeyName) -> Vec<Arc<Binding<C>>> {
        let removed = self.by_key.remove(&key).unwrap_or_default();
        for b in &removed {
            self.keys.remove(&b.handle);
        }
        removed
    }

    /// Remove every binding.
    pub fn clear(&mut self) -> Vec<Arc<Binding<C>>> {
        self.keys.clear();
        self.by_key.drain().flat_map(|(_, v)| v).collect()
    }

    /// All bindings for `key`, oldest first.
    pub fn lookup(&self, key: KeyName) -> &[Arc<Binding<C>>] {
        self.by_key.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// True if at least one binding for `key` fires on `kind`.
    pub fn has_match(&self, key: KeyName, kind: EventKind) -> bool {
        self.lookup(key).iter().any(|b| b.matches(kind))
    }

    /// Independent copy of the bindings for `key` that fire on `kind`.
    ///
    /// The copy stays valid while callbacks mutate the registry.
    pub fn snapshot(&self, key: KeyName, kind: EventKind) -> Vec<Arc<Binding<C>>> {
        self.lookup(key)
            .iter()
            .filter(|b| b.matches(kind))
            .cloned()
            .collect()
    }

    /// Number of registered bindings.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
