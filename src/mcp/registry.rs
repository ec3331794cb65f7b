//! Copy-on-write capability registry.
//!
//! One [`Registry`] holds every tool (or resource, or prompt) of a server
//! instance. Readers take an `Arc` to the current snapshot under a short
//! read lock and never observe a half-applied write. Writers clone the
//! snapshot only when a reader still holds the previous one.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// A registered capability: its descriptor and the handler behind it.
pub struct Entry<D, H: ?Sized> {
    pub descriptor: D,
    pub handler: Arc<H>,
}

impl<D: Clone, H: ?Sized> Clone for Entry<D, H> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

struct State<D, H: ?Sized> {
    order: Vec<String>,
    entries: HashMap<String, Entry<D, H>>,
}

impl<D: Clone, H: ?Sized> Clone for State<D, H> {
    fn clone(&self) -> Self {
        Self {
            order: self.order.clone(),
            entries: self.entries.clone(),
        }
    }
}

/// Name-keyed registry with last-write-wins semantics.
///
/// Listing order is registration order. Re-registering a name replaces
/// the entry in place and keeps its original position.
pub struct Registry<D, H: ?Sized> {
    state: RwLock<Arc<State<D, H>>>,
}

impl<D: Clone, H: ?Sized> Default for Registry<D, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Clone, H: ?Sized> Registry<D, H> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(State {
                order: Vec::new(),
                entries: HashMap::new(),
            })),
        }
    }

    fn current(&self) -> Arc<State<D, H>> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Insert or overwrite the entry for `name`.
    pub fn register(&self, name: impl Into<String>, descriptor: D, handler: Arc<H>) {
        let name = name.into();
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let state = Arc::make_mut(&mut guard);
        let entry = Entry {
            descriptor,
            handler,
        };
        if state.entries.insert(name.clone(), entry).is_some() {
            debug!("Replaced capability: {}", name);
        } else {
            debug!("Registered capability: {}", name);
            state.order.push(name);
        }
    }

    /// Insert the entry for `name` unless one is already there.
    ///
    /// The check and the insert happen under one write lock, so of several
    /// racing callers exactly one gets `true`.
    pub fn register_if_absent(
        &self,
        name: impl Into<String>,
        descriptor: D,
        handler: Arc<H>,
    ) -> bool {
        let name = name.into();
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if guard.entries.contains_key(&name) {
            return false;
        }
        let state = Arc::make_mut(&mut guard);
        state.entries.insert(
            name.clone(),
            Entry {
                descriptor,
                handler,
            },
        );
        debug!("Registered capability: {}", name);
        state.order.push(name);
        true
    }

    /// Remove the entry for `name`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.entries.contains_key(name) {
            return false;
        }
        let state = Arc::make_mut(&mut guard);
        state.entries.remove(name);
        state.order.retain(|n| n != name);
        debug!("Unregistered capability: {}", name);
        true
    }

    /// Look up the entry for `name`.
    pub fn lookup(&self, name: &str) -> Option<Entry<D, H>> {
        self.current().entries.get(name).cloned()
    }

    /// Check if a capability exists.
    pub fn contains(&self, name: &str) -> bool {
        self.current().entries.contains_key(name)
    }

    /// Take a point-in-time snapshot for enumeration.
    ///
    /// Registrations that complete after this call are not visible through
    /// the returned snapshot.
    pub fn snapshot(&self) -> Snapshot<D, H> {
        Snapshot {
            state: self.current(),
        }
    }

    /// Collect the descriptors of the current snapshot, in listing order.
    pub fn list(&self) -> Vec<D> {
        self.snapshot().descriptors().cloned().collect()
    }

    /// Get the number of registered capabilities.
    pub fn len(&self) -> usize {
        self.current().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable view of a registry at one point in time.
pub struct Snapshot<D, H: ?Sized> {
    state: Arc<State<D, H>>,
}

impl<D, H: ?Sized> Snapshot<D, H> {
    /// Descriptors in listing order.
    pub fn descriptors(&self) -> impl Iterator<Item = &D> + '_ {
        self.entries().map(|entry| &entry.descriptor)
    }

    /// Entries in listing order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry<D, H>> + '_ {
        self.state
            .order
            .iter()
            .filter_map(move |name| self.state.entries.get(name))
    }

    pub fn len(&self) -> usize {
        self.state.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.order.is_empty()
    }
}
