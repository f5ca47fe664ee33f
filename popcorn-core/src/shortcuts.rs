//! Scoped keyboard shortcuts.
//!
//! Views bind a key to an action when they mount and hold the returned
//! [`ShortcutGuard`]; dropping the guard unbinds the action. Remounting a
//! view therefore never accumulates stale listeners.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

type SharedAction = Arc<Mutex<Box<dyn FnMut() + Send>>>;

#[derive(Default)]
struct Bindings {
    next_id: u64,
    entries: Vec<Binding>,
}

struct Binding {
    id: u64,
    key: String,
    action: SharedAction,
}

/// Registry dispatching key names to bound actions.
///
/// Key names compare case-insensitively ("Escape" matches "escape").
#[derive(Clone, Default)]
pub struct ShortcutRegistry {
    bindings: Arc<Mutex<Bindings>>,
}

impl std::fmt::Debug for ShortcutRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortcutRegistry")
            .field("bound", &self.len())
            .finish()
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

impl ShortcutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `action` to `key` until the returned guard is dropped.
    #[must_use = "dropping the guard immediately unbinds the shortcut"]
    pub fn bind<F>(&self, key: &str, action: F) -> ShortcutGuard
    where
        F: FnMut() + Send + 'static,
    {
        let mut bindings = self.bindings.lock();
        let id = bindings.next_id;
        bindings.next_id += 1;
        bindings.entries.push(Binding {
            id,
            key: normalize(key),
            action: Arc::new(Mutex::new(Box::new(action))),
        });
        trace!(key, id, "Bound shortcut");

        ShortcutGuard {
            id,
            bindings: Arc::downgrade(&self.bindings),
        }
    }

    /// Runs every action bound to `key` and returns how many ran.
    ///
    /// Actions run after the registry lock is released, so an action may
    /// itself bind or unbind shortcuts.
    pub fn dispatch(&self, key: &str) -> usize {
        let key = normalize(key);
        let matching: Vec<SharedAction> = self
            .bindings
            .lock()
            .entries
            .iter()
            .filter(|binding| binding.key == key)
            .map(|binding| binding.action.clone())
            .collect();

        for action in &matching {
            let mut run = action.lock();
            (*run)();
        }
        trace!(key = %key, fired = matching.len(), "Dispatched shortcut");
        matching.len()
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.bindings.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps one shortcut bound for as long as it lives.
#[derive(Debug)]
pub struct ShortcutGuard {
    id: u64,
    bindings: Weak<Mutex<Bindings>>,
}

impl Drop for ShortcutGuard {
    fn drop(&mut self) {
        if let Some(bindings) = self.bindings.upgrade() {
            bindings.lock().entries.retain(|binding| binding.id != self.id);
            trace!(id = self.id, "Unbound shortcut");
        }
    }
}
