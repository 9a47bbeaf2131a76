//! Refresh engine
//!
//! Every store owns a [`Refresher`]. After a store writes a key it calls
//! [`Refresher::inform`], which first tells every generic key listener which
//! key changed, then writes the new value into every field bound to that key.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cfgstore_common::format_error;
use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::binder::{self, Bindable, Shared};
use crate::error::{ConfigError, Result};

/// Callback told the key of every write
pub type KeyListener = Arc<dyn Fn(&str) + Send + Sync>;

type ApplyFn = dyn Fn(&dyn Any) -> Result<bool> + Send + Sync;

/// Handle returned by [`Refresher::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Identity of a field binding
///
/// Two bindings are the same when they share the key, the target type and the
/// field name, whichever instance they point at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingId {
    key: String,
    type_id: TypeId,
    type_name: &'static str,
    field: &'static str,
}

impl BindingId {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the bound instance's type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn field(&self) -> &'static str {
        self.field
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[key: {}; type: {}; field: {}]", self.key, self.type_name, self.field)
    }
}

/// A key bound to one field of one shared instance
pub struct RefreshBinding {
    id: BindingId,
    apply: Arc<ApplyFn>,
}

impl RefreshBinding {
    pub fn id(&self) -> &BindingId {
        &self.id
    }

    /// Write `value` into the bound field
    pub fn apply(&self, value: &dyn Any) -> Result<bool> {
        (self.apply)(value)
    }
}

impl Clone for RefreshBinding {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            apply: Arc::clone(&self.apply),
        }
    }
}

impl fmt::Debug for RefreshBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshBinding").field("id", &self.id).finish()
    }
}

/// Subscriber registry of a store
pub struct Refresher {
    listeners: RwLock<Vec<(ListenerId, KeyListener)>>,
    bindings: RwLock<Vec<RefreshBinding>>,
    next_listener: AtomicU64,
}

impl Refresher {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            bindings: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Bind `key` to the field called `field` of `target`
    ///
    /// Returns `Ok(false)` when `T` has no such field, or when a binding with
    /// the same key, type and field already exists (the first one stays).
    pub fn register<T: Bindable>(&self, key: &str, target: &Shared<T>, field: &str) -> Result<bool> {
        if key.is_empty() {
            return Err(ConfigError::invalid_argument("refresh key must not be empty"));
        }
        if field.is_empty() {
            return Err(ConfigError::invalid_argument("refresh field name must not be empty"));
        }

        let Some(slot) = binder::find_field::<T>(field) else {
            debug!(key = %key, field = %field, target_type = type_name::<T>(), "No bindable field, binding skipped");
            return Ok(false);
        };

        let id = BindingId {
            key: key.to_string(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            field: slot.name(),
        };

        let mut bindings = self.bindings.write();
        if bindings.iter().any(|binding| binding.id == id) {
            debug!(binding = %id, "Binding already registered");
            return Ok(false);
        }

        let target = Arc::clone(target);
        debug!(binding = %id, "Registered refresh binding");
        bindings.push(RefreshBinding {
            id,
            apply: Arc::new(move |value: &dyn Any| binder::set_field(&slot, &target, value)),
        });
        Ok(true)
    }

    /// Subscribe to the key of every write
    pub fn add_listener(&self, listener: KeyListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Unsubscribe a listener; `false` when it was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Notify listeners, then refresh every field bound to `key`
    ///
    /// Both lists are copied out first, so callbacks may read the store or
    /// register further bindings. A failed field write is logged and the
    /// remaining bindings still run.
    pub fn inform(&self, key: &str, value: &dyn Any) {
        let listeners: Vec<KeyListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(key);
        }

        let bindings: Vec<RefreshBinding> = self
            .bindings
            .read()
            .iter()
            .filter(|binding| binding.id.key == key)
            .cloned()
            .collect();
        for binding in bindings {
            match binding.apply(value) {
                Ok(true) => {}
                Ok(false) => warn!(binding = %binding.id, "Refreshed field does not read back the written value"),
                Err(e) => error!(binding = %binding.id, error = %format_error(&e), "Failed to refresh field"),
            }
        }
    }

    /// Identities of all bindings, in registration order
    pub fn bindings(&self) -> Vec<BindingId> {
        self.bindings.read().iter().map(|binding| binding.id.clone()).collect()
    }

    /// Number of field bindings
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl Default for Refresher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Refresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refresher")
            .field("listeners", &self.listener_count())
            .field("bindings", &self.bindings())
            .finish()
    }
}
