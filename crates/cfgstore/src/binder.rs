//! Field binding
//!
//! Types whose fields can be written by a store implement [`Bindable`] and
//! describe each writable field with a [`FieldSlot`]: a name plus a setter
//! built from an accessor function. Instances are shared as [`Shared<T>`], so
//! a write only needs the instance's write guard for the duration of one
//! assignment.
//!
//! # Example
//!
//! ```ignore
//! use cfgstore::binder::{self, Bindable, FieldSlot};
//!
//! #[derive(Default)]
//! struct Window {
//!     width: i32,
//!     title: Option<String>,
//! }
//!
//! impl Bindable for Window {
//!     fn fields() -> Vec<FieldSlot<Self>> {
//!         vec![
//!             FieldSlot::new("width", |w: &mut Window| &mut w.width),
//!             FieldSlot::optional("title", |w: &mut Window| &mut w.title),
//!         ]
//!     }
//! }
//!
//! let window = binder::shared(Window::default());
//! binder::set_field_by_name(&window, "width", &640_i32)?;
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{ConfigError, Result};

/// How long a field write waits for the owner's write guard
pub const FIELD_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Instance shared between its owner and the stores that update it
pub type Shared<T> = Arc<RwLock<T>>;

/// Wrap a value so it can be bound to store keys
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

type WriteFn<T> = dyn Fn(&mut T, &dyn Any) -> Result<bool> + Send + Sync;

/// A type exposing named fields that stores may write
pub trait Bindable: Send + Sync + Sized + 'static {
    /// The writable fields of this type
    fn fields() -> Vec<FieldSlot<Self>>;
}

/// A named, writable field of `T`
pub struct FieldSlot<T> {
    name: &'static str,
    value_type: &'static str,
    write: Arc<WriteFn<T>>,
}

impl<T: 'static> FieldSlot<T> {
    /// A field holding a `V`
    pub fn new<V>(name: &'static str, accessor: fn(&mut T) -> &mut V) -> Self
    where
        V: Any + Clone + PartialEq + Send + Sync,
    {
        Self {
            name,
            value_type: type_name::<V>(),
            write: Arc::new(move |target: &mut T, value: &dyn Any| {
                let value = value
                    .downcast_ref::<V>()
                    .ok_or_else(|| ConfigError::type_mismatch(name, type_name::<V>()))?;
                let slot = accessor(target);
                *slot = value.clone();
                Ok(*slot == *value)
            }),
        }
    }

    /// A field holding an `Option<V>`; written values are wrapped in `Some`
    pub fn optional<V>(name: &'static str, accessor: fn(&mut T) -> &mut Option<V>) -> Self
    where
        V: Any + Clone + PartialEq + Send + Sync,
    {
        Self {
            name,
            value_type: type_name::<V>(),
            write: Arc::new(move |target: &mut T, value: &dyn Any| {
                let value = value
                    .downcast_ref::<V>()
                    .ok_or_else(|| ConfigError::type_mismatch(name, type_name::<V>()))?;
                let slot = accessor(target);
                *slot = Some(value.clone());
                Ok(slot.as_ref() == Some(value))
            }),
        }
    }
}

impl<T> FieldSlot<T> {
    /// Field name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name of the value type the field accepts
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }
}

impl<T> Clone for FieldSlot<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            value_type: self.value_type,
            write: Arc::clone(&self.write),
        }
    }
}

impl<T> fmt::Debug for FieldSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSlot")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .finish()
    }
}

/// Look up a field of `T` by name
pub fn find_field<T: Bindable>(name: &str) -> Option<FieldSlot<T>> {
    T::fields().into_iter().find(|slot| slot.name == name)
}

/// Write `value` into `slot` of `instance`
///
/// The write guard is held only for this single assignment. Returns whether
/// reading the field back yields a value equal to the one written.
pub fn set_field<T>(slot: &FieldSlot<T>, instance: &RwLock<T>, value: &dyn Any) -> Result<bool> {
    let mut guard = instance.try_write_for(FIELD_LOCK_TIMEOUT).ok_or_else(|| {
        ConfigError::access(
            slot.name,
            format!("write guard not acquired within {:?}", FIELD_LOCK_TIMEOUT),
        )
    })?;
    (slot.write)(&mut *guard, value)
}

/// Write `value` into the field called `field` of `instance`
pub fn set_field_by_name<T: Bindable>(instance: &Shared<T>, field: &str, value: &dyn Any) -> Result<bool> {
    let slot = find_field::<T>(field).ok_or_else(|| ConfigError::no_such_field(type_name::<T>(), field))?;
    set_field(&slot, instance, value)
}
