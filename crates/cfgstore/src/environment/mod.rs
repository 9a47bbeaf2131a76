//! Environment store
//!
//! [`Environment`] keeps arbitrary in-memory values. Values wrapped with
//! [`EnvValue::persistent`] survive [`Environment::save`]; transient values
//! stay in memory only and are left out of the record stream.

pub mod record;

pub use record::{EnvLoadReport, Persistent, StoredRecord, TypeRegistry, MAX_RECORD_BYTES};

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::{Arc, Weak};

use cfgstore_common::format_error;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::binder::{Bindable, Shared};
use crate::error::{ConfigError, Result};
use crate::refresh::{KeyListener, ListenerId, Refresher};
use crate::setting::{Setting, ValueCodec};

#[derive(Clone, Copy)]
struct Persistence {
    tag: &'static str,
    encode: fn(&dyn Any) -> Option<bincode::Result<Vec<u8>>>,
}

fn encode_as<T: Persistent>(value: &dyn Any) -> Option<bincode::Result<Vec<u8>>> {
    value.downcast_ref::<T>().map(record::encode_payload::<T>)
}

/// A value held by an [`Environment`]
#[derive(Clone)]
pub struct EnvValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    persistence: Option<Persistence>,
}

impl EnvValue {
    /// A value written to the record stream on save
    pub fn persistent<T: Persistent>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
            persistence: Some(Persistence {
                tag: T::TYPE_TAG,
                encode: encode_as::<T>,
            }),
        }
    }

    /// A value kept in memory only
    pub fn transient<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// A shared value kept in memory only
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: type_name::<T>(),
            persistence: None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }

    /// Stream tag of the value's type, for persistent values
    pub fn type_tag(&self) -> Option<&'static str> {
        self.persistence.map(|p| p.tag)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn as_any(&self) -> &dyn Any {
        &*self.value
    }

    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Shared handle to the value, if it is a `T`
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    fn encode_payload(&self) -> Option<(&'static str, bincode::Result<Vec<u8>>)> {
        let persistence = self.persistence?;
        (persistence.encode)(self.as_any()).map(|payload| (persistence.tag, payload))
    }
}

impl fmt::Debug for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvValue")
            .field("type_name", &self.type_name)
            .field("type_tag", &self.type_tag())
            .finish()
    }
}

/// Store of arbitrary values
///
/// Holding an exclusive lock on the value map for the whole of
/// [`save`](Self::save) and [`load`](Self::load) keeps concurrent `put`s out of
/// the middle of a snapshot.
pub struct Environment {
    values: Mutex<HashMap<String, EnvValue>>,
    types: RwLock<TypeRegistry>,
    refresher: Refresher,
}

impl Environment {
    /// Create an empty store restoring the built-in value types
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            types: RwLock::new(TypeRegistry::with_builtins()),
            refresher: Refresher::new(),
        }
    }

    /// Create a store holding the entries read from `reader`
    pub fn from_reader<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let env = Self::new();
        env.load(reader)?;
        Ok(env)
    }

    /// Create a store sharing `other`'s values and types, without its bindings
    pub fn with_entries_of(other: &Environment) -> Self {
        Self {
            values: Mutex::new(other.values.lock().clone()),
            types: RwLock::new(other.types.read().clone()),
            refresher: Refresher::new(),
        }
    }

    /// Store `value` under `key` and refresh everything bound to the key
    ///
    /// Returns the value previously stored. Storing the environment inside
    /// itself is rejected and leaves the store unchanged.
    pub fn put(&self, key: impl Into<String>, value: EnvValue) -> Result<Option<EnvValue>> {
        let key = key.into();
        if self.is_self(&value) {
            return Err(ConfigError::invalid_argument(format!(
                "cannot store the environment within itself (key {})",
                key
            )));
        }

        let previous = self.values.lock().insert(key.clone(), value.clone());
        self.refresher.inform(&key, value.as_any());
        Ok(previous)
    }

    /// Whether `value` is this environment, directly or through an `Arc` or `Weak`
    fn is_self(&self, value: &EnvValue) -> bool {
        let this: *const Environment = self;
        if let Some(env) = value.downcast_ref::<Environment>() {
            return std::ptr::eq(env, this);
        }
        if let Some(env) = value.downcast_ref::<Arc<Environment>>() {
            return std::ptr::eq(Arc::as_ptr(env), this);
        }
        if let Some(env) = value.downcast_ref::<Weak<Environment>>() {
            return std::ptr::eq(env.as_ptr(), this);
        }
        false
    }

    /// Store a value that is written on save
    pub fn put_persistent<T: Persistent>(&self, key: impl Into<String>, value: T) -> Result<Option<EnvValue>> {
        self.put(key, EnvValue::persistent(value))
    }

    /// Store a value that is kept in memory only
    pub fn put_transient<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> Result<Option<EnvValue>> {
        self.put(key, EnvValue::transient(value))
    }

    pub fn get(&self, key: &str) -> Option<EnvValue> {
        self.values.lock().get(key).cloned()
    }

    /// A clone of the value under `key`, if it is a `T`
    pub fn get_as<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|value| value.downcast_ref::<T>().cloned())
    }

    pub fn get_or<T: Any + Clone>(&self, key: &str, default: T) -> T {
        self.get_as(key).unwrap_or(default)
    }

    /// Store a typed setting value; the value is persistent
    ///
    /// Returns the previous value when it had the setting's type.
    pub fn put_setting<C>(&self, setting: &Setting<C>, value: C::Value) -> Result<Option<C::Value>>
    where
        C: ValueCodec,
        C::Value: Persistent,
    {
        let previous = self.put(setting.key(), EnvValue::persistent(value))?;
        Ok(previous.and_then(|value| value.downcast_ref::<C::Value>().cloned()))
    }

    /// The value under the setting's key, when it has the setting's type
    pub fn get_setting<C: ValueCodec>(&self, setting: &Setting<C>) -> Option<C::Value> {
        self.get_as::<C::Value>(setting.key())
    }

    pub fn get_setting_or<C: ValueCodec>(&self, setting: &Setting<C>, default: C::Value) -> C::Value {
        self.get_setting(setting).unwrap_or(default)
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.values.lock().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }

    /// Allow values of type `T` to be restored by [`load`](Self::load)
    pub fn register_type<T: Persistent>(&self) -> bool {
        self.types.write().register::<T>()
    }

    /// Tags of the types this store restores
    pub fn registered_types(&self) -> Vec<&'static str> {
        self.types.read().tags()
    }

    /// Merge the records read from `reader` into this store
    ///
    /// A stream that ends early or holds undecodable records is not an error;
    /// the returned report says what was restored. Bindings are not
    /// refreshed. The reader is left open.
    pub fn load<R: Read + ?Sized>(&self, reader: &mut R) -> Result<EnvLoadReport> {
        let mut values = self.values.lock();
        let types = self.types.read();

        let report = record::read_records(reader, &types, |key, value| {
            values.insert(key, value);
        })?;
        debug!(loaded = report.loaded, "Loaded environment");
        Ok(report)
    }

    /// Write every persistent entry to `writer`, in key order
    ///
    /// Returns the number of records written. The writer is flushed and left
    /// open.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize> {
        self.save_with_prefix(writer, "")
    }

    /// Write the persistent entries whose key starts with `prefix`
    pub(crate) fn save_with_prefix<W: Write + ?Sized>(&self, writer: &mut W, prefix: &str) -> Result<usize> {
        let values = self.values.lock();

        let mut keys: Vec<&String> = values.keys().filter(|key| key.starts_with(prefix)).collect();
        keys.sort_unstable();

        let mut frames = Vec::with_capacity(keys.len());
        for key in keys {
            let value = &values[key];
            match record::encode_record(key, value) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => debug!(key = %key, type_name = value.type_name(), "Transient value not saved"),
                Err(e) => warn!(key = %key, error = %format_error(&e), "Value excluded from save"),
            }
        }

        record::write_records(writer, &frames)?;
        debug!(records = frames.len(), prefix = %prefix, "Saved environment");
        Ok(frames.len())
    }

    /// The store's refresh engine
    pub fn refresher(&self) -> &Refresher {
        &self.refresher
    }

    /// Bind `key` to `field` of `target`; see [`Refresher::register`]
    pub fn register<T: Bindable>(&self, key: &str, target: &Shared<T>, field: &str) -> Result<bool> {
        self.refresher.register(key, target, field)
    }

    pub fn add_listener(&self, listener: KeyListener) -> ListenerId {
        self.refresher.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.refresher.remove_listener(id)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("keys", &self.keys())
            .field("refresher", &self.refresher)
            .finish()
    }
}
