//! Settings store
//!
//! [`Configuration`] keeps every value in its string form, keyed and sorted by
//! setting key, and converts through the setting's codec on `get`/`put`.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};

use parking_lot::RwLock;
use tracing::debug;

use crate::binder::{Bindable, Shared};
use crate::error::Result;
use crate::properties;
use crate::refresh::{KeyListener, ListenerId, Refresher};
use crate::setting::{Setting, ValueCodec};

/// String-valued settings store
///
/// # Example
///
/// ```ignore
/// use cfgstore::{Configuration, IntSetting};
///
/// let config = Configuration::new();
/// let width = IntSetting::new("window.width");
/// assert_eq!(config.put(&width, 800)?, None);
/// assert_eq!(config.put(&width, 1024)?, Some(800));
/// assert_eq!(config.get_or(&width, 640)?, 1024);
/// ```
#[derive(Default)]
pub struct Configuration {
    entries: RwLock<BTreeMap<String, String>>,
    refresher: Refresher,
}

impl Configuration {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the entries read from `reader`
    pub fn from_reader<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let config = Self::new();
        config.load(reader)?;
        Ok(config)
    }

    /// Create a store holding a copy of `other`'s entries, without its bindings
    pub fn with_entries_of(other: &Configuration) -> Self {
        Self {
            entries: RwLock::new(other.entries.read().clone()),
            refresher: Refresher::new(),
        }
    }

    /// Parse the stored value of `setting`
    pub fn get<C: ValueCodec>(&self, setting: &Setting<C>) -> Result<Option<C::Value>> {
        let raw = self.entries.read().get(setting.key()).cloned();
        C::parse(raw.as_deref())
    }

    /// Parse the stored value of `setting`, falling back to `default`
    pub fn get_or<C: ValueCodec>(&self, setting: &Setting<C>, default: C::Value) -> Result<C::Value> {
        Ok(self.get(setting)?.unwrap_or(default))
    }

    /// Store `value` and refresh everything bound to the setting's key
    ///
    /// Returns the value parsed from the previous entry. If that entry no
    /// longer parses, the error is returned and nothing is written.
    pub fn put<C: ValueCodec>(&self, setting: &Setting<C>, value: C::Value) -> Result<Option<C::Value>> {
        let previous = {
            let mut entries = self.entries.write();
            let previous = C::parse(entries.get(setting.key()).map(String::as_str))?;
            entries.insert(setting.key().to_string(), C::format(&value));
            previous
        };

        self.refresher.inform(setting.key(), &value);
        Ok(previous)
    }

    /// The stored string for `key`
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Merge the entries read from `reader` into this store
    ///
    /// Existing keys are overwritten. Bindings are not refreshed. The reader
    /// is left open.
    pub fn load<R: Read + ?Sized>(&self, reader: &mut R) -> Result<()> {
        let loaded = properties::read_entries(reader)?;
        let count = loaded.len();

        self.entries.write().extend(loaded);
        debug!(entries = count, "Loaded configuration");
        Ok(())
    }

    /// Write every entry to `writer`, in key order, after an optional comment
    ///
    /// The writer is flushed and left open.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W, comment: Option<&str>) -> Result<()> {
        let snapshot = self.entries.read().clone();
        properties::write_entries(writer, comment, &snapshot)?;
        debug!(entries = snapshot.len(), "Saved configuration");
        Ok(())
    }

    /// Entries whose key starts with `prefix`, in key order
    pub(crate) fn entries_with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.entries
            .read()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
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

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || *self.entries.read() == *other.entries.read()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("entries", &*self.entries.read())
            .field("refresher", &self.refresher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::setting::{BooleanSetting, DoubleSetting, IntSetting, StringSetting};
    use std::io::Cursor;
    use std::sync::Arc;

    #[test]
    fn test_put_returns_previous_value() {
        let config = Configuration::new();
        let volume = IntSetting::new("audio.volume");

        assert_eq!(config.put(&volume, 3).unwrap(), None);
        assert_eq!(config.put(&volume, 7).unwrap(), Some(3));
        assert_eq!(config.get(&volume).unwrap(), Some(7));
        assert_eq!(config.get_raw("audio.volume").as_deref(), Some("7"));
    }

    #[test]
    fn test_get_or_falls_back_only_when_absent() {
        let config = Configuration::new();
        let ratio = DoubleSetting::new("ratio");
        assert_eq!(config.get_or(&ratio, 1.5).unwrap(), 1.5);

        config.put(&ratio, 0.25).unwrap();
        assert_eq!(config.get_or(&ratio, 1.5).unwrap(), 0.25);
    }

    #[test]
    fn test_absent_boolean_is_false_not_default() {
        let config = Configuration::new();
        let flag = BooleanSetting::new("ui.dark");
        assert_eq!(config.get(&flag).unwrap(), Some(false));
        assert!(!config.get_or(&flag, true).unwrap());
    }

    #[test]
    fn test_put_over_unparsable_value_fails_without_writing() {
        let config = Configuration::new();
        config.put(&StringSetting::new("port"), "eighty".to_string()).unwrap();

        let err = config.put(&IntSetting::new("port"), 80).unwrap_err();
        assert!(matches!(err, ConfigError::Format { target: "int", .. }));
        assert_eq!(config.get_raw("port").as_deref(), Some("eighty"));
    }

    #[test]
    fn test_listener_sees_the_new_value() {
        let config = Arc::new(Configuration::new());
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let (store, seen_in) = (Arc::clone(&config), Arc::clone(&seen));
        config.add_listener(Arc::new(move |key: &str| {
            seen_in.lock().push(store.get_raw(key));
        }));

        config.put(&IntSetting::new("k"), 5).unwrap();
        assert_eq!(*seen.lock(), vec![Some("5".to_string())]);
    }

    #[test]
    fn test_save_is_sorted_and_loadable() {
        let config = Configuration::new();
        config.put(&StringSetting::new("b"), "2".to_string()).unwrap();
        config.put(&StringSetting::new("a"), "1".to_string()).unwrap();

        let mut out = Vec::new();
        config.save(&mut out, Some("demo")).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "#demo\na=1\nb=2\n");

        let loaded = Configuration::from_reader(&mut Cursor::new(out)).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_load_merges_and_overwrites() {
        let config = Configuration::new();
        config.put(&StringSetting::new("keep"), "old".to_string()).unwrap();
        config.put(&StringSetting::new("swap"), "old".to_string()).unwrap();

        config.load(&mut Cursor::new("swap=new\nadded=yes\n")).unwrap();

        assert_eq!(config.len(), 3);
        assert_eq!(config.get_raw("keep").as_deref(), Some("old"));
        assert_eq!(config.get_raw("swap").as_deref(), Some("new"));
        assert!(config.contains_key("added"));
    }

    #[test]
    fn test_entry_copy_has_no_bindings() {
        let config = Configuration::new();
        config.put(&IntSetting::new("x"), 1).unwrap();
        config.add_listener(Arc::new(|_: &str| {}));

        let copy = Configuration::with_entries_of(&config);
        assert_eq!(copy, config);
        assert_eq!(copy.refresher().listener_count(), 0);

        copy.put(&IntSetting::new("x"), 2).unwrap();
        assert_eq!(config.get(&IntSetting::new("x")).unwrap(), Some(1));
    }

    #[test]
    fn test_entries_with_prefix() {
        let config = Configuration::new();
        for key in ["a.1", "a.2", "b.1", "ab"] {
            config.put(&StringSetting::new(key), key.to_string()).unwrap();
        }

        let keys: Vec<_> = config.entries_with_prefix("a.").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a.1".to_string(), "a.2".to_string()]);
        assert_eq!(config.entries_with_prefix("").len(), 4);
    }
}
