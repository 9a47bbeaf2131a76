//! Declarative binding
//!
//! A [`Configurable`] type lists which of its fields take their value from a
//! store. [`Configurator::configure`] injects the stored values and, for
//! markers built with `with_refresh()`, keeps the fields bound so later
//! `put`s update them.
//!
//! # Example
//!
//! ```ignore
//! use cfgstore::{binder, Bindable, Configurable, Configuration, Configurator};
//! use cfgstore::{FieldSlot, IntCodec, SettingMarker};
//!
//! #[derive(Default)]
//! struct Window {
//!     width: i32,
//! }
//!
//! impl Bindable for Window {
//!     fn fields() -> Vec<FieldSlot<Self>> {
//!         vec![FieldSlot::new("width", |w: &mut Window| &mut w.width)]
//!     }
//! }
//!
//! impl Configurable for Window {
//!     fn setting_markers() -> Vec<SettingMarker> {
//!         vec![SettingMarker::of::<IntCodec>("width", "window.width").with_refresh()]
//!     }
//! }
//!
//! let window = binder::shared(Window::default());
//! let report = config.configure(&window);
//! assert!(report.is_complete());
//! ```

use std::any::{type_name, Any};
use std::fmt;

use cfgstore_common::format_error;
use tracing::{debug, warn};

use crate::binder::{self, Bindable, Shared};
use crate::configuration::Configuration;
use crate::environment::Environment;
use crate::error::{ConfigError, Result};
use crate::refresh::Refresher;
use crate::setting::{Setting, ValueCodec};

type ReadFn = fn(&Configuration, &str) -> Result<Option<Box<dyn Any>>>;

fn read_setting<C: ValueCodec>(config: &Configuration, key: &str) -> Result<Option<Box<dyn Any>>> {
    let value = config.get(&Setting::<C>::new(key))?;
    Ok(value.map(|value| Box::new(value) as Box<dyn Any>))
}

/// A field filled from a [`Configuration`] through a codec
#[derive(Clone)]
pub struct SettingMarker {
    field: &'static str,
    key: String,
    codec_id: &'static str,
    refresh: bool,
    read: ReadFn,
}

impl SettingMarker {
    /// Fill `field` with the value of `key`, parsed by `C`
    pub fn of<C: ValueCodec>(field: &'static str, key: impl Into<String>) -> Self {
        Self {
            field,
            key: key.into(),
            codec_id: C::ID,
            refresh: false,
            read: read_setting::<C>,
        }
    }

    /// Fill `field` with the value of `setting`
    pub fn for_setting<C: ValueCodec>(field: &'static str, setting: &Setting<C>) -> Self {
        Self::of::<C>(field, setting.key())
    }

    /// Keep the field bound after the initial injection
    pub fn with_refresh(mut self) -> Self {
        self.refresh = true;
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn codec_id(&self) -> &'static str {
        self.codec_id
    }

    pub fn refresh(&self) -> bool {
        self.refresh
    }
}

impl fmt::Debug for SettingMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingMarker")
            .field("field", &self.field)
            .field("key", &self.key)
            .field("codec", &self.codec_id)
            .field("refresh", &self.refresh)
            .finish()
    }
}

/// A field filled with a raw [`Environment`] value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvMarker {
    field: &'static str,
    key: String,
    refresh: bool,
}

impl EnvMarker {
    pub fn new(field: &'static str, key: impl Into<String>) -> Self {
        Self {
            field,
            key: key.into(),
            refresh: false,
        }
    }

    /// Keep the field bound after the initial injection
    pub fn with_refresh(mut self) -> Self {
        self.refresh = true;
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn refresh(&self) -> bool {
        self.refresh
    }
}

/// A type whose fields are declared against store keys
pub trait Configurable: Bindable {
    /// Fields filled by [`Configuration::configure`](Configurator::configure)
    fn setting_markers() -> Vec<SettingMarker> {
        Vec::new()
    }

    /// Fields filled by [`Environment::configure`](Configurator::configure)
    fn env_markers() -> Vec<EnvMarker> {
        Vec::new()
    }
}

/// A marker that could not be honoured
#[derive(Debug)]
pub struct ConfigureFailure {
    pub field: &'static str,
    pub key: String,
    pub error: ConfigError,
}

/// Outcome of [`Configurator::configure`]
#[derive(Debug, Default)]
pub struct ConfigureReport {
    /// Fields written with a stored value
    pub injected: Vec<&'static str>,
    /// Fields left untouched because the store holds no value for them
    pub absent: Vec<&'static str>,
    /// Fields newly bound for refresh
    pub registered: Vec<&'static str>,
    /// Markers that failed
    pub failed: Vec<ConfigureFailure>,
}

impl ConfigureReport {
    /// Whether every marker was honoured
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, field: &'static str, key: &str, error: ConfigError) {
        warn!(field, key = %key, error = %format_error(&error), "Failed to configure field");
        self.failed.push(ConfigureFailure {
            field,
            key: key.to_string(),
            error,
        });
    }
}

/// A store able to fill [`Configurable`] instances
pub trait Configurator {
    /// Inject stored values into `target` and bind the refreshing fields
    ///
    /// Never aborts: failures are logged and listed in the report, and the
    /// remaining markers are still processed.
    fn configure<T: Configurable>(&self, target: &Shared<T>) -> ConfigureReport;
}

impl Configurator for Configuration {
    fn configure<T: Configurable>(&self, target: &Shared<T>) -> ConfigureReport {
        let mut report = ConfigureReport::default();

        for marker in T::setting_markers() {
            match (marker.read)(self, &marker.key) {
                Ok(value) => bind_marker(
                    self.refresher(),
                    target,
                    (marker.field, &marker.key, marker.refresh),
                    value.as_deref(),
                    &mut report,
                ),
                Err(e) => report.fail(marker.field, &marker.key, e),
            }
        }

        debug!(
            target_type = type_name::<T>(),
            injected = report.injected.len(),
            failed = report.failed.len(),
            "Configured from settings"
        );
        report
    }
}

impl Configurator for Environment {
    fn configure<T: Configurable>(&self, target: &Shared<T>) -> ConfigureReport {
        let mut report = ConfigureReport::default();

        for marker in T::env_markers() {
            let value = self.get(&marker.key);
            bind_marker(
                self.refresher(),
                target,
                (marker.field, &marker.key, marker.refresh),
                value.as_ref().map(|value| value.as_any()),
                &mut report,
            );
        }

        debug!(
            target_type = type_name::<T>(),
            injected = report.injected.len(),
            failed = report.failed.len(),
            "Configured from environment"
        );
        report
    }
}

fn bind_marker<T: Bindable>(
    refresher: &Refresher,
    target: &Shared<T>,
    (field, key, refresh): (&'static str, &str, bool),
    value: Option<&dyn Any>,
    report: &mut ConfigureReport,
) {
    if binder::find_field::<T>(field).is_none() {
        report.fail(field, key, ConfigError::no_such_field(type_name::<T>(), field));
        return;
    }

    match value {
        Some(value) => match binder::set_field_by_name(target, field, value) {
            Ok(verified) => {
                if !verified {
                    warn!(field, key = %key, "Injected field does not read back the stored value");
                }
                report.injected.push(field);
            }
            Err(e) => {
                report.fail(field, key, e);
                return;
            }
        },
        None => report.absent.push(field),
    }

    if refresh {
        match refresher.register(key, target, field) {
            Ok(true) => report.registered.push(field),
            Ok(false) => debug!(field, key = %key, "Field already bound"),
            Err(e) => report.fail(field, key, e),
        }
    }
}
