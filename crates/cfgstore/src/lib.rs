//! cfgstore: typed settings and environment stores
//!
//! Two store flavors share one refresh engine:
//! - [`Configuration`] holds string-serialized settings, read and written
//!   through a typed [`Setting`] and its [`ValueCodec`]
//! - [`Environment`] holds arbitrary in-memory values; those wrapped as
//!   [`EnvValue::persistent`] can be saved to a binary record stream
//!
//! Fields of a [`Bindable`] type can be bound to keys with `register` (or
//! declaratively through [`Configurable`] and [`Configurator::configure`]) and
//! are rewritten on every `put` of their key. Both stores also implement
//! [`Splittable`], which spreads their keys over several files by prefix.
//!
//! # Example
//!
//! ```ignore
//! use cfgstore::{binder, Configuration, IntSetting, PartitionFile, Splittable};
//!
//! let config = Configuration::new();
//! let width = IntSetting::new("window.width");
//! config.put(&width, 800)?;
//!
//! config.save_split(&[
//!     PartitionFile::new("window.", "window.properties").with_comment("window"),
//!     PartitionFile::new("net.", "net.properties"),
//! ])?;
//! ```

pub mod binder;
pub mod configuration;
pub mod configure;
pub mod defaults;
pub mod environment;
pub mod error;
pub mod properties;
pub mod refresh;
pub mod setting;
pub mod split;

pub use binder::{set_field, set_field_by_name, shared, Bindable, FieldSlot, Shared, FIELD_LOCK_TIMEOUT};
pub use configuration::Configuration;
pub use configure::{Configurable, ConfigureFailure, ConfigureReport, Configurator, EnvMarker, SettingMarker};
pub use defaults::{
    configure_with_default_configuration, configure_with_default_environment, default_configuration,
    default_environment, set_default_configuration, set_default_environment,
};
pub use environment::{EnvLoadReport, EnvValue, Environment, Persistent, TypeRegistry, MAX_RECORD_BYTES};
pub use error::{ConfigError, IoOperation, Result};
pub use refresh::{BindingId, KeyListener, ListenerId, RefreshBinding, Refresher};
pub use setting::{
    BoolCodec, BooleanSetting, ByteCodec, ByteSetting, Color, ColorCodec, ColorSetting, DoubleCodec,
    DoubleSetting, FileCodec, FileSetting, FloatCodec, FloatSetting, IntCodec, IntSetting, LongCodec,
    LongSetting, Setting, ShortCodec, ShortSetting, StringCodec, StringSetting, UrlCodec, UrlSetting,
    ValueCodec,
};
pub use split::{PartitionFile, Splittable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
