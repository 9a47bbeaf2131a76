//! Typed settings
//!
//! A [`Setting`] pairs a key with a [`ValueCodec`], the contract that turns a
//! strongly typed value into its string form and back. Stores keep strings
//! (or arbitrary values, for the environment) and use the codec at the edges.
//!
//! Every codec obeys the round-trip law `parse(Some(&format(v))) == Some(v)`.
//! `format_opt(None)` is `None`, while `parse(None)` is codec specific: most
//! codecs return `None`, [`BoolCodec`] returns `Some(false)`.
//!
//! # Example
//!
//! ```ignore
//! use cfgstore::{Configuration, IntSetting};
//!
//! let config = Configuration::new();
//! let port = IntSetting::new("server.port");
//! config.put(&port, 8080)?;
//! assert_eq!(config.get(&port)?, Some(8080));
//! ```

mod builtin;
mod color;

pub use builtin::{
    BoolCodec, BooleanSetting, ByteCodec, ByteSetting, ColorCodec, ColorSetting, DoubleCodec,
    DoubleSetting, FileCodec, FileSetting, FloatCodec, FloatSetting, IntCodec, IntSetting,
    LongCodec, LongSetting, ShortCodec, ShortSetting, StringCodec, StringSetting, UrlCodec,
    UrlSetting,
};
pub use color::Color;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::Result;

/// Conversion between a typed value and its string representation
pub trait ValueCodec: Send + Sync + 'static {
    /// The typed value this codec handles
    type Value: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Stable identifier of the codec
    const ID: &'static str;

    /// Render a value as a string
    fn format(value: &Self::Value) -> String;

    /// Parse a stored string; `None` means the key is absent
    fn parse(raw: Option<&str>) -> Result<Option<Self::Value>>;

    /// Render an optional value, mapping `None` to `None`
    fn format_opt(value: Option<&Self::Value>) -> Option<String> {
        value.map(Self::format)
    }
}

/// A key bound to a codec
pub struct Setting<C: ValueCodec> {
    key: String,
    _codec: PhantomData<fn() -> C>,
}

impl<C: ValueCodec> Setting<C> {
    /// Create a setting for the given key
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            _codec: PhantomData,
        }
    }

    /// The key this setting is stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Identifier of the codec
    pub fn codec_id(&self) -> &'static str {
        C::ID
    }

    /// Format a value with this setting's codec
    pub fn format(&self, value: &C::Value) -> String {
        C::format(value)
    }

    /// Format an optional value with this setting's codec
    pub fn format_opt(&self, value: Option<&C::Value>) -> Option<String> {
        C::format_opt(value)
    }

    /// Parse a stored string with this setting's codec
    pub fn parse(&self, raw: Option<&str>) -> Result<Option<C::Value>> {
        C::parse(raw)
    }
}

impl<C: ValueCodec> Clone for Setting<C> {
    fn clone(&self) -> Self {
        Self::new(self.key.clone())
    }
}

// Settings are identified by key alone.
impl<C: ValueCodec> PartialEq for Setting<C> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<C: ValueCodec> Eq for Setting<C> {}

impl<C: ValueCodec> Hash for Setting<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<C: ValueCodec> fmt::Debug for Setting<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setting")
            .field("codec", &C::ID)
            .field("key", &self.key)
            .finish()
    }
}

impl<C: ValueCodec> fmt::Display for Setting<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", C::ID, self.key)
    }
}
