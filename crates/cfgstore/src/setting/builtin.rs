//! Built-in codecs

use std::path::PathBuf;

use cfgstore_common::format_error;
use tracing::error;
use url::Url;

use super::{Color, Setting, ValueCodec};
use crate::error::{ConfigError, Result};

macro_rules! numeric_codec {
    ($(#[$doc:meta])* $codec:ident, $alias:ident, $ty:ty, $id:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $codec;

        impl ValueCodec for $codec {
            type Value = $ty;
            const ID: &'static str = $id;

            fn format(value: &$ty) -> String {
                value.to_string()
            }

            fn parse(raw: Option<&str>) -> Result<Option<$ty>> {
                raw.map(|s| {
                    s.parse::<$ty>()
                        .map_err(|e| ConfigError::format(Self::ID, s, e))
                })
                .transpose()
            }
        }

        pub type $alias = Setting<$codec>;
    };
}

numeric_codec!(
    /// 8-bit signed integers
    ByteCodec, ByteSetting, i8, "byte"
);
numeric_codec!(
    /// 16-bit signed integers
    ShortCodec, ShortSetting, i16, "short"
);
numeric_codec!(
    /// 32-bit signed integers
    IntCodec, IntSetting, i32, "int"
);
numeric_codec!(
    /// 64-bit signed integers
    LongCodec, LongSetting, i64, "long"
);
numeric_codec!(
    /// Single precision floats
    FloatCodec, FloatSetting, f32, "float"
);
numeric_codec!(
    /// Double precision floats
    DoubleCodec, DoubleSetting, f64, "double"
);

/// Booleans
///
/// Parsing never fails: a case-insensitive `"true"` is `true`, anything else
/// is `false`, and an absent value is `false` as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolCodec;

impl ValueCodec for BoolCodec {
    type Value = bool;
    const ID: &'static str = "boolean";

    fn format(value: &bool) -> String {
        value.to_string()
    }

    fn parse(raw: Option<&str>) -> Result<Option<bool>> {
        Ok(Some(raw.is_some_and(|s| s.eq_ignore_ascii_case("true"))))
    }
}

pub type BooleanSetting = Setting<BoolCodec>;

/// Strings, stored as-is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringCodec;

impl ValueCodec for StringCodec {
    type Value = String;
    const ID: &'static str = "string";

    fn format(value: &String) -> String {
        value.clone()
    }

    fn parse(raw: Option<&str>) -> Result<Option<String>> {
        Ok(raw.map(str::to_string))
    }
}

pub type StringSetting = Setting<StringCodec>;

/// Colors, stored as the decimal packed ARGB value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorCodec;

impl ValueCodec for ColorCodec {
    type Value = Color;
    const ID: &'static str = "color";

    fn format(value: &Color) -> String {
        value.argb().to_string()
    }

    fn parse(raw: Option<&str>) -> Result<Option<Color>> {
        raw.map(|s| {
            s.parse::<i32>()
                .map(Color::from_argb)
                .map_err(|e| ConfigError::format(Self::ID, s, e))
        })
        .transpose()
    }
}

pub type ColorSetting = Setting<ColorCodec>;

/// File system paths; no existence check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCodec;

impl ValueCodec for FileCodec {
    type Value = PathBuf;
    const ID: &'static str = "file";

    fn format(value: &PathBuf) -> String {
        value.to_string_lossy().into_owned()
    }

    fn parse(raw: Option<&str>) -> Result<Option<PathBuf>> {
        Ok(raw.map(PathBuf::from))
    }
}

pub type FileSetting = Setting<FileCodec>;

/// URLs
///
/// A malformed URL is logged and yields `None` instead of an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlCodec;

impl ValueCodec for UrlCodec {
    type Value = Url;
    const ID: &'static str = "url";

    fn format(value: &Url) -> String {
        value.as_str().to_string()
    }

    fn parse(raw: Option<&str>) -> Result<Option<Url>> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        match Url::parse(raw) {
            Ok(url) => Ok(Some(url)),
            Err(e) => {
                error!(input = %raw, error = %format_error(&e), "Malformed URL");
                Ok(None)
            }
        }
    }
}

pub type UrlSetting = Setting<UrlCodec>;
