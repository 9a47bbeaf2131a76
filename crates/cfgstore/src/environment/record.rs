//! Binary record stream of the environment store
//!
//! Layout: a big-endian `i32` record count, followed by that many bincode
//! encoded [`StoredRecord`]s. Each record carries its key, the
//! [`Persistent::TYPE_TAG`] of the value and the value's own bincode payload.
//! Loading only materialises values whose tag is in the store's
//! [`TypeRegistry`].

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use bincode::Options;
use cfgstore_common::format_error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::EnvValue;
use crate::error::{ConfigError, Result};
use crate::setting::Color;

/// Upper bound for one encoded record, in bytes
pub const MAX_RECORD_BYTES: u64 = 16 * 1024 * 1024;

/// A value type that can be written to and restored from the record stream
pub trait Persistent: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable tag identifying the type inside a stream
    const TYPE_TAG: &'static str;
}

macro_rules! persistent {
    ($($ty:ty => $tag:literal),* $(,)?) => {
        $(
            impl Persistent for $ty {
                const TYPE_TAG: &'static str = $tag;
            }
        )*
    };
}

persistent! {
    String => "string",
    bool => "bool",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    f32 => "f32",
    f64 => "f64",
    PathBuf => "path",
    Color => "color",
    Url => "url",
    Vec<String> => "string_list",
}

/// One entry as it appears in the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub key: String,
    pub type_tag: String,
    pub payload: Vec<u8>,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_RECORD_BYTES)
}

/// Encode a value's payload
pub(crate) fn encode_payload<T: Persistent>(value: &T) -> bincode::Result<Vec<u8>> {
    options().serialize(value)
}

fn decode_payload<T: Persistent>(bytes: &[u8]) -> bincode::Result<EnvValue> {
    options().deserialize::<T>(bytes).map(EnvValue::persistent)
}

type Decoder = fn(&[u8]) -> bincode::Result<EnvValue>;

/// Allow-list of value types that may be restored from a stream
#[derive(Clone)]
pub struct TypeRegistry {
    decoders: HashMap<&'static str, Decoder>,
}

impl TypeRegistry {
    /// A registry that restores nothing
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry holding the built-in value types
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register::<String>();
        registry.register::<bool>();
        registry.register::<i8>();
        registry.register::<i16>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<u8>();
        registry.register::<u16>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<f32>();
        registry.register::<f64>();
        registry.register::<PathBuf>();
        registry.register::<Color>();
        registry.register::<Url>();
        registry.register::<Vec<String>>();
        registry
    }

    /// Allow `T`; returns `false` if its tag was already registered, in which
    /// case `T` replaces the previous type
    pub fn register<T: Persistent>(&mut self) -> bool {
        self.decoders.insert(T::TYPE_TAG, decode_payload::<T>).is_none()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.decoders.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    fn decode(&self, tag: &str, bytes: &[u8]) -> Option<bincode::Result<EnvValue>> {
        self.decoders.get(tag).map(|decode| decode(bytes))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry").field("tags", &self.tags()).finish()
    }
}

/// Outcome of reading a record stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvLoadReport {
    /// Record count announced by the header
    pub expected: usize,
    /// Records restored into the store
    pub loaded: usize,
    /// Records dropped for an unknown tag or an undecodable payload
    pub skipped: usize,
    /// Reading stopped before `expected` records were seen
    pub truncated: bool,
}

/// Encode one entry as a complete record frame
///
/// `Ok(None)` for values that are not persistent.
pub(crate) fn encode_record(key: &str, value: &EnvValue) -> Result<Option<Vec<u8>>> {
    let Some((type_tag, payload)) = value.encode_payload() else {
        return Ok(None);
    };
    let payload = payload.map_err(|e| ConfigError::encode(key, e))?;

    let record = StoredRecord {
        key: key.to_string(),
        type_tag: type_tag.to_string(),
        payload,
    };
    options()
        .serialize(&record)
        .map(Some)
        .map_err(|e| ConfigError::encode(key, e))
}

/// Write the header and the given frames, then flush
pub(crate) fn write_records<W: Write + ?Sized>(writer: &mut W, frames: &[Vec<u8>]) -> Result<()> {
    let count = i32::try_from(frames.len())
        .map_err(|_| ConfigError::invalid_argument(format!("too many records: {}", frames.len())))?;

    writer.write_all(&count.to_be_bytes())?;
    for frame in frames {
        writer.write_all(frame)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a stream, handing every restored entry to `sink` in stream order
///
/// Premature end of input stops reading. A record with an unknown tag or an
/// undecodable payload is skipped. A frame that cannot be decoded stops
/// reading. Any other I/O failure is returned.
pub(crate) fn read_records<R, F>(reader: &mut R, types: &TypeRegistry, mut sink: F) -> Result<EnvLoadReport>
where
    R: Read + ?Sized,
    F: FnMut(String, EnvValue),
{
    let mut report = EnvLoadReport::default();

    let mut header = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut header) {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            warn!("Environment stream ended before its header");
            report.truncated = true;
            return Ok(report);
        }
        return Err(e.into());
    }

    let count = i32::from_be_bytes(header);
    if count < 0 {
        warn!(count, "Negative record count, nothing to read");
    }
    report.expected = usize::try_from(count).unwrap_or(0);

    for index in 0..report.expected {
        let record: StoredRecord = match options().deserialize_from(&mut *reader) {
            Ok(record) => record,
            Err(e) => match *e {
                bincode::ErrorKind::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(index, expected = report.expected, "Environment stream ended early");
                    report.truncated = true;
                    break;
                }
                bincode::ErrorKind::Io(io) => return Err(io.into()),
                other => {
                    warn!(index, error = %other, "Unreadable record frame, stopping");
                    report.truncated = true;
                    break;
                }
            },
        };

        match types.decode(&record.type_tag, &record.payload) {
            Some(Ok(value)) => {
                sink(record.key, value);
                report.loaded += 1;
            }
            Some(Err(e)) => {
                warn!(key = %record.key, tag = %record.type_tag, error = %format_error(&*e), "Undecodable record skipped");
                report.skipped += 1;
            }
            None => {
                warn!(key = %record.key, tag = %record.type_tag, "Record of unregistered type skipped");
                report.skipped += 1;
            }
        }
    }

    debug!(
        expected = report.expected,
        loaded = report.loaded,
        skipped = report.skipped,
        "Read environment records"
    );
    Ok(report)
}
