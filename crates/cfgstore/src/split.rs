//! Split-file persistence
//!
//! One logical store spread over several files. Saving writes, for every
//! [`PartitionFile`], the entries whose key starts with its prefix. Loading
//! merges every listed file in order, whatever its prefix, so the file listed
//! last wins when keys overlap.
//!
//! A prefix matching nothing still truncates its file, and two descriptors
//! with the same prefix receive the same entries.

use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::configuration::Configuration;
use crate::environment::Environment;
use crate::error::{ConfigError, IoOperation, Result};
use crate::properties;

/// One file of a split store
///
/// Two descriptors are equal when prefix and path match; the comment is
/// not compared.
#[derive(Debug, Clone)]
pub struct PartitionFile {
    prefix: String,
    path: PathBuf,
    comment: String,
}

impl PartitionFile {
    pub fn new(prefix: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            path: path.into(),
            comment: String::new(),
        }
    }

    /// Comment written at the top of a settings file
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }
}

impl PartialEq for PartitionFile {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix && self.path == other.path
    }
}

impl Eq for PartitionFile {}

impl Hash for PartitionFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prefix.hash(state);
        self.path.hash(state);
    }
}

impl std::fmt::Display for PartitionFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[prefix: {}; file: {}]", self.prefix, self.path.display())
    }
}

/// A store that can be saved to and loaded from several files
pub trait Splittable {
    /// Write each file with the entries matching its prefix
    fn save_split(&self, files: &[PartitionFile]) -> Result<()>;

    /// Merge every file into the store, in order
    fn load_split(&self, files: &[PartitionFile]) -> Result<()>;
}

fn create(file: &PartitionFile) -> Result<BufWriter<File>> {
    File::create(&file.path)
        .map(BufWriter::new)
        .map_err(|e| ConfigError::io_error(&file.path, IoOperation::Write, e))
}

fn open(file: &PartitionFile) -> Result<BufReader<File>> {
    File::open(&file.path)
        .map(BufReader::new)
        .map_err(|e| ConfigError::io_error(&file.path, IoOperation::Read, e))
}

/// Attach the file path to stream errors
fn with_path(file: &PartitionFile, operation: IoOperation, error: ConfigError) -> ConfigError {
    match error {
        ConfigError::Io(source) => ConfigError::io_error(&file.path, operation, source),
        other => other,
    }
}

impl Splittable for Configuration {
    fn save_split(&self, files: &[PartitionFile]) -> Result<()> {
        for file in files {
            let entries = self.entries_with_prefix(&file.prefix);
            let mut writer = create(file)?;
            properties::write_entries(
                &mut writer,
                Some(file.comment.as_str()),
                entries.iter().map(|(key, value)| (key, value)),
            )
            .map_err(|e| with_path(file, IoOperation::Write, e))?;
            debug!(file = %file, entries = entries.len(), "Saved settings partition");
        }
        Ok(())
    }

    fn load_split(&self, files: &[PartitionFile]) -> Result<()> {
        for file in files {
            let mut reader = open(file)?;
            self.load(&mut reader)
                .map_err(|e| with_path(file, IoOperation::Read, e))?;
            debug!(file = %file, "Loaded settings partition");
        }
        Ok(())
    }
}

impl Splittable for Environment {
    fn save_split(&self, files: &[PartitionFile]) -> Result<()> {
        for file in files {
            let mut writer = create(file)?;
            let written = self
                .save_with_prefix(&mut writer, &file.prefix)
                .map_err(|e| with_path(file, IoOperation::Write, e))?;
            writer
                .flush()
                .map_err(|e| ConfigError::io_error(&file.path, IoOperation::Write, e))?;
            debug!(file = %file, records = written, "Saved environment partition");
        }
        Ok(())
    }

    fn load_split(&self, files: &[PartitionFile]) -> Result<()> {
        for file in files {
            let mut reader = open(file)?;
            let report = self
                .load(&mut reader)
                .map_err(|e| with_path(file, IoOperation::Read, e))?;
            debug!(file = %file, loaded = report.loaded, skipped = report.skipped, "Loaded environment partition");
        }
        Ok(())
    }
}
