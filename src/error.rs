// SPDX-License-Identifier: GPL-3.0-or-later

//! Error types for image validation and application

use thiserror::Error;

/// Structural problems found before any register is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Declared entry count is zero
    #[error("Empty image: declared entry count is 0")]
    EmptyImage,

    /// Declared width is not one the loader accepts
    #[error("Unsupported width: {width} bits")]
    UnsupportedWidth {
        width: u32,
    },

    /// Raw table cannot be split into (address, value) pairs
    #[error("Malformed image: {words} words is not a whole number of entries")]
    MalformedImage {
        words: usize,
    },

    /// Declared count disagrees with the table length
    #[error("Count mismatch: declared {declared} entries, table holds {words} words")]
    CountMismatch {
        declared: u32,
        words: usize,
    },

    /// A value does not fit in the declared width
    #[error("Value out of range at entry {index}: 0x{value:08x} exceeds {width} bits")]
    ValueOutOfRange {
        index: usize,
        value: u32,
        width: u32,
    },
}

/// Failure reported by a register sink for a single write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareWriteError {
    #[error("write to 0x{address:08x} rejected by device")]
    Rejected {
        address: u32,
    },

    #[error("bus error: {reason}")]
    Bus {
        reason: String,
    },
}

impl HardwareWriteError {
    pub fn bus(reason: impl Into<String>) -> Self {
        Self::Bus { reason: reason.into() }
    }
}

/// Failures while streaming a validated image to a sink.
///
/// Every variant carries enough to tell how far the device got, so the
/// caller can decide between a full retry from entry 0 and a reset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// Entry `index` failed; entries `0..index` were written
    #[error("entry {index} failed: {source}")]
    EntryWrite {
        index: usize,
        #[source]
        source: HardwareWriteError,
    },

    /// All entries were written but the control register write failed
    #[error("control register write failed after {entries_applied} entries: {source}")]
    ControlWriteFailed {
        entries_applied: usize,
        #[source]
        source: HardwareWriteError,
    },

    /// Stopped between entries on request
    #[error("cancelled after {completed} entries")]
    Cancelled {
        completed: usize,
    },
}

impl ApplyError {
    /// Number of entries that reached the sink before the failure.
    pub fn completed(&self) -> usize {
        match self {
            Self::EntryWrite { index, .. } => *index,
            Self::ControlWriteFailed { entries_applied, .. } => *entries_applied,
            Self::Cancelled { completed } => *completed,
        }
    }

    /// True when the bulk configuration made it to the device and only the
    /// trailing control write is missing.
    pub fn bulk_applied(&self) -> bool {
        matches!(self, Self::ControlWriteFailed { .. })
    }
}

/// Crate-wide error
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Table(#[from] crate::chroma::ChromaError),

    #[error(transparent)]
    Container(#[from] crate::container::ContainerError),
}

pub type Result<T> = std::result::Result<T, Error>;
