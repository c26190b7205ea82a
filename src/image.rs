// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::ValidationError;
use crate::validator::ImageValidator;

/// One (address, value) pair of a configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigEntry {
    pub address: u32,
    pub value: u32,
}

impl ConfigEntry {
    pub fn new(address: u32, value: u32) -> Self {
        Self { address, value }
    }
}

/// A validated configuration image. Only `ImageValidator` builds these, and
/// nothing mutates one afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigImage {
    entries: Vec<ConfigEntry>,
    width: u32,
    control: Option<u32>,
}

impl ConfigImage {
    pub(crate) fn new(entries: Vec<ConfigEntry>, width: u32, control: Option<u32>) -> Self {
        Self { entries, width, control }
    }

    /// Entries in write order
    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn control_value(&self) -> Option<u32> {
        self.control
    }

    /// Flattens the entries back into `[address, value, address, value, ..]`.
    pub fn to_words(&self) -> Vec<u32> {
        self.entries.iter()
            .flat_map(|e| [e.address, e.value])
            .collect()
    }
}

/// An unvalidated table as it comes out of the compiler: the word array plus
/// its out-of-band metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub name: String,
    pub words: Vec<u32>,
    pub count: u32,
    pub width: u32,
    pub control: Option<u32>,
    /// Hardware description the table was compiled from, when known
    pub source: Option<String>,
    /// Pin/config file used by the compiler, when known
    pub pin_config: Option<String>,
}

impl RawTable {
    pub fn validate(&self, validator: &ImageValidator) -> Result<ConfigImage, ValidationError> {
        validator.validate(&self.words, self.count, self.width, self.control)
    }
}
