// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::ValidationError;
use crate::image::{ConfigEntry, ConfigImage};

/// Widths the compiler emits. 44 is the TinyQV PRISM config word: a 12-bit
/// selector over a 32-bit payload.
pub const SUPPORTED_WIDTHS: &[u32] = &[8, 16, 24, 32, 44];

/// Turns a raw word table and its metadata into a `ConfigImage`.
#[derive(Debug, Clone)]
pub struct ImageValidator {
    widths: Vec<u32>,
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageValidator {
    pub fn new() -> Self {
        Self::with_widths(SUPPORTED_WIDTHS)
    }

    pub fn with_widths(widths: &[u32]) -> Self {
        Self { widths: widths.to_vec() }
    }

    pub fn supported_widths(&self) -> &[u32] {
        &self.widths
    }

    /// All-or-nothing: the first failed check is returned and no image is
    /// produced.
    pub fn validate(
        &self,
        raw_words: &[u32],
        declared_count: u32,
        declared_width: u32,
        declared_control: Option<u32>,
    ) -> Result<ConfigImage, ValidationError> {
        if declared_count == 0 {
            return Err(ValidationError::EmptyImage);
        }

        if !self.widths.contains(&declared_width) {
            return Err(ValidationError::UnsupportedWidth { width: declared_width });
        }

        if raw_words.len() % 2 != 0 {
            return Err(ValidationError::MalformedImage { words: raw_words.len() });
        }

        if raw_words.len() as u64 != 2 * declared_count as u64 {
            return Err(ValidationError::CountMismatch {
                declared: declared_count,
                words: raw_words.len(),
            });
        }

        let mut entries = Vec::with_capacity(declared_count as usize);
        for (index, pair) in raw_words.chunks_exact(2).enumerate() {
            let entry = ConfigEntry::new(pair[0], pair[1]);
            if !fits(entry.value, declared_width) {
                return Err(ValidationError::ValueOutOfRange {
                    index,
                    value: entry.value,
                    width: declared_width,
                });
            }
            entries.push(entry);
        }

        trace!("validated image entries={} width={} control={:x?}",
            entries.len(), declared_width, declared_control);

        Ok(ConfigImage::new(entries, declared_width, declared_control))
    }
}

fn fits(value: u32, width: u32) -> bool {
    // u32 >> 32 would overflow
    width >= 64 || (value as u64) >> width == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPIO24_HEAD: [u32; 4] = [0x0000_03c0, 0x0800_0000, 0x0000_0140, 0x0801_0010];

    #[test]
    fn accepts_well_formed_table() {
        let image = ImageValidator::new().validate(&GPIO24_HEAD, 2, 44, None).unwrap();
        assert_eq!(image.entries(), &[
            ConfigEntry::new(0x3c0, 0x0800_0000),
            ConfigEntry::new(0x140, 0x0801_0010),
        ]);
        assert_eq!(image.width(), 44);
        assert_eq!(image.to_words(), GPIO24_HEAD.to_vec());
    }

    #[test]
    fn count_mismatch() {
        let err = ImageValidator::new().validate(&GPIO24_HEAD, 3, 44, None).unwrap_err();
        assert_eq!(err, ValidationError::CountMismatch { declared: 3, words: 4 });

        let err = ImageValidator::new().validate(&GPIO24_HEAD, 1, 44, None).unwrap_err();
        assert_eq!(err, ValidationError::CountMismatch { declared: 1, words: 4 });
    }

    #[test]
    fn odd_length_is_malformed() {
        let err = ImageValidator::new().validate(&GPIO24_HEAD[..3], 2, 44, None).unwrap_err();
        assert_eq!(err, ValidationError::MalformedImage { words: 3 });
    }

    #[test]
    fn checks_run_in_order() {
        let v = ImageValidator::new();
        // empty wins over a bad width
        assert_eq!(v.validate(&[], 0, 7, None), Err(ValidationError::EmptyImage));
        // bad width wins over an odd length
        assert_eq!(v.validate(&[1, 2, 3], 2, 7, None), Err(ValidationError::UnsupportedWidth { width: 7 }));
        // odd length wins over a count mismatch
        assert_eq!(v.validate(&[1, 2, 3], 5, 32, None), Err(ValidationError::MalformedImage { words: 3 }));
    }

    #[test]
    fn value_out_of_range_names_first_offender() {
        let words = [0x10, 0xff, 0x11, 0x100, 0x12, 0x200];
        let err = ImageValidator::new().validate(&words, 3, 8, None).unwrap_err();
        assert_eq!(err, ValidationError::ValueOutOfRange { index: 1, value: 0x100, width: 8 });
    }

    #[test]
    fn wide_widths_accept_any_word() {
        let words = [0xffff_ffff, 0xffff_ffff];
        assert!(ImageValidator::new().validate(&words, 1, 32, None).is_ok());
        assert!(ImageValidator::new().validate(&words, 1, 44, None).is_ok());
        assert!(ImageValidator::new().validate(&words, 1, 24, None).is_err());
    }

    #[test]
    fn huge_declared_count_does_not_overflow() {
        let err = ImageValidator::new().validate(&GPIO24_HEAD, u32::MAX, 44, None).unwrap_err();
        assert_eq!(err, ValidationError::CountMismatch { declared: u32::MAX, words: 4 });
    }

    #[test]
    fn custom_width_set() {
        let v = ImageValidator::with_widths(&[44]);
        assert_eq!(v.supported_widths(), &[44]);
        assert_eq!(v.validate(&GPIO24_HEAD, 2, 32, None), Err(ValidationError::UnsupportedWidth { width: 32 }));
    }

    #[test]
    fn keeps_control_value() {
        let image = ImageValidator::new().validate(&GPIO24_HEAD, 2, 44, Some(0x2912)).unwrap();
        assert_eq!(image.control_value(), Some(0x2912));
    }
}
