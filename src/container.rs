// SPDX-License-Identifier: GPL-3.0-or-later

//! Checksummed binary container for configuration tables.
//!
//! The compiler's own output carries no length prefix or checksum, so this
//! is an optional transport wrapper. All fields are little-endian:
//!
//! ```text
//! magic   u32   "PRSM"
//! version u16
//! flags   u16   bit 0: control value present
//! count   u32
//! width   u32
//! control u32   0 when absent
//! words   u32 * n
//! crc32   u32   over every preceding byte
//! ```

use bytes::{Buf, BufMut, BytesMut};
use crc32fast::Hasher;
use thiserror::Error;

use crate::image::RawTable;

pub const MAGIC: u32 = 0x4D53_5250;
pub const VERSION: u16 = 1;
pub const FLAG_CONTROL: u16 = 1 << 0;

const HEADER_LEN: usize = 20;
const CRC_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("container truncated: {len} bytes")]
    Truncated {
        len: usize,
    },

    #[error("bad magic 0x{0:08x}")]
    BadMagic(u32),

    #[error("unsupported container version {0}")]
    UnsupportedVersion(u16),

    #[error("checksum mismatch: stored 0x{expected:08x}, computed 0x{actual:08x}")]
    ChecksumMismatch {
        expected: u32,
        actual: u32,
    },

    #[error("payload of {0} bytes is not a whole number of words")]
    Misaligned(usize),
}

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Wraps the table's words and metadata. The table is written as is; run it
/// through the validator first if only well-formed images should be packed.
pub fn encode(table: &RawTable) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + 4 * table.words.len() + CRC_LEN);

    let flags = if table.control.is_some() { FLAG_CONTROL } else { 0 };
    buf.put_u32_le(MAGIC);
    buf.put_u16_le(VERSION);
    buf.put_u16_le(flags);
    buf.put_u32_le(table.count);
    buf.put_u32_le(table.width);
    buf.put_u32_le(table.control.unwrap_or(0));
    for &word in &table.words {
        buf.put_u32_le(word);
    }

    let crc = checksum(&buf);
    buf.put_u32_le(crc);

    buf.to_vec()
}

/// The table comes back unvalidated: count and width are returned exactly
/// as stored.
pub fn decode(name: &str, data: &[u8]) -> Result<RawTable, ContainerError> {
    if data.len() < HEADER_LEN + CRC_LEN {
        return Err(ContainerError::Truncated { len: data.len() });
    }

    let (body, mut trailer) = data.split_at(data.len() - CRC_LEN);
    let mut header = body;

    let magic = header.get_u32_le();
    if magic != MAGIC {
        return Err(ContainerError::BadMagic(magic));
    }

    let version = header.get_u16_le();
    if version != VERSION {
        return Err(ContainerError::UnsupportedVersion(version));
    }

    let expected = trailer.get_u32_le();
    let actual = checksum(body);
    if expected != actual {
        return Err(ContainerError::ChecksumMismatch { expected, actual });
    }

    let flags = header.get_u16_le();
    let count = header.get_u32_le();
    let width = header.get_u32_le();
    let control = header.get_u32_le();

    let mut payload = header;
    if payload.len() % 4 != 0 {
        return Err(ContainerError::Misaligned(payload.len()));
    }

    let mut words = Vec::with_capacity(payload.len() / 4);
    while payload.has_remaining() {
        words.push(payload.get_u32_le());
    }

    Ok(RawTable {
        name: name.to_string(),
        words,
        count,
        width,
        control: (flags & FLAG_CONTROL != 0).then(|| control),
        ..RawTable::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        RawTable {
            name: "chroma_spislave".to_string(),
            words: vec![0x3c0, 0x0800_0000, 0x380, 0x0801_0000],
            count: 2,
            width: 44,
            control: Some(0x2912),
            ..RawTable::default()
        }
    }

    #[test]
    fn layout() {
        let data = encode(&table());
        assert_eq!(data.len(), HEADER_LEN + 16 + CRC_LEN);
        assert_eq!(&data[0..4], b"PRSM");
        assert_eq!(&data[20..24], &0x3c0u32.to_le_bytes());
    }

    #[test]
    fn decode_restores_metadata() {
        let decoded = decode("chroma_spislave", &encode(&table())).unwrap();
        assert_eq!(decoded, table());

        let mut t = table();
        t.control = None;
        assert_eq!(decode("chroma_spislave", &encode(&t)).unwrap().control, None);
    }

    #[test]
    fn detects_corruption() {
        let mut data = encode(&table());
        data[24] ^= 0x01;
        assert!(matches!(decode("x", &data), Err(ContainerError::ChecksumMismatch { .. })));
    }

    #[test]
    fn rejects_foreign_data() {
        assert_eq!(decode("x", &[0; 8]), Err(ContainerError::Truncated { len: 8 }));

        let mut data = encode(&table());
        data[0] = b'X';
        assert!(matches!(decode("x", &data), Err(ContainerError::BadMagic(_))));

        let mut data = encode(&table());
        data[4] = 2;
        assert_eq!(decode("x", &data), Err(ContainerError::UnsupportedVersion(2)));
    }

    #[test]
    fn misaligned_payload() {
        let mut data = encode(&table());
        let len = data.len();
        data.truncate(len - CRC_LEN);
        data.push(0xaa);
        let crc = checksum(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        assert_eq!(decode("x", &data), Err(ContainerError::Misaligned(17)));
    }
}
