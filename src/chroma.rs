// SPDX-License-Identifier: GPL-3.0-or-later

//! Reader for the C tables emitted by the PRISM compiler:
//!
//! ```c
//! const uint32_t chroma_gpio24[] = { 0x000003c0, 0x08000000, ... };
//! const uint32_t chroma_gpio24_count = 8;
//! const uint32_t chroma_gpio24_width = 44;
//! const uint32_t chroma_gpio24_ctrlReg = 0x00002912;  // optional
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::image::RawTable;

lazy_static! {
    static ref BLOCK_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    static ref LINE_COMMENT: Regex = Regex::new(r"//[^\n]*").unwrap();
    static ref HEADER_FIELD: Regex = Regex::new(r"(?m)^\s*(Input|Config):\s*(\S+)\s*$").unwrap();
    static ref TABLE: Regex = Regex::new(
        r"const\s+uint32_t\s+([A-Za-z_]\w*)\s*\[\s*\d*\s*\]\s*=\s*\{([^}]*)\}\s*;").unwrap();
    static ref SCALAR: Regex = Regex::new(
        r"const\s+uint32_t\s+([A-Za-z_]\w*)\s*=\s*([0-9A-Za-z_]+)\s*;").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChromaError {
    #[error("no `const uint32_t NAME[] = {{ ... }};` table found")]
    MissingTable,

    #[error("missing constant {0}")]
    MissingScalar(String),

    #[error("invalid literal `{literal}` in {context}")]
    BadNumber {
        literal: String,
        context: String,
    },
}

pub fn parse_literal(s: &str) -> Option<u32> {
    let s = s.trim();
    let s = s.trim_end_matches(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn number(literal: &str, context: &str) -> Result<u32, ChromaError> {
    parse_literal(literal).ok_or_else(|| ChromaError::BadNumber {
        literal: literal.trim().to_string(),
        context: context.to_string(),
    })
}

pub fn parse(text: &str) -> Result<RawTable, ChromaError> {
    let mut source = None;
    let mut pin_config = None;
    for comment in BLOCK_COMMENT.find_iter(text) {
        for cap in HEADER_FIELD.captures_iter(comment.as_str()) {
            match &cap[1] {
                "Input" => source = Some(cap[2].to_string()),
                _ => pin_config = Some(cap[2].to_string()),
            }
        }
    }

    let code = BLOCK_COMMENT.replace_all(text, " ");
    let code = LINE_COMMENT.replace_all(&code, " ");

    let table = TABLE.captures(&code).ok_or(ChromaError::MissingTable)?;
    let name = table[1].to_string();

    let words = table[2].split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(|w| number(w, &name))
        .collect::<Result<Vec<_>, _>>()?;

    let scalar = |suffix: &str| -> Result<Option<u32>, ChromaError> {
        let wanted = format!("{}_{}", name, suffix);
        SCALAR.captures_iter(&code)
            .find(|cap| cap[1] == wanted)
            .map(|cap| number(&cap[2], &wanted))
            .transpose()
    };

    let count = scalar("count")?.ok_or_else(|| ChromaError::MissingScalar(format!("{}_count", name)))?;
    let width = scalar("width")?.ok_or_else(|| ChromaError::MissingScalar(format!("{}_width", name)))?;
    let control = scalar("ctrlReg")?;

    Ok(RawTable { name, words, count, width, control, source, pin_config })
}
