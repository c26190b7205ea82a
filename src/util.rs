// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::prelude::*;
use std::path::Path;
use anyhow::{Context, Result};

use crate::{chroma, container, error, image::RawTable};

pub fn read_file(path: &str) -> Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path))?;

    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .with_context(|| format!("Failed to read {}", path))?;

    Ok(buf)
}

pub fn read_file_str(path: &str) -> Result<String> {
    let content = read_file(path)?;
    let str = String::from_utf8(content)
        .with_context(|| format!("{} is not valid UTF-8", path))?;
    Ok(str)
}

pub fn write_file(path: &str, content: &[u8]) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path))
}

/// C sources go through the table parser, anything else is taken to be a
/// packed container.
pub fn parse_table(path: &Path, content: &[u8]) -> error::Result<RawTable> {
    let is_c = matches!(path.extension().and_then(|e| e.to_str()), Some("c" | "h"));

    if is_c {
        Ok(chroma::parse(&String::from_utf8_lossy(content))?)
    } else {
        let name = path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        Ok(container::decode(name, content)?)
    }
}

pub fn load_table(path: &str) -> Result<RawTable> {
    let content = read_file(path)?;
    let table = parse_table(Path::new(path), &content)
        .with_context(|| format!("Failed to parse {}", path))?;

    debug!("Loaded table={} from file={} words={} count={} width={}",
        table.name, path, table.words.len(), table.count, table.width);

    Ok(table)
}
