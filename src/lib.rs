// SPDX-License-Identifier: GPL-3.0-or-later

//! Loader for PRISM downloadable configuration tables: validates a table
//! of (address, value) words and streams it, in order, to a register sink.

#[macro_use]
extern crate log;

pub mod applier;
pub mod chroma;
pub mod config;
pub mod container;
pub mod error;
pub mod image;
pub mod peripherals;
pub mod session;
pub mod sinks;
pub mod util;
pub mod validator;

pub use applier::{ApplyReport, ImageApplier, RegisterSink, CONTROL_REGISTER_ADDRESS};
pub use error::{ApplyError, Error, HardwareWriteError, ValidationError};
pub use image::{ConfigEntry, ConfigImage, RawTable};
pub use validator::{ImageValidator, SUPPORTED_WIDTHS};

/// Validates `table` and applies it to `sink`. Nothing reaches the sink
/// unless the whole table validates.
pub fn program<S: RegisterSink>(
    table: &RawTable,
    validator: &ImageValidator,
    applier: &ImageApplier,
    sink: &mut S,
) -> error::Result<ApplyReport> {
    let image = table.validate(validator)?;
    Ok(applier.apply(&image, sink)?)
}
