// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ApplyError, HardwareWriteError};
use crate::image::ConfigImage;

/// Offset of the PRISM control register.
pub const CONTROL_REGISTER_ADDRESS: u32 = 0x00;

/// Where the applier sends its writes.
pub trait RegisterSink {
    fn write(&mut self, address: u32, value: u32) -> Result<(), HardwareWriteError>;

    /// The post-load control write. Sinks whose control register sits on a
    /// different path than the configuration words override this.
    fn write_control(&mut self, address: u32, value: u32) -> Result<(), HardwareWriteError> {
        self.write(address, value)
    }
}

impl<S: RegisterSink + ?Sized> RegisterSink for &mut S {
    fn write(&mut self, address: u32, value: u32) -> Result<(), HardwareWriteError> {
        (**self).write(address, value)
    }

    fn write_control(&mut self, address: u32, value: u32) -> Result<(), HardwareWriteError> {
        (**self).write_control(address, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub entries_written: usize,
    pub control_written: bool,
}

/// Streams a validated image to a sink, one entry at a time, in order.
#[derive(Debug, Clone)]
pub struct ImageApplier {
    control_address: u32,
}

impl Default for ImageApplier {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageApplier {
    pub fn new() -> Self {
        Self { control_address: CONTROL_REGISTER_ADDRESS }
    }

    pub fn with_control_address(control_address: u32) -> Self {
        Self { control_address }
    }

    pub fn control_address(&self) -> u32 {
        self.control_address
    }

    pub fn apply<S: RegisterSink>(&self, image: &ConfigImage, sink: &mut S) -> Result<ApplyReport, ApplyError> {
        self.apply_until(image, sink, &AtomicBool::new(false))
    }

    /// Like `apply`, but checks `cancel` before each entry and before the
    /// control write. A write in flight is never interrupted.
    pub fn apply_until<S: RegisterSink>(
        &self,
        image: &ConfigImage,
        sink: &mut S,
        cancel: &AtomicBool,
    ) -> Result<ApplyReport, ApplyError> {
        for (index, entry) in image.entries().iter().enumerate() {
            if cancel.load(Ordering::Acquire) {
                debug!("apply cancelled completed={}", index);
                return Err(ApplyError::Cancelled { completed: index });
            }

            sink.write(entry.address, entry.value).map_err(|source| {
                debug!("entry write failed index={} address=0x{:08x}: {}", index, entry.address, source);
                ApplyError::EntryWrite { index, source }
            })?;
        }

        let entries_written = image.entry_count();

        let control_written = match image.control_value() {
            Some(value) => {
                if cancel.load(Ordering::Acquire) {
                    debug!("apply cancelled before control write");
                    return Err(ApplyError::Cancelled { completed: entries_written });
                }

                sink.write_control(self.control_address, value).map_err(|source| {
                    ApplyError::ControlWriteFailed { entries_applied: entries_written, source }
                })?;
                true
            }
            None => false,
        };

        Ok(ApplyReport { entries_written, control_written })
    }
}
