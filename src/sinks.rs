// SPDX-License-Identifier: GPL-3.0-or-later

use crate::applier::RegisterSink;
use crate::error::HardwareWriteError;
use crate::peripherals::{HostBus, prism::PrismReg};

/// Drives a PRISM block through its host registers: each configuration
/// entry goes through the CFG_ADDR/CFG_DATA pair, the control write goes
/// straight to the addressed register.
pub struct HostBusSink<'a, B: HostBus> {
    bus: &'a mut B,
    base: u32,
}

impl<'a, B: HostBus> HostBusSink<'a, B> {
    pub fn new(bus: &'a mut B, base: u32) -> Self {
        Self { bus, base }
    }

    fn reg(&self, offset: u32) -> Result<u32, HardwareWriteError> {
        self.base.checked_add(offset).ok_or_else(|| HardwareWriteError::bus(
            format!("offset 0x{:08x} past base 0x{:08x} leaves the address space", offset, self.base)))
    }
}

impl<B: HostBus> RegisterSink for HostBusSink<'_, B> {
    fn write(&mut self, address: u32, value: u32) -> Result<(), HardwareWriteError> {
        let cfg_addr = self.reg(PrismReg::CfgAddr as u32)?;
        let cfg_data = self.reg(PrismReg::CfgData as u32)?;
        self.bus.write_word(cfg_addr, address)?;
        self.bus.write_word(cfg_data, value)
    }

    fn write_control(&mut self, address: u32, value: u32) -> Result<(), HardwareWriteError> {
        let reg = self.reg(address)?;
        self.bus.write_word(reg, value)
    }
}

/// Logs every write on its way to the inner sink.
pub struct TraceSink<S> {
    inner: S,
    name: String,
    count: usize,
}

impl<S: RegisterSink> TraceSink<S> {
    pub fn new(name: &str, inner: S) -> Self {
        Self { inner, name: name.to_string(), count: 0 }
    }

    /// Writes forwarded so far, failed ones included
    pub fn count(&self) -> usize {
        self.count
    }
}

impl<S: RegisterSink> RegisterSink for TraceSink<S> {
    fn write(&mut self, address: u32, value: u32) -> Result<(), HardwareWriteError> {
        trace!("{} #{} entry addr=0x{:08x} value=0x{:08x}", self.name, self.count, address, value);
        self.count += 1;
        self.inner.write(address, value)
    }

    fn write_control(&mut self, address: u32, value: u32) -> Result<(), HardwareWriteError> {
        trace!("{} #{} control addr=0x{:08x} value=0x{:08x}", self.name, self.count, address, value);
        self.count += 1;
        self.inner.write_control(address, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Entry { address: u32, value: u32 },
    Control { address: u32, value: u32 },
}

/// Keeps the write sequence in memory. Used for dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    writes: Vec<Write>,
    attempts: usize,
    fail_at: Option<usize>,
    fail_control: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the entry write with this zero-based ordinal.
    pub fn failing_at(ordinal: usize) -> Self {
        Self { fail_at: Some(ordinal), ..Self::default() }
    }

    pub fn fail_control(mut self) -> Self {
        self.fail_control = true;
        self
    }

    /// Writes that were accepted, in order
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }
}

impl RegisterSink for RecordingSink {
    fn write(&mut self, address: u32, value: u32) -> Result<(), HardwareWriteError> {
        let ordinal = self.attempts;
        self.attempts += 1;
        if self.fail_at == Some(ordinal) {
            return Err(HardwareWriteError::Rejected { address });
        }
        self.writes.push(Write::Entry { address, value });
        Ok(())
    }

    fn write_control(&mut self, address: u32, value: u32) -> Result<(), HardwareWriteError> {
        if self.fail_control {
            return Err(HardwareWriteError::Rejected { address });
        }
        self.writes.push(Write::Control { address, value });
        Ok(())
    }
}
