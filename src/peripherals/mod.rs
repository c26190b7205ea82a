// SPDX-License-Identifier: GPL-3.0-or-later

pub mod prism;

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Result};

use crate::error::HardwareWriteError;

/// Host register writes issued so far, across all buses. Shown in log lines.
pub static NUM_WRITES: AtomicU64 = AtomicU64::new(0);

/// Word-wide access to a host register space.
pub trait HostBus {
    fn read_word(&mut self, addr: u32) -> u32;
    fn write_word(&mut self, addr: u32, value: u32) -> Result<(), HardwareWriteError>;
}

pub trait Peripheral {
    fn name(&self) -> &str;
    /// Bytes of register space claimed
    fn size(&self) -> u32;
    fn reg_name(&self, offset: u32) -> String;
    fn read(&mut self, offset: u32) -> u32;
    fn write(&mut self, offset: u32, value: u32) -> Result<(), HardwareWriteError>;
    fn reset(&mut self);
}

pub struct PeripheralSlot<T> {
    pub start: u32,
    pub end: u32,
    pub peripheral: T,
}

#[derive(Default)]
pub struct Peripherals {
    peripherals: Vec<PeripheralSlot<Box<dyn Peripheral>>>,
}

impl Peripherals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_peripheral(&mut self, base: u32, p: Box<dyn Peripheral>) -> Result<()> {
        let start = base;
        let end = match base.checked_add(p.size()) {
            Some(end) => end,
            None => bail!("Peripheral {} at base=0x{:08x} does not fit the address space", p.name(), base),
        };

        debug!("Peripheral base=0x{:08x} name={}", base, p.name());

        let index = self.peripherals.partition_point(|s| s.start < start);
        if let Some(prev) = index.checked_sub(1).and_then(|i| self.peripherals.get(i)) {
            if prev.end > start {
                bail!("Overlapping register blocks between {} and {}", prev.peripheral.name(), p.name());
            }
        }
        if let Some(next) = self.peripherals.get(index) {
            if end > next.start {
                bail!("Overlapping register blocks between {} and {}", p.name(), next.peripheral.name());
            }
        }

        self.peripherals.insert(index, PeripheralSlot { start, end, peripheral: p });
        Ok(())
    }

    pub fn get_peripheral<T>(peripherals: &mut [PeripheralSlot<T>], addr: u32) -> Option<&mut PeripheralSlot<T>> {
        let index = peripherals.binary_search_by_key(&addr, |p| p.start)
            .map_or_else(|e| e.checked_sub(1), Some);

        index.and_then(|i| peripherals.get_mut(i).filter(|p| addr < p.end))
    }

    pub fn addr_desc(&mut self, addr: u32) -> String {
        if let Some(p) = Self::get_peripheral(&mut self.peripherals, addr) {
            format!("addr=0x{:08x} block={} reg={}", addr, p.peripheral.name(), p.peripheral.reg_name(addr - p.start))
        } else {
            format!("addr=0x{:08x} block=????", addr)
        }
    }

    pub fn reset(&mut self) {
        for p in &mut self.peripherals {
            debug!("{} reset", p.peripheral.name());
            p.peripheral.reset();
        }
    }
}

impl HostBus for Peripherals {
    fn read_word(&mut self, addr: u32) -> u32 {
        if log::log_enabled!(log::Level::Trace) {
            let desc = self.addr_desc(addr);
            trace!("read:  {}", desc);
        }

        if let Some(p) = Self::get_peripheral(&mut self.peripherals, addr) {
            p.peripheral.read(addr - p.start)
        } else {
            warn!("read of unmapped addr=0x{:08x}", addr);
            0
        }
    }

    fn write_word(&mut self, addr: u32, value: u32) -> Result<(), HardwareWriteError> {
        NUM_WRITES.fetch_add(1, Ordering::Relaxed);

        if log::log_enabled!(log::Level::Trace) {
            let desc = self.addr_desc(addr);
            trace!("write: {} value=0x{:08x}", desc, value);
        }

        if let Some(p) = Self::get_peripheral(&mut self.peripherals, addr) {
            p.peripheral.write(addr - p.start, value)
        } else {
            warn!("write to unmapped addr=0x{:08x} value=0x{:08x}", addr, value);
            Err(HardwareWriteError::bus(format!("no peripheral at 0x{:08x}", addr)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::prism::{Prism, PrismConfig, PrismReg};

    fn prism() -> Box<dyn Peripheral> {
        Box::new(Prism::new(PrismConfig::default()))
    }

    #[test]
    fn lookup_by_address() {
        let mut bus = Peripherals::new();
        bus.register_peripheral(0x1000, prism()).unwrap();
        bus.register_peripheral(0x0000, prism()).unwrap();

        bus.write_word(0x1000 + PrismReg::Ctrl as u32, 7).unwrap();
        assert_eq!(bus.read_word(0x1000), 7);
        assert_eq!(bus.read_word(0x0000), 0);
    }

    #[test]
    fn unmapped_write_fails() {
        let mut bus = Peripherals::new();
        bus.register_peripheral(0x1000, prism()).unwrap();

        assert!(matches!(bus.write_word(0x0ffc, 1), Err(HardwareWriteError::Bus { .. })));
        assert!(matches!(bus.write_word(0x2000, 1), Err(HardwareWriteError::Bus { .. })));
        assert_eq!(bus.read_word(0x2000), 0);
    }

    #[test]
    fn overlap_rejected() {
        let mut bus = Peripherals::new();
        bus.register_peripheral(0x1000, prism()).unwrap();
        assert!(bus.register_peripheral(0x1010, prism()).is_err());
        assert!(bus.register_peripheral(0x0ff0, prism()).is_err());
    }
}
