// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::VecDeque;

use serde::Deserialize;

use crate::error::HardwareWriteError;
use super::Peripheral;

/// CTRL bit holding the fabric in reset
pub const CTRL_RESET: u32 = 1 << 30;

const SELECTOR_BITS: u32 = 12;
const SELECTOR_MASK: u32 = (1 << SELECTOR_BITS) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[repr(u32)]
pub enum PrismReg {
    Ctrl = 0x00,
    CfgData = 0x10,
    CfgAddr = 0x14,
    ComCtrl = 0x18,
    ShiftOut = 0x20,
    ShiftIn = 0x24,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrismConfig {
    #[serde(default)]
    pub base: u32,
    #[serde(default = "PrismConfig::default_depth")]
    pub depth: usize,
    /// Zero-based CFG_DATA write that gets rejected, once
    pub fail_write: Option<u32>,
}

impl PrismConfig {
    fn default_depth() -> usize {
        8
    }
}

impl Default for PrismConfig {
    fn default() -> Self {
        Self { base: 0, depth: Self::default_depth(), fail_write: None }
    }
}

/// Host side of the PRISM loading interface. Configuration words go into a
/// fixed-depth chain; the oldest word falls out once it is full.
pub struct Prism {
    config: PrismConfig,
    ctrl: u32,
    cfg_addr: u32,
    chain: VecDeque<u64>,
    com_ctrl: u32,
    shift_out: u32,
    shift_in: u32,
    // survives reset so an injected fault only fires once
    data_writes: u32,
    fault_fired: bool,
}

impl Prism {
    pub fn new(config: PrismConfig) -> Self {
        let chain = VecDeque::with_capacity(config.depth);
        Self {
            config,
            ctrl: 0,
            cfg_addr: 0,
            chain,
            com_ctrl: 0,
            shift_out: 0,
            shift_in: 0,
            data_writes: 0,
            fault_fired: false,
        }
    }

    fn in_reset(&self) -> bool {
        self.ctrl & CTRL_RESET != 0
    }

    fn head(&self) -> u64 {
        self.chain.front().copied().unwrap_or(0)
    }

    fn push_config(&mut self, data: u32) -> Result<(), HardwareWriteError> {
        let ordinal = self.data_writes;
        self.data_writes += 1;

        if !self.fault_fired && self.config.fail_write == Some(ordinal) {
            self.fault_fired = true;
            warn!("PRISM injected fault on config write #{}", ordinal);
            return Err(HardwareWriteError::Rejected { address: PrismReg::CfgData as u32 });
        }

        if !self.in_reset() {
            warn!("PRISM config write while fabric is running");
        }

        let word = (self.cfg_addr as u64) << 32 | data as u64;
        while self.chain.len() >= self.config.depth.max(1) {
            self.chain.pop_front();
        }
        self.chain.push_back(word);

        debug!("PRISM config[{}] sel=0x{:03x} data=0x{:08x}", self.chain.len() - 1, self.cfg_addr, data);
        Ok(())
    }

    fn ctrl_changed(&self, old: u32, new: u32) {
        if (old ^ new) & CTRL_RESET != 0 {
            if new & CTRL_RESET != 0 {
                debug!("PRISM held in reset");
            } else {
                info!("PRISM released from reset ctrl=0x{:08x} words={}", new, self.chain.len());
            }
        }
    }
}

impl Peripheral for Prism {
    fn name(&self) -> &str {
        "PRISM"
    }

    fn size(&self) -> u32 {
        0x40
    }

    fn reg_name(&self, offset: u32) -> String {
        let offset = offset - offset % 4;
        PrismReg::try_from(offset)
            .map(|r| format!("{:?} offset=0x{:02x}", r, offset))
            .unwrap_or_else(|_| format!("REG_???? offset=0x{:02x}", offset))
    }

    fn read(&mut self, offset: u32) -> u32 {
        match PrismReg::try_from(offset) {
            Ok(PrismReg::Ctrl) => self.ctrl,
            Ok(PrismReg::CfgData) => self.head() as u32,
            Ok(PrismReg::CfgAddr) => (self.head() >> 32) as u32,
            Ok(PrismReg::ComCtrl) => self.com_ctrl,
            Ok(PrismReg::ShiftOut) => self.shift_out,
            Ok(PrismReg::ShiftIn) => self.shift_in,
            Err(_) => {
                warn!("PRISM invalid offset=0x{:08x}", offset);
                0
            }
        }
    }

    fn write(&mut self, offset: u32, value: u32) -> Result<(), HardwareWriteError> {
        match PrismReg::try_from(offset) {
            Ok(PrismReg::Ctrl) => {
                self.ctrl_changed(self.ctrl, value);
                self.ctrl = value;
            }
            Ok(PrismReg::CfgData) => {
                self.push_config(value)?;
            }
            Ok(PrismReg::CfgAddr) => {
                if value & !SELECTOR_MASK != 0 {
                    warn!("PRISM selector 0x{:08x} truncated to {} bits", value, SELECTOR_BITS);
                }
                self.cfg_addr = value & SELECTOR_MASK;
            }
            Ok(PrismReg::ComCtrl) => self.com_ctrl = value,
            Ok(PrismReg::ShiftOut) => self.shift_out = value,
            Ok(PrismReg::ShiftIn) => self.shift_in = value,
            Err(_) => {
                warn!("PRISM invalid offset=0x{:08x}", offset);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.ctrl = 0;
        self.cfg_addr = 0;
        self.chain.clear();
        self.com_ctrl = 0;
        self.shift_out = 0;
        self.shift_in = 0;
    }
}
