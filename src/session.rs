// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{bail, Context as _, Result};

use crate::applier::{ApplyReport, ImageApplier};
use crate::config::{self, Config};
use crate::error::ApplyError;
use crate::image::ConfigImage;
use crate::peripherals::{HostBus, Peripherals, prism::{Prism, PrismReg, CTRL_RESET}};
use crate::sinks::{HostBusSink, TraceSink};
use crate::util;
use crate::validator::ImageValidator;

/// An emulated PRISM block on a host bus, and the loader driving it.
pub struct Session {
    bus: Peripherals,
    base: u32,
    depth: usize,
    validator: ImageValidator,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self> {
        if config.prism.depth == 0 {
            bail!("PRISM chain depth must be at least 1");
        }

        let mut bus = Peripherals::new();
        let base = config.prism.base;
        bus.register_peripheral(base, Box::new(Prism::new(config.prism.clone())))
            .context("Failed to map PRISM")?;

        let validator = config.widths.as_deref()
            .map(ImageValidator::with_widths)
            .unwrap_or_default();

        Ok(Self { bus, base, depth: config.prism.depth, validator })
    }

    pub fn bus(&mut self) -> &mut Peripherals {
        &mut self.bus
    }

    pub fn load_image(&mut self, image_config: &config::Image) -> Result<ApplyReport> {
        let mut table = util::load_table(&image_config.file)?;
        if table.control.is_none() {
            table.control = image_config.control;
        }

        let image = table.validate(&self.validator)
            .with_context(|| format!("Invalid image {}", table.name))?;

        info!("Loading image={} entries={} width={} control={}",
            table.name, image.entry_count(), image.width(),
            image.control_value().map_or("none".to_string(), |c| format!("0x{:08x}", c)));

        let applier = image_config.control_address
            .map(ImageApplier::with_control_address)
            .unwrap_or_default();

        let report = self.program(&table.name, &image, &applier, image_config.retries)?;

        if image_config.verify {
            self.verify(&table.name, &image)?;
        }

        Ok(report)
    }

    /// Resets the block and applies the image from entry 0, as many times as
    /// `retries` allows when an entry write fails. A failed control write is
    /// never retried: the bulk configuration is already in place.
    pub fn program(&mut self, name: &str, image: &ConfigImage, applier: &ImageApplier, retries: u32) -> Result<ApplyReport> {
        let attempts = retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            self.bus.reset();
            self.bus.write_word(self.base + PrismReg::Ctrl as u32, CTRL_RESET)
                .context("Failed to hold PRISM in reset")?;

            let mut sink = TraceSink::new(name, HostBusSink::new(&mut self.bus, self.base));
            let result = applier.apply(image, &mut sink);
            debug!("{} attempt={} writes={}", name, attempt, sink.count());

            match result {
                Ok(report) => {
                    info!("Loaded image={} entries={} control={}",
                        name, report.entries_written, report.control_written);
                    return Ok(report);
                }
                Err(e @ ApplyError::EntryWrite { .. }) if attempt < attempts => {
                    warn!("{} attempt {}/{} failed: {}. Restarting from entry 0", name, attempt, attempts, e);
                    attempt += 1;
                }
                Err(e) if e.bulk_applied() => {
                    return Err(e).with_context(|| format!(
                        "Image {} configuration applied but control write failed", name));
                }
                Err(e) => {
                    return Err(e).with_context(|| format!(
                        "Failed to load image {} after {} attempt(s)", name, attempt));
                }
            }
        }
    }

    /// Reads the head of the configuration chain back and checks it against
    /// the entry that should be sitting there.
    pub fn verify(&mut self, name: &str, image: &ConfigImage) -> Result<()> {
        let entries = image.entries();
        let index = entries.len().saturating_sub(self.depth);
        let expected = entries[index];

        let address = self.bus.read_word(self.base + PrismReg::CfgAddr as u32);
        let value = self.bus.read_word(self.base + PrismReg::CfgData as u32);

        if address != expected.address & 0xfff || value != expected.value {
            bail!("Image {} readback mismatch at entry {}: got sel=0x{:03x} data=0x{:08x}, expected sel=0x{:03x} data=0x{:08x}",
                name, index, address, value, expected.address, expected.value);
        }

        debug!("{} readback ok entry={}", name, index);
        Ok(())
    }
}

pub fn run_session(config: Config) -> Result<()> {
    let mut session = Session::new(&config)?;

    for image in &config.images {
        session.load_image(image)?;
    }

    info!("Loaded {} image(s)", config.images.len());
    Ok(())
}
