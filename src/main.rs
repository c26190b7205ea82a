// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use clap::{AppSettings, Parser, Subcommand};
use clap_num::maybe_hex;
use anyhow::{bail, Context, Result};
use env_logger::fmt::Color;
use log::LevelFilter;
use termcolor::{ColorChoice, ColorSpec, StandardStream, WriteColor};

use prism_loader::config::Config;
use prism_loader::container;
use prism_loader::peripherals::NUM_WRITES;
use prism_loader::session::run_session;
use prism_loader::sinks::{self, RecordingSink};
use prism_loader::util::{load_table, read_file_str, write_file};
use prism_loader::{program, ImageApplier, ImageValidator};

#[macro_use]
extern crate log;

/// Validate, inspect and load PRISM configuration tables
#[derive(Parser, Debug)]
#[clap(
    global_setting(AppSettings::DeriveDisplayOrder)
)]
pub struct Args {
    /// Verbosity. Can be repeated
    #[clap(short, long, parse(from_occurrences), global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate one or more tables
    Check {
        #[clap(required = true)]
        files: Vec<String>,
    },

    /// Print a table's metadata and entries
    Dump {
        file: String,
    },

    /// Show the register writes a load would issue, without a device
    Plan {
        file: String,

        /// Control register address
        #[clap(long, parse(try_from_str=maybe_hex))]
        control_address: Option<u32>,
    },

    /// Validate a table and write it as a checksummed container
    Pack {
        file: String,

        #[clap(short, long)]
        output: String,
    },

    /// Load the images listed in a config file into an emulated PRISM block
    Load {
        config: String,
    },
}

fn init_logging(level: u8) {
    let lf = match level {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    static LAST_NUM_WRITES: AtomicU64 = AtomicU64::new(0);

    env_logger::Builder::new()
        .filter_level(lf)
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            let num_writes = NUM_WRITES.load(Relaxed);
            let delta_writes = num_writes - LAST_NUM_WRITES.swap(num_writes, Relaxed);

            let mut style = buf.style();
            let level = match record.level() {
                log::Level::Error => style.set_color(Color::Red).set_intense(true).value("ERROR"),
                log::Level::Warn =>  style.set_color(Color::Yellow).set_intense(true).value("WARN "),
                log::Level::Info =>  style.set_color(Color::Green).set_intense(true).value("INFO "),
                log::Level::Debug => style.set_color(Color::Cyan).set_intense(true).value("DEBUG"),
                log::Level::Trace => style.set_color(Color::Blue).set_intense(true).value("TRACE"),
            };

            let mut style = buf.style();
            match delta_writes {
                0..=15  => { }
                16..=63 => { style.set_color(Color::Yellow); }
                64..    => { style.set_color(Color::Magenta); }
            }
            let delta_writes = style.value(delta_writes);

            writeln!(buf, "[{:06} +{:04}] {} {}", num_writes, delta_writes, level, record.args())
        })
        .init();
}

fn check(files: &[String]) -> Result<()> {
    let validator = ImageValidator::new();
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut failed = 0;

    for file in files {
        let result = load_table(file)
            .and_then(|table| Ok(table.validate(&validator).map(|image| (table, image))?));

        match result {
            Ok((table, image)) => {
                stdout.set_color(ColorSpec::new().set_fg(Some(termcolor::Color::Green)).set_bold(true))?;
                write!(stdout, "OK  ")?;
                stdout.reset()?;
                writeln!(stdout, " {} ({}) entries={} width={}", file, table.name, image.entry_count(), image.width())?;
            }
            Err(e) => {
                failed += 1;
                stdout.set_color(ColorSpec::new().set_fg(Some(termcolor::Color::Red)).set_bold(true))?;
                write!(stdout, "FAIL")?;
                stdout.reset()?;
                writeln!(stdout, " {}: {:#}", file, e)?;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} table(s) failed validation", failed, files.len());
    }
    Ok(())
}

fn dump(file: &str) -> Result<()> {
    let table = load_table(file)?;
    let image = table.validate(&ImageValidator::new())
        .with_context(|| format!("Invalid image {}", table.name))?;

    println!("name:    {}", table.name);
    if let Some(source) = &table.source {
        println!("source:  {} ({})", source, table.pin_config.as_deref().unwrap_or("?"));
    }
    println!("entries: {}", image.entry_count());
    println!("width:   {}", image.width());
    match image.control_value() {
        Some(c) => println!("control: 0x{:08x}", c),
        None => println!("control: none"),
    }
    for (i, e) in image.entries().iter().enumerate() {
        println!("  [{:3}] 0x{:08x} 0x{:08x}", i, e.address, e.value);
    }
    Ok(())
}

fn plan(file: &str, control_address: Option<u32>) -> Result<()> {
    let table = load_table(file)?;
    let applier = control_address
        .map(ImageApplier::with_control_address)
        .unwrap_or_default();

    let mut sink = RecordingSink::new();
    program(&table, &ImageValidator::new(), &applier, &mut sink)
        .with_context(|| format!("Failed to plan {}", table.name))?;

    for (i, w) in sink.writes().iter().enumerate() {
        match w {
            sinks::Write::Entry { address, value } => println!("{:3} entry   0x{:08x} <- 0x{:08x}", i, address, value),
            sinks::Write::Control { address, value } => println!("{:3} control 0x{:08x} <- 0x{:08x}", i, address, value),
        }
    }
    Ok(())
}

fn pack(file: &str, output: &str) -> Result<()> {
    let table = load_table(file)?;
    table.validate(&ImageValidator::new())
        .with_context(|| format!("Invalid image {}", table.name))?;

    let data = container::encode(&table);
    write_file(output, &data)?;
    info!("Packed table={} into file={} bytes={}", table.name, output, data.len());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Check { files } => check(&files),
        Command::Dump { file } => dump(&file),
        Command::Plan { file, control_address } => plan(&file, control_address),
        Command::Pack { file, output } => pack(&file, &output),
        Command::Load { config } => {
            let config: Config = serde_yaml::from_str(&read_file_str(&config)?)
                .with_context(|| format!("Failed to parse {}", config))?;
            run_session(config)
        }
    }
}
