//! End-to-end loading of the sample tables in chromas/

use prism_loader::applier::ImageApplier;
use prism_loader::config::{Config, Image};
use prism_loader::peripherals::HostBus;
use prism_loader::peripherals::prism::{PrismConfig, PrismReg, CTRL_RESET};
use prism_loader::session::Session;
use prism_loader::sinks::{RecordingSink, Write};
use prism_loader::util::load_table;
use prism_loader::{ApplyError, ImageValidator};

fn chroma(name: &str) -> String {
    format!("{}/chromas/{}.c", env!("CARGO_MANIFEST_DIR"), name)
}

fn image(name: &str) -> Image {
    Image { file: chroma(name), control: None, control_address: None, retries: 0, verify: true }
}

fn config(prism: PrismConfig, images: Vec<Image>) -> Config {
    Config { prism, widths: None, images }
}

#[test]
fn sample_tables_validate() {
    let gpio24 = load_table(&chroma("chroma_gpio24")).unwrap();
    assert_eq!(gpio24.source.as_deref(), Some("chroma_gpio24.sv"));
    let image = gpio24.validate(&ImageValidator::new()).unwrap();
    assert_eq!(image.entry_count(), 8);
    assert_eq!(image.width(), 44);
    assert_eq!(image.control_value(), None);
    assert_eq!(image.to_words(), gpio24.words);

    let spislave = load_table(&chroma("chroma_spislave")).unwrap();
    let image = spislave.validate(&ImageValidator::new()).unwrap();
    assert_eq!(image.control_value(), Some(0x2912));
    assert_eq!(image.entries()[2].address, 0x141);
}

#[test]
fn plan_matches_table_order() {
    let table = load_table(&chroma("chroma_spislave")).unwrap();
    let image = table.validate(&ImageValidator::new()).unwrap();

    let mut sink = RecordingSink::new();
    ImageApplier::new().apply(&image, &mut sink).unwrap();

    let mut expected: Vec<Write> = table.words.chunks(2)
        .map(|p| Write::Entry { address: p[0], value: p[1] })
        .collect();
    expected.push(Write::Control { address: 0x00, value: 0x2912 });
    assert_eq!(sink.writes(), expected.as_slice());
}

#[test]
fn session_loads_and_releases_fabric() {
    let mut gpio24 = image("chroma_gpio24");
    gpio24.control = Some(0x2598_0000);
    let config = config(PrismConfig::default(), vec![gpio24]);

    let mut session = Session::new(&config).unwrap();
    let report = session.load_image(&config.images[0]).unwrap();
    assert_eq!(report.entries_written, 8);
    assert!(report.control_written);

    let bus = session.bus();
    assert_eq!(bus.read_word(PrismReg::Ctrl as u32), 0x2598_0000);
    assert_eq!(bus.read_word(PrismReg::CfgAddr as u32), 0x3c0);
    assert_eq!(bus.read_word(PrismReg::CfgData as u32), 0x0800_0000);
}

#[test]
fn session_without_control_stays_in_reset() {
    let config = config(PrismConfig::default(), vec![image("chroma_gpio24")]);

    let mut session = Session::new(&config).unwrap();
    let report = session.load_image(&config.images[0]).unwrap();
    assert!(!report.control_written);
    assert_eq!(session.bus().read_word(PrismReg::Ctrl as u32), CTRL_RESET);
}

#[test]
fn retry_restarts_from_first_entry() {
    let prism = PrismConfig { fail_write: Some(5), ..PrismConfig::default() };
    let mut spislave = image("chroma_spislave");
    spislave.retries = 1;
    let config = config(prism, vec![spislave]);

    let mut session = Session::new(&config).unwrap();
    let report = session.load_image(&config.images[0]).unwrap();
    assert_eq!(report.entries_written, 8);
    assert_eq!(session.bus().read_word(PrismReg::Ctrl as u32), 0x2912);
}

#[test]
fn failure_without_retries_reports_index() {
    let prism = PrismConfig { fail_write: Some(5), ..PrismConfig::default() };
    let config = config(prism, vec![image("chroma_spislave")]);

    let mut session = Session::new(&config).unwrap();
    let err = session.load_image(&config.images[0]).unwrap_err();
    let apply = err.downcast_ref::<ApplyError>().unwrap();
    assert!(matches!(apply, ApplyError::EntryWrite { index: 5, .. }));
    assert_eq!(apply.completed(), 5);
}

#[test]
fn shallow_chain_verifies_tail() {
    let prism = PrismConfig { depth: 4, ..PrismConfig::default() };
    let config = config(prism, vec![image("chroma_gpio24")]);

    let mut session = Session::new(&config).unwrap();
    session.load_image(&config.images[0]).unwrap();
    // 8 entries through a depth-4 chain leaves entry 4 at the head
    assert_eq!(session.bus().read_word(PrismReg::CfgAddr as u32), 0x140);
}

#[test]
fn control_write_to_unmapped_register_fails_after_bulk() {
    let mut spislave = image("chroma_spislave");
    spislave.control_address = Some(0x1000);
    spislave.retries = 3;
    let config = config(PrismConfig::default(), vec![spislave]);

    let mut session = Session::new(&config).unwrap();
    let err = session.load_image(&config.images[0]).unwrap_err();
    let apply = err.downcast_ref::<ApplyError>().unwrap();
    assert!(apply.bulk_applied());
    assert_eq!(apply.completed(), 8);
}

#[test]
fn zero_depth_chain_is_rejected() {
    let prism = PrismConfig { depth: 0, ..PrismConfig::default() };
    let config = config(prism, vec![image("chroma_gpio24")]);

    assert!(Session::new(&config).is_err());
}

#[test]
fn unbounded_retries_succeed_on_first_attempt() {
    let mut gpio24 = image("chroma_gpio24");
    gpio24.retries = u32::MAX;
    let config = config(PrismConfig::default(), vec![gpio24]);

    let mut session = Session::new(&config).unwrap();
    assert_eq!(session.load_image(&config.images[0]).unwrap().entries_written, 8);
}

#[test]
fn unbounded_retries_with_fault_recover() {
    let prism = PrismConfig { fail_write: Some(0), ..PrismConfig::default() };
    let mut spislave = image("chroma_spislave");
    spislave.retries = u32::MAX;
    let config = config(prism, vec![spislave]);

    let mut session = Session::new(&config).unwrap();
    assert_eq!(session.load_image(&config.images[0]).unwrap().entries_written, 8);
}
