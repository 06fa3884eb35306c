//! Init and shutdown: channel layout, fixed devices, card headers and SRAM
//! persistence.

use std::fs;

use emu_core::{FromThread, Observable};
use nintendo_exi::header::GC_EPOCH;
use nintendo_exi::interface::{self, get_channel};
use nintendo_exi::sram::SRAM_SIZE;
use nintendo_exi::{
    Device, DeviceType, ExiConfig, ExiError, MovieState, Region, Slot, Sram, System,
};

fn config_in(dir: &tempfile::TempDir) -> ExiConfig {
    ExiConfig {
        sram_path: dir.path().join("SRAM.raw"),
        ..ExiConfig::default()
    }
}

#[test]
fn fixed_layout_after_init() {
    let dir = tempfile::tempdir().unwrap();
    let mut system = System::new(config_in(&dir), MovieState::default(), 0);
    interface::init(&mut system, None);

    assert!(system.exi.is_initialized());
    assert_eq!(system.exi.channels().len(), 3);
    assert_eq!(
        get_channel(&system, 0).unwrap().device(1).device_type(),
        DeviceType::MaskRom
    );
    assert_eq!(
        get_channel(&system, 2).unwrap().device(0).device_type(),
        DeviceType::Ad16
    );
    assert_eq!(
        get_channel(&system, 0).unwrap().device(0).device_type(),
        DeviceType::MemoryCardFolder
    );
    assert!(get_channel(&system, 3).is_none());
}

#[test]
fn owned_sram_is_written_back_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let path = config.sram_path.clone();

    let mut stored = Sram::default();
    stored.set_language(5);
    stored.save(&path).unwrap();

    let mut system = System::new(config, MovieState::default(), 0);
    interface::init(&mut system, None);
    assert!(!system.exi.is_sram_overridden());
    assert_eq!(system.sram.language(), 5);

    system.sram.set_rtc_bias(0x1234);
    interface::shutdown(&mut system).unwrap();

    let written = fs::read(&path).unwrap();
    assert_eq!(written.len(), SRAM_SIZE);
    assert_eq!(written.as_slice(), system.sram.as_bytes());
    assert!(!system.exi.is_initialized());
}

#[test]
fn overridden_sram_is_never_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let path = config.sram_path.clone();

    let mut supplied = Sram::default();
    supplied.set_language(2);

    let mut system = System::new(config, MovieState::default(), 0);
    interface::init(&mut system, Some(supplied.clone()));
    assert!(system.exi.is_sram_overridden());
    assert_eq!(system.sram, supplied);

    interface::shutdown(&mut system).unwrap();
    assert!(!path.exists());
}

#[test]
fn sram_write_failure_is_reported_after_teardown() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExiConfig {
        sram_path: dir.path().join("missing").join("SRAM.raw"),
        ..ExiConfig::default()
    };
    let mut system = System::new(config, MovieState::default(), 0);
    interface::init(&mut system, None);

    let err = interface::shutdown(&mut system).unwrap_err();
    assert!(matches!(err, ExiError::Io { .. }));
    assert!(system.exi.channels().is_empty());
}

#[test]
fn card_headers_follow_sram_and_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExiConfig {
        slot_a: DeviceType::MemoryCard,
        slot_b: DeviceType::MemoryCard,
        memory_card_size: 2,
        region: Region::NtscJ,
        ..config_in(&dir)
    };
    let mut sram = Sram::default();
    sram.set_rtc_bias(99);

    let mut system = System::new(config, MovieState::default(), GC_EPOCH + 500);
    interface::init(&mut system, Some(sram));

    for ch in 0..3u32 {
        let header = get_channel(&system, ch as usize).unwrap().header();
        assert_eq!(header.format_time, 500 + u64::from(ch));
        assert_eq!(header.size_mbits, 16);
        assert!(header.shift_jis);
        assert_eq!(header.rtc_bias, 99);
    }

    match get_channel(&system, 1).unwrap().device(0) {
        Device::MemoryCard(card) => {
            assert_eq!(card.card_id(), 16);
            assert_eq!(card.header().format_time, 501);
        }
        other => panic!("expected a memory card, got {other:?}"),
    }
}

#[test]
fn serial_port_device_comes_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExiConfig {
        serial_port_1: DeviceType::EthernetBuiltIn,
        ..config_in(&dir)
    };
    let mut system = System::new(config, MovieState::default(), 0);
    interface::init(&mut system, None);
    assert_eq!(
        get_channel(&system, 0).unwrap().device(2).device_type(),
        DeviceType::EthernetBuiltIn
    );
    assert_eq!(
        system.exi.query("channel0.device2"),
        Some(emu_core::Value::from("Broadband Adapter (HLE)"))
    );
}

#[test]
fn init_again_after_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let mut system = System::new(config_in(&dir), MovieState::default(), 0);
    interface::init(&mut system, None);
    interface::shutdown(&mut system).unwrap();
    interface::init(&mut system, Some(Sram::default()));
    assert!(system.exi.is_initialized());
    assert!(system.exi.is_sram_overridden());
}

#[test]
fn swap_queued_before_shutdown_does_not_reach_next_session() {
    let config = ExiConfig {
        slot_a: DeviceType::MemoryCard,
        ..ExiConfig::default()
    };
    let mut system = System::new(config, MovieState::default(), 0);
    interface::init(&mut system, Some(Sram::default()));
    let stale_remote = interface::remote(&system).unwrap();
    interface::change_device(&mut system, Slot::A, DeviceType::Gecko, FromThread::Cpu);

    interface::shutdown(&mut system).unwrap();
    assert!(interface::remote(&system).is_none());

    interface::init(&mut system, Some(Sram::default()));
    stale_remote.change_device(Slot::B, DeviceType::Gecko);
    let second = system.ticks_per_second();
    system.advance(second);
    system.advance(second);

    let slot_type = |system: &System, slot| {
        interface::get_device(system, slot).map(Device::device_type)
    };
    assert_eq!(slot_type(&system, Slot::A), Some(DeviceType::MemoryCard));
    assert_eq!(slot_type(&system, Slot::B), Some(DeviceType::None));
    assert_eq!(system.timing.pending(), 0);
}

#[cfg(feature = "native")]
#[test]
fn boots_from_json_config() {
    let config = ExiConfig::from_json(
        r#"{ "slot_a": "MemoryCard", "serial_port_1": "ModemTapServer", "memory_card_size": 0 }"#,
    )
    .unwrap();
    let mut system = System::new(config, MovieState::default(), 0);
    interface::init(&mut system, Some(Sram::default()));
    assert_eq!(
        get_channel(&system, 0).unwrap().device(2).device_type(),
        DeviceType::ModemTapServer
    );
    assert_eq!(get_channel(&system, 0).unwrap().header().size_mbits, 4);
}
