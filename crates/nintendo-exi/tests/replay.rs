//! Provisioning under replay playback.

use nintendo_exi::interface::{self, get_device};
use nintendo_exi::{DeviceType, ExiConfig, MovieState, Slot, Sram, System};

fn boot(config: ExiConfig, movie: MovieState) -> System {
    let mut system = System::new(config, movie, 0);
    interface::init(&mut system, Some(Sram::default()));
    system
}

fn slot_type(system: &System, slot: Slot) -> DeviceType {
    get_device(system, slot).map_or(DeviceType::None, |d| d.device_type())
}

const PLAYING: MovieState = MovieState {
    playing_input: true,
    config_saved: true,
    memcards: [true, false],
};

#[test]
fn expected_card_missing_warns_and_keeps_config() {
    let config = ExiConfig {
        slot_a: DeviceType::Gecko,
        ..ExiConfig::default()
    };
    let mut system = boot(config, PLAYING);

    let alerts = system.take_alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("Slot A"), "{}", alerts[0]);
    assert!(alerts[0].contains("USB Gecko"), "{}", alerts[0]);
    assert_eq!(slot_type(&system, Slot::A), DeviceType::Gecko);
}

#[test]
fn unexpected_card_is_removed() {
    let config = ExiConfig {
        slot_a: DeviceType::MemoryCard,
        slot_b: DeviceType::MemoryCardFolder,
        ..ExiConfig::default()
    };
    let mut system = boot(config, PLAYING);

    assert!(system.take_alerts().is_empty());
    assert_eq!(slot_type(&system, Slot::A), DeviceType::MemoryCard);
    assert_eq!(slot_type(&system, Slot::B), DeviceType::None);
}

#[test]
fn either_card_kind_satisfies_the_movie() {
    let config = ExiConfig {
        slot_a: DeviceType::MemoryCardFolder,
        ..ExiConfig::default()
    };
    let mut system = boot(config, PLAYING);
    assert!(system.take_alerts().is_empty());
    assert_eq!(slot_type(&system, Slot::A), DeviceType::MemoryCardFolder);
}

#[test]
fn serial_port_is_not_affected_by_playback() {
    let config = ExiConfig {
        slot_a: DeviceType::MemoryCard,
        serial_port_1: DeviceType::Ethernet,
        ..ExiConfig::default()
    };
    let system = boot(config, PLAYING);
    assert_eq!(slot_type(&system, Slot::Sp1), DeviceType::Ethernet);
}

#[test]
fn config_wins_without_saved_movie_config() {
    let config = ExiConfig {
        slot_a: DeviceType::Gecko,
        slot_b: DeviceType::MemoryCard,
        ..ExiConfig::default()
    };
    for movie in [
        MovieState::default(),
        MovieState {
            config_saved: false,
            ..PLAYING
        },
        MovieState {
            playing_input: false,
            ..PLAYING
        },
    ] {
        let mut system = boot(config.clone(), movie);
        assert!(system.take_alerts().is_empty());
        assert_eq!(slot_type(&system, Slot::A), DeviceType::Gecko);
        assert_eq!(slot_type(&system, Slot::B), DeviceType::MemoryCard);
    }
}
