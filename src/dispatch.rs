//! Protocol dispatch: route each raw unit to the decoder for its shape

use crate::event::{ProtocolMode, RawUnit, SourceAddress};
use crate::format;
use crate::legacy::{self, LegacyEvent};
use crate::midi;
use crate::ump::{self, UmpPacket};

/// A fully decoded unit, ready for the formatter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Legacy { source: SourceAddress, event: LegacyEvent },
    Ump { source: SourceAddress, packet: UmpPacket },
}

/// Decode one unit under the active protocol mode
///
/// Legacy mode always goes through the legacy decoder; a UMP unit reaching a
/// legacy client is first translated back to its MIDI 1.0 sequencer event
/// when it has one. In UMP modes, legacy-shaped units fall back to the legacy
/// decoder one unit at a time.
pub fn dispatch(unit: &RawUnit, mode: ProtocolMode) -> Decoded {
    match (mode, unit) {
        (_, RawUnit::Legacy(record)) => Decoded::Legacy {
            source: record.source,
            event: legacy::decode(record),
        },
        (ProtocolMode::Legacy, RawUnit::Ump(record)) => match midi::legacy_from_ump(record) {
            Some(translated) => Decoded::Legacy {
                source: record.source,
                event: legacy::decode(&translated),
            },
            None => Decoded::Ump {
                source: record.source,
                packet: ump::decode(&record.words),
            },
        },
        (ProtocolMode::Ump1 | ProtocolMode::Ump2, RawUnit::Ump(record)) => Decoded::Ump {
            source: record.source,
            packet: ump::decode(&record.words),
        },
    }
}

/// Decode and format one unit
pub fn render(unit: &RawUnit, mode: ProtocolMode) -> String {
    format::line(&dispatch(unit, mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{event_type, LegacyRecord, UmpRecord};
    use proptest::prelude::*;

    const SRC: SourceAddress = SourceAddress::new(20, 0);

    fn note_on(velocity: u8) -> RawUnit {
        LegacyRecord::note(event_type::NOTEON, SRC, 0, 60, velocity).into()
    }

    #[test]
    fn test_legacy_note_on_end_to_end() {
        let line = render(&note_on(100), ProtocolMode::Legacy);
        assert!(line.contains("Note on"));
        assert!(line.ends_with(" 0, note 60, velocity 100"));
    }

    #[test]
    fn test_legacy_note_on_velocity_zero_end_to_end() {
        let line = render(&note_on(0), ProtocolMode::Legacy);
        assert!(line.contains("Note off"));
        assert!(line.ends_with("note 60"));
        assert!(!line.contains("velocity"));
    }

    #[test]
    fn test_ump_control_change_end_to_end() {
        let unit = RawUnit::Ump(UmpRecord::new(SRC, &[0x23B2_0740]));
        let line = render(&unit, ProtocolMode::Ump1);
        assert!(line.contains("Group  3"));
        assert!(line.contains("Control change"));
        assert!(line.contains(" 2, controller 7, value 0x40"));
    }

    #[test]
    fn test_legacy_unit_in_ump_mode_falls_back() {
        let unit: RawUnit = LegacyRecord::addr(
            event_type::PORT_START,
            SourceAddress::SYSTEM_ANNOUNCE,
            SourceAddress::new(130, 0),
        )
        .into();
        let decoded = dispatch(&unit, ProtocolMode::Ump2);
        assert_eq!(
            decoded,
            Decoded::Legacy {
                source: SourceAddress::SYSTEM_ANNOUNCE,
                event: LegacyEvent::PortStart { addr: SourceAddress::new(130, 0) },
            }
        );
        assert!(!render(&unit, ProtocolMode::Ump2).contains("Group"));
    }

    #[test]
    fn test_mixed_units_dispatch_independently() {
        let units = [
            RawUnit::Ump(UmpRecord::new(SRC, &[0x2090_3C40])),
            note_on(100),
            RawUnit::Ump(UmpRecord::new(SRC, &[0x2080_3C00])),
        ];
        let kinds: Vec<bool> = units
            .iter()
            .map(|unit| matches!(dispatch(unit, ProtocolMode::Ump1), Decoded::Ump { .. }))
            .collect();
        assert_eq!(kinds, vec![true, false, true]);
    }

    #[test]
    fn test_ump_unit_in_legacy_mode_is_translated() {
        let unit = RawUnit::Ump(UmpRecord::new(SRC, &[0x2091_3C64]));
        assert_eq!(
            dispatch(&unit, ProtocolMode::Legacy),
            Decoded::Legacy {
                source: SRC,
                event: LegacyEvent::NoteOn { channel: 1, note: 60, velocity: 100 },
            }
        );
    }

    #[test]
    fn test_untranslatable_ump_unit_in_legacy_mode_is_kept() {
        let unit = RawUnit::Ump(UmpRecord::new(SRC, &[0x4090_3C00, 0x8000_0000]));
        assert!(matches!(dispatch(&unit, ProtocolMode::Legacy), Decoded::Ump { .. }));
    }

    #[test]
    fn test_sysex7_ump_in_legacy_mode_renders_generic_line() {
        let unit = RawUnit::Ump(UmpRecord::new(SRC, &[0x3003_0102, 0x0300_0000]));
        assert_eq!(
            render(&unit, ProtocolMode::Legacy),
            " 20:0   UMP event: type = 3, group = 0, status = 0, 0x30030102"
        );
    }

    proptest! {
        #[test]
        fn prop_zero_velocity_note_on_renders_note_off(channel in 0u8..16, note in 0u8..128) {
            let record = LegacyRecord::note(event_type::NOTEON, SRC, channel, note, 0);
            let unit: RawUnit = record.into();
            let line = render(&unit, ProtocolMode::Legacy);
            prop_assert!(line.contains("Note off"));
            let expected_suffix = format!("note {}", note);
            prop_assert!(line.ends_with(&expected_suffix));
            prop_assert!(!line.contains("velocity"));
        }

        #[test]
        fn prop_sysex_renders_every_byte_in_order(
            data in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let unit: RawUnit = LegacyRecord::sysex(SRC, data.clone()).into();
            let line = render(&unit, ProtocolMode::Legacy);
            let tokens: Vec<&str> = line
                .trim_start_matches(&format::address(SRC))
                .trim_start_matches("System exclusive")
                .split_whitespace()
                .collect();
            let expected: Vec<String> = data.iter().map(|b| format!("{:02X}", b)).collect();
            prop_assert_eq!(tokens, expected);
        }

        #[test]
        fn prop_unknown_legacy_type_is_shown(event_type in any::<u8>()) {
            let known = legacy::decode(&LegacyRecord::new(event_type, SRC));
            prop_assume!(matches!(known, LegacyEvent::Unknown { .. }));
            let line = render(&LegacyRecord::new(event_type, SRC).into(), ProtocolMode::Legacy);
            let expected = format!("Event type {}", event_type);
            prop_assert!(line.ends_with(&expected));
        }

        #[test]
        fn prop_midi2_program_change_bank_only_when_valid(
            flags in any::<u8>(),
            program in 0u8..128,
            msb in 0u8..128,
            lsb in 0u8..128,
        ) {
            let w0 = 0x40C0_0000 | flags as u32;
            let w1 = (program as u32) << 24 | (msb as u32) << 8 | lsb as u32;
            let unit = RawUnit::Ump(UmpRecord::new(SRC, &[w0, w1]));
            let line = render(&unit, ProtocolMode::Ump2);
            if flags & 0x01 != 0 {
                let expected = format!(", Bank select {}:{}", msb, lsb);
                prop_assert!(line.ends_with(&expected));
            } else {
                prop_assert!(!line.contains("Bank"));
            }
        }
    }
}
