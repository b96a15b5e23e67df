//! Universal MIDI Packet decoder
//!
//! The message type in the top nibble of the first word selects the field
//! layout. Only channel voice messages (MIDI 1.0 and MIDI 2.0) are decoded
//! field by field; every other message type keeps its generic header.

/// UMP message types (top nibble of word 0)
pub mod message_type {
    pub const UTILITY: u8 = 0x0;
    pub const SYSTEM: u8 = 0x1;
    pub const MIDI1_CHANNEL_VOICE: u8 = 0x2;
    pub const DATA64: u8 = 0x3;
    pub const MIDI2_CHANNEL_VOICE: u8 = 0x4;
    pub const DATA128: u8 = 0x5;
    pub const FLEX_DATA: u8 = 0xD;
    pub const STREAM: u8 = 0xF;
}

/// Channel voice status codes (opcode nibble)
pub mod status {
    pub const PER_NOTE_RCC: u8 = 0x0;
    pub const PER_NOTE_ACC: u8 = 0x1;
    pub const RPN: u8 = 0x2;
    pub const NRPN: u8 = 0x3;
    pub const RELATIVE_RPN: u8 = 0x4;
    pub const RELATIVE_NRPN: u8 = 0x5;
    pub const PER_NOTE_PITCHBEND: u8 = 0x6;
    pub const NOTE_OFF: u8 = 0x8;
    pub const NOTE_ON: u8 = 0x9;
    pub const POLY_PRESSURE: u8 = 0xA;
    pub const CONTROL_CHANGE: u8 = 0xB;
    pub const PROGRAM_CHANGE: u8 = 0xC;
    pub const CHANNEL_PRESSURE: u8 = 0xD;
    pub const PITCHBEND: u8 = 0xE;
    pub const PER_NOTE_MGMT: u8 = 0xF;
}

/// Number of 32-bit words in a packet of the given message type
pub fn word_count(message_type: u8) -> usize {
    match message_type & 0x0F {
        0x0 | 0x1 | 0x2 | 0x6 | 0x7 => 1,
        0x3 | 0x4 | 0x8 | 0x9 | 0xA => 2,
        0xB | 0xC => 3,
        _ => 4,
    }
}

pub fn message_type_of(word: u32) -> u8 {
    (word >> 28) as u8 & 0x0F
}

pub fn group_of(word: u32) -> u8 {
    (word >> 24) as u8 & 0x0F
}

pub fn status_of(word: u32) -> u8 {
    (word >> 20) as u8 & 0x0F
}

pub fn channel_of(word: u32) -> u8 {
    (word >> 16) as u8 & 0x0F
}

/// MIDI 1.0 channel voice message (message type 0x2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Midi1Message {
    NoteOff { note: u8, velocity: u8 },
    NoteOn { note: u8, velocity: u8 },
    PolyPressure { note: u8, data: u8 },
    ControlChange { index: u8, data: u8 },
    ProgramChange { program: u8 },
    ChannelPressure { data: u8 },
    /// 14-bit value, `msb << 7 | lsb`
    PitchBend { value: u16 },
    Unknown { status: u8 },
}

/// MIDI 2.0 channel voice message (message type 0x4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Midi2Message {
    PerNoteRegisteredController { note: u8, index: u8, data: u32 },
    PerNoteAssignableController { note: u8, index: u8, data: u32 },
    RegisteredController { bank: u8, index: u8, data: u32 },
    AssignableController { bank: u8, index: u8, data: u32 },
    RelativeRegisteredController { bank: u8, index: u8, data: u32 },
    RelativeAssignableController { bank: u8, index: u8, data: u32 },
    PerNotePitchBend { note: u8, data: u32 },
    NoteOff { note: u8, velocity: u16, attr_type: u8, attr_data: u16 },
    NoteOn { note: u8, velocity: u16, attr_type: u8, attr_data: u16 },
    PolyPressure { note: u8, data: u32 },
    ControlChange { index: u8, data: u32 },
    /// Bank select (MSB, LSB) only when the bank-valid option flag is set
    ProgramChange { program: u8, bank: Option<(u8, u8)> },
    ChannelPressure { data: u32 },
    PitchBend { data: u32 },
    PerNoteManagement { note: u8, flags: u8 },
    Unknown { status: u8 },
}

/// Message body of a decoded packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UmpMessage {
    Midi1(Midi1Message),
    Midi2(Midi2Message),
    /// Any non channel voice message type; only the header is interpreted
    Other,
}

/// Decoded UMP packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UmpPacket {
    pub message_type: u8,
    pub group: u8,
    pub status: u8,
    pub channel: u8,
    pub words: [u32; 4],
    pub message: UmpMessage,
}

impl UmpPacket {
    pub fn first_word(&self) -> u32 {
        self.words[0]
    }
}

/// Decode a packet; words missing from `words` read as zero
pub fn decode(words: &[u32]) -> UmpPacket {
    let mut packed = [0u32; 4];
    for (slot, word) in packed.iter_mut().zip(words) {
        *slot = *word;
    }

    let w0 = packed[0];
    let message_type = message_type_of(w0);
    let message = match message_type {
        message_type::MIDI1_CHANNEL_VOICE => UmpMessage::Midi1(decode_midi1(w0)),
        message_type::MIDI2_CHANNEL_VOICE => UmpMessage::Midi2(decode_midi2(w0, packed[1])),
        _ => UmpMessage::Other,
    };

    UmpPacket {
        message_type,
        group: group_of(w0),
        status: status_of(w0),
        channel: channel_of(w0),
        words: packed,
        message,
    }
}

fn decode_midi1(w0: u32) -> Midi1Message {
    let byte1 = (w0 >> 8) as u8 & 0x7F;
    let byte2 = w0 as u8 & 0x7F;

    match status_of(w0) {
        status::NOTE_OFF => Midi1Message::NoteOff { note: byte1, velocity: byte2 },
        status::NOTE_ON => Midi1Message::NoteOn { note: byte1, velocity: byte2 },
        status::POLY_PRESSURE => Midi1Message::PolyPressure { note: byte1, data: byte2 },
        status::CONTROL_CHANGE => Midi1Message::ControlChange { index: byte1, data: byte2 },
        status::PROGRAM_CHANGE => Midi1Message::ProgramChange { program: byte1 },
        status::CHANNEL_PRESSURE => Midi1Message::ChannelPressure { data: byte1 },
        status::PITCHBEND => Midi1Message::PitchBend {
            value: ((byte2 as u16) << 7) | byte1 as u16,
        },
        other => Midi1Message::Unknown { status: other },
    }
}

fn decode_midi2(w0: u32, w1: u32) -> Midi2Message {
    let note = (w0 >> 8) as u8 & 0x7F;
    let low = w0 as u8;
    let bank = note;
    let index7 = low & 0x7F;

    match status_of(w0) {
        status::PER_NOTE_RCC => {
            Midi2Message::PerNoteRegisteredController { note, index: low, data: w1 }
        }
        status::PER_NOTE_ACC => {
            Midi2Message::PerNoteAssignableController { note, index: low, data: w1 }
        }
        status::RPN => Midi2Message::RegisteredController { bank, index: index7, data: w1 },
        status::NRPN => Midi2Message::AssignableController { bank, index: index7, data: w1 },
        status::RELATIVE_RPN => {
            Midi2Message::RelativeRegisteredController { bank, index: index7, data: w1 }
        }
        status::RELATIVE_NRPN => {
            Midi2Message::RelativeAssignableController { bank, index: index7, data: w1 }
        }
        status::PER_NOTE_PITCHBEND => Midi2Message::PerNotePitchBend { note, data: w1 },
        status::NOTE_OFF => Midi2Message::NoteOff {
            note,
            velocity: (w1 >> 16) as u16,
            attr_type: low,
            attr_data: w1 as u16,
        },
        status::NOTE_ON => Midi2Message::NoteOn {
            note,
            velocity: (w1 >> 16) as u16,
            attr_type: low,
            attr_data: w1 as u16,
        },
        status::POLY_PRESSURE => Midi2Message::PolyPressure { note, data: w1 },
        status::CONTROL_CHANGE => Midi2Message::ControlChange { index: note, data: w1 },
        status::PROGRAM_CHANGE => {
            let bank_valid = low & 0x01 != 0;
            Midi2Message::ProgramChange {
                program: (w1 >> 24) as u8 & 0x7F,
                bank: bank_valid.then(|| ((w1 >> 8) as u8 & 0x7F, w1 as u8 & 0x7F)),
            }
        }
        status::CHANNEL_PRESSURE => Midi2Message::ChannelPressure { data: w1 },
        status::PITCHBEND => Midi2Message::PitchBend { data: w1 },
        status::PER_NOTE_MGMT => Midi2Message::PerNoteManagement { note, flags: low },
        other => Midi2Message::Unknown { status: other },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let packet = decode(&[0x23B2_0740]);
        assert_eq!(packet.message_type, message_type::MIDI1_CHANNEL_VOICE);
        assert_eq!(packet.group, 3);
        assert_eq!(packet.status, status::CONTROL_CHANGE);
        assert_eq!(packet.channel, 2);
        assert_eq!(
            packet.message,
            UmpMessage::Midi1(Midi1Message::ControlChange { index: 7, data: 64 })
        );
    }

    #[test]
    fn test_midi1_pitch_bend_combines_lsb_msb() {
        // lsb 0x00, msb 0x40 => center
        let packet = decode(&[0x20E0_0040]);
        assert_eq!(packet.message, UmpMessage::Midi1(Midi1Message::PitchBend { value: 8192 }));
    }

    #[test]
    fn test_midi1_unknown_status() {
        let packet = decode(&[0x2010_0000]);
        assert_eq!(packet.message, UmpMessage::Midi1(Midi1Message::Unknown { status: 1 }));
    }

    #[test]
    fn test_midi2_note_on_fields() {
        let packet = decode(&[0x4093_3C03, 0xC000_1234]);
        assert_eq!(packet.channel, 3);
        assert_eq!(
            packet.message,
            UmpMessage::Midi2(Midi2Message::NoteOn {
                note: 60,
                velocity: 0xC000,
                attr_type: 3,
                attr_data: 0x1234,
            })
        );
    }

    #[test]
    fn test_same_status_differs_by_message_type() {
        // Status 0xB with identical first-word payload
        let gen1 = decode(&[0x20B0_0740, 0xFFFF_FFFF]);
        let gen2 = decode(&[0x40B0_0740, 0xFFFF_FFFF]);
        assert_eq!(
            gen1.message,
            UmpMessage::Midi1(Midi1Message::ControlChange { index: 7, data: 0x40 })
        );
        assert_eq!(
            gen2.message,
            UmpMessage::Midi2(Midi2Message::ControlChange { index: 7, data: 0xFFFF_FFFF })
        );
    }

    #[test]
    fn test_midi2_program_change_bank() {
        let without = decode(&[0x40C0_0000, 0x0500_0102]);
        assert_eq!(
            without.message,
            UmpMessage::Midi2(Midi2Message::ProgramChange { program: 5, bank: None })
        );

        let with = decode(&[0x40C0_0001, 0x0500_0102]);
        assert_eq!(
            with.message,
            UmpMessage::Midi2(Midi2Message::ProgramChange { program: 5, bank: Some((1, 2)) })
        );
    }

    #[test]
    fn test_midi2_per_note_messages_are_distinct() {
        let rcc = decode(&[0x4000_3C05, 1]).message;
        let acc = decode(&[0x4010_3C05, 1]).message;
        let bend = decode(&[0x4060_3C00, 1]).message;
        let mgmt = decode(&[0x40F0_3C03, 0]).message;
        assert_eq!(
            rcc,
            UmpMessage::Midi2(Midi2Message::PerNoteRegisteredController {
                note: 60,
                index: 5,
                data: 1,
            })
        );
        assert_eq!(
            acc,
            UmpMessage::Midi2(Midi2Message::PerNoteAssignableController {
                note: 60,
                index: 5,
                data: 1,
            })
        );
        assert_eq!(bend, UmpMessage::Midi2(Midi2Message::PerNotePitchBend { note: 60, data: 1 }));
        assert_eq!(mgmt, UmpMessage::Midi2(Midi2Message::PerNoteManagement { note: 60, flags: 3 }));
    }

    #[test]
    fn test_midi2_rpn_bank_index() {
        let packet = decode(&[0x4021_0006, 0x8000_0000]);
        assert_eq!(
            packet.message,
            UmpMessage::Midi2(Midi2Message::RegisteredController {
                bank: 0,
                index: 6,
                data: 0x8000_0000,
            })
        );
    }

    #[test]
    fn test_other_message_type_keeps_header() {
        let packet = decode(&[0x1AF8_0000]);
        assert_eq!(packet.message_type, message_type::SYSTEM);
        assert_eq!(packet.group, 0xA);
        assert_eq!(packet.status, 0xF);
        assert_eq!(packet.message, UmpMessage::Other);
    }

    #[test]
    fn test_short_packet_reads_zero() {
        let packet = decode(&[0x4090_3C00]);
        assert_eq!(
            packet.message,
            UmpMessage::Midi2(Midi2Message::NoteOn {
                note: 60,
                velocity: 0,
                attr_type: 0,
                attr_data: 0,
            })
        );
        let empty = decode(&[]);
        assert_eq!(empty.message_type, message_type::UTILITY);
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(message_type::MIDI1_CHANNEL_VOICE), 1);
        assert_eq!(word_count(message_type::MIDI2_CHANNEL_VOICE), 2);
        assert_eq!(word_count(0xB), 3);
        assert_eq!(word_count(message_type::STREAM), 4);
    }
}
