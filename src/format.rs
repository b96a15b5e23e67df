//! Fixed-column text rendering of decoded events
//!
//! Every line starts with the source address (`%3d:%-3d `). UMP channel voice
//! lines add a `Group NN, ` column. The event label is padded so that the
//! channel and data columns line up with the header from [`header`].
//!
//! Legacy values are printed in decimal. UMP velocity and data values are
//! printed in hexadecimal with a `0x` prefix; note, controller, index and
//! program numbers stay decimal.

use std::fmt::Write as _;

use crate::dispatch::Decoded;
use crate::event::{ProtocolMode, SourceAddress};
use crate::legacy::LegacyEvent;
use crate::ump::{Midi1Message, Midi2Message, UmpMessage, UmpPacket};

/// Width of the label column for channel events (channel follows)
const LABEL_WIDTH: usize = 23;

/// Width of the label column for events without a channel
const DATA_COLUMN: usize = LABEL_WIDTH + 4;

/// Column header printed once before the first event
pub fn header(mode: ProtocolMode) -> String {
    format!(
        "Source  {}Event                  Ch  Data",
        if mode.is_ump() { "Group    " } else { "" }
    )
}

/// Banner printed before the header; `virtual_port` names the port clients write to
pub fn banner(virtual_port: Option<&str>) -> String {
    match virtual_port {
        Some(name) => format!("Waiting for data at port {}. Press Ctrl+C to end.", name),
        None => "Waiting for data. Press Ctrl+C to end.".to_string(),
    }
}

/// Render one decoded unit, without line terminator
pub fn line(decoded: &Decoded) -> String {
    match decoded {
        Decoded::Legacy { source, event } => legacy_line(*source, event),
        Decoded::Ump { source, packet } => ump_line(*source, packet),
    }
}

pub fn address(source: SourceAddress) -> String {
    format!("{:>3}:{:<3} ", source.client, source.port)
}

fn channel_event(label: &str, channel: u8, fields: &str) -> String {
    format!("{:<width$}{:>2}, {}", label, channel, fields, width = LABEL_WIDTH)
}

fn data_event(label: &str, data: &str) -> String {
    format!("{:<width$}{}", label, data, width = DATA_COLUMN)
}

fn queue_event(label: &str, queue: u8) -> String {
    data_event(label, &format!("queue {}", queue))
}

/// Render a legacy event
pub fn legacy_line(source: SourceAddress, event: &LegacyEvent) -> String {
    let mut line = address(source);
    line.push_str(&legacy_body(event));
    line
}

fn legacy_body(event: &LegacyEvent) -> String {
    match event {
        LegacyEvent::NoteOn { channel, note, velocity } => channel_event(
            "Note on",
            *channel,
            &format!("note {}, velocity {}", note, velocity),
        ),
        LegacyEvent::NoteOff { channel, note, velocity: Some(velocity) } => channel_event(
            "Note off",
            *channel,
            &format!("note {}, velocity {}", note, velocity),
        ),
        LegacyEvent::NoteOff { channel, note, velocity: None } => {
            channel_event("Note off", *channel, &format!("note {}", note))
        }
        LegacyEvent::KeyPressure { channel, note, value } => channel_event(
            "Polyphonic aftertouch",
            *channel,
            &format!("note {}, value {}", note, value),
        ),
        LegacyEvent::ControlChange { channel, controller, value } => channel_event(
            "Control change",
            *channel,
            &format!("controller {}, value {}", controller, value),
        ),
        LegacyEvent::ProgramChange { channel, program } => {
            channel_event("Program change", *channel, &format!("program {}", program))
        }
        LegacyEvent::ChannelPressure { channel, value } => {
            channel_event("Channel aftertouch", *channel, &format!("value {}", value))
        }
        LegacyEvent::PitchBend { channel, value } => {
            channel_event("Pitch bend", *channel, &format!("value {}", value))
        }
        LegacyEvent::Control14 { channel, controller, value } => channel_event(
            "Control change",
            *channel,
            &format!("controller {}, value {:5}", controller, value),
        ),
        LegacyEvent::NonRegisteredParam { channel, param, value } => channel_event(
            "Non-reg. parameter",
            *channel,
            &format!("parameter {}, value {}", param, value),
        ),
        LegacyEvent::RegisteredParam { channel, param, value } => channel_event(
            "Reg. parameter",
            *channel,
            &format!("parameter {}, value {}", param, value),
        ),
        LegacyEvent::SongPosition { value } => {
            data_event("Song position pointer", &format!("value {}", value))
        }
        LegacyEvent::SongSelect { value } => data_event("Song select", &format!("value {}", value)),
        LegacyEvent::QuarterFrame { value } => {
            data_event("MTC quarter frame", &format!("{:02x}h", value))
        }
        LegacyEvent::TimeSignature { value } => {
            data_event("SMF time signature", &format!("({:#010x})", value))
        }
        LegacyEvent::KeySignature { value } => {
            data_event("SMF key signature", &format!("({:#010x})", value))
        }
        LegacyEvent::Start { queue: Some(queue) } => queue_event("Queue start", *queue),
        LegacyEvent::Start { queue: None } => "Start".to_string(),
        LegacyEvent::Continue { queue: Some(queue) } => queue_event("Queue continue", *queue),
        LegacyEvent::Continue { queue: None } => "Continue".to_string(),
        LegacyEvent::Stop { queue: Some(queue) } => queue_event("Queue stop", *queue),
        LegacyEvent::Stop { queue: None } => "Stop".to_string(),
        LegacyEvent::SetPositionTick { queue } => queue_event("Set tick queue pos.", *queue),
        LegacyEvent::SetPositionTime { queue } => queue_event("Set rt queue pos.", *queue),
        LegacyEvent::Tempo { queue } => queue_event("Set queue tempo", *queue),
        LegacyEvent::Clock => "Clock".to_string(),
        LegacyEvent::Tick => "Tick".to_string(),
        LegacyEvent::QueueSkew { queue } => queue_event("Queue timer skew", *queue),
        LegacyEvent::TuneRequest => "Tune request".to_string(),
        LegacyEvent::Reset => "Reset".to_string(),
        LegacyEvent::ActiveSensing => "Active Sensing".to_string(),
        LegacyEvent::ClientStart { client } => {
            data_event("Client start", &format!("client {}", client))
        }
        LegacyEvent::ClientExit { client } => {
            data_event("Client exit", &format!("client {}", client))
        }
        LegacyEvent::ClientChange { client } => {
            data_event("Client changed", &format!("client {}", client))
        }
        LegacyEvent::PortStart { addr } => data_event("Port start", &addr.to_string()),
        LegacyEvent::PortExit { addr } => data_event("Port exit", &addr.to_string()),
        LegacyEvent::PortChange { addr } => data_event("Port changed", &addr.to_string()),
        LegacyEvent::PortSubscribed { sender, dest } => {
            data_event("Port subscribed", &format!("{} -> {}", sender, dest))
        }
        LegacyEvent::PortUnsubscribed { sender, dest } => {
            data_event("Port unsubscribed", &format!("{} -> {}", sender, dest))
        }
        LegacyEvent::SysEx { data } => {
            // Bytes start one column early; each one carries its own leading space
            let mut body = format!("{:<width$}", "System exclusive", width = DATA_COLUMN - 1);
            body.push_str(&sysex_bytes(data));
            body
        }
        LegacyEvent::Unknown { event_type } => format!("Event type {}", event_type),
    }
}

/// ` XX` for every byte, in order
pub fn sysex_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for byte in data {
        let _ = write!(out, " {:02X}", byte);
    }
    out
}

/// Render a UMP packet
pub fn ump_line(source: SourceAddress, packet: &UmpPacket) -> String {
    let mut line = address(source);
    match &packet.message {
        UmpMessage::Midi1(message) => {
            let _ = write!(line, "Group {:>2}, ", packet.group);
            line.push_str(&midi1_body(packet, message));
        }
        UmpMessage::Midi2(message) => {
            let _ = write!(line, "Group {:>2}, ", packet.group);
            line.push_str(&midi2_body(packet, message));
        }
        UmpMessage::Other => {
            let _ = write!(
                line,
                "UMP event: type = {}, group = {}, status = {}, {:#010x}",
                packet.message_type,
                packet.group,
                packet.status,
                packet.first_word()
            );
        }
    }
    line
}

fn midi1_body(packet: &UmpPacket, message: &Midi1Message) -> String {
    let channel = packet.channel;
    match *message {
        Midi1Message::NoteOff { note, velocity } => channel_event(
            "Note off",
            channel,
            &format!("note {}, velocity {:#x}", note, velocity),
        ),
        Midi1Message::NoteOn { note, velocity } => channel_event(
            "Note on",
            channel,
            &format!("note {}, velocity {:#x}", note, velocity),
        ),
        Midi1Message::PolyPressure { note, data } => channel_event(
            "Poly pressure",
            channel,
            &format!("note {}, value {:#x}", note, data),
        ),
        Midi1Message::ControlChange { index, data } => channel_event(
            "Control change",
            channel,
            &format!("controller {}, value {:#x}", index, data),
        ),
        Midi1Message::ProgramChange { program } => {
            channel_event("Program change", channel, &format!("program {}", program))
        }
        Midi1Message::ChannelPressure { data } => {
            channel_event("Channel pressure", channel, &format!("value {:#x}", data))
        }
        Midi1Message::PitchBend { value } => {
            channel_event("Pitchbend", channel, &format!("value {:#x}", value))
        }
        Midi1Message::Unknown { status } => format!(
            "UMP MIDI1 event: status = {}, channel = {}, {:#010x}",
            status,
            channel,
            packet.first_word()
        ),
    }
}

fn midi2_body(packet: &UmpPacket, message: &Midi2Message) -> String {
    let channel = packet.channel;
    match *message {
        Midi2Message::PerNoteRegisteredController { note, index, data } => channel_event(
            "Per-note RCC",
            channel,
            &format!("note {}, index {}, value {:#x}", note, index, data),
        ),
        Midi2Message::PerNoteAssignableController { note, index, data } => channel_event(
            "Per-note ACC",
            channel,
            &format!("note {}, index {}, value {:#x}", note, index, data),
        ),
        Midi2Message::RegisteredController { bank, index, data } => channel_event(
            "RPN",
            channel,
            &format!("bank {}:{}, value {:#x}", bank, index, data),
        ),
        Midi2Message::AssignableController { bank, index, data } => channel_event(
            "NRPN",
            channel,
            &format!("bank {}:{}, value {:#x}", bank, index, data),
        ),
        Midi2Message::RelativeRegisteredController { bank, index, data } => channel_event(
            "relative RPN",
            channel,
            &format!("bank {}:{}, value {:#x}", bank, index, data),
        ),
        Midi2Message::RelativeAssignableController { bank, index, data } => channel_event(
            "relative NRPN",
            channel,
            &format!("bank {}:{}, value {:#x}", bank, index, data),
        ),
        Midi2Message::PerNotePitchBend { note, data } => channel_event(
            "Per-note pitchbend",
            channel,
            &format!("note {}, value {:#x}", note, data),
        ),
        Midi2Message::NoteOff { note, velocity, attr_type, attr_data } => channel_event(
            "Note off",
            channel,
            &format!(
                "note {}, velocity {:#x}, attr type = {}, data = {:#x}",
                note, velocity, attr_type, attr_data
            ),
        ),
        Midi2Message::NoteOn { note, velocity, attr_type, attr_data } => channel_event(
            "Note on",
            channel,
            &format!(
                "note {}, velocity {:#x}, attr type = {}, data = {:#x}",
                note, velocity, attr_type, attr_data
            ),
        ),
        Midi2Message::PolyPressure { note, data } => channel_event(
            "Poly pressure",
            channel,
            &format!("note {}, value {:#x}", note, data),
        ),
        Midi2Message::ControlChange { index, data } => channel_event(
            "Control change",
            channel,
            &format!("controller {}, value {:#x}", index, data),
        ),
        Midi2Message::ProgramChange { program, bank } => {
            let mut fields = format!("program {}", program);
            if let Some((msb, lsb)) = bank {
                let _ = write!(fields, ", Bank select {}:{}", msb, lsb);
            }
            channel_event("Program change", channel, &fields)
        }
        Midi2Message::ChannelPressure { data } => {
            channel_event("Channel pressure", channel, &format!("value {:#x}", data))
        }
        Midi2Message::PitchBend { data } => {
            channel_event("Pitchbend", channel, &format!("value {:#x}", data))
        }
        Midi2Message::PerNoteManagement { note, flags } => channel_event(
            "Per-note management",
            channel,
            &format!("note {}, flags {:#x}", note, flags),
        ),
        Midi2Message::Unknown { status } => format!(
            "UMP MIDI2 event: status = {}, channel = {}, {:#010x}",
            status,
            channel,
            packet.first_word()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{event_type, LegacyRecord};
    use crate::{legacy, ump};

    const SRC: SourceAddress = SourceAddress::new(20, 0);

    fn legacy(event: LegacyEvent) -> String {
        legacy_line(SRC, &event)
    }

    #[test]
    fn test_banner() {
        assert_eq!(banner(None), "Waiting for data. Press Ctrl+C to end.");
        assert_eq!(
            banner(Some("seqdump")),
            "Waiting for data at port seqdump. Press Ctrl+C to end."
        );
    }

    #[test]
    fn test_header() {
        assert_eq!(header(ProtocolMode::Legacy), "Source  Event                  Ch  Data");
        assert_eq!(
            header(ProtocolMode::Ump2),
            "Source  Group    Event                  Ch  Data"
        );
    }

    #[test]
    fn test_address_columns() {
        assert_eq!(address(SourceAddress::new(128, 0)), "128:0   ");
        assert_eq!(address(SourceAddress::new(0, 1)), "  0:1   ");
    }

    #[test]
    fn test_note_on_line() {
        assert_eq!(
            legacy(LegacyEvent::NoteOn { channel: 0, note: 60, velocity: 100 }),
            " 20:0   Note on                 0, note 60, velocity 100"
        );
    }

    #[test]
    fn test_relabelled_note_off_has_no_velocity() {
        assert_eq!(
            legacy(LegacyEvent::NoteOff { channel: 0, note: 60, velocity: None }),
            " 20:0   Note off                0, note 60"
        );
    }

    #[test]
    fn test_data_column_alignment() {
        assert_eq!(
            legacy(LegacyEvent::SongPosition { value: 16 }),
            " 20:0   Song position pointer      value 16"
        );
        assert_eq!(
            legacy(LegacyEvent::QuarterFrame { value: 0x1a }),
            " 20:0   MTC quarter frame          1ah"
        );
        assert_eq!(
            legacy(LegacyEvent::TimeSignature { value: 0x0402_1808 }),
            " 20:0   SMF time signature         (0x04021808)"
        );
        assert_eq!(
            legacy(LegacyEvent::PortSubscribed {
                sender: SourceAddress::new(20, 0),
                dest: SourceAddress::new(128, 0),
            }),
            " 20:0   Port subscribed            20:0 -> 128:0"
        );
    }

    #[test]
    fn test_transport_with_and_without_queue() {
        assert_eq!(
            legacy(LegacyEvent::Start { queue: Some(1) }),
            " 20:0   Queue start                queue 1"
        );
        assert_eq!(legacy(LegacyEvent::Start { queue: None }), " 20:0   Start");
    }

    #[test]
    fn test_continue_and_stop_queue_only_from_system_timer() {
        let render = |kind, source| {
            let record = LegacyRecord::queue(kind, source, 2, 0);
            legacy_line(source, &legacy::decode(&record))
        };
        let timer = SourceAddress::SYSTEM_TIMER;

        assert_eq!(
            render(event_type::CONTINUE, timer),
            "  0:0   Queue continue             queue 2"
        );
        assert_eq!(
            render(event_type::STOP, timer),
            "  0:0   Queue stop                 queue 2"
        );
        assert_eq!(render(event_type::CONTINUE, SRC), " 20:0   Continue");
        assert_eq!(render(event_type::STOP, SRC), " 20:0   Stop");
    }

    #[test]
    fn test_control14_value_width() {
        assert_eq!(
            legacy(LegacyEvent::Control14 { channel: 1, controller: 7, value: 42 }),
            " 20:0   Control change          1, controller 7, value    42"
        );
    }

    #[test]
    fn test_sysex_line() {
        assert_eq!(
            legacy(LegacyEvent::SysEx { data: vec![0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7] }),
            " 20:0   System exclusive           F0 7E 7F 06 01 F7"
        );
        assert_eq!(
            legacy(LegacyEvent::SysEx { data: Vec::new() }),
            " 20:0   System exclusive          "
        );
    }

    #[test]
    fn test_unknown_event_type() {
        assert_eq!(legacy(LegacyEvent::Unknown { event_type: 99 }), " 20:0   Event type 99");
    }

    #[test]
    fn test_ump_control_change_line() {
        let packet = ump::decode(&[0x23B2_0740]);
        assert_eq!(
            ump_line(SRC, &packet),
            " 20:0   Group  3, Control change          2, controller 7, value 0x40"
        );
    }

    #[test]
    fn test_ump_midi1_program_change_is_not_channel_pressure() {
        let packet = ump::decode(&[0x20C1_0500]);
        assert_eq!(
            ump_line(SRC, &packet),
            " 20:0   Group  0, Program change          1, program 5"
        );
    }

    #[test]
    fn test_ump_midi2_pitch_bend_has_its_own_label() {
        let packet = ump::decode(&[0x40E0_0000, 0x8000_0000]);
        assert_eq!(
            ump_line(SRC, &packet),
            " 20:0   Group  0, Pitchbend               0, value 0x80000000"
        );
    }

    #[test]
    fn test_ump_midi2_program_change_bank() {
        let with = ump::decode(&[0x40C0_0001, 0x0500_0102]);
        assert_eq!(
            ump_line(SRC, &with),
            " 20:0   Group  0, Program change          0, program 5, Bank select 1:2"
        );
        let without = ump::decode(&[0x40C0_0000, 0x0500_0102]);
        assert_eq!(
            ump_line(SRC, &without),
            " 20:0   Group  0, Program change          0, program 5"
        );
    }

    #[test]
    fn test_ump_midi1_unknown_status_fallback() {
        let packet = ump::decode(&[0x2375_1234]);
        assert_eq!(
            ump_line(SRC, &packet),
            " 20:0   Group  3, UMP MIDI1 event: status = 7, channel = 5, 0x23751234"
        );
    }

    #[test]
    fn test_ump_unknown_status_fallback() {
        let packet = ump::decode(&[0x4075_1234, 0]);
        assert_eq!(
            ump_line(SRC, &packet),
            " 20:0   Group  0, UMP MIDI2 event: status = 7, channel = 5, 0x40751234"
        );
    }

    #[test]
    fn test_ump_other_message_type() {
        let packet = ump::decode(&[0x10F8_0000]);
        assert_eq!(
            ump_line(SRC, &packet),
            " 20:0   UMP event: type = 1, group = 0, status = 15, 0x10f80000"
        );
    }
}
