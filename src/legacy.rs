//! Legacy sequencer event decoder
//!
//! Interprets the fixed-layout [`LegacyRecord`] into a named [`LegacyEvent`].
//! Decoding is total: unknown type tags become [`LegacyEvent::Unknown`].

use crate::event::{event_type as ty, LegacyRecord, SourceAddress};

/// Decoded legacy sequencer event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyEvent {
    /// Note On (velocity is never 0, see [`decode`])
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off; `velocity` is `None` when relabelled from a zero-velocity Note On
    NoteOff { channel: u8, note: u8, velocity: Option<u8> },
    /// Polyphonic aftertouch
    KeyPressure { channel: u8, note: u8, value: u8 },
    ControlChange { channel: u8, controller: u32, value: i32 },
    ProgramChange { channel: u8, program: i32 },
    ChannelPressure { channel: u8, value: i32 },
    /// Pitch bend, signed around 0 (-8192..8191)
    PitchBend { channel: u8, value: i32 },
    /// 14-bit control change
    Control14 { channel: u8, controller: u32, value: i32 },
    NonRegisteredParam { channel: u8, param: u32, value: i32 },
    RegisteredParam { channel: u8, param: u32, value: i32 },
    SongPosition { value: i32 },
    SongSelect { value: i32 },
    QuarterFrame { value: i32 },
    TimeSignature { value: i32 },
    KeySignature { value: i32 },
    /// Transport start; `queue` is set when sent by the system timer
    Start { queue: Option<u8> },
    Continue { queue: Option<u8> },
    Stop { queue: Option<u8> },
    SetPositionTick { queue: u8 },
    SetPositionTime { queue: u8 },
    Tempo { queue: u8 },
    Clock,
    Tick,
    QueueSkew { queue: u8 },
    TuneRequest,
    Reset,
    ActiveSensing,
    ClientStart { client: u8 },
    ClientExit { client: u8 },
    ClientChange { client: u8 },
    PortStart { addr: SourceAddress },
    PortExit { addr: SourceAddress },
    PortChange { addr: SourceAddress },
    PortSubscribed { sender: SourceAddress, dest: SourceAddress },
    PortUnsubscribed { sender: SourceAddress, dest: SourceAddress },
    SysEx { data: Vec<u8> },
    /// Type tag outside the known set
    Unknown { event_type: u8 },
}

/// Decode a legacy record
pub fn decode(record: &LegacyRecord) -> LegacyEvent {
    let from_timer = record.source.is_system_timer();
    let channel = record.byte(0);
    let queue = record.byte(0);

    match record.event_type {
        ty::NOTEON => {
            let note = record.byte(1);
            let velocity = record.byte(2);
            if velocity == 0 {
                LegacyEvent::NoteOff { channel, note, velocity: None }
            } else {
                LegacyEvent::NoteOn { channel, note, velocity }
            }
        }
        ty::NOTEOFF => LegacyEvent::NoteOff {
            channel,
            note: record.byte(1),
            velocity: Some(record.byte(2)),
        },
        ty::KEYPRESS => LegacyEvent::KeyPressure {
            channel,
            note: record.byte(1),
            value: record.byte(2),
        },
        ty::CONTROLLER => LegacyEvent::ControlChange {
            channel,
            controller: record.u32_at(4),
            value: record.i32_at(8),
        },
        ty::PGMCHANGE => LegacyEvent::ProgramChange { channel, program: record.i32_at(8) },
        ty::CHANPRESS => LegacyEvent::ChannelPressure { channel, value: record.i32_at(8) },
        ty::PITCHBEND => LegacyEvent::PitchBend { channel, value: record.i32_at(8) },
        ty::CONTROL14 => LegacyEvent::Control14 {
            channel,
            controller: record.u32_at(4),
            value: record.i32_at(8),
        },
        ty::NONREGPARAM => LegacyEvent::NonRegisteredParam {
            channel,
            param: record.u32_at(4),
            value: record.i32_at(8),
        },
        ty::REGPARAM => LegacyEvent::RegisteredParam {
            channel,
            param: record.u32_at(4),
            value: record.i32_at(8),
        },
        ty::SONGPOS => LegacyEvent::SongPosition { value: record.i32_at(8) },
        ty::SONGSEL => LegacyEvent::SongSelect { value: record.i32_at(8) },
        ty::QFRAME => LegacyEvent::QuarterFrame { value: record.i32_at(8) },
        ty::TIMESIGN => LegacyEvent::TimeSignature { value: record.i32_at(8) },
        ty::KEYSIGN => LegacyEvent::KeySignature { value: record.i32_at(8) },
        ty::START => LegacyEvent::Start { queue: from_timer.then_some(queue) },
        ty::CONTINUE => LegacyEvent::Continue { queue: from_timer.then_some(queue) },
        ty::STOP => LegacyEvent::Stop { queue: from_timer.then_some(queue) },
        ty::SETPOS_TICK => LegacyEvent::SetPositionTick { queue },
        ty::SETPOS_TIME => LegacyEvent::SetPositionTime { queue },
        ty::TEMPO => LegacyEvent::Tempo { queue },
        ty::CLOCK => LegacyEvent::Clock,
        ty::TICK => LegacyEvent::Tick,
        ty::QUEUE_SKEW => LegacyEvent::QueueSkew { queue },
        ty::TUNE_REQUEST => LegacyEvent::TuneRequest,
        ty::RESET => LegacyEvent::Reset,
        ty::SENSING => LegacyEvent::ActiveSensing,
        ty::CLIENT_START => LegacyEvent::ClientStart { client: record.byte(0) },
        ty::CLIENT_EXIT => LegacyEvent::ClientExit { client: record.byte(0) },
        ty::CLIENT_CHANGE => LegacyEvent::ClientChange { client: record.byte(0) },
        ty::PORT_START => LegacyEvent::PortStart { addr: addr_at(record, 0) },
        ty::PORT_EXIT => LegacyEvent::PortExit { addr: addr_at(record, 0) },
        ty::PORT_CHANGE => LegacyEvent::PortChange { addr: addr_at(record, 0) },
        ty::PORT_SUBSCRIBED => LegacyEvent::PortSubscribed {
            sender: addr_at(record, 0),
            dest: addr_at(record, 2),
        },
        ty::PORT_UNSUBSCRIBED => LegacyEvent::PortUnsubscribed {
            sender: addr_at(record, 0),
            dest: addr_at(record, 2),
        },
        ty::SYSEX => LegacyEvent::SysEx { data: record.ext.clone() },
        other => LegacyEvent::Unknown { event_type: other },
    }
}

fn addr_at(record: &LegacyRecord, offset: usize) -> SourceAddress {
    SourceAddress::new(record.byte(offset), record.byte(offset + 1))
}
