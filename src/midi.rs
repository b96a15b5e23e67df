//! MIDI 1.0 byte stream messages and their conversion into sequencer units
//!
//! Input ports hand us plain MIDI 1.0 bytes. Depending on the client protocol
//! they become legacy sequencer records or UMP packets, the same way the
//! sequencer core converts events for clients of either kind.

use std::fmt;

use crate::event::{LegacyRecord, ProtocolMode, RawUnit, SourceAddress, UmpRecord};
use crate::ump;

/// MIDI message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    ///
    /// Velocity 0 is kept as-is; relabelling is up to the consumer.
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Polyphonic Key Pressure: channel (0-15), note (0-127), pressure (0-127)
    PolyPressure { channel: u8, note: u8, pressure: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },

    /// Channel Pressure: channel (0-15), pressure (0-127)
    ChannelPressure { channel: u8, pressure: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },

    /// System Exclusive payload, without the F0/F7 framing
    SysEx { data: Vec<u8> },

    /// MIDI Time Code Quarter Frame
    MidiTimeCode { data: u8 },

    /// Song Position Pointer
    SongPosition { position: u16 },

    /// Song Select
    SongSelect { song: u8 },

    TuneRequest,
    TimingClock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    SystemReset,
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    ///
    /// Returns `None` for running status, truncated messages and SysEx
    /// without its terminating F7.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;

        if status < 0x80 {
            return None;
        }

        let data1 = data.get(1).map(|b| b & 0x7F);
        let data2 = data.get(2).map(|b| b & 0x7F);

        if status < 0xF0 {
            let channel = status & 0x0F;
            return match status & 0xF0 {
                0x80 => Some(MidiMessage::NoteOff { channel, note: data1?, velocity: data2? }),
                0x90 => Some(MidiMessage::NoteOn { channel, note: data1?, velocity: data2? }),
                0xA0 => Some(MidiMessage::PolyPressure { channel, note: data1?, pressure: data2? }),
                0xB0 => Some(MidiMessage::ControlChange { channel, cc: data1?, value: data2? }),
                0xC0 => Some(MidiMessage::ProgramChange { channel, program: data1? }),
                0xD0 => Some(MidiMessage::ChannelPressure { channel, pressure: data1? }),
                0xE0 => {
                    let lsb = data1? as u16;
                    let msb = data2? as u16;
                    Some(MidiMessage::PitchBend { channel, value: (msb << 7) | lsb })
                }
                _ => None,
            };
        }

        match status {
            0xF0 => {
                let end = data.iter().position(|&b| b == 0xF7)?;
                Some(MidiMessage::SysEx { data: data[1..end].to_vec() })
            }
            0xF1 => Some(MidiMessage::MidiTimeCode { data: data1? }),
            0xF2 => {
                let lsb = data1? as u16;
                let msb = data2? as u16;
                Some(MidiMessage::SongPosition { position: (msb << 7) | lsb })
            }
            0xF3 => Some(MidiMessage::SongSelect { song: data1? }),
            0xF6 => Some(MidiMessage::TuneRequest),
            0xF8 => Some(MidiMessage::TimingClock),
            0xFA => Some(MidiMessage::Start),
            0xFB => Some(MidiMessage::Continue),
            0xFC => Some(MidiMessage::Stop),
            0xFE => Some(MidiMessage::ActiveSensing),
            0xFF => Some(MidiMessage::SystemReset),
            _ => None,
        }
    }

    /// Get the channel for channel messages (0-15), None for system messages
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOff { channel, .. }
            | MidiMessage::NoteOn { channel, .. }
            | MidiMessage::PolyPressure { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::ChannelPressure { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// Status byte of a channel or system common/real-time message
    fn status_byte(&self) -> u8 {
        match *self {
            MidiMessage::NoteOff { channel, .. } => 0x80 | channel,
            MidiMessage::NoteOn { channel, .. } => 0x90 | channel,
            MidiMessage::PolyPressure { channel, .. } => 0xA0 | channel,
            MidiMessage::ControlChange { channel, .. } => 0xB0 | channel,
            MidiMessage::ProgramChange { channel, .. } => 0xC0 | channel,
            MidiMessage::ChannelPressure { channel, .. } => 0xD0 | channel,
            MidiMessage::PitchBend { channel, .. } => 0xE0 | channel,
            MidiMessage::SysEx { .. } => 0xF0,
            MidiMessage::MidiTimeCode { .. } => 0xF1,
            MidiMessage::SongPosition { .. } => 0xF2,
            MidiMessage::SongSelect { .. } => 0xF3,
            MidiMessage::TuneRequest => 0xF6,
            MidiMessage::TimingClock => 0xF8,
            MidiMessage::Start => 0xFA,
            MidiMessage::Continue => 0xFB,
            MidiMessage::Stop => 0xFC,
            MidiMessage::ActiveSensing => 0xFE,
            MidiMessage::SystemReset => 0xFF,
        }
    }

    /// Convert to a legacy sequencer record
    pub fn to_legacy(&self, source: SourceAddress) -> LegacyRecord {
        use crate::event::event_type as ty;

        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                LegacyRecord::note(ty::NOTEOFF, source, channel, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                LegacyRecord::note(ty::NOTEON, source, channel, note, velocity)
            }
            MidiMessage::PolyPressure { channel, note, pressure } => {
                LegacyRecord::note(ty::KEYPRESS, source, channel, note, pressure)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                LegacyRecord::control(ty::CONTROLLER, source, channel, cc as u32, value as i32)
            }
            MidiMessage::ProgramChange { channel, program } => {
                LegacyRecord::control(ty::PGMCHANGE, source, channel, 0, program as i32)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                LegacyRecord::control(ty::CHANPRESS, source, channel, 0, pressure as i32)
            }
            MidiMessage::PitchBend { channel, value } => {
                LegacyRecord::control(ty::PITCHBEND, source, channel, 0, value as i32 - 8192)
            }
            MidiMessage::SysEx { ref data } => {
                let mut framed = Vec::with_capacity(data.len() + 2);
                framed.push(0xF0);
                framed.extend_from_slice(data);
                framed.push(0xF7);
                LegacyRecord::sysex(source, framed)
            }
            MidiMessage::MidiTimeCode { data } => {
                LegacyRecord::control(ty::QFRAME, source, 0, 0, data as i32)
            }
            MidiMessage::SongPosition { position } => {
                LegacyRecord::control(ty::SONGPOS, source, 0, 0, position as i32)
            }
            MidiMessage::SongSelect { song } => {
                LegacyRecord::control(ty::SONGSEL, source, 0, 0, song as i32)
            }
            MidiMessage::TuneRequest => LegacyRecord::new(ty::TUNE_REQUEST, source),
            MidiMessage::TimingClock => LegacyRecord::new(ty::CLOCK, source),
            MidiMessage::Start => LegacyRecord::new(ty::START, source),
            MidiMessage::Continue => LegacyRecord::new(ty::CONTINUE, source),
            MidiMessage::Stop => LegacyRecord::new(ty::STOP, source),
            MidiMessage::ActiveSensing => LegacyRecord::new(ty::SENSING, source),
            MidiMessage::SystemReset => LegacyRecord::new(ty::RESET, source),
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
            MidiMessage::SysEx { ref data } => write!(f, "SysEx {} bytes", data.len()),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// MIDI 1.0 to MIDI 2.0 resolution conversion
pub mod convert {
    /// Scale a value up by bit replication (min, center and max are preserved)
    pub fn scale_up(value: u32, src_bits: u32, dst_bits: u32) -> u32 {
        let scale_bits = dst_bits - src_bits;
        let mut shifted = (value as u64) << scale_bits;
        let center = 1u32 << (src_bits - 1);
        if value <= center {
            return shifted as u32;
        }

        let repeat_bits = src_bits - 1;
        let repeat_mask = (1u64 << repeat_bits) - 1;
        let mut repeat = value as u64 & repeat_mask;
        if scale_bits > repeat_bits {
            repeat <<= scale_bits - repeat_bits;
        } else {
            repeat >>= repeat_bits - scale_bits;
        }
        while repeat != 0 {
            shifted |= repeat;
            repeat >>= repeat_bits;
        }
        shifted as u32
    }

    /// 7-bit velocity to 16-bit
    pub fn velocity_to_16bit(velocity: u8) -> u16 {
        scale_up(velocity as u32, 7, 16) as u16
    }

    /// 7-bit controller or pressure value to 32-bit
    pub fn value_to_32bit(value: u8) -> u32 {
        scale_up(value as u32, 7, 32)
    }

    /// 14-bit pitch bend to 32-bit
    pub fn pitch_bend_to_32bit(value: u16) -> u32 {
        scale_up(value as u32, 14, 32)
    }
}

/// Bank select state for one channel, fed by CC 0 and CC 32
#[derive(Debug, Clone, Copy, Default)]
struct BankSelect {
    msb: Option<u8>,
    lsb: Option<u8>,
}

/// Converts parsed MIDI 1.0 messages into the raw units a client sees
#[derive(Debug, Clone)]
pub struct Converter {
    mode: ProtocolMode,
    raw: bool,
    group: u8,
    banks: [BankSelect; 16],
}

impl Converter {
    /// `raw` disables legacy to UMP conversion; UMP clients then receive
    /// legacy records unchanged
    pub fn new(mode: ProtocolMode, raw: bool) -> Self {
        Self {
            mode,
            raw,
            group: 0,
            banks: [BankSelect::default(); 16],
        }
    }

    /// Convert one message; SysEx may span several UMP packets
    pub fn convert(&mut self, source: SourceAddress, message: &MidiMessage) -> Vec<RawUnit> {
        if let MidiMessage::ControlChange { channel, cc, value } = *message {
            let bank = &mut self.banks[channel as usize & 0x0F];
            match cc {
                0 => bank.msb = Some(value),
                32 => bank.lsb = Some(value),
                _ => {}
            }
        }

        if self.raw || self.mode == ProtocolMode::Legacy {
            return vec![message.to_legacy(source).into()];
        }

        match message {
            MidiMessage::SysEx { data } => sysex7_packets(self.group, data)
                .into_iter()
                .map(|words| UmpRecord::new(source, &words).into())
                .collect(),
            _ if message.channel().is_none() => {
                vec![UmpRecord::new(source, &[self.system_word(message)]).into()]
            }
            _ if self.mode == ProtocolMode::Ump1 => {
                vec![UmpRecord::new(source, &[self.midi1_word(message)]).into()]
            }
            _ => vec![UmpRecord::new(source, &self.midi2_words(message)).into()],
        }
    }

    fn header(&self, message_type: u8, status: u8) -> u32 {
        (message_type as u32) << 28 | (self.group as u32) << 24 | (status as u32) << 16
    }

    /// Message type 0x1: system common and real time
    fn system_word(&self, message: &MidiMessage) -> u32 {
        let (data1, data2) = match *message {
            MidiMessage::MidiTimeCode { data } => (data, 0),
            MidiMessage::SongPosition { position } => {
                ((position & 0x7F) as u8, ((position >> 7) & 0x7F) as u8)
            }
            MidiMessage::SongSelect { song } => (song, 0),
            _ => (0, 0),
        };
        self.header(ump::message_type::SYSTEM, message.status_byte())
            | (data1 as u32) << 8
            | data2 as u32
    }

    /// Message type 0x2: MIDI 1.0 channel voice, byte for byte
    fn midi1_word(&self, message: &MidiMessage) -> u32 {
        let (data1, data2) = match *message {
            MidiMessage::NoteOff { note, velocity, .. }
            | MidiMessage::NoteOn { note, velocity, .. } => (note, velocity),
            MidiMessage::PolyPressure { note, pressure, .. } => (note, pressure),
            MidiMessage::ControlChange { cc, value, .. } => (cc, value),
            MidiMessage::ProgramChange { program, .. } => (program, 0),
            MidiMessage::ChannelPressure { pressure, .. } => (pressure, 0),
            MidiMessage::PitchBend { value, .. } => {
                ((value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8)
            }
            _ => (0, 0),
        };
        self.header(ump::message_type::MIDI1_CHANNEL_VOICE, message.status_byte())
            | (data1 as u32) << 8
            | data2 as u32
    }

    /// Message type 0x4: MIDI 2.0 channel voice with upscaled values
    fn midi2_words(&self, message: &MidiMessage) -> [u32; 2] {
        use convert::{pitch_bend_to_32bit, value_to_32bit, velocity_to_16bit};

        let cv = ump::message_type::MIDI2_CHANNEL_VOICE;
        match *message {
            MidiMessage::NoteOn { channel, note, velocity: 0 } => [
                self.header(cv, 0x80 | channel) | (note as u32) << 8,
                0,
            ],
            MidiMessage::NoteOn { channel, note, velocity } => [
                self.header(cv, 0x90 | channel) | (note as u32) << 8,
                (velocity_to_16bit(velocity) as u32) << 16,
            ],
            MidiMessage::NoteOff { channel, note, velocity } => [
                self.header(cv, 0x80 | channel) | (note as u32) << 8,
                (velocity_to_16bit(velocity) as u32) << 16,
            ],
            MidiMessage::PolyPressure { channel, note, pressure } => [
                self.header(cv, 0xA0 | channel) | (note as u32) << 8,
                value_to_32bit(pressure),
            ],
            MidiMessage::ControlChange { channel, cc, value } => [
                self.header(cv, 0xB0 | channel) | (cc as u32) << 8,
                value_to_32bit(value),
            ],
            MidiMessage::ProgramChange { channel, program } => {
                let bank = self.banks[channel as usize & 0x0F];
                let mut w0 = self.header(cv, 0xC0 | channel);
                let mut w1 = (program as u32) << 24;
                if let Some(msb) = bank.msb {
                    w0 |= 0x01;
                    w1 |= (msb as u32) << 8 | bank.lsb.unwrap_or(0) as u32;
                }
                [w0, w1]
            }
            MidiMessage::ChannelPressure { channel, pressure } => [
                self.header(cv, 0xD0 | channel),
                value_to_32bit(pressure),
            ],
            MidiMessage::PitchBend { channel, value } => [
                self.header(cv, 0xE0 | channel),
                pitch_bend_to_32bit(value),
            ],
            _ => [self.system_word(message), 0],
        }
    }
}

/// Split a SysEx payload into message type 0x3 packets of up to six bytes
pub fn sysex7_packets(group: u8, data: &[u8]) -> Vec<[u32; 2]> {
    const COMPLETE: u8 = 0x0;
    const START: u8 = 0x1;
    const CONTINUE: u8 = 0x2;
    const END: u8 = 0x3;

    let chunks: Vec<&[u8]> = if data.is_empty() {
        vec![data]
    } else {
        data.chunks(6).collect()
    };
    let last = chunks.len() - 1;

    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let kind = match (i, last) {
                (_, 0) => COMPLETE,
                (0, _) => START,
                (i, last) if i == last => END,
                _ => CONTINUE,
            };
            let mut bytes = [0u8; 6];
            for (slot, b) in bytes.iter_mut().zip(chunk.iter()) {
                *slot = b & 0x7F;
            }
            let w0 = (ump::message_type::DATA64 as u32) << 28
                | ((group & 0x0F) as u32) << 24
                | ((kind << 4 | chunk.len() as u8) as u32) << 16
                | (bytes[0] as u32) << 8
                | bytes[1] as u32;
            let w1 = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
            [w0, w1]
        })
        .collect()
}

/// Translate a UMP packet carrying MIDI 1.0 semantics back to a legacy record
///
/// Only MIDI 1.0 channel voice and system common/real-time packets have a
/// legacy equivalent.
pub fn legacy_from_ump(record: &UmpRecord) -> Option<LegacyRecord> {
    let w0 = record.words[0];
    match ump::message_type_of(w0) {
        ump::message_type::MIDI1_CHANNEL_VOICE | ump::message_type::SYSTEM => {
            let bytes = [(w0 >> 16) as u8, (w0 >> 8) as u8, w0 as u8];
            MidiMessage::parse(&bytes).map(|message| message.to_legacy(record.source))
        }
        _ => None,
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
