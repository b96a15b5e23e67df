//! Raw sequencer units and the types shared by the decoders
//!
//! A raw unit is one undecoded event as the source delivers it: either a
//! legacy fixed-layout sequencer record or a group of UMP words.

use std::fmt;
use std::str::FromStr;

/// Originating endpoint of an event (sequencer client and port)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceAddress {
    pub client: u8,
    pub port: u8,
}

impl SourceAddress {
    /// Reserved system timer address; transport events from here are queue control
    pub const SYSTEM_TIMER: SourceAddress = SourceAddress { client: 0, port: 0 };

    /// System announce address (client/port lifecycle notifications)
    pub const SYSTEM_ANNOUNCE: SourceAddress = SourceAddress { client: 0, port: 1 };

    pub const fn new(client: u8, port: u8) -> Self {
        Self { client, port }
    }

    pub fn is_system_timer(&self) -> bool {
        *self == Self::SYSTEM_TIMER
    }
}

impl fmt::Display for SourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.client, self.port)
    }
}

impl FromStr for SourceAddress {
    type Err = String;

    /// Parse `client:port`; a bare client number means port 0
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (client, port) = match s.split_once(':') {
            Some((c, p)) => (c, p),
            None => (s, "0"),
        };
        let client = client
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("invalid client number in '{}'", s))?;
        let port = port
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("invalid port number in '{}'", s))?;
        Ok(Self { client, port })
    }
}

/// Client protocol version selected before the drain loop starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolMode {
    /// Legacy sequencer events only
    #[default]
    Legacy,
    /// UMP with MIDI 1.0 channel voice messages
    Ump1,
    /// UMP with MIDI 2.0 channel voice messages
    Ump2,
}

impl ProtocolMode {
    /// Map the numeric MIDI version (0, 1, 2) used on the command line
    pub fn from_version(version: u8) -> Option<Self> {
        match version {
            0 => Some(ProtocolMode::Legacy),
            1 => Some(ProtocolMode::Ump1),
            2 => Some(ProtocolMode::Ump2),
            _ => None,
        }
    }

    pub fn is_ump(&self) -> bool {
        !matches!(self, ProtocolMode::Legacy)
    }
}

impl fmt::Display for ProtocolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolMode::Legacy => write!(f, "legacy"),
            ProtocolMode::Ump1 => write!(f, "UMP MIDI 1.0"),
            ProtocolMode::Ump2 => write!(f, "UMP MIDI 2.0"),
        }
    }
}

/// Size of the fixed payload area of a legacy sequencer event
pub const LEGACY_DATA_LEN: usize = 12;

/// Legacy sequencer event type tags
pub mod event_type {
    pub const NOTEON: u8 = 6;
    pub const NOTEOFF: u8 = 7;
    pub const KEYPRESS: u8 = 8;
    pub const CONTROLLER: u8 = 10;
    pub const PGMCHANGE: u8 = 11;
    pub const CHANPRESS: u8 = 12;
    pub const PITCHBEND: u8 = 13;
    pub const CONTROL14: u8 = 14;
    pub const NONREGPARAM: u8 = 15;
    pub const REGPARAM: u8 = 16;
    pub const SONGPOS: u8 = 20;
    pub const SONGSEL: u8 = 21;
    pub const QFRAME: u8 = 22;
    pub const TIMESIGN: u8 = 23;
    pub const KEYSIGN: u8 = 24;
    pub const START: u8 = 30;
    pub const CONTINUE: u8 = 31;
    pub const STOP: u8 = 32;
    pub const SETPOS_TICK: u8 = 33;
    pub const SETPOS_TIME: u8 = 34;
    pub const TEMPO: u8 = 35;
    pub const CLOCK: u8 = 36;
    pub const TICK: u8 = 37;
    pub const QUEUE_SKEW: u8 = 38;
    pub const TUNE_REQUEST: u8 = 40;
    pub const RESET: u8 = 41;
    pub const SENSING: u8 = 42;
    pub const CLIENT_START: u8 = 60;
    pub const CLIENT_EXIT: u8 = 61;
    pub const CLIENT_CHANGE: u8 = 62;
    pub const PORT_START: u8 = 63;
    pub const PORT_EXIT: u8 = 64;
    pub const PORT_CHANGE: u8 = 65;
    pub const PORT_SUBSCRIBED: u8 = 66;
    pub const PORT_UNSUBSCRIBED: u8 = 67;
    pub const SYSEX: u8 = 130;
}

/// Legacy fixed-layout sequencer event
///
/// `data` is the 12-byte payload area. Which overlay applies (note, control,
/// queue, address, connection) depends on `event_type`; multi-byte fields are
/// little-endian. Variable-length payloads live in `ext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRecord {
    pub event_type: u8,
    pub source: SourceAddress,
    pub data: [u8; LEGACY_DATA_LEN],
    pub ext: Vec<u8>,
}

impl LegacyRecord {
    pub fn new(event_type: u8, source: SourceAddress) -> Self {
        Self {
            event_type,
            source,
            data: [0; LEGACY_DATA_LEN],
            ext: Vec::new(),
        }
    }

    /// Note overlay: channel, note, velocity
    pub fn note(event_type: u8, source: SourceAddress, channel: u8, note: u8, velocity: u8) -> Self {
        let mut record = Self::new(event_type, source);
        record.data[0] = channel;
        record.data[1] = note;
        record.data[2] = velocity;
        record
    }

    /// Control overlay: channel, parameter, signed value
    pub fn control(event_type: u8, source: SourceAddress, channel: u8, param: u32, value: i32) -> Self {
        let mut record = Self::new(event_type, source);
        record.data[0] = channel;
        record.data[4..8].copy_from_slice(&param.to_le_bytes());
        record.data[8..12].copy_from_slice(&value.to_le_bytes());
        record
    }

    /// Queue overlay: queue id and its parameter
    pub fn queue(event_type: u8, source: SourceAddress, queue: u8, value: i32) -> Self {
        let mut record = Self::new(event_type, source);
        record.data[0] = queue;
        record.data[4..8].copy_from_slice(&value.to_le_bytes());
        record
    }

    /// Address overlay: a single client:port
    pub fn addr(event_type: u8, source: SourceAddress, addr: SourceAddress) -> Self {
        let mut record = Self::new(event_type, source);
        record.data[0] = addr.client;
        record.data[1] = addr.port;
        record
    }

    /// Connection overlay: sender and destination
    pub fn connect(
        event_type: u8,
        source: SourceAddress,
        sender: SourceAddress,
        dest: SourceAddress,
    ) -> Self {
        let mut record = Self::new(event_type, source);
        record.data[0] = sender.client;
        record.data[1] = sender.port;
        record.data[2] = dest.client;
        record.data[3] = dest.port;
        record
    }

    /// Variable-length payload (system exclusive)
    pub fn sysex(source: SourceAddress, bytes: Vec<u8>) -> Self {
        let mut record = Self::new(event_type::SYSEX, source);
        record.data[0..4].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
        record.ext = bytes;
        record
    }

    pub fn byte(&self, offset: usize) -> u8 {
        self.data[offset]
    }

    pub fn u32_at(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    pub fn i32_at(&self, offset: usize) -> i32 {
        self.u32_at(offset) as i32
    }
}

/// Maximum number of words in one UMP packet
pub const UMP_MAX_WORDS: usize = 4;

/// One UMP packet as delivered by the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UmpRecord {
    pub source: SourceAddress,
    pub words: [u32; UMP_MAX_WORDS],
}

impl UmpRecord {
    /// Build from up to four words; extra words are ignored, missing ones are zero
    pub fn new(source: SourceAddress, words: &[u32]) -> Self {
        let mut packed = [0u32; UMP_MAX_WORDS];
        for (slot, word) in packed.iter_mut().zip(words) {
            *slot = *word;
        }
        Self { source, words: packed }
    }
}

/// One undecoded unit, in either shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawUnit {
    Legacy(LegacyRecord),
    Ump(UmpRecord),
}

impl RawUnit {
    pub fn is_ump(&self) -> bool {
        matches!(self, RawUnit::Ump(_))
    }
}

impl From<LegacyRecord> for RawUnit {
    fn from(record: LegacyRecord) -> Self {
        RawUnit::Legacy(record)
    }
}

impl From<UmpRecord> for RawUnit {
    fn from(record: UmpRecord) -> Self {
        RawUnit::Ump(record)
    }
}
