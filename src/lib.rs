//! seqdump: show the events received at MIDI sequencer ports
//!
//! Raw units (legacy sequencer events or UMP packets) are pulled from an
//! [`source::EventSource`], decoded per the client's [`event::ProtocolMode`]
//! and written one line each by the [`drain::Drain`] loop.

pub mod cancel;
pub mod config;
pub mod dispatch;
pub mod drain;
pub mod event;
pub mod format;
pub mod legacy;
pub mod midi;
pub mod ports;
pub mod source;
pub mod ump;

pub use cancel::Cancellation;
pub use drain::{Drain, DrainError, DrainSummary};
pub use event::{ProtocolMode, RawUnit, SourceAddress};
