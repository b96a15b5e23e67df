//! Raw event sources
//!
//! A source hands out raw units one at a time without blocking, and offers a
//! readiness wait for when nothing is pending. The drain loop only talks to
//! the [`EventSource`] trait, so live ports, capture replays and test fakes
//! are interchangeable.

pub mod channel;
#[cfg(feature = "live")]
pub mod live;
pub mod replay;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::{ProtocolMode, RawUnit};

pub use channel::{ChannelSource, UnitSender};

/// Hard source failures; "nothing ready" is not an error
#[derive(Error, Debug)]
pub enum SourceError {
    /// All producers are gone and every queued unit has been delivered
    #[error("event source disconnected")]
    Disconnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("replay line {line}: {message}")]
    Replay { line: usize, message: String },

    #[error("MIDI port error: {0}")]
    Port(String),
}

#[async_trait]
pub trait EventSource: Send {
    /// Wait until at least one unit can be pulled without blocking
    ///
    /// Must be cancel-safe: dropping the future loses no unit.
    async fn readable(&mut self) -> Result<(), SourceError>;

    /// Next unit, or `Ok(None)` when nothing is ready right now
    fn pull(&mut self) -> Result<Option<RawUnit>, SourceError>;

    /// Protocol the client was opened with
    fn mode(&self) -> ProtocolMode;
}
