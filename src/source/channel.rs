//! Channel-backed event source
//!
//! Producers (port callbacks, the replay reader) push units into an unbounded
//! channel, so bursts are never dropped and per-producer order is kept.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TryRecvError};

use super::{EventSource, SourceError};
use crate::event::{ProtocolMode, RawUnit};

type Item = Result<RawUnit, SourceError>;

/// Producer half of a [`ChannelSource`]
#[derive(Debug, Clone)]
pub struct UnitSender {
    tx: mpsc::UnboundedSender<Item>,
}

impl UnitSender {
    /// Queue a unit; returns false once the source has been dropped
    pub fn send(&self, unit: RawUnit) -> bool {
        self.tx.send(Ok(unit)).is_ok()
    }

    /// Queue a hard error; the reader sees it after every unit sent before it
    pub fn fail(&self, error: SourceError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }
}

/// Consumer half: implements [`EventSource`]
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Item>,
    /// Unit received while waiting for readiness, handed out by the next pull
    pending: Option<RawUnit>,
    mode: ProtocolMode,
}

impl ChannelSource {
    pub fn new(mode: ProtocolMode) -> (UnitSender, ChannelSource) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            UnitSender { tx },
            ChannelSource {
                rx,
                pending: None,
                mode,
            },
        )
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn readable(&mut self) -> Result<(), SourceError> {
        if self.pending.is_some() {
            return Ok(());
        }
        // recv() is cancel-safe; the unit is only stored once it arrived
        match self.rx.recv().await {
            Some(Ok(unit)) => {
                self.pending = Some(unit);
                Ok(())
            }
            Some(Err(error)) => Err(error),
            None => Err(SourceError::Disconnected),
        }
    }

    fn pull(&mut self) -> Result<Option<RawUnit>, SourceError> {
        if let Some(unit) = self.pending.take() {
            return Ok(Some(unit));
        }
        match self.rx.try_recv() {
            Ok(Ok(unit)) => Ok(Some(unit)),
            Ok(Err(error)) => Err(error),
            // Report disconnection from readable() so this cycle still flushes
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn mode(&self) -> ProtocolMode {
        self.mode
    }
}
