//! Drain loop: wait for readiness, empty the source, flush, repeat
//!
//! One cycle pulls every unit that is ready without blocking, writes one line
//! per unit and flushes the output once. Cancellation is honoured while
//! waiting and between units.

use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, trace};

use crate::cancel::Cancellation;
use crate::dispatch;
use crate::event::ProtocolMode;
use crate::source::{EventSource, SourceError};

#[derive(Error, Debug)]
pub enum DrainError {
    #[error("event source failed: {0}")]
    Source(#[from] SourceError),

    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

impl DrainError {
    /// The source ran dry for good (end of a capture, producers gone)
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, DrainError::Source(SourceError::Disconnected))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    Waiting,
    Draining,
    Terminated,
}

/// Totals reported when the loop ends cleanly
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    pub units: u64,
    pub cycles: u64,
}

pub struct Drain<S, W> {
    source: S,
    out: W,
    mode: ProtocolMode,
    state: DrainState,
    summary: DrainSummary,
}

enum CycleEnd {
    WouldBlock,
    Cancelled,
}

impl<S: EventSource, W: Write> Drain<S, W> {
    pub fn new(source: S, out: W) -> Self {
        let mode = source.mode();
        Self {
            source,
            out,
            mode,
            state: DrainState::Waiting,
            summary: DrainSummary::default(),
        }
    }

    pub fn state(&self) -> DrainState {
        self.state
    }

    pub fn mode(&self) -> ProtocolMode {
        self.mode
    }

    /// Run until cancelled or until the source or output fails
    ///
    /// The source is dropped when this returns, releasing its connections.
    pub async fn run(mut self, cancel: &Cancellation) -> Result<DrainSummary, DrainError> {
        let result = self.run_cycles(cancel).await;
        self.state = DrainState::Terminated;
        debug!(
            "Drain loop terminated after {} cycles, {} units",
            self.summary.cycles, self.summary.units
        );
        result.map(|()| self.summary)
    }

    async fn run_cycles(&mut self, cancel: &Cancellation) -> Result<(), DrainError> {
        loop {
            self.state = DrainState::Waiting;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                ready = self.source.readable() => ready?,
            }

            self.state = DrainState::Draining;
            if let CycleEnd::Cancelled = self.drain_cycle(cancel)? {
                return Ok(());
            }
        }
    }

    fn drain_cycle(&mut self, cancel: &Cancellation) -> Result<CycleEnd, DrainError> {
        let mut written = 0u64;
        let outcome = loop {
            if cancel.is_cancelled() {
                break Ok(CycleEnd::Cancelled);
            }
            match self.source.pull() {
                Ok(Some(unit)) => {
                    let line = dispatch::render(&unit, self.mode);
                    if let Err(e) = writeln!(self.out, "{}", line) {
                        break Err(DrainError::Output(e));
                    }
                    written += 1;
                }
                Ok(None) => break Ok(CycleEnd::WouldBlock),
                Err(e) => break Err(DrainError::Source(e)),
            }
        };

        // Every cycle ends with exactly one flush, whatever stopped it
        let flushed = self.out.flush();
        self.summary.units += written;
        self.summary.cycles += 1;
        trace!("Drain cycle {}: {} units", self.summary.cycles, written);

        let end = outcome?;
        flushed?;
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{event_type, LegacyRecord, RawUnit, SourceAddress, UmpRecord};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;

    const SRC: SourceAddress = SourceAddress::new(20, 0);

    fn note(note: u8) -> RawUnit {
        LegacyRecord::note(event_type::NOTEON, SRC, 0, note, 100).into()
    }

    /// Hands out scripted batches; idles forever once the script is done
    struct ScriptedSource {
        batches: VecDeque<Vec<RawUnit>>,
        ready: VecDeque<RawUnit>,
        mode: ProtocolMode,
        pulled: usize,
        cancel_after: Option<(usize, Cancellation)>,
        fail_after_script: bool,
    }

    impl ScriptedSource {
        fn new(mode: ProtocolMode, batches: Vec<Vec<RawUnit>>) -> Self {
            Self {
                batches: batches.into(),
                ready: VecDeque::new(),
                mode,
                pulled: 0,
                cancel_after: None,
                fail_after_script: false,
            }
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn readable(&mut self) -> Result<(), SourceError> {
            if !self.ready.is_empty() {
                return Ok(());
            }
            match self.batches.pop_front() {
                Some(batch) => {
                    self.ready.extend(batch);
                    Ok(())
                }
                None if self.fail_after_script => Err(SourceError::Port("unplugged".into())),
                None => std::future::pending().await,
            }
        }

        fn pull(&mut self) -> Result<Option<RawUnit>, SourceError> {
            let unit = self.ready.pop_front();
            if unit.is_some() {
                self.pulled += 1;
                if let Some((after, cancel)) = &self.cancel_after {
                    if self.pulled == *after {
                        cancel.cancel();
                    }
                }
            }
            Ok(unit)
        }

        fn mode(&self) -> ProtocolMode {
            self.mode
        }
    }

    /// Records output and the line count at each flush
    #[derive(Default)]
    struct Recorder {
        text: String,
        flushes: Vec<usize>,
        fail_writes: bool,
    }

    impl Recorder {
        fn lines(&self) -> Vec<&str> {
            self.text.lines().collect()
        }
    }

    impl Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            self.text.push_str(&String::from_utf8_lossy(buf));
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes.push(self.text.lines().count());
            Ok(())
        }
    }

    async fn run_until_idle(
        source: ScriptedSource,
        out: &mut Recorder,
    ) -> Result<DrainSummary, DrainError> {
        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        Drain::new(source, out).run(&cancel).await
    }

    #[tokio::test]
    async fn test_lines_in_order_with_one_flush_per_cycle() {
        let source = ScriptedSource::new(
            ProtocolMode::Legacy,
            vec![vec![note(60), note(61)], vec![note(62)]],
        );
        let mut out = Recorder::default();

        let summary = run_until_idle(source, &mut out).await.unwrap();

        assert_eq!(summary, DrainSummary { units: 3, cycles: 2 });
        let lines = out.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("note 60, velocity 100"));
        assert!(lines[1].ends_with("note 61, velocity 100"));
        assert!(lines[2].ends_with("note 62, velocity 100"));
        assert_eq!(out.flushes, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_writes_nothing() {
        let source = ScriptedSource::new(ProtocolMode::Legacy, vec![vec![note(60)]]);
        let cancel = Cancellation::new();
        cancel.cancel();
        let mut out = Recorder::default();

        let summary = Drain::new(source, &mut out).run(&cancel).await.unwrap();

        assert_eq!(summary, DrainSummary::default());
        assert!(out.text.is_empty());
        assert!(out.flushes.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_drain_flushes_decoded_lines() {
        let cancel = Cancellation::new();
        let mut source = ScriptedSource::new(
            ProtocolMode::Legacy,
            vec![vec![note(60), note(61), note(62), note(63)]],
        );
        source.cancel_after = Some((2, cancel.clone()));
        let mut out = Recorder::default();

        let summary = Drain::new(source, &mut out).run(&cancel).await.unwrap();

        assert_eq!(summary, DrainSummary { units: 2, cycles: 1 });
        assert_eq!(out.lines().len(), 2);
        assert_eq!(out.flushes, vec![2]);
    }

    #[tokio::test]
    async fn test_source_error_ends_loop_after_flush() {
        let mut source = ScriptedSource::new(ProtocolMode::Legacy, vec![vec![note(60)]]);
        source.fail_after_script = true;
        let mut out = Recorder::default();

        let err = Drain::new(source, &mut out)
            .run(&Cancellation::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DrainError::Source(SourceError::Port(_))));
        assert!(!err.is_end_of_input());
        assert_eq!(out.lines().len(), 1);
        assert_eq!(out.flushes, vec![1]);
    }

    #[tokio::test]
    async fn test_write_failure_is_output_error() {
        let source = ScriptedSource::new(ProtocolMode::Legacy, vec![vec![note(60)]]);
        let mut out = Recorder {
            fail_writes: true,
            ..Recorder::default()
        };

        let err = Drain::new(source, &mut out)
            .run(&Cancellation::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DrainError::Output(_)));
        assert_eq!(out.flushes.len(), 1);
    }

    #[tokio::test]
    async fn test_mode_comes_from_source() {
        let unit = RawUnit::Ump(UmpRecord::new(SRC, &[0x2090_3C64]));
        let source = ScriptedSource::new(ProtocolMode::Ump1, vec![vec![unit]]);
        let mut out = Recorder::default();

        let drain = Drain::new(source, &mut out);
        assert_eq!(drain.mode(), ProtocolMode::Ump1);
        assert_eq!(drain.state(), DrainState::Waiting);

        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        drain.run(&cancel).await.unwrap();

        let lines = out.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Group  0"));
        assert!(lines[0].contains("Note on"));
    }
}
