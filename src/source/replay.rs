//! Capture replay source
//!
//! Reads sequencer events from a JSON-lines capture, one raw unit per line:
//!
//! ```text
//! {"source":"20:0","type":6,"data":"003c64"}
//! {"source":"20:0","type":130,"ext":"f07e7f0601f7"}
//! {"source":"20:0","ump":["0x23b20740"]}
//! ```

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::thread;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::{ChannelSource, SourceError, UnitSender};
use crate::event::{
    event_type, LegacyRecord, ProtocolMode, RawUnit, SourceAddress, UmpRecord, LEGACY_DATA_LEN,
    UMP_MAX_WORDS,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaptureLine {
    source: String,
    #[serde(rename = "type")]
    event_type: Option<u8>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    ump: Option<Vec<String>>,
}

/// Where a capture is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayInput {
    Stdin,
    File(PathBuf),
}

impl ReplayInput {
    /// `-` selects standard input
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == "-" {
            ReplayInput::Stdin
        } else {
            ReplayInput::File(arg.to_path_buf())
        }
    }
}

/// Parse one capture line; `Ok(None)` for blanks and `#` comments
pub fn parse_line(text: &str, line: usize) -> Result<Option<RawUnit>, SourceError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let fail = |message: String| SourceError::Replay { line, message };

    let capture: CaptureLine =
        serde_json::from_str(text).map_err(|e| fail(e.to_string()))?;
    let source: SourceAddress = capture
        .source
        .parse()
        .map_err(|e| fail(format!("bad source address: {}", e)))?;

    match (capture.event_type, capture.ump) {
        (Some(_), Some(_)) => Err(fail("both \"type\" and \"ump\" given".to_string())),
        (None, None) => Err(fail("one of \"type\" or \"ump\" is required".to_string())),
        (None, Some(words)) => {
            if capture.data.is_some() || capture.ext.is_some() {
                return Err(fail("UMP lines take no \"data\" or \"ext\"".to_string()));
            }
            if words.is_empty() || words.len() > UMP_MAX_WORDS {
                return Err(fail(format!("expected 1 to {} UMP words", UMP_MAX_WORDS)));
            }
            let words = words
                .iter()
                .map(|w| parse_word(w))
                .collect::<Result<Vec<u32>, String>>()
                .map_err(fail)?;
            Ok(Some(UmpRecord::new(source, &words).into()))
        }
        (Some(ty), None) => {
            let ext = match &capture.ext {
                Some(ext) => hex::decode(ext).map_err(|e| fail(format!("bad ext: {}", e)))?,
                None => Vec::new(),
            };
            let mut record = if ty == event_type::SYSEX {
                LegacyRecord::sysex(source, ext)
            } else {
                let mut record = LegacyRecord::new(ty, source);
                record.ext = ext;
                record
            };
            if let Some(data) = &capture.data {
                let bytes = hex::decode(data).map_err(|e| fail(format!("bad data: {}", e)))?;
                if bytes.len() > LEGACY_DATA_LEN {
                    return Err(fail(format!(
                        "data is {} bytes, at most {} allowed",
                        bytes.len(),
                        LEGACY_DATA_LEN
                    )));
                }
                record.data[..bytes.len()].copy_from_slice(&bytes);
            }
            Ok(Some(record.into()))
        }
    }
}

fn parse_word(word: &str) -> Result<u32, String> {
    let digits = word
        .strip_prefix("0x")
        .or_else(|| word.strip_prefix("0X"))
        .unwrap_or(word);
    u32::from_str_radix(digits, 16).map_err(|e| format!("bad UMP word {:?}: {}", word, e))
}

/// Queue one capture line; false when reading should stop
fn forward(tx: &UnitSender, text: &str, line: usize, sent: &mut usize) -> bool {
    match parse_line(text, line) {
        Ok(Some(unit)) => {
            if !tx.send(unit) {
                debug!("Replay reader stopped: source closed");
                return false;
            }
            *sent += 1;
            true
        }
        Ok(None) => true,
        Err(e) => {
            tx.fail(e);
            false
        }
    }
}

/// Feed every unit of `reader` into `tx`
///
/// Stops at end of input, at the first malformed line (forwarded as a hard
/// error), or when the receiving source is gone.
pub async fn pump<R>(reader: R, tx: UnitSender) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line = 0;
    let mut sent = 0;

    loop {
        line += 1;
        match lines.next_line().await {
            Ok(Some(text)) => {
                if !forward(&tx, &text, line, &mut sent) {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tx.fail(SourceError::Io(e));
                break;
            }
        }
    }

    sent
}

/// Blocking twin of [`pump`] for readers that cannot be polled
pub fn pump_blocking<R: BufRead>(reader: R, tx: UnitSender) -> usize {
    let mut sent = 0;

    for (index, text) in reader.lines().enumerate() {
        match text {
            Ok(text) => {
                if !forward(&tx, &text, index + 1, &mut sent) {
                    break;
                }
            }
            Err(e) => {
                tx.fail(SourceError::Io(e));
                break;
            }
        }
    }

    sent
}

/// Replay a blocking reader from its own thread
///
/// The thread is detached: a read that never returns does not hold up
/// shutdown of the async runtime.
pub fn open_reader<R>(reader: R, mode: ProtocolMode) -> Result<ChannelSource, SourceError>
where
    R: BufRead + Send + 'static,
{
    let (tx, source) = ChannelSource::new(mode);

    thread::Builder::new()
        .name("replay-reader".to_string())
        .spawn(move || {
            let sent = pump_blocking(reader, tx);
            debug!("Replay finished: {} units", sent);
        })?;

    Ok(source)
}

/// Open a capture and replay it through a [`ChannelSource`]
pub async fn open(input: ReplayInput, mode: ProtocolMode) -> Result<ChannelSource, SourceError> {
    match input {
        ReplayInput::Stdin => {
            info!("Replaying capture from stdin");
            open_reader(io::BufReader::new(io::stdin()), mode)
        }
        ReplayInput::File(path) => {
            let file = tokio::fs::File::open(&path).await?;
            info!("Replaying capture {}", path.display());
            let (tx, source) = ChannelSource::new(mode);
            tokio::spawn(async move {
                let sent = pump(BufReader::new(file), tx).await;
                debug!("Replay of {} finished: {} units", path.display(), sent);
            });
            Ok(source)
        }
    }
}
