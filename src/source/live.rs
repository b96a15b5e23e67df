//! Live MIDI input through midir
//!
//! Each connected port gets its own callback thread. Callbacks parse the
//! incoming bytes, convert them for the client's protocol mode and push the
//! resulting units into a shared [`ChannelSource`].

use midir::{Ignore, MidiInput, MidiInputConnection};
use tracing::{debug, info, trace};

use super::{ChannelSource, SourceError, UnitSender};
use crate::event::{ProtocolMode, SourceAddress};
use crate::midi::{format_hex, Converter, MidiMessage};
use crate::ports::{self, PortInfo, PortSpec};

/// midir does not report who wrote to a virtual port
pub const VIRTUAL_SENDER: SourceAddress = SourceAddress::new(255, 0);

#[derive(Debug, Clone)]
pub struct LiveOptions {
    pub client_name: String,
    pub ports: Vec<PortSpec>,
    pub mode: ProtocolMode,
    pub raw: bool,
}

/// What the live input is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listening {
    Ports(Vec<PortInfo>),
    Virtual(String),
}

/// Open port connections; dropping this closes them
pub struct LiveInput {
    connections: Vec<MidiInputConnection<()>>,
    listening: Listening,
}

impl LiveInput {
    pub fn listening(&self) -> &Listening {
        &self.listening
    }

    pub fn close(self) {
        let count = self.connections.len();
        for connection in self.connections {
            connection.close();
        }
        debug!("Closed {} MIDI input connection(s)", count);
    }
}

fn port_error(e: impl std::fmt::Display) -> SourceError {
    SourceError::Port(e.to_string())
}

fn new_input(client_name: &str) -> Result<MidiInput, SourceError> {
    let mut midi_in = MidiInput::new(client_name).map_err(port_error)?;
    midi_in.ignore(Ignore::None);
    Ok(midi_in)
}

fn callback(
    source: SourceAddress,
    mut converter: Converter,
    tx: UnitSender,
) -> impl FnMut(u64, &[u8], &mut ()) + Send + 'static {
    move |_stamp, data, _| match MidiMessage::parse(data) {
        Some(message) => {
            trace!("{}: {}", source, message);
            for unit in converter.convert(source, &message) {
                tx.send(unit);
            }
        }
        None => debug!("Ignoring unparsable MIDI from {}: {}", source, format_hex(data)),
    }
}

/// Connect the requested ports, or create a virtual port when none are given
pub fn open(options: &LiveOptions) -> Result<(LiveInput, ChannelSource), SourceError> {
    let (tx, source) = ChannelSource::new(options.mode);
    let converter = Converter::new(options.mode, options.raw);

    if options.ports.is_empty() {
        let connection = open_virtual(options, callback(VIRTUAL_SENDER, converter, tx))?;
        let input = LiveInput {
            connections: vec![connection],
            listening: Listening::Virtual(options.client_name.clone()),
        };
        return Ok((input, source));
    }

    let available = ports::discover_input_ports(&options.client_name)?;
    let mut connections = Vec::new();
    let mut connected = Vec::new();

    for spec in &options.ports {
        let info = spec
            .resolve(&available)
            .ok_or_else(|| SourceError::Port(format!("invalid source address {}", spec)))?;

        // Each connection consumes its MidiInput, so enumerate again and
        // look the port up by identity rather than by its old index
        let midi_in = new_input(&options.client_name)?;
        let (current, handles): (Vec<PortInfo>, Vec<_>) =
            ports::enumerate(&midi_in).into_iter().unzip();
        let port = ports::find_current(&current, info)
            .and_then(|position| handles.into_iter().nth(position))
            .ok_or_else(|| SourceError::Port(format!("port {} disappeared", info.address)))?;

        info!("Connecting to: {} ({})", info.port_name, info.address);
        let connection = midi_in
            .connect(
                &port,
                &options.client_name,
                callback(info.address, converter.clone(), tx.clone()),
                (),
            )
            .map_err(|e| {
                SourceError::Port(format!("cannot connect from port {}: {}", info.address, e))
            })?;

        connections.push(connection);
        connected.push(info.clone());
    }

    let input = LiveInput {
        connections,
        listening: Listening::Ports(connected),
    };
    Ok((input, source))
}

#[cfg(unix)]
fn open_virtual<F>(options: &LiveOptions, callback: F) -> Result<MidiInputConnection<()>, SourceError>
where
    F: FnMut(u64, &[u8], &mut ()) + Send + 'static,
{
    use midir::os::unix::VirtualInput;

    let midi_in = new_input(&options.client_name)?;
    let connection = midi_in
        .create_virtual(&options.client_name, callback, ())
        .map_err(port_error)?;
    info!("Created virtual input port {}", options.client_name);
    Ok(connection)
}

#[cfg(not(unix))]
fn open_virtual<F>(_options: &LiveOptions, _callback: F) -> Result<MidiInputConnection<()>, SourceError>
where
    F: FnMut(u64, &[u8], &mut ()) + Send + 'static,
{
    Err(SourceError::Port(
        "virtual ports are not supported here; use --port".to_string(),
    ))
}
