//! Input port discovery and selection

use std::io::{self, Write};

use crate::event::SourceAddress;

/// One input port as seen by the MIDI backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Position in the backend's enumeration
    pub index: usize,
    pub address: SourceAddress,
    pub client_name: String,
    pub port_name: String,
}

impl PortInfo {
    /// Build from a backend port name
    ///
    /// ALSA names look like `Client:Port C:P`. Anything else keeps the whole
    /// name as port name and uses the enumeration index as client number.
    pub fn from_backend_name(index: usize, name: &str) -> Self {
        let parsed = name.rsplit_once(' ').and_then(|(names, addr)| {
            let address = addr.parse::<SourceAddress>().ok().filter(|_| addr.contains(':'))?;
            let (client, port) = names.split_once(':')?;
            Some((address, client.to_string(), port.to_string()))
        });

        match parsed {
            Some((address, client_name, port_name)) => Self {
                index,
                address,
                client_name,
                port_name,
            },
            None => Self {
                index,
                address: SourceAddress::new(index.min(u8::MAX as usize) as u8, 0),
                client_name: String::new(),
                port_name: name.to_string(),
            },
        }
    }

    fn matches_name(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.client_name.to_lowercase().contains(&needle)
            || self.port_name.to_lowercase().contains(&needle)
    }
}

/// A requested port: an address or a name fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSpec {
    Address(SourceAddress),
    Name(String),
}

impl PortSpec {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.parse::<SourceAddress>() {
            Ok(address) => PortSpec::Address(address),
            Err(_) => PortSpec::Name(text.to_string()),
        }
    }

    /// Split a comma separated list, ignoring empty entries
    pub fn parse_list(text: &str) -> Vec<Self> {
        text.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// First matching port; names match case-insensitively
    pub fn resolve<'a>(&self, ports: &'a [PortInfo]) -> Option<&'a PortInfo> {
        match self {
            PortSpec::Address(address) => ports.iter().find(|p| p.address == *address),
            PortSpec::Name(name) => ports.iter().find(|p| p.matches_name(name)),
        }
    }
}

impl std::fmt::Display for PortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortSpec::Address(address) => write!(f, "{}", address),
            PortSpec::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Position of `wanted` in a fresh enumeration; indices shift when ports come and go
pub fn find_current(current: &[PortInfo], wanted: &PortInfo) -> Option<usize> {
    current.iter().position(|p| {
        p.address == wanted.address
            && p.client_name == wanted.client_name
            && p.port_name == wanted.port_name
    })
}

pub fn write_port_list<W: Write>(out: &mut W, ports: &[PortInfo]) -> io::Result<()> {
    writeln!(out, " Port    Client name                      Port name")?;
    for port in ports {
        writeln!(
            out,
            "{:>3}:{:<3}  {:<32.32} {}",
            port.address.client, port.address.port, port.client_name, port.port_name
        )?;
    }
    Ok(())
}

/// Enumerate input ports through midir
#[cfg(feature = "live")]
pub fn discover_input_ports(
    client_name: &str,
) -> Result<Vec<PortInfo>, crate::source::SourceError> {
    let midi_in = midir::MidiInput::new(client_name)
        .map_err(|e| crate::source::SourceError::Port(e.to_string()))?;
    Ok(enumerate(&midi_in).into_iter().map(|(info, _)| info).collect())
}

/// Describe every port of an open midir input, skipping unnamed ones
#[cfg(feature = "live")]
pub fn enumerate(midi_in: &midir::MidiInput) -> Vec<(PortInfo, midir::MidiInputPort)> {
    let mut ports = Vec::new();
    for (index, port) in midi_in.ports().into_iter().enumerate() {
        match midi_in.port_name(&port) {
            Ok(name) => ports.push((PortInfo::from_backend_name(index, &name), port)),
            Err(e) => tracing::debug!("Skipping port {}: {}", index, e),
        }
    }
    ports
}
