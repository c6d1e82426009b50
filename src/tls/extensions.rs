//! ClientInitial extension encoding and decoding.
//!
//! Extension format: type (2 bytes) + length (2 bytes) + data.
//! Only four types are recognised; anything else is rejected.

use crate::error::Error;
use crate::tls::messages::{get_bytes, get_u16, get_u8, put_bytes, put_u16, put_u8};

// Extension type codes
pub const EXT_SERVER_NAME: u16 = 0x0000;
pub const EXT_ALPN: u16 = 0x0010;
pub const EXT_SESSION_TICKET: u16 = 0x0023;
pub const EXT_QUIC_TRANSPORT_PARAMS: u16 = 0xFFA5;

pub const EXTENSION_HEADER_LEN: usize = 4;

const SNI_NAME_TYPE_HOST_NAME: u8 = 0;

/// One recognised extension, borrowing its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension<'a> {
    /// A single host name.
    ServerName(&'a str),
    /// Raw protocol name list: repeated `len:u8, name[len]`.
    AppProtocols(&'a [u8]),
    /// Opaque ticket; empty when the client only signals early data.
    SessionTicket(&'a [u8]),
    /// QUIC transport parameters, passed through untouched.
    TransportParameters(&'a [u8]),
}

impl<'a> Extension<'a> {
    pub fn ext_type(&self) -> u16 {
        match self {
            Extension::ServerName(_) => EXT_SERVER_NAME,
            Extension::AppProtocols(_) => EXT_ALPN,
            Extension::SessionTicket(_) => EXT_SESSION_TICKET,
            Extension::TransportParameters(_) => EXT_QUIC_TRANSPORT_PARAMS,
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            // list_len + name_type + name_len + name
            Extension::ServerName(name) => 2 + 1 + 2 + name.len(),
            Extension::AppProtocols(list) => 2 + list.len(),
            Extension::SessionTicket(data) | Extension::TransportParameters(data) => data.len(),
        }
    }

    /// Bytes this extension occupies on the wire, header included.
    pub fn encoded_len(&self) -> usize {
        EXTENSION_HEADER_LEN + self.payload_len()
    }

    /// Append this extension at `*off`.
    pub fn encode(&self, buf: &mut [u8], off: &mut usize) -> Result<(), Error> {
        let payload_len = u16::try_from(self.payload_len()).map_err(|_| Error::InvalidParameter)?;
        put_u16(buf, off, self.ext_type())?;
        put_u16(buf, off, payload_len)?;
        match self {
            Extension::ServerName(name) => {
                put_u16(buf, off, payload_len - 2)?;
                put_u8(buf, off, SNI_NAME_TYPE_HOST_NAME)?;
                put_u16(buf, off, name.len() as u16)?;
                put_bytes(buf, off, name.as_bytes())?;
            }
            Extension::AppProtocols(list) => {
                put_u16(buf, off, list.len() as u16)?;
                put_bytes(buf, off, list)?;
            }
            Extension::SessionTicket(data) | Extension::TransportParameters(data) => {
                put_bytes(buf, off, data)?;
            }
        }
        Ok(())
    }

    /// Interpret a payload of the given type.
    pub fn decode(ext_type: u16, payload: &'a [u8]) -> Result<Self, Error> {
        match ext_type {
            EXT_SERVER_NAME => {
                let mut off = 0;
                let list_len = get_u16(payload, &mut off)? as usize;
                let list = get_bytes(payload, &mut off, list_len)?;
                let mut off = 0;
                let _name_type = get_u8(list, &mut off)?;
                let name_len = get_u16(list, &mut off)? as usize;
                let name = get_bytes(list, &mut off, name_len)?;
                let name = core::str::from_utf8(name).map_err(|_| Error::Framing)?;
                Ok(Extension::ServerName(name))
            }
            EXT_ALPN => {
                let mut off = 0;
                let list_len = get_u16(payload, &mut off)? as usize;
                Ok(Extension::AppProtocols(get_bytes(payload, &mut off, list_len)?))
            }
            EXT_SESSION_TICKET => Ok(Extension::SessionTicket(payload)),
            EXT_QUIC_TRANSPORT_PARAMS => Ok(Extension::TransportParameters(payload)),
            other => Err(Error::UnknownExtension(other)),
        }
    }
}

/// Walks an extension list as raw `(type, payload)` pairs.
///
/// An entry claiming more bytes than remain yields `Error::Framing` and
/// ends the walk.
pub struct ExtensionIter<'a> {
    data: &'a [u8],
}

impl<'a> ExtensionIter<'a> {
    pub fn new(list: &'a [u8]) -> Self {
        Self { data: list }
    }
}

impl<'a> Iterator for ExtensionIter<'a> {
    type Item = Result<(u16, &'a [u8]), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        let mut off = 0;
        let entry = get_u16(self.data, &mut off).and_then(|ext_type| {
            let len = get_u16(self.data, &mut off)? as usize;
            Ok((ext_type, get_bytes(self.data, &mut off, len)?))
        });
        match entry {
            Ok(item) => {
                self.data = &self.data[off..];
                Some(Ok(item))
            }
            Err(e) => {
                self.data = &[];
                Some(Err(e))
            }
        }
    }
}

/// Total wire length of `exts`.
pub fn extensions_len(exts: &[Extension<'_>]) -> usize {
    exts.iter().map(Extension::encoded_len).sum()
}

/// Encode `exts` contiguously, in slice order, into `buf`.
pub fn encode_extensions(exts: &[Extension<'_>], buf: &mut [u8]) -> Result<usize, Error> {
    let mut off = 0;
    for ext in exts {
        ext.encode(buf, &mut off)?;
    }
    Ok(off)
}

/// What the server learned from a ClientInitial's extension list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHelloInfo<'a> {
    /// Host name, only when present and non-empty.
    pub server_name: Option<&'a str>,
    pub app_protocols: Option<&'a [u8]>,
    /// A SessionTicket extension was present (early data offered).
    pub session_ticket: bool,
    pub transport_params: Option<&'a [u8]>,
}

/// Decode every extension in `list`, failing on the first bad entry.
pub fn parse_client_initial_extensions(list: &[u8]) -> Result<ClientHelloInfo<'_>, Error> {
    let mut info = ClientHelloInfo::default();
    for entry in ExtensionIter::new(list) {
        let (ext_type, payload) = entry?;
        match Extension::decode(ext_type, payload)? {
            Extension::ServerName(name) => {
                if !name.is_empty() {
                    info.server_name = Some(name);
                }
            }
            Extension::AppProtocols(list) => info.app_protocols = Some(list),
            Extension::SessionTicket(_) => info.session_ticket = true,
            Extension::TransportParameters(tp) => info.transport_params = Some(tp),
        }
    }
    Ok(info)
}
