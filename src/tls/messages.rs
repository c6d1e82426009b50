//! Stub handshake message encoding and decoding.
//!
//! Message format:
//!   Type (1 byte)
//!   Length (3 bytes, big-endian, excludes this 4-byte header)
//!   Body (Length bytes)
//!
//! Bodies have a fixed shape per type. The three one-flag messages are
//! padded to 8 bytes on the wire so that every message meets the 7-byte
//! minimum the driver checks for.

use crate::error::Error;

/// Type byte + 24-bit length.
pub const MESSAGE_HEADER_LEN: usize = 4;
/// Fewer bytes than this can never hold a complete message.
pub const MIN_MESSAGE_LEN: usize = 7;
/// Fixed transport-parameter region inside ServerHandshake.
pub const MAX_PARAM_LEN: usize = 256;
/// Largest transport-parameter blob: its length travels in one byte.
pub const MAX_TRANSPORT_PARAMS_LEN: usize = MAX_PARAM_LEN - 1;

pub const CLIENT_HANDSHAKE_LEN: usize = MIN_MESSAGE_LEN + 1;
pub const SERVER_INITIAL_LEN: usize = MIN_MESSAGE_LEN + 1;
pub const TICKET_LEN: usize = MIN_MESSAGE_LEN + 1;
/// ServerHandshake length without the certificate.
pub const SERVER_HANDSHAKE_BASE_LEN: usize = MIN_MESSAGE_LEN + 3 + MAX_PARAM_LEN;

pub const RANDOM_LEN: usize = 32;
/// ClientInitial body up to and including the extension-list length.
pub const CLIENT_INITIAL_FIXED_LEN: usize = 2 + RANDOM_LEN + 1 + 2 + 1 + 1 + 2;
/// Legacy version field the client writes.
pub const CLIENT_INITIAL_VERSION: u16 = 0x0302;

const SERVER_INITIAL_SUCCESS: u8 = 0x01;
const SERVER_INITIAL_EARLY_DATA_ACCEPTED: u8 = 0x02;

/// Handshake message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Shares its code with a TLS ClientHello.
    ClientInitial = 1,
    ClientHandshakeAck = 2,
    ServerInitial = 3,
    ServerHandshake = 4,
    Ticket = 5,
}

impl MessageType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::ClientInitial),
            2 => Some(Self::ClientHandshakeAck),
            3 => Some(Self::ServerInitial),
            4 => Some(Self::ServerHandshake),
            5 => Some(Self::Ticket),
            _ => None,
        }
    }
}

/// ClientInitial body. `extensions` is the raw extension list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInitial<'a> {
    pub version: u16,
    pub random: [u8; RANDOM_LEN],
    pub compression_method: u8,
    pub extensions: &'a [u8],
}

/// A decoded (or to-be-encoded) handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<'a> {
    ClientInitial(ClientInitial<'a>),
    ClientHandshakeAck {
        success: bool,
    },
    ServerInitial {
        success: bool,
        early_data_accepted: bool,
    },
    ServerHandshake {
        transport_params: &'a [u8],
        certificate: &'a [u8],
    },
    Ticket {
        has_ticket: bool,
    },
}

// ---------------------------------------------------------------------------
// Cursor helpers
// ---------------------------------------------------------------------------

pub(crate) fn put_u8(buf: &mut [u8], off: &mut usize, val: u8) -> Result<(), Error> {
    put_bytes(buf, off, &[val])
}

pub(crate) fn put_u16(buf: &mut [u8], off: &mut usize, val: u16) -> Result<(), Error> {
    put_bytes(buf, off, &val.to_be_bytes())
}

pub(crate) fn put_bytes(buf: &mut [u8], off: &mut usize, data: &[u8]) -> Result<(), Error> {
    let end = *off + data.len();
    if buf.len() < end {
        return Err(Error::BufferTooSmall { needed: end });
    }
    buf[*off..end].copy_from_slice(data);
    *off = end;
    Ok(())
}

pub(crate) fn get_u8(data: &[u8], off: &mut usize) -> Result<u8, Error> {
    Ok(get_bytes(data, off, 1)?[0])
}

pub(crate) fn get_u16(data: &[u8], off: &mut usize) -> Result<u16, Error> {
    let b = get_bytes(data, off, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

pub(crate) fn get_bytes<'a>(data: &'a [u8], off: &mut usize, len: usize) -> Result<&'a [u8], Error> {
    let end = off.checked_add(len).ok_or(Error::Framing)?;
    if data.len() < end {
        return Err(Error::Framing);
    }
    let out = &data[*off..end];
    *off = end;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Read the message header: returns `(type_byte, body_length)`.
///
/// `None` means the message is not complete yet: fewer than
/// [`MIN_MESSAGE_LEN`] bytes, or fewer than `body_length + 4`.
pub fn decode_header(data: &[u8]) -> Option<(u8, usize)> {
    if data.len() < MIN_MESSAGE_LEN {
        return None;
    }
    let length = ((data[1] as usize) << 16) | ((data[2] as usize) << 8) | (data[3] as usize);
    if data.len() < length + MESSAGE_HEADER_LEN {
        return None;
    }
    Some((data[0], length))
}

/// Write the 4-byte header. The caller guarantees `out.len() >= 4` and
/// `body_len` fits in 24 bits.
pub fn encode_header(msg_type: MessageType, body_len: usize, out: &mut [u8]) {
    out[0] = msg_type as u8;
    out[1] = ((body_len >> 16) & 0xFF) as u8;
    out[2] = ((body_len >> 8) & 0xFF) as u8;
    out[3] = (body_len & 0xFF) as u8;
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

impl<'a> Message<'a> {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::ClientInitial(_) => MessageType::ClientInitial,
            Message::ClientHandshakeAck { .. } => MessageType::ClientHandshakeAck,
            Message::ServerInitial { .. } => MessageType::ServerInitial,
            Message::ServerHandshake { .. } => MessageType::ServerHandshake,
            Message::Ticket { .. } => MessageType::Ticket,
        }
    }

    /// Total wire length, header included.
    pub fn encoded_len(&self) -> usize {
        match self {
            Message::ClientInitial(ci) => {
                MESSAGE_HEADER_LEN + CLIENT_INITIAL_FIXED_LEN + ci.extensions.len()
            }
            Message::ClientHandshakeAck { .. } => CLIENT_HANDSHAKE_LEN,
            Message::ServerInitial { .. } => SERVER_INITIAL_LEN,
            Message::ServerHandshake { certificate, .. } => {
                SERVER_HANDSHAKE_BASE_LEN + certificate.len()
            }
            Message::Ticket { .. } => TICKET_LEN,
        }
    }

    /// Encode into `out`, returning the bytes written.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, Error> {
        let total = self.encoded_len();
        if out.len() < total {
            return Err(Error::BufferTooSmall { needed: total });
        }
        let out = &mut out[..total];
        out.fill(0);
        encode_header(self.message_type(), total - MESSAGE_HEADER_LEN, out);
        let mut off = MESSAGE_HEADER_LEN;

        match self {
            Message::ClientInitial(ci) => {
                let ext_len = u16::try_from(ci.extensions.len())
                    .map_err(|_| Error::InvalidParameter)?;
                put_u16(out, &mut off, ci.version)?;
                put_bytes(out, &mut off, &ci.random)?;
                // No legacy session ID, no cipher suites, one compression method.
                put_u8(out, &mut off, 0)?;
                put_u16(out, &mut off, 0)?;
                put_u8(out, &mut off, 1)?;
                put_u8(out, &mut off, ci.compression_method)?;
                put_u16(out, &mut off, ext_len)?;
                put_bytes(out, &mut off, ci.extensions)?;
            }
            Message::ClientHandshakeAck { success } => {
                put_u8(out, &mut off, *success as u8)?;
            }
            Message::ServerInitial {
                success,
                early_data_accepted,
            } => {
                let mut flags = 0;
                if *success {
                    flags |= SERVER_INITIAL_SUCCESS;
                }
                if *early_data_accepted {
                    flags |= SERVER_INITIAL_EARLY_DATA_ACCEPTED;
                }
                put_u8(out, &mut off, flags)?;
            }
            Message::ServerHandshake {
                transport_params,
                certificate,
            } => {
                if transport_params.len() > MAX_TRANSPORT_PARAMS_LEN {
                    return Err(Error::InvalidParameter);
                }
                let cert_len =
                    u16::try_from(certificate.len()).map_err(|_| Error::InvalidParameter)?;
                put_u8(out, &mut off, transport_params.len() as u8)?;
                put_bytes(out, &mut off, transport_params)?;
                off = MESSAGE_HEADER_LEN + 1 + MAX_PARAM_LEN;
                put_u16(out, &mut off, cert_len)?;
                put_bytes(out, &mut off, certificate)?;
            }
            Message::Ticket { has_ticket } => {
                put_u8(out, &mut off, *has_ticket as u8)?;
            }
        }

        // Anything between `off` and `total` is zero padding.
        Ok(total)
    }

    /// Decode one complete message from the front of `data`.
    ///
    /// Returns the message and the bytes it occupies (`length + 4`).
    pub fn decode(data: &'a [u8]) -> Result<(Self, usize), Error> {
        let (type_byte, body_len) = decode_header(data).ok_or(Error::Framing)?;
        let msg_type = MessageType::from_u8(type_byte).ok_or(Error::UnexpectedMessage(type_byte))?;
        let total = MESSAGE_HEADER_LEN + body_len;
        let body = &data[MESSAGE_HEADER_LEN..total];

        let msg = match msg_type {
            MessageType::ClientInitial => Message::ClientInitial(decode_client_initial(body)?),
            MessageType::ClientHandshakeAck => Message::ClientHandshakeAck {
                success: get_u8(body, &mut 0)? != 0,
            },
            MessageType::ServerInitial => {
                let flags = get_u8(body, &mut 0)?;
                Message::ServerInitial {
                    success: flags & SERVER_INITIAL_SUCCESS != 0,
                    early_data_accepted: flags & SERVER_INITIAL_EARLY_DATA_ACCEPTED != 0,
                }
            }
            MessageType::ServerHandshake => decode_server_handshake(body)?,
            MessageType::Ticket => Message::Ticket {
                has_ticket: get_u8(body, &mut 0)? != 0,
            },
        };
        Ok((msg, total))
    }
}

fn decode_client_initial(body: &[u8]) -> Result<ClientInitial<'_>, Error> {
    let mut off = 0;
    let version = get_u16(body, &mut off)?;
    let mut random = [0u8; RANDOM_LEN];
    random.copy_from_slice(get_bytes(body, &mut off, RANDOM_LEN)?);

    let session_id_len = get_u8(body, &mut off)? as usize;
    get_bytes(body, &mut off, session_id_len)?;
    let cipher_suites_len = get_u16(body, &mut off)? as usize;
    get_bytes(body, &mut off, cipher_suites_len)?;
    let compression_len = get_u8(body, &mut off)? as usize;
    let compression = get_bytes(body, &mut off, compression_len)?;
    let compression_method = compression.first().copied().unwrap_or(0);

    let ext_list_len = get_u16(body, &mut off)? as usize;
    // Anything after the declared list is ignored.
    let extensions = get_bytes(body, &mut off, ext_list_len)?;

    Ok(ClientInitial {
        version,
        random,
        compression_method,
        extensions,
    })
}

fn decode_server_handshake(body: &[u8]) -> Result<Message<'_>, Error> {
    let mut off = 0;
    let tp_len = get_u8(body, &mut off)? as usize;
    let tp_region = get_bytes(body, &mut off, MAX_PARAM_LEN)?;
    let cert_len = get_u16(body, &mut off)? as usize;
    let certificate = get_bytes(body, &mut off, cert_len)?;
    Ok(Message::ServerHandshake {
        transport_params: &tp_region[..tp_len],
        certificate,
    })
}
