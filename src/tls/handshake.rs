//! Stub handshake state machines and the `process_data` driver.
//!
//! Client-side state machine:
//! ```text
//! Invalid -> Sent -> HandshakeAckSent -> TicketReceived
//! ```
//!
//! Server-side state machine:
//! ```text
//! Invalid -> ServerHandshakeSent -> TicketSent
//! ```
//!
//! Each role has a transition table mapping `(state, incoming message)`
//! to an action and the next state. An action validates everything it
//! needs before it touches the output buffer or the key slots, so a
//! failed call leaves [`ProcessState`] as it found it. The client hands
//! the server's transport parameters to its hooks before checking the
//! certificate chain.

use core::fmt;
use std::sync::Arc;

use crate::crypto::Level;
use crate::error::Error;
use crate::tls::config::{SecConfig, SIGNATURE_ALGORITHMS};
use crate::tls::extensions::{
    encode_extensions, extensions_len, parse_client_initial_extensions, Extension,
};
use crate::tls::messages::{
    decode_header, ClientInitial, Message, MessageType, CLIENT_HANDSHAKE_LEN,
    CLIENT_INITIAL_VERSION, MAX_TRANSPORT_PARAMS_LEN, RANDOM_LEN, SERVER_HANDSHAKE_BASE_LEN,
    SERVER_INITIAL_LEN, TICKET_LEN,
};
use crate::tls::session::{TlsSession, MAX_ALPN_LEN};
use crate::tls::state::ProcessState;
use crate::tls::ResultFlags;
use crate::transport::{Rng, TransportHooks};

/// Longest server name accepted from configuration or from the peer.
pub const MAX_SNI_LEN: usize = 255;

/// Worst case for SNI + ALPN + SessionTicket + transport parameters.
const MAX_CLIENT_EXTENSIONS_LEN: usize =
    (9 + MAX_SNI_LEN) + (7 + MAX_ALPN_LEN) + 4 + (4 + MAX_TRANSPORT_PARAMS_LEN);

/// The single byte `read_ticket` hands out.
const TICKET_BYTE: u8 = 0xFF;

/// Client or server role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Client => "C",
            Role::Server => "S",
        })
    }
}

/// Last handshake step taken. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandshakeState {
    /// Nothing sent or received yet.
    Invalid,
    /// Client: ClientInitial sent.
    Sent,
    /// Server: ServerInitial and ServerHandshake sent.
    ServerHandshakeSent,
    /// Client: ClientHandshakeAck sent.
    HandshakeAckSent,
    /// Server: Ticket sent.
    TicketSent,
    /// Client: Ticket received.
    TicketReceived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    SendClientInitial,
    ReadServerInitial,
    ReadServerHandshake,
    ReadTicket,
    ReadClientInitial,
    ReadClientAck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub action: Action,
    pub next: HandshakeState,
}

/// Client table. `Invalid` needs no input and ignores whatever is given.
pub(crate) fn client_transition(
    state: HandshakeState,
    incoming: Option<MessageType>,
) -> Option<Transition> {
    use HandshakeState::*;
    let (action, next) = match (state, incoming) {
        (Invalid, _) => (Action::SendClientInitial, Sent),
        (Sent, Some(MessageType::ServerInitial)) => (Action::ReadServerInitial, Sent),
        (Sent, Some(MessageType::ServerHandshake)) => {
            (Action::ReadServerHandshake, HandshakeAckSent)
        }
        (HandshakeAckSent, Some(MessageType::Ticket)) => (Action::ReadTicket, TicketReceived),
        _ => return None,
    };
    Some(Transition { action, next })
}

pub(crate) fn server_transition(
    state: HandshakeState,
    incoming: Option<MessageType>,
) -> Option<Transition> {
    use HandshakeState::*;
    let (action, next) = match (state, incoming) {
        (Invalid, Some(MessageType::ClientInitial)) => {
            (Action::ReadClientInitial, ServerHandshakeSent)
        }
        (ServerHandshakeSent, Some(MessageType::ClientHandshakeAck)) => {
            (Action::ReadClientAck, TicketSent)
        }
        _ => return None,
    };
    Some(Transition { action, next })
}

/// Everything needed to create a [`HandshakeContext`].
#[derive(Debug, Clone)]
pub struct HandshakeConfig<'a> {
    pub role: Role,
    pub session: Arc<TlsSession>,
    pub sec_config: Arc<SecConfig>,
    /// Host name to send (client) or the default until the peer names one (server).
    pub server_name: Option<&'a str>,
    /// Local QUIC transport parameters, at most 255 bytes.
    pub transport_params: &'a [u8],
}

/// Result of one `process_data` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Processed {
    pub flags: ResultFlags,
    /// Input bytes to drop before the next call.
    pub consumed: usize,
}

impl Processed {
    const fn error() -> Self {
        Self {
            flags: ResultFlags::ERROR,
            consumed: 0,
        }
    }

    pub fn is_error(&self) -> bool {
        self.flags.contains(ResultFlags::ERROR)
    }
}

/// One connection's handshake.
pub struct HandshakeContext<H: TransportHooks> {
    role: Role,
    state: HandshakeState,
    server_name: Option<heapless::String<MAX_SNI_LEN>>,
    session: Arc<TlsSession>,
    local_transport_params: heapless::Vec<u8, MAX_TRANSPORT_PARAMS_LEN>,
    /// Dropped by the server once the peer acknowledges the handshake.
    sec_config: Option<Arc<SecConfig>>,
    ticket_ready: bool,
    random: [u8; RANDOM_LEN],
    hooks: H,
    /// Once set, no further progress is possible.
    error: Option<Error>,
}

impl<H: TransportHooks> HandshakeContext<H> {
    /// Create a context. The client random is drawn from `rng`.
    pub fn new<R: Rng>(config: HandshakeConfig<'_>, hooks: H, rng: &mut R) -> Result<Self, Error> {
        let role = config.role;

        let server_name = match config.server_name {
            Some(name) => Some(heapless::String::try_from(name).map_err(|_| {
                tracing::error!(role = %role, len = name.len(), "invalid / too long server name");
                Error::InvalidParameter
            })?),
            None => None,
        };
        let local_transport_params = heapless::Vec::from_slice(config.transport_params)
            .map_err(|_| {
                tracing::error!(
                    role = %role,
                    len = config.transport_params.len(),
                    "transport parameters too long"
                );
                Error::InvalidParameter
            })?;

        let mut random = [0u8; RANDOM_LEN];
        rng.fill(&mut random);

        tracing::debug!(role = %role, "created");
        Ok(Self {
            role,
            state: HandshakeState::Invalid,
            server_name,
            session: config.session,
            local_transport_params,
            sec_config: Some(config.sec_config),
            ticket_ready: false,
            random,
            hooks,
            error: None,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Configured name, or the one the client sent (server side).
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn session(&self) -> &TlsSession {
        &self.session
    }

    pub fn is_ticket_ready(&self) -> bool {
        self.ticket_ready
    }

    /// The latched fatal error, if any.
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Another reference to the security configuration, unless released.
    pub fn sec_config(&self) -> Option<Arc<SecConfig>> {
        self.sec_config.clone()
    }

    /// Whether `input` holds a complete message (or none is needed yet).
    pub fn has_valid_message_to_process(&self, input: &[u8]) -> bool {
        if self.role == Role::Client && self.state == HandshakeState::Invalid && input.is_empty() {
            return true;
        }
        if decode_header(input).is_none() {
            tracing::trace!(role = %self.role, available = input.len(), "insufficient data to process");
            return false;
        }
        true
    }

    /// Feed received bytes and produce the next flight into `state`.
    pub fn process_data<const N: usize>(
        &mut self,
        input: &[u8],
        state: &mut ProcessState<N>,
    ) -> Processed {
        if let Some(err) = self.error {
            tracing::error!(role = %self.role, error = %err, "handshake already failed");
            return Processed::error();
        }
        if !input.is_empty() {
            tracing::trace!(role = %self.role, len = input.len(), "processing received bytes");
        }
        if !self.has_valid_message_to_process(input) {
            return Processed::default();
        }

        let produced_before = state.buffer.total_len();
        match self.dispatch(input, state) {
            Ok(processed) => {
                tracing::info!(role = %self.role, consumed = processed.consumed, "consumed bytes");
                let produced = state.buffer.total_len() - produced_before;
                if produced > 0 {
                    tracing::info!(role = %self.role, produced, "produced bytes");
                }
                processed
            }
            Err(err) => {
                tracing::error!(role = %self.role, state = ?self.state, error = %err, "handshake error");
                if err.is_fatal() {
                    self.error = Some(err);
                }
                Processed::error()
            }
        }
    }

    /// There is no asynchronous processing to complete.
    pub fn process_data_complete(&mut self) -> Processed {
        Processed::error()
    }

    /// Copy out the session ticket once one has been received.
    pub fn read_ticket(&self, out: &mut [u8]) -> Result<usize, Error> {
        if !self.ticket_ready {
            return Err(Error::InvalidState);
        }
        let first = out.first_mut().ok_or(Error::BufferTooSmall { needed: 1 })?;
        *first = TICKET_BYTE;
        Ok(1)
    }

    pub fn param_get(&self, _param: u32, _out: &mut [u8]) -> Result<usize, Error> {
        Err(Error::NotSupported)
    }

    pub fn param_set(&mut self, _param: u32, _value: &[u8]) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    /// Start the client over so a fresh ClientInitial is produced.
    pub fn reset(&mut self) -> Result<(), Error> {
        if self.role != Role::Client {
            return Err(Error::InvalidState);
        }
        tracing::info!(role = %self.role, "resetting TLS state");
        self.state = HandshakeState::Invalid;
        self.error = None;
        Ok(())
    }

    fn dispatch<const N: usize>(
        &mut self,
        input: &[u8],
        state: &mut ProcessState<N>,
    ) -> Result<Processed, Error> {
        let header = decode_header(input);
        let incoming = header.and_then(|(ty, _)| MessageType::from_u8(ty));
        let transition = match self.role {
            Role::Client => client_transition(self.state, incoming),
            Role::Server => server_transition(self.state, incoming),
        };
        let Some(transition) = transition else {
            let ty = header.map_or(0, |(ty, _)| ty);
            tracing::error!(role = %self.role, msg_type = ty, "invalid message for state");
            return Err(Error::UnexpectedMessage(ty));
        };

        let processed = if transition.action == Action::SendClientInitial {
            Processed {
                flags: self.send_client_initial(state)?,
                consumed: 0,
            }
        } else {
            let (msg, consumed) = Message::decode(input)?;
            let flags = match (transition.action, msg) {
                (Action::ReadServerInitial, Message::ServerInitial { early_data_accepted, .. }) => {
                    self.read_server_initial(early_data_accepted, state)
                }
                (
                    Action::ReadServerHandshake,
                    Message::ServerHandshake {
                        transport_params,
                        certificate,
                    },
                ) => self.read_server_handshake(transport_params, certificate, state)?,
                (Action::ReadTicket, Message::Ticket { .. }) => self.read_ticket_message(),
                (Action::ReadClientInitial, Message::ClientInitial(hello)) => {
                    self.read_client_initial(&hello, state)?
                }
                (Action::ReadClientAck, Message::ClientHandshakeAck { success }) => {
                    self.read_client_ack(success, state)?
                }
                (_, msg) => return Err(Error::UnexpectedMessage(msg.message_type() as u8)),
            };
            Processed { flags, consumed }
        };

        debug_assert!(transition.next >= self.state);
        self.state = transition.next;
        Ok(processed)
    }

    // -----------------------------------------------------------------------
    // Client actions
    // -----------------------------------------------------------------------

    fn send_client_initial<const N: usize>(
        &mut self,
        state: &mut ProcessState<N>,
    ) -> Result<ResultFlags, Error> {
        // No ticket store: early data is always attempted.
        let early_data_attempted = true;

        let alpn = self.session.alpn();
        let mut alpn_list = heapless::Vec::<u8, { MAX_ALPN_LEN + 1 }>::new();
        alpn_list
            .push(alpn.len() as u8)
            .map_err(|_| Error::InvalidParameter)?;
        alpn_list
            .extend_from_slice(alpn)
            .map_err(|_| Error::InvalidParameter)?;

        let exts: heapless::Vec<Extension<'_>, 4> = [
            self.server_name.as_deref().map(Extension::ServerName),
            Some(Extension::AppProtocols(&alpn_list)),
            early_data_attempted.then_some(Extension::SessionTicket(&[])),
            Some(Extension::TransportParameters(&self.local_transport_params)),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut ext_buf = [0u8; MAX_CLIENT_EXTENSIONS_LEN];
        let ext_len = encode_extensions(&exts, &mut ext_buf[..extensions_len(&exts)])?;

        let msg = Message::ClientInitial(ClientInitial {
            version: CLIENT_INITIAL_VERSION,
            random: self.random,
            compression_method: 0,
            extensions: &ext_buf[..ext_len],
        });
        state
            .buffer
            .append_with(msg.encoded_len(), |out| msg.encode(out))?;

        state.early_data_attempted = early_data_attempted;
        state.early_data_accepted = false;

        let mut flags = ResultFlags::DATA;
        if early_data_attempted {
            state.install_write_key(Level::ZeroRtt);
            flags |= ResultFlags::WRITE_KEY_UPDATED;
        }
        Ok(flags)
    }

    fn read_server_initial<const N: usize>(
        &mut self,
        early_data_accepted: bool,
        state: &mut ProcessState<N>,
    ) -> ResultFlags {
        let mut flags = ResultFlags::empty();
        if state.early_data_attempted {
            state.early_data_accepted = early_data_accepted;
            flags |= if early_data_accepted {
                ResultFlags::EARLY_DATA_ACCEPT
            } else {
                ResultFlags::EARLY_DATA_REJECT
            };
        }

        state.buffer.mark_handshake();
        state.install_read_key(Level::Handshake);
        state.install_write_key(Level::Handshake);
        flags | ResultFlags::READ_KEY_UPDATED | ResultFlags::WRITE_KEY_UPDATED
    }

    fn read_server_handshake<const N: usize>(
        &mut self,
        transport_params: &[u8],
        certificate: &[u8],
        state: &mut ProcessState<N>,
    ) -> Result<ResultFlags, Error> {
        let config = self.sec_config.clone().ok_or(Error::InvalidState)?;
        state.buffer.ensure_room(CLIENT_HANDSHAKE_LEN)?;

        self.hooks.on_receive_transport_params(transport_params);

        if config.validation_disabled() {
            tracing::warn!(role = %self.role, "certificate validation disabled!");
        } else {
            let provider = config.provider();
            let chain = provider.parse_chain(certificate).map_err(|_| {
                tracing::error!(role = %self.role, "cert parse error");
                Error::CertificateParse
            })?;
            if !provider.validate_chain(&chain, self.server_name(), config.flags()) {
                tracing::error!(role = %self.role, "cert chain validation failed");
                return Err(Error::CertificateValidation);
            }
        }

        state.handshake_complete = true;
        tracing::info!(role = %self.role, "handshake complete");

        let ack = Message::ClientHandshakeAck { success: true };
        state
            .buffer
            .append_with(ack.encoded_len(), |out| ack.encode(out))?;
        state.buffer.mark_one_rtt();

        state.install_read_key(Level::OneRtt);
        state.install_write_key(Level::OneRtt);
        Ok(ResultFlags::COMPLETE
            | ResultFlags::DATA
            | ResultFlags::READ_KEY_UPDATED
            | ResultFlags::WRITE_KEY_UPDATED)
    }

    fn read_ticket_message(&mut self) -> ResultFlags {
        self.ticket_ready = true;
        ResultFlags::TICKET
    }

    // -----------------------------------------------------------------------
    // Server actions
    // -----------------------------------------------------------------------

    fn read_client_initial<const N: usize>(
        &mut self,
        hello: &ClientInitial<'_>,
        state: &mut ProcessState<N>,
    ) -> Result<ResultFlags, Error> {
        let info = parse_client_initial_extensions(hello.extensions)?;
        let peer_name = match info.server_name {
            Some(name) => Some(
                heapless::String::<MAX_SNI_LEN>::try_from(name)
                    .map_err(|_| Error::InvalidParameter)?,
            ),
            None => None,
        };

        let config = self.sec_config.clone().ok_or(Error::InvalidState)?;
        if config.provider().select_signature(SIGNATURE_ALGORITHMS).is_none() {
            tracing::error!(
                role = %self.role,
                "no matching signature algorithm for the provided server certificate"
            );
            return Err(Error::NoSignatureAlgorithm);
        }

        let certificate = config.formatted_chain();
        state
            .buffer
            .ensure_room(SERVER_INITIAL_LEN + SERVER_HANDSHAKE_BASE_LEN + certificate.len())?;

        // Session tickets are always honoured.
        state.early_data_attempted = info.session_ticket;
        state.early_data_accepted = info.session_ticket;
        if peer_name.is_some() {
            self.server_name = peer_name;
        }
        if let Some(tp) = info.transport_params {
            self.hooks.on_receive_transport_params(tp);
        }

        let initial = Message::ServerInitial {
            success: true,
            early_data_accepted: state.early_data_accepted,
        };
        state
            .buffer
            .append_with(initial.encoded_len(), |out| initial.encode(out))?;
        state.buffer.mark_handshake();

        let handshake = Message::ServerHandshake {
            transport_params: &self.local_transport_params,
            certificate,
        };
        state
            .buffer
            .append_with(handshake.encoded_len(), |out| handshake.encode(out))?;
        state.buffer.mark_one_rtt();

        let mut flags = ResultFlags::DATA;
        if state.early_data_accepted {
            state.install_read_key(Level::ZeroRtt);
            flags |= ResultFlags::EARLY_DATA_ACCEPT | ResultFlags::READ_KEY_UPDATED;
        }
        state.install_read_key(Level::Handshake);
        state.install_write_key(Level::Handshake);
        state.install_write_key(Level::OneRtt);
        Ok(flags | ResultFlags::READ_KEY_UPDATED | ResultFlags::WRITE_KEY_UPDATED)
    }

    fn read_client_ack<const N: usize>(
        &mut self,
        success: bool,
        state: &mut ProcessState<N>,
    ) -> Result<ResultFlags, Error> {
        if !success {
            tracing::error!(role = %self.role, "failure client finish");
            return Err(Error::HandshakeFailed);
        }
        state.buffer.ensure_room(TICKET_LEN)?;

        state.handshake_complete = true;
        tracing::info!(role = %self.role, "handshake complete");
        // Not needed past this point.
        self.sec_config = None;

        let ticket = Message::Ticket { has_ticket: true };
        state
            .buffer
            .append_with(ticket.encoded_len(), |out| ticket.encode(out))?;

        state.install_read_key(Level::OneRtt);
        Ok(ResultFlags::COMPLETE | ResultFlags::DATA | ResultFlags::READ_KEY_UPDATED)
    }
}

impl<H: TransportHooks> fmt::Debug for HandshakeContext<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeContext")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("server_name", &self.server_name())
            .field("ticket_ready", &self.ticket_ready)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<H: TransportHooks> Drop for HandshakeContext<H> {
    fn drop(&mut self) {
        tracing::debug!(role = %self.role, "cleaning up");
    }
}
