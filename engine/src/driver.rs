//! The connection driver (L5): a pure byte-in/byte-out adapter wrapped
//! around the connection/session/link state machine in `amqp_transport`.
//!
//! Every method here is synchronous and non-blocking; the driver never
//! touches a socket itself. The caller pumps bytes in through
//! [`ConnectionDriver::read_buffer`]/[`ConnectionDriver::read_done`], pumps
//! bytes out through [`ConnectionDriver::write_buffer`]/[`ConnectionDriver::write_done`],
//! and drains [`ConnectionDriver::next_event`] after each call.

use amqp_transport::dispatcher::dispatch_incoming;
use amqp_transport::endpoint::Connection;
use amqp_transport::error::{ConnectionError, Error as TransportError};
use amqp_transport::events::Event;
use amqp_transport::frame::{self, FRAME_TYPE_AMQP};
use amqp_transport::protocol_header::ProtocolHeader;

use crate::error::Error;

const PROTOCOL_HEADER_LEN: usize = 8;
const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Negotiation {
    /// Waiting for the peer's 8-byte protocol header before any framing is attempted.
    AwaitingHeader,
    /// Header exchange complete; bytes are parsed as AMQP frames.
    Framing,
}

/// Drives an [`amqp_transport::endpoint::Connection`] over a byte stream.
///
/// Owns an inbound staging buffer and an outbound byte queue; the caller is
/// responsible for moving bytes between those buffers and an actual socket.
#[derive(Debug)]
pub struct ConnectionDriver {
    connection: Connection,
    negotiation: Negotiation,
    inbound: Vec<u8>,
    inbound_filled: usize,
    outbound: Vec<u8>,
    outbound_sent: usize,
    last_input_ms: u64,
    last_output_ms: u64,
    now_ms: u64,
    remote_idle_timeout_ms: Option<u64>,
    head_closed: bool,
    tail_closed: bool,
    terminal: bool,
}

impl ConnectionDriver {
    /// Wraps `connection`, queuing this side's protocol header for output.
    pub fn new(connection: Connection) -> Self {
        let mut outbound = Vec::with_capacity(8 * 1024);
        let header: [u8; 8] = ProtocolHeader::amqp().into();
        outbound.extend_from_slice(&header);
        Self {
            connection,
            negotiation: Negotiation::AwaitingHeader,
            inbound: Vec::new(),
            inbound_filled: 0,
            outbound,
            outbound_sent: 0,
            last_input_ms: 0,
            last_output_ms: 0,
            now_ms: 0,
            remote_idle_timeout_ms: None,
            head_closed: false,
            tail_closed: false,
            terminal: false,
        }
    }

    /// The connection endpoint this driver wraps, for application-level
    /// inspection (session/link lookups, handle allocation, and so on).
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The connection endpoint, mutably.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Marks the connection open locally and queues the OPEN frame.
    pub fn open(&mut self) -> Result<(), Error> {
        self.connection.open();
        let open = self.connection.open_performative();
        self.queue_frame(0, frame::FrameBody::Open(open))
    }

    /// Marks the connection closed locally and queues the CLOSE frame.
    pub fn close(&mut self) -> Result<(), Error> {
        self.connection.close();
        let close = amqp_types::performatives::Close { error: None };
        self.queue_frame(0, frame::FrameBody::Close(close))
    }

    /// Queues one already-built frame body onto `channel`.
    pub fn queue_frame(&mut self, channel: u16, body: frame::FrameBody) -> Result<(), Error> {
        let encoded = frame::encode_frame_body(&body)?;
        let wire = frame::write_frame(FRAME_TYPE_AMQP, channel, &encoded);
        self.outbound.extend_from_slice(&wire);
        self.last_output_ms = self.now_ms;
        Ok(())
    }

    /// The writable region the caller should fill with bytes read from the
    /// socket, growing the staging buffer if it's nearly full.
    pub fn read_buffer(&mut self) -> &mut [u8] {
        if self.inbound.len() - self.inbound_filled < READ_CHUNK / 2 {
            self.inbound.resize(self.inbound.len() + READ_CHUNK, 0);
        }
        &mut self.inbound[self.inbound_filled..]
    }

    /// Signals that the caller filled `n` bytes of [`ConnectionDriver::read_buffer`].
    pub fn read_done(&mut self, n: usize) -> Result<(), Error> {
        self.inbound_filled += n;
        self.last_input_ms = self.now_ms;
        if let Err(err) = self.process_inbound() {
            self.fail(err);
        }
        Ok(())
    }

    fn process_inbound(&mut self) -> Result<(), TransportError> {
        loop {
            match self.negotiation {
                Negotiation::AwaitingHeader => {
                    if self.inbound_filled < PROTOCOL_HEADER_LEN {
                        return Ok(());
                    }
                    let mut header = [0u8; PROTOCOL_HEADER_LEN];
                    header.copy_from_slice(&self.inbound[..PROTOCOL_HEADER_LEN]);
                    ProtocolHeader::try_from(header).map_err(|_| {
                        TransportError::Framing("unrecognized protocol header".into())
                    })?;
                    self.consume(PROTOCOL_HEADER_LEN);
                    self.negotiation = Negotiation::Framing;
                }
                Negotiation::Framing => {
                    let max_frame_size = self.connection.max_frame_size;
                    let raw = match frame::read_frame(
                        &self.inbound[..self.inbound_filled],
                        max_frame_size,
                    )? {
                        Some(raw) => raw,
                        None => return Ok(()),
                    };
                    let channel = raw.header.channel;
                    let consumed = raw.header.size as usize;
                    let body = frame::decode_frame_body(raw.body)?;
                    tracing::trace!(channel, "dispatching incoming frame");
                    dispatch_incoming(&mut self.connection, channel, body)?;
                    if let Some(millis) = self.connection.remote_idle_time_out {
                        self.remote_idle_timeout_ms = Some(millis as u64);
                    }
                    while let Some((out_channel, out_body)) = self.connection.next_pending_frame() {
                        let encoded = frame::encode_frame_body(&out_body)?;
                        let wire = frame::write_frame(FRAME_TYPE_AMQP, out_channel, &encoded);
                        self.outbound.extend_from_slice(&wire);
                        self.last_output_ms = self.now_ms;
                    }
                    self.consume(consumed);
                }
            }
        }
    }

    fn consume(&mut self, n: usize) {
        self.inbound.copy_within(n..self.inbound_filled, 0);
        self.inbound_filled -= n;
    }

    fn fail(&mut self, err: TransportError) {
        tracing::error!("connection failed: {err}");
        let condition = err.condition();
        self.connection
            .push_event(Event::TransportError(condition.clone()));
        let close = amqp_types::performatives::Close {
            error: Some(amqp_types::definitions::Error::new(condition, None, None)),
        };
        let _ = self.queue_frame(0, frame::FrameBody::Close(close));
        self.connection.push_event(Event::TransportClosed);
        self.terminal = true;
    }

    /// The readable region of already-queued bytes the caller should push to
    /// the socket.
    pub fn write_buffer(&self) -> &[u8] {
        &self.outbound[self.outbound_sent..]
    }

    /// Signals that the caller consumed `n` bytes of [`ConnectionDriver::write_buffer`].
    pub fn write_done(&mut self, n: usize) {
        self.outbound_sent += n;
        if self.outbound_sent == self.outbound.len() {
            self.outbound.clear();
            self.outbound_sent = 0;
        }
        self.last_output_ms = self.now_ms;
    }

    /// Signals that no more bytes will ever arrive from the peer.
    pub fn close_head(&mut self) {
        self.head_closed = true;
        self.settle_if_both_closed();
    }

    /// Signals that no more bytes will ever be written to the peer.
    pub fn close_tail(&mut self) {
        self.tail_closed = true;
        self.settle_if_both_closed();
    }

    fn settle_if_both_closed(&mut self) {
        if self.head_closed && self.tail_closed && !self.terminal {
            self.connection.push_event(Event::TransportClosed);
            self.terminal = true;
        }
    }

    /// True once a terminal condition has been reached: either a protocol
    /// failure or an application-level close that has fully settled. Any
    /// CLOSE frame queued in response may still be waiting in
    /// [`ConnectionDriver::write_buffer`].
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Advances the driver's clock, sending a heartbeat if the remote idle
    /// timeout is close to elapsing and failing the connection if the local
    /// idle timeout has elapsed with no input. Returns the next absolute
    /// deadline, in milliseconds, the caller should arm a timer for.
    pub fn tick(&mut self, now_ms: u64) -> Option<u64> {
        self.now_ms = now_ms;
        let mut deadline = None;

        if let Some(remote_timeout) = self.remote_idle_timeout_ms {
            let send_by = self.last_output_ms + remote_timeout / 2;
            if now_ms >= send_by {
                let _ = self.queue_frame(0, frame::FrameBody::Empty);
            } else {
                deadline = Some(deadline.map_or(send_by, |d: u64| d.min(send_by)));
            }
        }

        if let Some(local_timeout) = self.connection.idle_time_out {
            let local_timeout = local_timeout as u64;
            let fail_by = self.last_input_ms + 2 * local_timeout;
            if now_ms >= fail_by {
                self.fail(TransportError::Connection(ConnectionError::RemoteIdleTimeout));
            } else {
                deadline = Some(deadline.map_or(fail_by, |d: u64| d.min(fail_by)));
            }
        }

        deadline
    }

    /// Records the peer's advertised idle timeout.
    ///
    /// Called automatically once the peer's OPEN is dispatched; exposed for
    /// callers that want to override it (e.g. a test harness driving the
    /// state machine without going through [`ConnectionDriver::read_done`]).
    pub fn set_remote_idle_timeout_ms(&mut self, millis: u64) {
        self.remote_idle_timeout_ms = Some(millis);
    }

    /// True if at least one event is queued.
    pub fn has_event(&self) -> bool {
        self.connection.has_event()
    }

    /// Drains the next queued event, in the order it was produced.
    pub fn next_event(&mut self) -> Option<Event> {
        self.connection.next_event()
    }
}
