//! Frame header parsing/emission and the AMQP frame body.
//!
//! A frame on the wire is an 8-byte header followed by an optional extended
//! header and a performative-encoded body. This module never blocks on I/O:
//! [`read_frame`] is handed whatever bytes the caller has already buffered
//! and reports how many it consumed, mirroring the emitter/consumer
//! contract of the type codec one layer below.

use amqp_codec::{from_slice, to_vec, Consumer};
use amqp_types::performatives::{
    Attach, Begin, Close, Detach, Disposition, End, Flow, Open, Performative, Transfer,
};

use crate::error::Error;

/// Frame type byte identifying an AMQP frame.
pub const FRAME_TYPE_AMQP: u8 = 0x00;

/// Frame type byte identifying a SASL frame.
pub const FRAME_TYPE_SASL: u8 = 0x01;

const FRAME_HEADER_LEN: u32 = 8;

/// The fixed 8-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Total frame size in bytes, including this header.
    pub size: u32,
    /// Data offset in 4-byte words; always ≥ 2.
    pub doff: u8,
    /// [`FRAME_TYPE_AMQP`] or [`FRAME_TYPE_SASL`].
    pub frame_type: u8,
    /// Channel number the frame is addressed to.
    pub channel: u16,
}

impl FrameHeader {
    /// Encodes the header to its 8-byte wire form.
    pub fn to_bytes(self) -> [u8; 8] {
        let size = self.size.to_be_bytes();
        let channel = self.channel.to_be_bytes();
        [
            size[0], size[1], size[2], size[3], self.doff, self.frame_type, channel[0], channel[1],
        ]
    }

    /// Offset, in bytes, at which the frame body begins.
    pub fn body_offset(&self) -> u32 {
        self.doff as u32 * 4
    }
}

/// A header plus the raw body slice it describes, still unparsed.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    /// The parsed header.
    pub header: FrameHeader,
    /// Bytes between the fixed header and `doff * 4`, if any.
    pub extended: &'a [u8],
    /// Bytes from `doff * 4` to `size`: performative plus payload.
    pub body: &'a [u8],
}

/// Parses a single frame out of `bytes`.
///
/// Returns `Ok(None)` when fewer than `size` bytes are available yet (the
/// caller should retry once more input has arrived). Returns an error when
/// the declared size exceeds `max_frame_size` or `doff` places the body
/// start outside `[8, size)`.
pub fn read_frame(bytes: &[u8], max_frame_size: u32) -> Result<Option<RawFrame<'_>>, Error> {
    if bytes.len() < FRAME_HEADER_LEN as usize {
        return Ok(None);
    }

    let size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let doff = bytes[4];
    let frame_type = bytes[5];
    let channel = u16::from_be_bytes([bytes[6], bytes[7]]);

    if size > max_frame_size {
        return Err(Error::Framing(format!(
            "frame size {size} exceeds negotiated max-frame-size {max_frame_size}"
        )));
    }

    let body_offset = doff as u32 * 4;
    if body_offset < FRAME_HEADER_LEN || body_offset > size {
        return Err(Error::Framing(format!(
            "data offset {doff} (= {body_offset} bytes) out of range for frame of size {size}"
        )));
    }

    if (bytes.len() as u64) < size as u64 {
        return Ok(None);
    }

    let header = FrameHeader {
        size,
        doff,
        frame_type,
        channel,
    };
    let extended = &bytes[FRAME_HEADER_LEN as usize..body_offset as usize];
    let body = &bytes[body_offset as usize..size as usize];

    Ok(Some(RawFrame {
        header,
        extended,
        body,
    }))
}

/// Assembles the wire bytes for one AMQP frame: no extended header, doff
/// fixed at 2 words (AMQP frames never carry one).
pub fn write_frame(frame_type: u8, channel: u16, body: &[u8]) -> Vec<u8> {
    let size = FRAME_HEADER_LEN + body.len() as u32;
    let header = FrameHeader {
        size,
        doff: 2,
        frame_type,
        channel,
    };
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(body);
    out
}

/// The body of an AMQP-typed frame, one variant per performative plus the
/// heartbeat sentinel.
#[derive(Debug, Clone)]
pub enum FrameBody {
    /// Open performative.
    Open(Open),
    /// Begin performative.
    Begin(Begin),
    /// Attach performative.
    Attach(Attach),
    /// Flow performative.
    Flow(Flow),
    /// Transfer performative together with its raw payload bytes.
    Transfer {
        /// Transfer performative.
        performative: Transfer,
        /// Message bytes carried alongside the performative.
        payload: Vec<u8>,
    },
    /// Disposition performative.
    Disposition(Disposition),
    /// Detach performative.
    Detach(Detach),
    /// End performative.
    End(End),
    /// Close performative.
    Close(Close),
    /// A size-zero frame, used only to satisfy idle-timeout obligations.
    Empty,
}

/// Decodes a frame body (performative plus any trailing payload) out of the
/// bytes following the frame header.
pub fn decode_frame_body(body: &[u8]) -> Result<FrameBody, Error> {
    if body.is_empty() {
        return Ok(FrameBody::Empty);
    }

    // Only TRANSFER carries a payload after its performative; measure the
    // described-list's width with a throwaway cursor so the payload bytes
    // can be sliced off before the typed decode runs.
    let mut cursor = Consumer::new(body);
    cursor
        .skip_value()
        .map_err(|_| Error::Framing("malformed performative".into()))?;
    let consumed = cursor.position();
    let performative: Performative = from_slice(&body[..consumed])?;

    let frame_body = match performative {
        Performative::Open(p) => FrameBody::Open(p),
        Performative::Begin(p) => FrameBody::Begin(p),
        Performative::Attach(p) => FrameBody::Attach(p),
        Performative::Flow(p) => FrameBody::Flow(p),
        Performative::Transfer(p) => FrameBody::Transfer {
            performative: p,
            payload: body[consumed..].to_vec(),
        },
        Performative::Disposition(p) => FrameBody::Disposition(p),
        Performative::Detach(p) => FrameBody::Detach(p),
        Performative::End(p) => FrameBody::End(p),
        Performative::Close(p) => FrameBody::Close(p),
    };

    Ok(frame_body)
}

/// Encodes a frame body back into its performative-plus-payload wire form.
pub fn encode_frame_body(body: &FrameBody) -> Result<Vec<u8>, Error> {
    let bytes = match body {
        FrameBody::Open(p) => to_vec(&Performative::Open(p.clone()))?,
        FrameBody::Begin(p) => to_vec(&Performative::Begin(p.clone()))?,
        FrameBody::Attach(p) => to_vec(&Performative::Attach(p.clone()))?,
        FrameBody::Flow(p) => to_vec(&Performative::Flow(p.clone()))?,
        FrameBody::Transfer {
            performative,
            payload,
        } => {
            let mut bytes = to_vec(&Performative::Transfer(performative.clone()))?;
            bytes.extend_from_slice(payload);
            bytes
        }
        FrameBody::Disposition(p) => to_vec(&Performative::Disposition(p.clone()))?,
        FrameBody::Detach(p) => to_vec(&Performative::Detach(p.clone()))?,
        FrameBody::End(p) => to_vec(&Performative::End(p.clone()))?,
        FrameBody::Close(p) => to_vec(&Performative::Close(p.clone()))?,
        FrameBody::Empty => Vec::new(),
    };
    Ok(bytes)
}
