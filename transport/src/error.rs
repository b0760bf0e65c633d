//! Errors produced while driving frames through the connection/session/link
//! state machine.

use amqp_types::definitions::ErrorCondition;

/// Errors that can terminate a connection, session, or link.
///
/// Every variant that represents a protocol-visible failure carries the
/// [`ErrorCondition`] that should be placed on the CLOSE/END/DETACH
/// performative sent back to the peer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed wire bytes or an unexpected type code.
    #[error("decode error: {0}")]
    Decode(#[from] amqp_codec::Error),

    /// Bad data-offset or an oversize frame.
    #[error("framing error: {0}")]
    Framing(String),

    /// A connection-scoped protocol violation.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A session-scoped protocol violation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A link-scoped protocol violation.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Allocation or table-capacity failure.
    #[error("resource limit exceeded")]
    ResourceLimitExceeded,
}

impl Error {
    /// The [`ErrorCondition`] to report on the performative that closes the
    /// affected scope, if this error is protocol-visible.
    pub fn condition(&self) -> ErrorCondition {
        use amqp_types::definitions::AmqpError;
        match self {
            Error::Decode(_) => ErrorCondition::AmqpError(AmqpError::DecodeError),
            Error::Framing(_) => ErrorCondition::ConnectionError(
                amqp_types::definitions::ConnectionError::FramingError,
            ),
            Error::Connection(e) => e.condition(),
            Error::Session(e) => e.condition(),
            Error::Link(e) => e.condition(),
            Error::ResourceLimitExceeded => {
                ErrorCondition::AmqpError(AmqpError::ResourceLimitExceeded)
            }
        }
    }
}

/// Connection-scoped protocol violations.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// A performative arrived while the connection was not in a state that
    /// permits it (e.g. a second OPEN).
    #[error("performative not allowed in current connection state")]
    IllegalState,

    /// The remote advertised or the local peer violated `max-frame-size`.
    #[error("frame exceeds negotiated max-frame-size")]
    FrameTooLarge,

    /// No input arrived within twice the local idle timeout.
    #[error("remote idle timeout elapsed")]
    RemoteIdleTimeout,

    /// A channel number referenced a session that does not exist.
    #[error("channel {0} is not bound to any session")]
    UnboundChannel(u16),
}

impl ConnectionError {
    /// The condition to place on the outbound CLOSE.
    pub fn condition(&self) -> ErrorCondition {
        use amqp_types::definitions::{AmqpError, ConnectionError as WireConnectionError};
        match self {
            ConnectionError::IllegalState => ErrorCondition::AmqpError(AmqpError::IllegalState),
            ConnectionError::FrameTooLarge => {
                ErrorCondition::ConnectionError(WireConnectionError::FramingError)
            }
            ConnectionError::RemoteIdleTimeout => {
                ErrorCondition::AmqpError(AmqpError::ResourceLimitExceeded)
            }
            ConnectionError::UnboundChannel(_) => {
                ErrorCondition::ConnectionError(WireConnectionError::FramingError)
            }
        }
    }
}

/// Session-scoped protocol violations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A TRANSFER, FLOW, or DISPOSITION referenced a handle with no ATTACH.
    #[error("handle {0:?} is not attached on this session")]
    UnattachedHandle(amqp_types::definitions::Handle),

    /// The incoming window was violated by the peer.
    #[error("incoming window violation")]
    WindowViolation,

    /// Two links attempted to attach with the same handle.
    #[error("handle {0:?} is already in use")]
    HandleInUse(amqp_types::definitions::Handle),
}

impl SessionError {
    /// The condition to place on the outbound END.
    pub fn condition(&self) -> ErrorCondition {
        use amqp_types::definitions::SessionError as WireSessionError;
        match self {
            SessionError::UnattachedHandle(_) => {
                ErrorCondition::SessionError(WireSessionError::UnattachedHandle)
            }
            SessionError::WindowViolation => {
                ErrorCondition::SessionError(WireSessionError::WindowViolation)
            }
            SessionError::HandleInUse(_) => {
                ErrorCondition::SessionError(WireSessionError::HandleInUse)
            }
        }
    }
}

/// Link-scoped protocol violations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A TRANSFER arrived for a delivery-id already in use by another active
    /// delivery on this link.
    #[error("duplicate delivery id")]
    DuplicateDeliveryId,

    /// The peer sent more messages than the outstanding link-credit allowed.
    #[error("transfer sent beyond granted link-credit")]
    TransferLimitExceeded,

    /// A TRANSFER payload exceeded the link's `max-message-size`.
    #[error("message size exceeds max-message-size")]
    MessageSizeExceeded,
}

impl LinkError {
    /// The condition to place on the outbound DETACH.
    pub fn condition(&self) -> ErrorCondition {
        use amqp_types::definitions::LinkError as WireLinkError;
        match self {
            LinkError::DuplicateDeliveryId => {
                ErrorCondition::LinkError(WireLinkError::DetachForced)
            }
            LinkError::TransferLimitExceeded => {
                ErrorCondition::LinkError(WireLinkError::TransferLimitExceeded)
            }
            LinkError::MessageSizeExceeded => {
                ErrorCondition::LinkError(WireLinkError::MessageSizeExceeded)
            }
        }
    }
}
