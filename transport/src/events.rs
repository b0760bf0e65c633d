//! Observable endpoint transitions, enqueued on the connection's collector
//! in the order the transitions that produced them occurred.

use amqp_types::definitions::ErrorCondition;

use crate::endpoint::{DeliveryId, LinkHandle, SessionHandle};

/// An event drained from [`crate::endpoint::Connection::next_event`].
#[derive(Debug, Clone)]
pub enum Event {
    /// The peer's OPEN was applied; the connection's `remote_state` is now active.
    ConnectionRemoteOpen,
    /// The peer's CLOSE was applied; the connection's `remote_state` is now closed.
    ConnectionRemoteClose,
    /// The application opened the connection locally.
    ConnectionLocalOpen,
    /// The application closed the connection locally.
    ConnectionLocalClose,
    /// The connection object has been fully released.
    ConnectionFinal,

    /// The peer's BEGIN was applied for this session.
    SessionRemoteOpen(SessionHandle),
    /// The peer's END was applied for this session.
    SessionRemoteClose(SessionHandle),
    /// The application began this session locally.
    SessionLocalOpen(SessionHandle),
    /// The application ended this session locally.
    SessionLocalClose(SessionHandle),
    /// The session has been fully released.
    SessionFinal(SessionHandle),

    /// The peer's ATTACH was applied for this link.
    LinkRemoteOpen(SessionHandle, LinkHandle),
    /// The peer's DETACH was applied for this link.
    LinkRemoteClose(SessionHandle, LinkHandle),
    /// The application attached this link locally.
    LinkLocalOpen(SessionHandle, LinkHandle),
    /// The application detached this link locally.
    LinkLocalClose(SessionHandle, LinkHandle),
    /// The link has been fully released.
    LinkFinal(SessionHandle, LinkHandle),

    /// A FLOW updated credit, window, or drain state for this link.
    LinkFlow(SessionHandle, LinkHandle),

    /// A delivery was created, updated, or settled.
    Delivery(SessionHandle, LinkHandle, DeliveryId),
    /// A delivery has been removed from all lists and returned to the pool.
    DeliveryFinal(SessionHandle, LinkHandle, DeliveryId),

    /// Bytes were written to or read from the transport.
    Transport,
    /// A terminal condition was raised on the connection.
    TransportError(ErrorCondition),
    /// No further events will be produced; the connection is terminal.
    TransportClosed,
}
