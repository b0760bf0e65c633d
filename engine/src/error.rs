//! Errors surfaced by the connection driver and the raw-connection buffer
//! manager.

/// Errors produced while driving bytes through a [`crate::driver::ConnectionDriver`]
/// or a [`crate::raw::RawConnection`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The protocol header the peer sent did not start with `"AMQP"`, or
    /// named a protocol id this driver does not speak.
    #[error("unrecognized protocol header")]
    ProtocolHeaderMismatch,

    /// A frame or performative was rejected by the endpoint state machine.
    #[error(transparent)]
    Transport(#[from] amqp_transport::error::Error),

    /// A buffer-table capacity was exceeded (too many outstanding read or
    /// write buffers).
    #[error("resource limit exceeded")]
    ResourceLimitExceeded,

    /// A call was made after the connection or raw connection had already
    /// reached its terminal state.
    #[error("connection is already closed")]
    AlreadyClosed,
}
