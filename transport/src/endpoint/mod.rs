//! Connection / Session / Link / Delivery state machine.
//!
//! Every endpoint tracks a local and a remote [`EndpointState`], each only
//! ever moving forward: `Uninitialized -> Active -> Closed`. Parents own
//! their children in `slab::Slab` collections; children address siblings
//! and parents through the index-based handles defined here rather than
//! intrusive pointers.

mod connection;
mod delivery;
mod link;
mod session;

pub use connection::Connection;
pub use delivery::{Delivery, DeliveryId, Disposition};
pub use link::Link;
pub use session::Session;

/// The three-state lifecycle shared by every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Created, but OPEN/BEGIN/ATTACH has not yet been sent or received
    /// for this side.
    Uninitialized,
    /// OPEN/BEGIN/ATTACH has been applied for this side.
    Active,
    /// CLOSE/END/DETACH has been applied for this side.
    Closed,
}

impl EndpointState {
    /// Advances to `Active`.
    ///
    /// Panics if called from `Closed`: state only moves forward, and a
    /// caller advancing from `Closed` indicates a dispatcher bug, not a
    /// wire condition.
    pub fn open(&mut self) {
        debug_assert_ne!(*self, EndpointState::Closed, "cannot re-open a closed endpoint");
        *self = EndpointState::Active;
    }

    /// Advances to `Closed`. Idempotent.
    pub fn close(&mut self) {
        *self = EndpointState::Closed;
    }

    /// True once both this side and the peer's side have reached `Closed`.
    pub fn is_closed(&self) -> bool {
        matches!(self, EndpointState::Closed)
    }
}

impl Default for EndpointState {
    fn default() -> Self {
        EndpointState::Uninitialized
    }
}

/// Slab index identifying a session within its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionHandle(pub usize);

/// Slab index identifying a link within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkHandle(pub usize);

/// A session's outgoing channel number, assigned on BEGIN and released on END.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OutgoingChannel(pub u16);

/// The channel number the peer assigned to a session's incoming traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IncomingChannel(pub u16);

/// A link's output handle, scoped to the local end of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OutputHandle(pub u32);

/// A link's input handle, scoped to the remote end of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InputHandle(pub u32);

impl From<amqp_types::definitions::Handle> for OutputHandle {
    fn from(handle: amqp_types::definitions::Handle) -> Self {
        Self(handle.0)
    }
}

impl From<OutputHandle> for amqp_types::definitions::Handle {
    fn from(handle: OutputHandle) -> Self {
        Self(handle.0)
    }
}

impl From<amqp_types::definitions::Handle> for InputHandle {
    fn from(handle: amqp_types::definitions::Handle) -> Self {
        Self(handle.0)
    }
}

impl From<InputHandle> for amqp_types::definitions::Handle {
    fn from(handle: InputHandle) -> Self {
        Self(handle.0)
    }
}

#[cfg(test)]
mod tests {
    use super::EndpointState;

    #[test]
    fn state_advances_forward_only() {
        let mut state = EndpointState::default();
        assert_eq!(state, EndpointState::Uninitialized);
        state.open();
        assert_eq!(state, EndpointState::Active);
        state.close();
        assert_eq!(state, EndpointState::Closed);
        assert!(state.is_closed());
    }
}
