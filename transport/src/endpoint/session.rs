//! A session endpoint: the multiplexing layer between a connection and its
//! links, tracking per-direction transfer windows and the delivery table.

use std::collections::BTreeMap;

use slab::Slab;

use amqp_types::definitions::{Handle, TransferNumber};
use amqp_types::performatives::{Begin, End, Flow};
use amqp_types::Role;

use super::{DeliveryId, Delivery, EndpointState, IncomingChannel, Link, LinkHandle, OutgoingChannel};
use crate::error::Error;

/// A session endpoint, multiplexing zero or more links over one channel
/// pair.
#[derive(Debug)]
pub struct Session {
    /// Channel this side addresses the session on.
    pub local_channel: OutgoingChannel,
    /// Channel the peer addresses the session on, once BEGIN has been
    /// exchanged in both directions.
    pub remote_channel: Option<IncomingChannel>,
    /// This side's lifecycle state.
    pub local_state: EndpointState,
    /// The peer's lifecycle state.
    pub remote_state: EndpointState,
    /// Transfer-id this side will assign to its next outgoing TRANSFER.
    pub next_outgoing_id: TransferNumber,
    /// Transfer-id expected on the next incoming TRANSFER.
    pub next_incoming_id: TransferNumber,
    /// Remaining capacity, in transfer frames, for incoming TRANSFERs.
    pub incoming_window: u32,
    /// The value `incoming_window` is reset to when it is replenished.
    pub initial_incoming_window: u32,
    /// Once `incoming_window` falls to or below this, a replenishing FLOW
    /// is scheduled.
    pub incoming_window_low_water_mark: u32,
    /// Remaining capacity, in transfer frames, this side may use for
    /// outgoing TRANSFERs.
    pub outgoing_window: u32,
    /// Links attached to this session, keyed by local handle.
    pub links: Slab<Link>,
    /// Deliveries not yet settled by both sides, keyed by session-scoped id.
    pub unsettled: BTreeMap<DeliveryId, Delivery>,
}

impl Session {
    /// Creates a session in its initial, unopened state on the given local
    /// channel.
    pub fn new(local_channel: OutgoingChannel, incoming_window: u32, outgoing_window: u32) -> Self {
        Self {
            local_channel,
            remote_channel: None,
            local_state: EndpointState::Uninitialized,
            remote_state: EndpointState::Uninitialized,
            next_outgoing_id: 0,
            next_incoming_id: 0,
            incoming_window,
            initial_incoming_window: incoming_window,
            incoming_window_low_water_mark: incoming_window / 2,
            outgoing_window,
            links: Slab::new(),
            unsettled: BTreeMap::new(),
        }
    }

    /// True once `incoming_window` has fallen to or below the low-water
    /// mark and a replenishing FLOW should be sent.
    pub fn needs_flow_replenish(&self) -> bool {
        self.incoming_window <= self.incoming_window_low_water_mark
    }

    /// Builds a FLOW performative describing this side's session window and,
    /// if `link_handle` is given, that link's credit state.
    pub fn flow_performative(&self, link_handle: Option<LinkHandle>, echo: bool) -> Flow {
        let link = link_handle.and_then(|handle| self.link(handle));
        Flow {
            next_incoming_id: Some(self.next_incoming_id),
            incoming_window: self.incoming_window,
            next_outgoing_id: self.next_outgoing_id,
            outgoing_window: self.outgoing_window,
            handle: link.and_then(|l| l.local_handle).map(Into::into),
            delivery_count: link.map(|l| l.delivery_count),
            link_credit: link.map(|l| l.link_credit),
            available: link.map(|l| l.available),
            drain: link.map(|l| l.drain).unwrap_or(false),
            echo,
            properties: None,
        }
    }

    /// Builds the BEGIN performative describing this side's session state.
    pub fn begin_performative(&self, remote_channel: Option<u16>) -> Begin {
        Begin {
            remote_channel,
            next_outgoing_id: self.next_outgoing_id,
            incoming_window: self.incoming_window,
            outgoing_window: self.outgoing_window,
            handle_max: Handle(u32::MAX),
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        }
    }

    /// Applies the peer's BEGIN, recording their channel and initial window.
    pub fn apply_remote_begin(&mut self, channel: IncomingChannel, begin: Begin) {
        self.remote_channel = Some(channel);
        self.next_incoming_id = begin.next_outgoing_id;
        self.remote_state.open();
    }

    /// Builds the END performative for this side.
    pub fn end_performative(&self, error: Option<amqp_types::definitions::Error>) -> End {
        End { error }
    }

    /// Allocates a new link with the given role, returning its session-local
    /// handle.
    pub fn allocate_link(&mut self, name: String, role: Role) -> LinkHandle {
        LinkHandle(self.links.insert(Link::new(name, role)))
    }

    /// Releases a link from the handle table once both DETACHes have been
    /// exchanged.
    pub fn remove_link(&mut self, handle: LinkHandle) -> Result<Link, Error> {
        if !self.links.contains(handle.0) {
            return Err(Error::Session(crate::error::SessionError::UnattachedHandle(
                Handle(handle.0 as u32),
            )));
        }
        Ok(self.links.remove(handle.0))
    }

    /// Looks up a link by handle.
    pub fn link(&self, handle: LinkHandle) -> Option<&Link> {
        self.links.get(handle.0)
    }

    /// Looks up a link by handle, mutably.
    pub fn link_mut(&mut self, handle: LinkHandle) -> Option<&mut Link> {
        self.links.get_mut(handle.0)
    }

    /// Finds the link the peer addressed with `remote_handle` on an
    /// incoming FLOW, TRANSFER, or DISPOSITION.
    pub fn link_by_remote_handle(&self, remote_handle: u32) -> Option<LinkHandle> {
        self.links
            .iter()
            .find(|(_, link)| link.remote_handle.map(|h| h.0) == Some(remote_handle))
            .map(|(idx, _)| LinkHandle(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_uninitialized() {
        let session = Session::new(OutgoingChannel(0), 100, 100);
        assert_eq!(session.local_state, EndpointState::Uninitialized);
        assert!(session.remote_channel.is_none());
    }

    #[test]
    fn allocate_and_remove_link_round_trips() {
        let mut session = Session::new(OutgoingChannel(0), 100, 100);
        let handle = session.allocate_link("l1".into(), Role::Sender);
        assert!(session.link(handle).is_some());
        session.remove_link(handle).unwrap();
        assert!(session.link(handle).is_none());
    }

    #[test]
    fn remove_unknown_link_is_an_unattached_handle_error() {
        let mut session = Session::new(OutgoingChannel(0), 100, 100);
        let handle = session.allocate_link("l1".into(), Role::Sender);
        session.remove_link(handle).unwrap();
        assert!(session.remove_link(handle).is_err());
    }
}
