//! A link endpoint: one end of a named, directional channel for transferring
//! deliveries, attached to a session via ATTACH and released via DETACH.

use std::collections::VecDeque;

use amqp_types::definitions::{
    Fields, Handle, ReceiverSettleMode, Role, SenderSettleMode, SequenceNo,
};
use amqp_types::messaging::{Source, TargetArchetype};
use amqp_types::performatives::{Attach, Detach, Flow};

use super::{Delivery, DeliveryId, EndpointState, InputHandle, OutputHandle};
use crate::error::Error;

/// A link endpoint.
///
/// `local_handle`/`remote_handle` are populated once ATTACH has been sent
/// and received respectively; a link created locally has a `local_handle`
/// from the moment it's allocated but no `remote_handle` until the peer's
/// ATTACH arrives (and vice versa for a peer-initiated link).
#[derive(Debug, Clone)]
pub struct Link {
    /// Link name; unique within the pair of endpoints for the container
    /// lifetime of the underlying session.
    pub name: String,
    /// Sender or receiver, from this endpoint's perspective.
    pub role: Role,
    /// Handle this side uses to address the link.
    pub local_handle: Option<OutputHandle>,
    /// Handle the peer uses to address the link.
    pub remote_handle: Option<InputHandle>,
    /// This side's lifecycle state.
    pub local_state: EndpointState,
    /// The peer's lifecycle state.
    pub remote_state: EndpointState,
    /// Negotiated sender settlement mode.
    pub snd_settle_mode: SenderSettleMode,
    /// Negotiated receiver settlement mode.
    pub rcv_settle_mode: ReceiverSettleMode,
    /// Terminus this link reads from, if any.
    pub source: Option<Source>,
    /// Terminus this link writes to, if any.
    pub target: Option<TargetArchetype>,
    /// Running count of deliveries initiated on this link.
    pub delivery_count: SequenceNo,
    /// Remaining credit extended to the sender; only meaningful when
    /// `role == Role::Sender`.
    pub link_credit: u32,
    /// Messages waiting to be sent, advertised by the sender.
    pub available: u32,
    /// Whether the receiver has requested the sender drain its credit.
    pub drain: bool,
    /// True once a sender has emptied `queued` after a drain request;
    /// cleared the next time the receiver grants fresh credit.
    pub drained: bool,
    /// Outbound deliveries queued locally, drained onto the wire only as
    /// `link_credit` and the session's outgoing window permit.
    pub queued: VecDeque<Delivery>,
    /// Maximum size, in bytes, of a message this link will transfer.
    pub max_message_size: Option<u64>,
    /// Link state properties exchanged on ATTACH.
    pub properties: Option<Fields>,
    /// Delivery-id of the incoming delivery currently being assembled across
    /// TRANSFER continuation frames; cleared once that delivery completes.
    pub incoming_delivery_id: Option<DeliveryId>,
}

impl Link {
    /// Creates a link in its initial, fully-uninitialized state.
    pub fn new(name: String, role: Role) -> Self {
        Self {
            name,
            role,
            local_handle: None,
            remote_handle: None,
            local_state: EndpointState::Uninitialized,
            remote_state: EndpointState::Uninitialized,
            snd_settle_mode: SenderSettleMode::Mixed,
            rcv_settle_mode: ReceiverSettleMode::First,
            source: None,
            target: None,
            delivery_count: 0,
            link_credit: 0,
            available: 0,
            drain: false,
            drained: false,
            queued: VecDeque::new(),
            max_message_size: None,
            properties: None,
            incoming_delivery_id: None,
        }
    }

    /// Builds the ATTACH performative describing this side's link state.
    pub fn attach_performative(&self) -> Result<Attach, Error> {
        let handle = self
            .local_handle
            .ok_or_else(|| Error::Framing("link has no local handle".into()))?;
        Ok(Attach {
            name: self.name.clone(),
            handle: handle.into(),
            role: self.role,
            snd_settle_mode: self.snd_settle_mode.clone(),
            rcv_settle_mode: self.rcv_settle_mode.clone(),
            source: self.source.clone().map(Box::new),
            target: self.target.clone().map(Box::new),
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: matches!(self.role, Role::Sender).then_some(self.delivery_count),
            max_message_size: self.max_message_size,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: self.properties.clone(),
        })
    }

    /// Applies the peer's ATTACH, recording their handle and negotiated
    /// terminus state.
    pub fn apply_remote_attach(&mut self, attach: Attach) {
        self.remote_handle = Some(attach.handle.into());
        self.remote_state.open();
        if let Some(count) = attach.initial_delivery_count {
            if matches!(self.role, Role::Receiver) {
                self.delivery_count = count;
            }
        }
    }

    /// Applies a FLOW's link-scoped fields.
    pub fn apply_flow(&mut self, flow: &Flow) {
        if let Some(count) = flow.delivery_count {
            self.delivery_count = count;
        }
        if let Some(credit) = flow.link_credit {
            self.link_credit = credit;
        }
        if let Some(available) = flow.available {
            self.available = available;
        }
        self.drain = flow.drain;
        if self.drain {
            self.drained = self.queued.is_empty();
        }
    }

    /// Queues an outbound delivery to be sent as link-credit allows.
    pub fn enqueue(&mut self, delivery: Delivery) {
        self.queued.push_back(delivery);
        self.drained = false;
    }

    /// Pops the next queued delivery, consuming one unit of `link_credit`.
    ///
    /// Returns `None` when either the queue is empty or no credit remains;
    /// sets `drained` once a drain request empties the queue under zero
    /// credit.
    pub fn pop_for_send(&mut self) -> Option<Delivery> {
        if self.link_credit == 0 {
            if self.drain {
                self.drained = true;
            }
            return None;
        }
        let delivery = self.queued.pop_front()?;
        self.link_credit -= 1;
        self.delivery_count = self.delivery_count.wrapping_add(1);
        if self.drain && self.queued.is_empty() {
            self.drained = true;
        }
        Some(delivery)
    }

    /// Builds the DETACH performative for this side, optionally carrying an
    /// error and marking the link as permanently closed.
    pub fn detach_performative(&self, closed: bool, error: Option<amqp_types::definitions::Error>) -> Result<Detach, Error> {
        let handle = self
            .local_handle
            .ok_or_else(|| Error::Framing("link has no local handle".into()))?;
        Ok(Detach {
            handle: handle.into(),
            closed,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_link_starts_uninitialized_with_no_handles() {
        let link = Link::new("l1".into(), Role::Sender);
        assert_eq!(link.local_state, EndpointState::Uninitialized);
        assert!(link.local_handle.is_none());
        assert!(link.remote_handle.is_none());
    }

    #[test]
    fn attach_performative_requires_local_handle() {
        let link = Link::new("l1".into(), Role::Sender);
        assert!(link.attach_performative().is_err());
    }

    #[test]
    fn flow_updates_credit_and_drain() {
        let mut link = Link::new("l1".into(), Role::Sender);
        let flow = Flow {
            next_incoming_id: None,
            incoming_window: 0,
            next_outgoing_id: 0,
            outgoing_window: 0,
            handle: Some(Handle(0)),
            delivery_count: Some(5),
            link_credit: Some(10),
            available: Some(2),
            drain: true,
            echo: false,
            properties: None,
        };
        link.apply_flow(&flow);
        assert_eq!(link.link_credit, 10);
        assert_eq!(link.available, 2);
        assert!(link.drain);
        assert_eq!(link.delivery_count, 5);
    }
}
