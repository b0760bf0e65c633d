//! A delivery in flight on a link: the bytes accumulated so far plus the
//! local/remote settlement state attached to them.

use amqp_types::definitions::{DeliveryNumber, DeliveryTag};
use amqp_types::messaging::DeliveryState;

use super::LinkHandle;

/// Identifies a delivery within a session's unsettled map.
///
/// Wraps the wire `delivery-id` (a [`DeliveryNumber`]), not a link-local
/// sequence: two links in the same session never share a delivery-id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeliveryId(pub DeliveryNumber);

/// Settlement outcome attached to a delivery, mirrored from [`DeliveryState`]
/// but normalized so the endpoint state machine can match on it without
/// reaching into the wire type.
#[derive(Debug, Clone)]
pub enum Disposition {
    /// No outcome communicated yet.
    Unknown,
    /// The receiver has seen the delivery but not yet decided its outcome.
    Received {
        /// Section number of the first unreceived section.
        section_number: u32,
        /// Byte offset within that section.
        section_offset: u64,
    },
    /// The delivery was accepted.
    Accepted,
    /// The delivery was rejected, with an optional wire error condition.
    Rejected(Option<amqp_types::definitions::Error>),
    /// The delivery was released for redelivery elsewhere.
    Released,
    /// The delivery was modified before being released.
    Modified {
        /// True if redelivery should be attempted again.
        delivery_failed: bool,
        /// True if the message should be considered undeliverable.
        undeliverable_here: bool,
        /// Annotations to merge into the message before redelivery.
        message_annotations: Option<amqp_types::definitions::Fields>,
    },
    /// A raw disposition the endpoint layer does not interpret, carried
    /// through as-is (covers transactional outcomes under the `transaction`
    /// feature).
    Passthrough(DeliveryState),
}

impl From<DeliveryState> for Disposition {
    fn from(state: DeliveryState) -> Self {
        match state {
            DeliveryState::Received(r) => Disposition::Received {
                section_number: r.section_number,
                section_offset: r.section_offset,
            },
            DeliveryState::Accepted(_) => Disposition::Accepted,
            DeliveryState::Rejected(r) => Disposition::Rejected(r.error),
            DeliveryState::Released(_) => Disposition::Released,
            DeliveryState::Modified(m) => Disposition::Modified {
                delivery_failed: m.delivery_failed.unwrap_or(false),
                undeliverable_here: m.undeliverable_here.unwrap_or(false),
                message_annotations: m.message_annotations,
            },
            other => Disposition::Passthrough(other),
        }
    }
}

/// A single delivery tracked by a session's unsettled map.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Delivery tag assigned by the sender; unique per link, not per session.
    pub tag: DeliveryTag,
    /// Session-scoped delivery-id.
    pub id: DeliveryId,
    /// The link this delivery was transferred on.
    pub link: LinkHandle,
    /// This side's view of the delivery's outcome.
    pub local_state: Disposition,
    /// The peer's view of the delivery's outcome, if communicated.
    pub remote_state: Disposition,
    /// True once the peer has reported this delivery settled, via a
    /// pre-settled TRANSFER or a later DISPOSITION.
    pub settled: bool,
    /// True once this side has settled the delivery, either explicitly or
    /// through `rcv-settle-mode = first` auto-settlement.
    pub local_settled: bool,
    /// Bytes received so far, across one or more TRANSFER frames.
    pub bytes: Vec<u8>,
    /// True once the final TRANSFER of a multi-frame delivery has arrived.
    pub complete: bool,
    /// True if the delivery was aborted mid-transfer; `bytes` MUST be
    /// discarded rather than delivered to the application.
    pub aborted: bool,
}

impl Delivery {
    /// Starts tracking a new, unsettled, empty delivery.
    pub fn new(tag: DeliveryTag, id: DeliveryId, link: LinkHandle) -> Self {
        Self {
            tag,
            id,
            link,
            local_state: Disposition::Unknown,
            remote_state: Disposition::Unknown,
            settled: false,
            local_settled: false,
            bytes: Vec::new(),
            complete: false,
            aborted: false,
        }
    }

    /// Appends a TRANSFER frame's payload, clearing accumulated bytes if the
    /// transfer was aborted.
    pub fn append(&mut self, payload: &[u8], more: bool, aborted: bool) {
        if aborted {
            self.aborted = true;
            self.bytes.clear();
            self.complete = true;
            return;
        }
        self.bytes.extend_from_slice(payload);
        self.complete = !more;
    }

    /// Marks this side as having settled the delivery.
    pub fn settle_locally(&mut self) {
        self.local_settled = true;
    }

    /// True once both this side and the peer have settled the delivery.
    pub fn is_settled(&self) -> bool {
        self.settled && self.local_settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_accumulates_until_more_is_false() {
        let mut delivery = Delivery::new(DeliveryTag::from(vec![1]), DeliveryId(0), LinkHandle(0));
        delivery.append(&[1, 2, 3], true, false);
        assert!(!delivery.complete);
        delivery.append(&[4, 5], false, false);
        assert!(delivery.complete);
        assert_eq!(delivery.bytes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn abort_discards_accumulated_bytes() {
        let mut delivery = Delivery::new(DeliveryTag::from(vec![1]), DeliveryId(0), LinkHandle(0));
        delivery.append(&[1, 2, 3], true, false);
        delivery.append(&[], false, true);
        assert!(delivery.aborted);
        assert!(delivery.bytes.is_empty());
    }

    #[test]
    fn is_settled_requires_both_sides() {
        let mut delivery = Delivery::new(DeliveryTag::from(vec![1]), DeliveryId(0), LinkHandle(0));
        delivery.settled = true;
        assert!(!delivery.is_settled());
        delivery.settle_locally();
        assert!(delivery.is_settled());
    }
}
