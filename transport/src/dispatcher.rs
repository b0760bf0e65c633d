//! Routes a decoded incoming frame to its connection, session, or link and
//! applies it, the inverse of the encode path in [`crate::frame`].

use amqp_types::definitions::{ReceiverSettleMode, Role};

use crate::endpoint::{Connection, DeliveryId, Delivery};
use crate::error::{ConnectionError, Error, LinkError, SessionError};
use crate::events::Event;
use crate::frame::FrameBody;

/// Applies one incoming frame body, addressed to `channel`, to `connection`.
///
/// OPEN and CLOSE are connection-scoped and ignore `channel` beyond
/// validating it is zero. Every other performative requires `channel` to
/// already be bound to a session (BEGIN itself is the one exception that
/// may bind a previously-unbound channel).
pub fn dispatch_incoming(connection: &mut Connection, channel: u16, body: FrameBody) -> Result<(), Error> {
    match body {
        FrameBody::Open(open) => {
            connection.apply_remote_open(open);
            Ok(())
        }
        FrameBody::Close(close) => {
            if let Some(error) = close.error {
                connection.push_event(Event::TransportError(error.condition().clone()));
            }
            connection.apply_remote_close();
            Ok(())
        }
        FrameBody::Begin(begin) => {
            connection.apply_remote_begin(channel, begin)?;
            Ok(())
        }
        FrameBody::End(end) => {
            let handle = connection
                .session_for_channel(channel)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;
            if let Some(error) = end.error {
                connection.push_event(Event::TransportError(error.condition().clone()));
            }
            if let Some(session) = connection.session_mut(handle) {
                session.remote_state.close();
            }
            connection.push_event(Event::SessionRemoteClose(handle));
            Ok(())
        }
        FrameBody::Attach(attach) => {
            let session_handle = connection
                .session_for_channel(channel)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;
            let session = connection
                .session_mut(session_handle)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;

            let pending = session
                .links
                .iter()
                .find(|(_, link)| link.name == attach.name && link.remote_handle.is_none())
                .map(|(idx, _)| idx);

            let link_handle = match pending {
                Some(idx) => crate::endpoint::LinkHandle(idx),
                None => {
                    let peer_role = attach.role;
                    let our_role = match peer_role {
                        Role::Sender => Role::Receiver,
                        Role::Receiver => Role::Sender,
                    };
                    session.allocate_link(attach.name.clone(), our_role)
                }
            };

            let link = session
                .link_mut(link_handle)
                .expect("link_handle just resolved or allocated");
            link.apply_remote_attach(attach);
            connection.push_event(Event::LinkRemoteOpen(session_handle, link_handle));
            Ok(())
        }
        FrameBody::Detach(detach) => {
            let session_handle = connection
                .session_for_channel(channel)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;
            let session = connection
                .session_mut(session_handle)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;
            let link_handle = session
                .link_by_remote_handle(detach.handle.0)
                .ok_or(Error::Session(SessionError::UnattachedHandle(detach.handle)))?;
            if let Some(link) = session.link_mut(link_handle) {
                link.remote_state.close();
            }
            if let Some(error) = detach.error {
                connection.push_event(Event::TransportError(error.condition().clone()));
            }
            connection.push_event(Event::LinkRemoteClose(session_handle, link_handle));
            Ok(())
        }
        FrameBody::Flow(flow) => {
            let session_handle = connection
                .session_for_channel(channel)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;
            let session = connection
                .session_mut(session_handle)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;

            let link_handle = if let Some(wire_handle) = flow.handle {
                let link_handle = session
                    .link_by_remote_handle(wire_handle.0)
                    .ok_or(Error::Session(SessionError::UnattachedHandle(wire_handle)))?;
                if let Some(link) = session.link_mut(link_handle) {
                    link.apply_flow(&flow);
                }
                Some(link_handle)
            } else {
                session.next_incoming_id = flow.next_outgoing_id;
                None
            };

            let out_channel = session.local_channel.0;
            let echo_flow = flow
                .echo
                .then(|| session.flow_performative(link_handle, false));

            match link_handle {
                Some(link_handle) => connection.push_event(Event::LinkFlow(session_handle, link_handle)),
                None => connection.push_event(Event::Transport),
            }
            if let Some(body) = echo_flow {
                connection.push_pending_frame(out_channel, FrameBody::Flow(body));
            }
            Ok(())
        }
        FrameBody::Transfer {
            performative,
            payload,
        } => {
            let session_handle = connection
                .session_for_channel(channel)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;
            let session = connection
                .session_mut(session_handle)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;
            let link_handle = session
                .link_by_remote_handle(performative.handle.0)
                .ok_or(Error::Session(SessionError::UnattachedHandle(performative.handle)))?;

            // Only the first frame of a delivery carries an explicit
            // delivery-id; continuation frames (`more` was true on the
            // previous frame) must be routed to that same in-progress
            // delivery rather than minting a fresh one.
            let delivery_id = match performative.delivery_id {
                Some(id) => {
                    let delivery_id = DeliveryId(id);
                    if let Some(existing) = session.unsettled.get(&delivery_id) {
                        if !existing.complete {
                            return Err(Error::Link(LinkError::DuplicateDeliveryId));
                        }
                    }
                    if let Some(link) = session.link_mut(link_handle) {
                        link.incoming_delivery_id = Some(delivery_id);
                    }
                    delivery_id
                }
                None => session
                    .link(link_handle)
                    .and_then(|link| link.incoming_delivery_id)
                    .ok_or(Error::Session(SessionError::WindowViolation))?,
            };

            let delivery = session.unsettled.entry(delivery_id).or_insert_with(|| {
                Delivery::new(
                    performative.delivery_tag.clone().unwrap_or_default(),
                    delivery_id,
                    link_handle,
                )
            });
            delivery.append(&payload, performative.more, performative.aborted);
            if let Some(settled) = performative.settled {
                delivery.settled = delivery.settled || settled;
            }

            session.incoming_window = session.incoming_window.saturating_sub(1);
            let needs_replenish = session.needs_flow_replenish();

            // Credit and the session's transfer-id accounting advance once
            // per delivery, on its final frame, not on every frame.
            if !performative.more {
                session.next_incoming_id = delivery_id.0.wrapping_add(1);
                let auto_settle = if let Some(link) = session.link_mut(link_handle) {
                    link.incoming_delivery_id = None;
                    if matches!(link.role, Role::Receiver) {
                        link.delivery_count = link.delivery_count.wrapping_add(1);
                        link.link_credit = link.link_credit.saturating_sub(1);
                    }
                    matches!(link.role, Role::Receiver)
                        && matches!(link.rcv_settle_mode, ReceiverSettleMode::First)
                } else {
                    false
                };
                if auto_settle {
                    if let Some(delivery) = session.unsettled.get_mut(&delivery_id) {
                        delivery.settle_locally();
                    }
                }
            }

            let out_channel = session.local_channel.0;
            let replenish_flow = needs_replenish.then(|| {
                let flow = session.flow_performative(None, false);
                session.incoming_window = session.initial_incoming_window;
                flow
            });

            connection.push_event(Event::Delivery(session_handle, link_handle, delivery_id));
            if let Some(body) = replenish_flow {
                connection.push_pending_frame(out_channel, FrameBody::Flow(body));
            }
            Ok(())
        }
        FrameBody::Disposition(disposition) => {
            let session_handle = connection
                .session_for_channel(channel)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;
            let session = connection
                .session_mut(session_handle)
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;

            let first = disposition.first;
            let last = disposition.last.unwrap_or(first);
            let mut finalized = Vec::new();
            for id in first..=last {
                let delivery_id = DeliveryId(id);
                if let Some(delivery) = session.unsettled.get_mut(&delivery_id) {
                    if let Some(state) = disposition.state.clone() {
                        delivery.remote_state = state.into();
                    }
                    delivery.settled = delivery.settled || disposition.settled;
                    if delivery.is_settled() {
                        finalized.push((delivery_id, delivery.link));
                    }
                }
            }
            for (delivery_id, _) in &finalized {
                session.unsettled.remove(delivery_id);
            }

            connection.push_event(Event::Transport);
            for (delivery_id, link_handle) in finalized {
                connection.push_event(Event::DeliveryFinal(session_handle, link_handle, delivery_id));
            }
            Ok(())
        }
        FrameBody::Empty => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amqp_types::definitions::Handle;
    use amqp_types::performatives::{Attach, Begin, Disposition, Flow, Open, Transfer};

    fn attached_receiver(incoming_window: u32) -> (Connection, crate::endpoint::SessionHandle, crate::endpoint::LinkHandle) {
        let mut conn = Connection::new("container-1".into(), 4096, 100);
        conn.apply_remote_open(Open {
            container_id: "peer".into(),
            hostname: None,
            max_frame_size: 4096u32.into(),
            channel_max: 100u16.into(),
            idle_time_out: None,
            outgoing_locales: None,
            incoming_locales: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        });
        let session_handle = conn
            .apply_remote_begin(
                0,
                Begin {
                    remote_channel: None,
                    next_outgoing_id: 0,
                    incoming_window,
                    outgoing_window: 100,
                    handle_max: Handle(u32::MAX),
                    offered_capabilities: None,
                    desired_capabilities: None,
                    properties: None,
                },
            )
            .unwrap();
        if let Some(session) = conn.session_mut(session_handle) {
            session.incoming_window = incoming_window;
            session.initial_incoming_window = incoming_window;
            session.incoming_window_low_water_mark = incoming_window / 2;
        }
        dispatch_incoming(
            &mut conn,
            0,
            FrameBody::Attach(Attach {
                name: "l1".into(),
                handle: Handle(7),
                role: Role::Sender,
                snd_settle_mode: Default::default(),
                rcv_settle_mode: Default::default(),
                source: None,
                target: None,
                unsettled: None,
                incomplete_unsettled: false,
                initial_delivery_count: Some(0),
                max_message_size: None,
                offered_capabilities: None,
                desired_capabilities: None,
                properties: None,
            }),
        )
        .unwrap();
        let link_handle = conn.session(session_handle).unwrap().link_by_remote_handle(7).unwrap();
        if let Some(link) = conn
            .session_mut(session_handle)
            .and_then(|s| s.link_mut(link_handle))
        {
            link.link_credit = 10;
        }
        (conn, session_handle, link_handle)
    }

    fn transfer(delivery_id: Option<u32>, more: bool, settled: Option<bool>) -> Transfer {
        Transfer {
            handle: Handle(7),
            delivery_id,
            delivery_tag: Some(vec![1].into()),
            message_format: None,
            settled,
            more,
            rcv_settle_mode: None,
            state: None,
            resume: false,
            aborted: false,
            batchable: false,
        }
    }

    #[test]
    fn continuation_frame_appends_to_same_delivery() {
        let (mut conn, session_handle, link_handle) = attached_receiver(100);
        dispatch_incoming(
            &mut conn,
            0,
            FrameBody::Transfer {
                performative: transfer(Some(0), true, None),
                payload: vec![1, 2],
            },
        )
        .unwrap();
        dispatch_incoming(
            &mut conn,
            0,
            FrameBody::Transfer {
                performative: transfer(None, false, None),
                payload: vec![3, 4],
            },
        )
        .unwrap();

        let session = conn.session(session_handle).unwrap();
        assert_eq!(session.unsettled.len(), 1);
        let delivery = session.unsettled.get(&crate::endpoint::DeliveryId(0)).unwrap();
        assert_eq!(delivery.bytes, vec![1, 2, 3, 4]);
        assert!(delivery.complete);
        let link = session.link(link_handle).unwrap();
        assert_eq!(link.link_credit, 9);
        assert_eq!(link.delivery_count, 1);
        assert_eq!(session.next_incoming_id, 1);
    }

    #[test]
    fn credit_and_id_do_not_advance_on_intermediate_frames() {
        let (mut conn, session_handle, link_handle) = attached_receiver(100);
        dispatch_incoming(
            &mut conn,
            0,
            FrameBody::Transfer {
                performative: transfer(Some(0), true, None),
                payload: vec![1],
            },
        )
        .unwrap();
        let session = conn.session(session_handle).unwrap();
        assert_eq!(session.next_incoming_id, 0);
        assert_eq!(session.link(link_handle).unwrap().link_credit, 10);
    }

    #[test]
    fn duplicate_delivery_id_on_active_delivery_is_a_session_error() {
        let (mut conn, _session_handle, _link_handle) = attached_receiver(100);
        dispatch_incoming(
            &mut conn,
            0,
            FrameBody::Transfer {
                performative: transfer(Some(0), true, None),
                payload: vec![1],
            },
        )
        .unwrap();
        let err = dispatch_incoming(
            &mut conn,
            0,
            FrameBody::Transfer {
                performative: transfer(Some(0), true, None),
                payload: vec![2],
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Link(LinkError::DuplicateDeliveryId)));
    }

    #[test]
    fn both_ends_settled_removes_delivery_and_emits_final_event() {
        let (mut conn, session_handle, link_handle) = attached_receiver(100);
        dispatch_incoming(
            &mut conn,
            0,
            FrameBody::Transfer {
                performative: transfer(Some(0), false, None),
                payload: vec![1],
            },
        )
        .unwrap();
        // drain the Delivery event
        while !matches!(conn.next_event(), Some(Event::Delivery(..)) | None) {}

        if let Some(session) = conn.session_mut(session_handle) {
            session
                .unsettled
                .get_mut(&crate::endpoint::DeliveryId(0))
                .unwrap()
                .settle_locally();
        }

        dispatch_incoming(
            &mut conn,
            0,
            FrameBody::Disposition(Disposition {
                role: Role::Sender,
                first: 0,
                last: None,
                settled: true,
                state: None,
                batchable: false,
            }),
        )
        .unwrap();

        assert!(conn.session(session_handle).unwrap().unsettled.is_empty());
        let events: Vec<_> = std::iter::from_fn(|| conn.next_event()).collect();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::DeliveryFinal(s, l, d) if *s == session_handle && *l == link_handle && *d == crate::endpoint::DeliveryId(0)
        )));
    }

    #[test]
    fn flow_echo_schedules_a_flow_response() {
        let (mut conn, session_handle, _link_handle) = attached_receiver(100);
        dispatch_incoming(
            &mut conn,
            0,
            FrameBody::Flow(Flow {
                next_incoming_id: Some(0),
                incoming_window: 100,
                next_outgoing_id: 0,
                outgoing_window: 100,
                handle: None,
                delivery_count: None,
                link_credit: None,
                available: None,
                drain: false,
                echo: true,
                properties: None,
            }),
        )
        .unwrap();

        let (out_channel, body) = conn.next_pending_frame().expect("echo FLOW scheduled");
        let session = conn.session(session_handle).unwrap();
        assert_eq!(out_channel, session.local_channel.0);
        assert!(matches!(body, FrameBody::Flow(_)));
    }

    #[test]
    fn low_incoming_window_schedules_a_replenishing_flow() {
        let (mut conn, _session_handle, _link_handle) = attached_receiver(2);
        dispatch_incoming(
            &mut conn,
            0,
            FrameBody::Transfer {
                performative: transfer(Some(0), false, None),
                payload: vec![1],
            },
        )
        .unwrap();
        assert!(conn.next_pending_frame().is_some());
    }
}
