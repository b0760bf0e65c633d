//! The connection endpoint: container identity, the session handle table,
//! and the event queue the driver layer drains.

use std::collections::VecDeque;

use slab::Slab;

use amqp_types::definitions::{Milliseconds, Role};
use amqp_types::performatives::{Begin, Open};

use super::{EndpointState, IncomingChannel, Link, LinkHandle, OutgoingChannel, Session, SessionHandle};
use crate::error::{ConnectionError, Error};
use crate::events::Event;
use crate::frame::FrameBody;

/// The connection endpoint.
///
/// Owns every session attached to it; sessions in turn own their links.
/// Holds no socket and performs no I/O itself -- frames are handed to it by
/// the driver layer and performatives come back out through
/// [`Connection::next_event`].
#[derive(Debug)]
pub struct Connection {
    /// This container's identifying string, sent on OPEN.
    pub container_id: String,
    /// Hostname to present to the peer, if any (used for virtual hosting).
    pub hostname: Option<String>,
    /// Largest frame, in bytes, this side will accept.
    pub max_frame_size: u32,
    /// Largest frame, in bytes, the peer said it will accept.
    pub remote_max_frame_size: Option<u32>,
    /// Highest channel number this side will use.
    pub channel_max: u16,
    /// Local idle timeout advertised on OPEN, in milliseconds.
    pub idle_time_out: Option<Milliseconds>,
    /// Idle timeout the peer advertised on its OPEN, in milliseconds.
    pub remote_idle_time_out: Option<Milliseconds>,
    /// This side's lifecycle state.
    pub local_state: EndpointState,
    /// The peer's lifecycle state.
    pub remote_state: EndpointState,
    /// Sessions keyed by local (outgoing) channel number.
    sessions: Slab<Session>,
    /// Maps an incoming channel number back to the session handle it was
    /// bound to on BEGIN.
    channel_to_session: std::collections::HashMap<u16, SessionHandle>,
    events: VecDeque<Event>,
    /// Performatives the endpoint layer itself produced (FLOW echoes and
    /// low-water-mark replenishment), awaiting encode-and-send by the driver.
    pending_frames: VecDeque<(u16, FrameBody)>,
}

/// Smallest `max-frame-size` a conforming peer may advertise.
const MIN_MAX_FRAME_SIZE: u32 = 512;

impl Connection {
    /// Creates a connection in its initial, unopened state.
    pub fn new(container_id: String, max_frame_size: u32, channel_max: u16) -> Self {
        Self {
            container_id,
            hostname: None,
            max_frame_size,
            remote_max_frame_size: None,
            channel_max,
            idle_time_out: None,
            remote_idle_time_out: None,
            local_state: EndpointState::Uninitialized,
            remote_state: EndpointState::Uninitialized,
            sessions: Slab::new(),
            channel_to_session: std::collections::HashMap::new(),
            events: VecDeque::new(),
            pending_frames: VecDeque::new(),
        }
    }

    /// Builds this side's OPEN performative.
    pub fn open_performative(&self) -> Open {
        Open {
            container_id: self.container_id.clone(),
            hostname: self.hostname.clone(),
            max_frame_size: self.max_frame_size.into(),
            channel_max: self.channel_max.into(),
            idle_time_out: self.idle_time_out,
            outgoing_locales: None,
            incoming_locales: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        }
    }

    /// Marks this side's local state active and enqueues [`Event::ConnectionLocalOpen`].
    pub fn open(&mut self) {
        self.local_state.open();
        self.events.push_back(Event::ConnectionLocalOpen);
    }

    /// Applies the peer's OPEN performative.
    ///
    /// `max-frame-size` is clamped to the protocol minimum so a peer cannot
    /// advertise a frame size too small to carry any real performative.
    pub fn apply_remote_open(&mut self, open: Open) {
        let max_frame_size: u32 = open.max_frame_size.into();
        self.remote_max_frame_size = Some(max_frame_size.max(MIN_MAX_FRAME_SIZE));
        self.remote_idle_time_out = open.idle_time_out;
        self.remote_state.open();
        self.events.push_back(Event::ConnectionRemoteOpen);
    }

    /// Marks this side's local state closed and enqueues [`Event::ConnectionLocalClose`].
    pub fn close(&mut self) {
        self.local_state.close();
        self.events.push_back(Event::ConnectionLocalClose);
    }

    /// Applies the peer's CLOSE performative.
    pub fn apply_remote_close(&mut self) {
        self.remote_state.close();
        self.events.push_back(Event::ConnectionRemoteClose);
        if self.local_state.is_closed() {
            self.events.push_back(Event::ConnectionFinal);
        }
    }

    /// Allocates a new session and returns its handle.
    pub fn allocate_session(&mut self, incoming_window: u32, outgoing_window: u32) -> SessionHandle {
        let handle = SessionHandle(
            self.sessions
                .insert(Session::new(OutgoingChannel(0), incoming_window, outgoing_window)),
        );
        if let Some(session) = self.sessions.get_mut(handle.0) {
            session.local_channel = OutgoingChannel(handle.0 as u16);
        }
        self.events.push_back(Event::SessionLocalOpen(handle));
        handle
    }

    /// Allocates a new link on `session_handle` and enqueues
    /// [`Event::LinkLocalOpen`].
    pub fn attach_link(
        &mut self,
        session_handle: SessionHandle,
        name: String,
        role: Role,
    ) -> Result<LinkHandle, Error> {
        let session = self
            .sessions
            .get_mut(session_handle.0)
            .ok_or(Error::ResourceLimitExceeded)?;
        let link_handle = session.allocate_link(name, role);
        self.events
            .push_back(Event::LinkLocalOpen(session_handle, link_handle));
        Ok(link_handle)
    }

    /// Releases a link from `session_handle`'s handle table once both
    /// DETACHes have been exchanged, enqueuing [`Event::LinkFinal`].
    pub fn remove_link(&mut self, session_handle: SessionHandle, link_handle: LinkHandle) -> Result<Link, Error> {
        let session = self
            .sessions
            .get_mut(session_handle.0)
            .ok_or(Error::ResourceLimitExceeded)?;
        let link = session.remove_link(link_handle)?;
        self.events
            .push_back(Event::LinkFinal(session_handle, link_handle));
        Ok(link)
    }

    /// Builds the BEGIN performative for a locally-allocated session.
    pub fn begin_performative(&self, handle: SessionHandle) -> Result<Begin, Error> {
        let session = self
            .sessions
            .get(handle.0)
            .ok_or(Error::ResourceLimitExceeded)?;
        let remote_channel = session.remote_channel.map(|c| c.0);
        Ok(session.begin_performative(remote_channel))
    }

    /// Applies a BEGIN arriving on `channel`.
    ///
    /// If `channel` is already bound to a locally-allocated session this
    /// completes that session's handshake; otherwise a new peer-initiated
    /// session is allocated.
    pub fn apply_remote_begin(&mut self, channel: u16, begin: Begin) -> Result<SessionHandle, Error> {
        if let Some(remote_channel) = begin.remote_channel {
            let handle = self
                .channel_to_session
                .values()
                .copied()
                .find(|h| {
                    self.sessions
                        .get(h.0)
                        .map(|s| s.local_channel.0 == remote_channel)
                        .unwrap_or(false)
                })
                .ok_or(Error::Connection(ConnectionError::UnboundChannel(channel)))?;
            let session = self
                .sessions
                .get_mut(handle.0)
                .ok_or(Error::ResourceLimitExceeded)?;
            session.apply_remote_begin(IncomingChannel(channel), begin);
            self.channel_to_session.insert(channel, handle);
            self.events.push_back(Event::SessionRemoteOpen(handle));
            Ok(handle)
        } else {
            let handle = SessionHandle(self.sessions.insert(Session::new(
                OutgoingChannel(channel),
                0,
                0,
            )));
            let session = self
                .sessions
                .get_mut(handle.0)
                .expect("just inserted");
            session.apply_remote_begin(IncomingChannel(channel), begin);
            self.channel_to_session.insert(channel, handle);
            self.events.push_back(Event::SessionRemoteOpen(handle));
            Ok(handle)
        }
    }

    /// Resolves an incoming channel number to the session bound to it.
    pub fn session_for_channel(&self, channel: u16) -> Option<SessionHandle> {
        self.channel_to_session.get(&channel).copied()
    }

    /// Looks up a session by handle.
    pub fn session(&self, handle: SessionHandle) -> Option<&Session> {
        self.sessions.get(handle.0)
    }

    /// Looks up a session by handle, mutably.
    pub fn session_mut(&mut self, handle: SessionHandle) -> Option<&mut Session> {
        self.sessions.get_mut(handle.0)
    }

    /// Ends and releases a session, enqueuing [`Event::SessionFinal`].
    pub fn remove_session(&mut self, handle: SessionHandle) {
        if self.sessions.contains(handle.0) {
            self.sessions.remove(handle.0);
            self.channel_to_session.retain(|_, h| *h != handle);
            self.events.push_back(Event::SessionFinal(handle));
        }
    }

    /// Pushes an event onto the collector; used by the session/link layer
    /// and the driver to surface their own transitions through the same
    /// queue.
    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// True if at least one event is queued.
    pub fn has_event(&self) -> bool {
        !self.events.is_empty()
    }

    /// Drains the next queued event, in the order it was produced.
    pub fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Queues a performative the endpoint layer itself produced (a FLOW
    /// echo or a low-water-mark replenishment), for the driver to encode
    /// and send.
    pub fn push_pending_frame(&mut self, channel: u16, body: FrameBody) {
        self.pending_frames.push_back((channel, body));
    }

    /// Drains the next self-produced performative awaiting encode-and-send.
    pub fn next_pending_frame(&mut self) -> Option<(u16, FrameBody)> {
        self.pending_frames.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_enqueues_local_open_event() {
        let mut conn = Connection::new("container-1".into(), 4096, 100);
        conn.open();
        assert!(matches!(conn.next_event(), Some(Event::ConnectionLocalOpen)));
        assert!(!conn.has_event());
    }

    #[test]
    fn remote_open_then_local_close_does_not_emit_final_until_both_closed() {
        let mut conn = Connection::new("container-1".into(), 4096, 100);
        conn.apply_remote_open(conn.open_performative());
        conn.next_event();
        conn.close();
        let events: Vec<_> = std::iter::from_fn(|| conn.next_event()).collect();
        assert!(events
            .iter()
            .all(|e| !matches!(e, Event::ConnectionFinal)));
    }

    #[test]
    fn allocate_session_assigns_distinct_channels() {
        let mut conn = Connection::new("container-1".into(), 4096, 100);
        let a = conn.allocate_session(100, 100);
        let b = conn.allocate_session(100, 100);
        assert_ne!(
            conn.session(a).unwrap().local_channel.0,
            conn.session(b).unwrap().local_channel.0
        );
    }

    #[test]
    fn attach_and_remove_link_emit_local_open_and_final() {
        let mut conn = Connection::new("container-1".into(), 4096, 100);
        let session = conn.allocate_session(100, 100);
        conn.next_event();
        let link = conn.attach_link(session, "l1".into(), Role::Sender).unwrap();
        assert!(matches!(
            conn.next_event(),
            Some(Event::LinkLocalOpen(s, l)) if s == session && l == link
        ));
        conn.remove_link(session, link).unwrap();
        assert!(matches!(
            conn.next_event(),
            Some(Event::LinkFinal(s, l)) if s == session && l == link
        ));
    }

    #[test]
    fn apply_remote_open_clamps_max_frame_size_to_protocol_minimum() {
        let mut conn = Connection::new("container-1".into(), 4096, 100);
        let mut open = conn.open_performative();
        open.max_frame_size = 128;
        conn.apply_remote_open(open);
        assert_eq!(conn.remote_max_frame_size, Some(MIN_MAX_FRAME_SIZE));
    }

    #[test]
    fn apply_remote_open_records_remote_idle_timeout() {
        let mut conn = Connection::new("container-1".into(), 4096, 100);
        let mut open = conn.open_performative();
        open.idle_time_out = Some(30_000);
        conn.apply_remote_open(open);
        assert_eq!(conn.remote_idle_time_out, Some(30_000));
    }
}
