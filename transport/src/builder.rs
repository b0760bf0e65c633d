//! Typed builders producing connection/session/link endpoints with sensible
//! AMQP defaults, in place of a serde-driven configuration file.

use amqp_types::definitions::{
    Fields, ReceiverSettleMode, Role, SenderSettleMode, SequenceNo,
};
use amqp_types::messaging::{Source, TargetArchetype};

use crate::endpoint::{Connection, Link, Session};

/// Default negotiated max-frame-size, in bytes.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 32 * 1024;

/// Highest channel number a connection built with [`ConnectionBuilder`] will use.
pub const DEFAULT_CHANNEL_MAX: u16 = 32767;

/// Default incoming/outgoing transfer window, in frames, for a new session.
pub const DEFAULT_WINDOW: SequenceNo = 2048;

/// Builds a [`Connection`] with AMQP-sensible defaults.
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    container_id: String,
    hostname: Option<String>,
    max_frame_size: u32,
    channel_max: u16,
    idle_time_out: Option<u32>,
}

impl ConnectionBuilder {
    /// Starts a builder for the given container id.
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            hostname: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            channel_max: DEFAULT_CHANNEL_MAX,
            idle_time_out: None,
        }
    }

    /// Sets the hostname presented on OPEN.
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Overrides the default max-frame-size.
    pub fn max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Overrides the default channel-max.
    pub fn channel_max(mut self, channel_max: u16) -> Self {
        self.channel_max = channel_max;
        self
    }

    /// Sets the local idle timeout advertised on OPEN, in milliseconds.
    pub fn idle_time_out(mut self, millis: u32) -> Self {
        self.idle_time_out = Some(millis);
        self
    }

    /// Builds the connection endpoint, in its initial unopened state.
    pub fn build(self) -> Connection {
        let mut connection = Connection::new(self.container_id, self.max_frame_size, self.channel_max);
        connection.hostname = self.hostname;
        connection.idle_time_out = self.idle_time_out;
        connection
    }
}

/// Builds a [`Session`] with AMQP-sensible defaults.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    incoming_window: u32,
    outgoing_window: u32,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            incoming_window: DEFAULT_WINDOW,
            outgoing_window: DEFAULT_WINDOW,
        }
    }
}

impl SessionBuilder {
    /// Starts a builder with the default transfer windows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the initial incoming-window.
    pub fn incoming_window(mut self, window: u32) -> Self {
        self.incoming_window = window;
        self
    }

    /// Overrides the initial outgoing-window.
    pub fn outgoing_window(mut self, window: u32) -> Self {
        self.outgoing_window = window;
        self
    }

    /// Builds the session endpoint. The caller is responsible for attaching
    /// it to a connection via [`Connection::allocate_session`].
    pub fn build(self) -> Session {
        Session::new(
            crate::endpoint::OutgoingChannel(0),
            self.incoming_window,
            self.outgoing_window,
        )
    }
}

/// Builds a [`Link`] with AMQP-sensible defaults.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    name: String,
    role: Role,
    snd_settle_mode: SenderSettleMode,
    rcv_settle_mode: ReceiverSettleMode,
    source: Option<Source>,
    target: Option<TargetArchetype>,
    max_message_size: Option<u64>,
    properties: Option<Fields>,
}

impl LinkBuilder {
    /// Starts a builder for a link with the given name and role.
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
            snd_settle_mode: SenderSettleMode::Mixed,
            rcv_settle_mode: ReceiverSettleMode::First,
            source: None,
            target: None,
            max_message_size: None,
            properties: None,
        }
    }

    /// Sets the source terminus.
    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the target terminus.
    pub fn target(mut self, target: impl Into<TargetArchetype>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Overrides the negotiated sender settlement mode.
    pub fn snd_settle_mode(mut self, mode: SenderSettleMode) -> Self {
        self.snd_settle_mode = mode;
        self
    }

    /// Overrides the negotiated receiver settlement mode.
    pub fn rcv_settle_mode(mut self, mode: ReceiverSettleMode) -> Self {
        self.rcv_settle_mode = mode;
        self
    }

    /// Caps the size, in bytes, of a message this link will transfer.
    pub fn max_message_size(mut self, size: u64) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// Attaches link state properties to exchange on ATTACH.
    pub fn properties(mut self, properties: Fields) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Builds the link endpoint. The caller is responsible for attaching it
    /// to a session via [`Session::allocate_link`] and assigning a handle.
    pub fn build(self) -> Link {
        let mut link = Link::new(self.name, self.role);
        link.snd_settle_mode = self.snd_settle_mode;
        link.rcv_settle_mode = self.rcv_settle_mode;
        link.source = self.source;
        link.target = self.target;
        link.max_message_size = self.max_message_size;
        link.properties = self.properties;
        link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_builder_applies_defaults() {
        let connection = ConnectionBuilder::new("container-1").build();
        assert_eq!(connection.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(connection.channel_max, DEFAULT_CHANNEL_MAX);
    }

    #[test]
    fn session_builder_applies_default_window() {
        let session = SessionBuilder::new().build();
        assert_eq!(session.incoming_window, DEFAULT_WINDOW);
        assert_eq!(session.outgoing_window, DEFAULT_WINDOW);
    }

    #[test]
    fn link_builder_sets_role_and_settle_modes() {
        let link = LinkBuilder::new("l1", Role::Sender)
            .snd_settle_mode(SenderSettleMode::Settled)
            .build();
        assert_eq!(link.role, Role::Sender);
        assert_eq!(link.snd_settle_mode, SenderSettleMode::Settled);
    }
}
