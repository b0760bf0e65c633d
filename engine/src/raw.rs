//! The raw-connection buffer manager (L6): the same give/take buffer
//! discipline as the connection driver, but for arbitrary byte traffic with
//! no AMQP framing, so the same proactor loop can pump non-AMQP sockets.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Error;

/// Default number of outstanding read or write buffers a [`RawConnection`]
/// will hold before refusing more.
pub const DEFAULT_BUFFER_CAPACITY: usize = 16;

/// The lifecycle of one buffer slot.
///
/// Read-direction slots move `Unused -> Read -> (removed)`; write-direction
/// slots move `Unwritten -> Written -> (removed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Unused,
    Read,
    Unwritten,
    Written,
}

#[derive(Debug)]
struct Slot {
    buffer: Vec<u8>,
    filled: usize,
    state: SlotState,
}

/// Events produced by a [`RawConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    /// One or more read buffers were filled and are ready for [`RawConnection::take_read_buffers`].
    BuffersRead,
    /// One or more write buffers were fully written and are ready for [`RawConnection::take_written_buffers`].
    BuffersWritten,
    /// No unused read buffers remain; call [`RawConnection::give_read_buffers`].
    NeedReadBuffers,
    /// The outbound write queue has drained; call [`RawConnection::write_buffers`].
    NeedWriteBuffers,
    /// [`RawConnection::close_read`] has taken effect.
    ClosedRead,
    /// [`RawConnection::close_write`] has taken effect.
    ClosedWrite,
    /// Both directions are closed and every buffer has been returned to the
    /// application; the connection is eligible for deallocation.
    Disconnected,
    /// [`RawConnection::waker`] was woken from another thread.
    Wake,
}

/// A thread-safe, idempotent-coalescing handle that can request the event
/// loop to re-poll this connection from another thread.
#[derive(Debug, Clone)]
pub struct RawConnectionWaker {
    flag: Arc<AtomicBool>,
}

impl RawConnectionWaker {
    /// Requests a wake-up. Multiple calls before the resulting
    /// [`RawEvent::Wake`] is drained collapse into a single event.
    pub fn wake(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Manages read/write buffer ownership for one raw (non-AMQP) connection.
#[derive(Debug)]
pub struct RawConnection {
    read_capacity: usize,
    write_capacity: usize,
    read_slots: VecDeque<Slot>,
    write_slots: VecDeque<Slot>,
    need_read_buffers_armed: bool,
    need_write_buffers_armed: bool,
    read_closed: bool,
    write_closed: bool,
    disconnected: bool,
    wake_flag: Arc<AtomicBool>,
    events: VecDeque<RawEvent>,
}

impl Default for RawConnection {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY, DEFAULT_BUFFER_CAPACITY)
    }
}

impl RawConnection {
    /// Creates a raw connection with the given read/write buffer capacities.
    pub fn new(read_capacity: usize, write_capacity: usize) -> Self {
        Self {
            read_capacity,
            write_capacity,
            read_slots: VecDeque::new(),
            write_slots: VecDeque::new(),
            need_read_buffers_armed: false,
            need_write_buffers_armed: false,
            read_closed: false,
            write_closed: false,
            disconnected: false,
            wake_flag: Arc::new(AtomicBool::new(false)),
            events: VecDeque::new(),
        }
    }

    /// A cloneable, thread-safe handle that can wake this connection's event
    /// loop from another thread.
    pub fn waker(&self) -> RawConnectionWaker {
        RawConnectionWaker {
            flag: self.wake_flag.clone(),
        }
    }

    /// Gives the engine ownership of `buffers` to fill on the read side.
    pub fn give_read_buffers(&mut self, buffers: Vec<Vec<u8>>) -> Result<(), Error> {
        if self.read_closed {
            return Err(Error::AlreadyClosed);
        }
        for buffer in buffers {
            if self.read_slots.len() >= self.read_capacity {
                return Err(Error::ResourceLimitExceeded);
            }
            self.read_slots.push_back(Slot {
                buffer,
                filled: 0,
                state: SlotState::Unused,
            });
        }
        self.need_read_buffers_armed = false;
        Ok(())
    }

    /// Fills the earliest unused read buffer with as much of `data` as it
    /// holds, returning the number of bytes consumed. Returns `0` and arms
    /// [`RawEvent::NeedReadBuffers`] (once) if no unused buffer is available.
    pub fn fill_read(&mut self, data: &[u8]) -> usize {
        if self.read_closed || data.is_empty() {
            return 0;
        }
        let slot = match self
            .read_slots
            .iter_mut()
            .find(|slot| slot.state == SlotState::Unused)
        {
            Some(slot) => slot,
            None => {
                self.arm_need_read_buffers();
                return 0;
            }
        };
        let n = data.len().min(slot.buffer.len());
        slot.buffer[..n].copy_from_slice(&data[..n]);
        slot.filled = n;
        slot.state = SlotState::Read;
        self.events.push_back(RawEvent::BuffersRead);
        n
    }

    /// Returns ownership of every filled read buffer back to the
    /// application, along with how many bytes each holds.
    pub fn take_read_buffers(&mut self) -> Vec<(Vec<u8>, usize)> {
        let mut taken = Vec::new();
        let mut remaining = VecDeque::new();
        while let Some(slot) = self.read_slots.pop_front() {
            if slot.state == SlotState::Read {
                taken.push((slot.buffer, slot.filled));
            } else {
                remaining.push_back(slot);
            }
        }
        self.read_slots = remaining;
        taken
    }

    /// Enqueues `buffers` to be written out, in order.
    pub fn write_buffers(&mut self, buffers: Vec<Vec<u8>>) -> Result<(), Error> {
        if self.write_closed {
            return Err(Error::AlreadyClosed);
        }
        for buffer in buffers {
            if self.write_slots.len() >= self.write_capacity {
                return Err(Error::ResourceLimitExceeded);
            }
            let len = buffer.len();
            self.write_slots.push_back(Slot {
                buffer,
                filled: len,
                state: SlotState::Unwritten,
            });
        }
        self.need_write_buffers_armed = false;
        Ok(())
    }

    /// Drains up to `cap` bytes from the earliest unwritten buffers into the
    /// caller's socket-write path, marking fully-drained buffers `Written`.
    /// Returns the bytes actually produced.
    pub fn drain_write(&mut self, out: &mut Vec<u8>, cap: usize) -> usize {
        let mut produced = 0;
        for slot in self.write_slots.iter_mut() {
            if slot.state != SlotState::Unwritten {
                continue;
            }
            if produced >= cap {
                break;
            }
            let take = slot.filled.min(cap - produced);
            out.extend_from_slice(&slot.buffer[..take]);
            produced += take;
            if take == slot.filled {
                slot.state = SlotState::Written;
            } else {
                slot.buffer.drain(..take);
                slot.filled -= take;
            }
        }
        if produced > 0 && self.write_slots.iter().any(|s| s.state == SlotState::Written) {
            self.events.push_back(RawEvent::BuffersWritten);
        }
        if self.write_slots.iter().all(|s| s.state == SlotState::Written) && !self.write_slots.is_empty()
        {
            self.arm_need_write_buffers();
        }
        produced
    }

    /// Returns ownership of every fully-written buffer back to the
    /// application.
    pub fn take_written_buffers(&mut self) -> Vec<Vec<u8>> {
        let mut taken = Vec::new();
        let mut remaining = VecDeque::new();
        while let Some(slot) = self.write_slots.pop_front() {
            if slot.state == SlotState::Written {
                taken.push(slot.buffer);
            } else {
                remaining.push_back(slot);
            }
        }
        self.write_slots = remaining;
        taken
    }

    fn arm_need_read_buffers(&mut self) {
        if !self.need_read_buffers_armed {
            tracing::trace!("out of unused read buffers");
            self.need_read_buffers_armed = true;
            self.events.push_back(RawEvent::NeedReadBuffers);
        }
    }

    fn arm_need_write_buffers(&mut self) {
        if !self.need_write_buffers_armed {
            self.need_write_buffers_armed = true;
            self.events.push_back(RawEvent::NeedWriteBuffers);
        }
    }

    /// Idempotently closes the read half. Forces the return of any
    /// still-owned unused read buffers (as zero-filled) so the application
    /// is never left holding nothing while the engine sits on its buffers.
    pub fn close_read(&mut self) {
        if self.read_closed {
            return;
        }
        self.read_closed = true;
        for slot in self.read_slots.iter_mut() {
            if slot.state == SlotState::Unused {
                slot.filled = 0;
                slot.state = SlotState::Read;
            }
        }
        self.events.push_back(RawEvent::ClosedRead);
        self.maybe_disconnect();
    }

    /// Idempotently closes the write half. Forces the return of any
    /// still-owned unwritten buffers, marking them written with whatever
    /// they had already drained.
    pub fn close_write(&mut self) {
        if self.write_closed {
            return;
        }
        self.write_closed = true;
        for slot in self.write_slots.iter_mut() {
            if slot.state == SlotState::Unwritten {
                slot.state = SlotState::Written;
            }
        }
        self.events.push_back(RawEvent::ClosedWrite);
        self.maybe_disconnect();
    }

    fn maybe_disconnect(&mut self) {
        if self.disconnected || !self.read_closed || !self.write_closed {
            return;
        }
        let all_returned = self
            .read_slots
            .iter()
            .all(|s| s.state == SlotState::Read)
            && self.write_slots.iter().all(|s| s.state == SlotState::Written);
        if all_returned {
            self.disconnected = true;
            self.events.push_back(RawEvent::Disconnected);
        }
    }

    /// True once [`RawEvent::Disconnected`] has been produced.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// True if at least one event is queued, including a pending wake.
    pub fn has_event(&self) -> bool {
        !self.events.is_empty() || self.wake_flag.load(Ordering::SeqCst)
    }

    /// Drains the next queued event. A pending wake is reported only once
    /// the non-wake queue is empty, and clears the flag when reported.
    pub fn next_event(&mut self) -> Option<RawEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if self.wake_flag.swap(false, Ordering::SeqCst) {
            return Some(RawEvent::Wake);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_read_without_buffers_arms_need_read_once() {
        let mut conn = RawConnection::new(2, 2);
        assert_eq!(conn.fill_read(b"hello"), 0);
        assert_eq!(conn.fill_read(b"again"), 0);
        let events: Vec<_> = std::iter::from_fn(|| conn.next_event()).collect();
        assert_eq!(events, vec![RawEvent::NeedReadBuffers]);
    }

    #[test]
    fn give_fill_take_round_trips_bytes() {
        let mut conn = RawConnection::new(2, 2);
        conn.give_read_buffers(vec![vec![0u8; 4]]).unwrap();
        assert_eq!(conn.fill_read(b"hiya"), 4);
        assert!(matches!(conn.next_event(), Some(RawEvent::BuffersRead)));
        let taken = conn.take_read_buffers();
        assert_eq!(taken, vec![(b"hiya".to_vec(), 4)]);
    }

    #[test]
    fn give_read_buffers_beyond_capacity_errs() {
        let mut conn = RawConnection::new(1, 1);
        conn.give_read_buffers(vec![vec![0u8; 4]]).unwrap();
        assert!(matches!(
            conn.give_read_buffers(vec![vec![0u8; 4]]),
            Err(Error::ResourceLimitExceeded)
        ));
    }

    #[test]
    fn write_drain_and_reclaim() {
        let mut conn = RawConnection::new(2, 2);
        conn.write_buffers(vec![b"abcdef".to_vec()]).unwrap();
        let mut out = Vec::new();
        let n = conn.drain_write(&mut out, 100);
        assert_eq!(n, 6);
        assert_eq!(out, b"abcdef");
        assert!(matches!(conn.next_event(), Some(RawEvent::BuffersWritten)));
        let reclaimed = conn.take_written_buffers();
        assert_eq!(reclaimed, vec![b"abcdef".to_vec()]);
    }

    #[test]
    fn wake_is_idempotent_before_drain() {
        let conn = RawConnection::new(1, 1);
        let waker = conn.waker();
        waker.wake();
        waker.wake();
        waker.wake();
        let mut conn = conn;
        assert!(matches!(conn.next_event(), Some(RawEvent::Wake)));
        assert!(conn.next_event().is_none());
    }

    #[test]
    fn disconnect_only_fires_once_both_closed_and_buffers_returned() {
        let mut conn = RawConnection::new(2, 2);
        conn.give_read_buffers(vec![vec![0u8; 4]]).unwrap();
        conn.close_read();
        conn.close_write();
        let events: Vec<_> = std::iter::from_fn(|| conn.next_event()).collect();
        assert!(events.contains(&RawEvent::Disconnected));
        assert!(conn.is_disconnected());
    }
}
