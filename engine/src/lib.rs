#![deny(missing_docs, missing_debug_implementations)]

//! Sans-io drivers that sit between a socket and [`amqp_transport`]: a
//! connection driver speaking AMQP framing (L5), and a raw-connection buffer
//! manager for arbitrary byte traffic (L6). Neither touches a socket or
//! blocks; both expose a give/take buffer discipline the caller drives from
//! its own I/O loop.

pub mod driver;
pub mod error;
pub mod raw;
