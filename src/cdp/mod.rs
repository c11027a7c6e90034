//! Minimal Chrome DevTools Protocol client
//!
//! A hand-rolled WebSocket transport, typed structs for the commands this
//! crate actually sends, and the connection/session layer on top.

pub mod connection;
pub mod transport;
pub mod types;

pub use connection::{Connection, Session};
pub use transport::Transport;
