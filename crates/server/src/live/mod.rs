//! Realtime progress channel.

pub mod hub;

pub use hub::{BroadcastHub, ClientConnection, ClientId};
