//! Real-time event distribution client for the Botdeck dashboard.
//!
//! Owns one long-lived WebSocket connection to the event server using
//! `tokio-tungstenite` and fans server-pushed events out to registered
//! subscribers. Handles bounded auto-reconnect, per-project room
//! membership (re-announced after every reconnect), and per-handler
//! failure isolation during dispatch.

pub mod catalog;
mod client;
mod connection;
mod registry;
mod types;

pub use catalog::EventKind;
pub use client::RealtimeClient;
pub use registry::{Handler, HandlerRegistry};
pub use types::{ConnectionState, RealtimeConfig, WireMessage};
