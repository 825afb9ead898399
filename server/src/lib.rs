//! # Walk Session Broker Library
//!
//! This library provides the relay server for live walk-tracking sessions.
//! It groups connections into session rooms, fans relayed events out to the
//! right receivers, and coordinates the teardown of a room when the walk it
//! hosts ends.
//!
//! ## Core Responsibilities
//!
//! ### Session Rooms
//! Every connection may attach itself to one session room at connect time.
//! Rooms are created implicitly by the first member and removed with the
//! last one, so the broker needs no out-of-band room administration.
//!
//! ### Event Routing
//! Location and timer events are relayed to the other members of the
//! sender's room, never back to the sender itself. Generic text messages
//! are broadcast process-wide by default, or kept inside the sender's room
//! when the broker runs in scoped-message mode.
//!
//! ### Coordinated Teardown
//! A terminal timer update (the walk has ended) first reaches every replica
//! in the room, then every member of the room is disconnected and the room
//! itself disappears. The ordering is guaranteed by resolving receivers and
//! draining the room under one registry lock and queueing the outgoing
//! packets on a single FIFO channel.
//!
//! ## Architecture Design
//!
//! ### Single Routing Loop
//! All inbound packets funnel through one event loop that owns every
//! routing decision. Room mutations happen behind a single registry lock,
//! which keeps join/leave/relay interleavings serial without per-room
//! locking machinery.
//!
//! ### UDP-Based Communication
//! Uses UDP sockets for low-latency delivery. Relayed events are
//! best-effort: a lost location sample is superseded by the next one, and
//! the timer protocol is self-healing because every update carries the
//! full replicated state.
//!
//! ### Payload-Agnostic Relay
//! The broker validates packet shape at the boundary (malformed datagrams
//! are logged and dropped) but never interprets relayed payloads. Clients
//! own the meaning of what they exchange.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Owns connection and room state:
//! - Connection registration and id assignment
//! - Room membership and fan-out target resolution
//! - Forced room teardown
//! - Timeout detection and cleanup
//!
//! ### Network Module (`network`)
//! Handles all networking operations and routing:
//! - UDP socket management and packet processing
//! - Message serialization and deserialization
//! - Connection establishment and termination
//! - Per-packet routing decisions
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bind the broker with room for 64 connections, using the default
//!     // process-wide scope for generic messages
//!     let mut server = Server::new("127.0.0.1:8080", 64, false).await?;
//!
//!     // Run the routing loop - this:
//!     // - Accepts connections and room joins
//!     // - Relays location and timer events to room members
//!     // - Broadcasts generic messages
//!     // - Tears rooms down when their walk ends
//!     // - Sweeps out silent connections
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The broker uses an event-driven architecture with internal async tasks that handle:
//! - **Network Receiver**: Continuously listens for incoming packets
//! - **Network Sender**: Drains the outgoing relay queue in order
//! - **Timeout Checker**: Monitors connection health and removes silent ones
//! - **Main Routing Loop**: Applies registry mutations and routing decisions
//!
//! ## Operational Notes
//!
//! ### Delivery Semantics
//! Relayed events are delivered at most once. There is no retransmission,
//! no acknowledgement, and no backfill of events missed while disconnected;
//! a reconnecting client resumes from the next live event.
//!
//! ### Reconnection
//! A new `Connect` from an address that is already registered replaces the
//! old registration with a fresh connection id. Session state accumulated
//! under the old id is not carried over.
//!
//! ### Capacity
//! The registry enforces a connection ceiling. Connections beyond it are
//! refused with an explicit reason rather than silently dropped.

pub mod network;
pub mod registry;
