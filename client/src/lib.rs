//! # Walk Tracking Client Library
//!
//! This library provides the complete client-side implementation for live
//! walk-tracking sessions. It handles position sampling, signal conditioning,
//! the replicated walk timer, path accumulation, and communication with the
//! session broker.
//!
//! ## Architecture Overview
//!
//! The client is built around one role-driven event loop. Every component is
//! role-agnostic; the chosen role only decides which event streams the loop
//! drives:
//!
//! ### Walker
//! Samples a position source, conditions the raw stream (throttle plus
//! trailing-mean smoothing), transmits the surviving samples, and owns the
//! session's walk timer from start to terminal end.
//!
//! ### Observer
//! Accumulates relayed position samples into the session path, keeps the map
//! view honest (fit once, never fight the user's pan), and mirrors the walk
//! timer by overwriting its replica with each received update.
//!
//! ## Module Organization
//!
//! ### Conditioner Module (`conditioner`)
//! The two-stage pipeline between raw fixes and the wire:
//! - Throttle that drops samples arriving faster than the minimum interval
//! - Trailing-window arithmetic mean over accepted samples
//! - Emits from the very first sample; partial windows average as-is
//!
//! ### Location Module (`location`)
//! Position sources and their lifecycle:
//! - `LocationSource` seam with a seedable simulated walk behind it
//! - One-shot initial fix with a default-coordinate fallback
//! - The watch task that samples at a fixed cadence and stops deterministically
//!
//! ### Timer Module (`timer`)
//! Both halves of the replicated walk timer:
//! - The authority recomputing elapsed time from its captured start instant
//! - The replica applying received updates last-write-wins
//! - Terminality: an ended walk can never restart
//!
//! ### Track Module (`track`)
//! What the session leaves behind:
//! - Append-only path in arrival order
//! - Bounds recomputed over the full path per sample
//! - The auto-center latch that fits the view exactly once
//!
//! ### Network Module (`network`)
//! Manages all client-broker communication:
//! - UDP socket management and bounded-retry connection establishment
//! - Packet serialization and deserialization
//! - The select loop wiring fixes, ticks, heartbeats and received events
//! - Graceful teardown when the walk ends or the user interrupts
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use client::network::{Client, ClientConfig, Role};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig {
//!         server_addr: "127.0.0.1:8080".to_string(),
//!         session_id: Some("board-42".to_string()),
//!         role: Role::Walker,
//!         walk_duration: Duration::from_secs(60),
//!         sample_interval: Duration::from_millis(1000),
//!         announce: Some("heading out".to_string()),
//!         seed: None,
//!     };
//!
//!     // Connect, walk for a minute, end the walk and let the broker tear
//!     // the room down
//!     let mut client = Client::new(config).await?;
//!     client.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Design Philosophy
//!
//! ### The Wire Is Not the Sensor
//! Raw fixes are plentiful, noisy and cheap; transmitted samples are rare and
//! already smoothed. Everything downstream (the path, the view, the other
//! side of the session) only ever sees the conditioned stream.
//!
//! ### State Flows One Way
//! The walk timer has exactly one writer per session. Replicas never argue
//! with the authority; they overwrite and move on, with terminality as the
//! single guarded transition.
//!
//! ### Graceful Degradation
//! Lost datagrams are absorbed: the next location sample supersedes the
//! missing one and every timer update carries the full replicated state.
//! A dead position source logs locally and never leaks across the network.

pub mod conditioner;
pub mod location;
pub mod network;
pub mod timer;
pub mod track;
