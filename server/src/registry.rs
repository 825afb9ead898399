//! Session room registry for the walk-tracking broker
//!
//! This module owns the server-side mapping between connections and sessions:
//! - Participant lifecycle (register, join, leave, timeout)
//! - Room membership keyed by externally issued session identifiers
//! - Fan-out target resolution for room-scoped and process-wide broadcasts
//! - Room-wide forced disconnect when a tracked activity ends
//!
//! The registry is a plain data structure; the network layer wraps it in an
//! `Arc<RwLock>` so every mutation is serialized behind one boundary. It never
//! touches a socket: callers resolve targets here and do the sending.

use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client and the session it joined with
///
/// Each participant holds its connection identity, the network address used
/// for responses, the session it belongs to (at most one), and the last time
/// any packet arrived from it.
#[derive(Debug)]
pub struct Participant {
    /// Unique connection identifier assigned by the registry
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Session joined at connect time; None for session-less connections
    pub session_id: Option<String>,
    /// Last time we received any packet from this connection
    pub last_seen: Instant,
}

impl Participant {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            session_id: None,
            last_seen: Instant::now(),
        }
    }

    /// Returns true if no packets have arrived within the timeout window.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Maps sessions to their connected participants
///
/// Rooms are created implicitly when the first participant joins and removed
/// when the last one leaves; an empty entry never outlives its members. All
/// disconnect paths (explicit leave, timeout, forced room teardown) converge
/// on [`RoomRegistry::remove`], so cleanup behaves identically regardless of
/// how a connection went away.
pub struct RoomRegistry {
    /// Connected participants indexed by connection id
    participants: HashMap<u32, Participant>,
    /// Room membership: session id -> connection ids
    rooms: HashMap<String, HashSet<u32>>,
    /// Next available connection id
    next_connection_id: u32,
    /// Maximum number of concurrent connections allowed
    max_participants: usize,
}

impl RoomRegistry {
    pub fn new(max_participants: usize) -> Self {
        Self {
            participants: HashMap::new(),
            rooms: HashMap::new(),
            next_connection_id: 1,
            max_participants,
        }
    }

    /// Registers a new connection
    ///
    /// Returns Some(connection_id) on success, None when the broker is at
    /// capacity. The connection starts session-less; `join` attaches it to a
    /// room.
    pub fn register(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.participants.len() >= self.max_participants {
            return None;
        }

        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;

        info!("Connection {} registered from {}", connection_id, addr);
        self.participants
            .insert(connection_id, Participant::new(connection_id, addr));

        Some(connection_id)
    }

    /// Attaches a connection to a session room
    ///
    /// Silently does nothing when the session identifier is empty, the
    /// connection is unknown, or the connection already sits in a room.
    /// A connection may operate without a session and holds at most one.
    pub fn join(&mut self, connection_id: u32, session_id: &str) {
        if session_id.is_empty() {
            return;
        }

        let Some(participant) = self.participants.get_mut(&connection_id) else {
            return;
        };
        if participant.session_id.is_some() {
            debug!(
                "Connection {} already in a session, ignoring join to {}",
                connection_id, session_id
            );
            return;
        }

        participant.session_id = Some(session_id.to_string());
        self.rooms
            .entry(session_id.to_string())
            .or_default()
            .insert(connection_id);
        info!("Connection {} joined room {}", connection_id, session_id);
    }

    /// Detaches a connection from whatever session it was in
    ///
    /// Idempotent: leaving twice, or leaving while session-less, is a no-op.
    /// The room entry is pruned once its last member is gone.
    pub fn leave(&mut self, connection_id: u32) {
        let Some(participant) = self.participants.get_mut(&connection_id) else {
            return;
        };
        let Some(session_id) = participant.session_id.take() else {
            return;
        };

        if let Some(members) = self.rooms.get_mut(&session_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                self.rooms.remove(&session_id);
            }
        }
        info!("Connection {} left room {}", connection_id, session_id);
    }

    /// Removes a connection entirely
    ///
    /// Leaves its room first, then drops the participant. Returns true if the
    /// connection was known. Every disconnect path funnels through here.
    pub fn remove(&mut self, connection_id: u32) -> bool {
        self.leave(connection_id);
        if let Some(participant) = self.participants.remove(&connection_id) {
            info!("Connection {} removed", participant.id);
            true
        } else {
            false
        }
    }

    /// Finds a connection id by its network address
    ///
    /// Used to associate incoming datagrams with registered connections.
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.participants
            .iter()
            .find(|(_, participant)| participant.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Marks a connection as alive; called for every packet it sends.
    pub fn refresh(&mut self, connection_id: u32) {
        if let Some(participant) = self.participants.get_mut(&connection_id) {
            participant.last_seen = Instant::now();
        }
    }

    /// Returns the session a connection belongs to, if any.
    pub fn session_of(&self, connection_id: u32) -> Option<String> {
        self.participants
            .get(&connection_id)
            .and_then(|participant| participant.session_id.clone())
    }

    /// Resolves fan-out targets for one session room
    ///
    /// Returns every member's (id, addr) except the excluded connection.
    /// Unknown or empty sessions resolve to an empty list; broadcasting to
    /// them is a silent no-op, not an error.
    pub fn room_members(
        &self,
        session_id: &str,
        exclude: Option<u32>,
    ) -> Vec<(u32, SocketAddr)> {
        let Some(members) = self.rooms.get(session_id) else {
            return Vec::new();
        };

        members
            .iter()
            .filter(|id| Some(**id) != exclude)
            .filter_map(|id| {
                self.participants
                    .get(id)
                    .map(|participant| (*id, participant.addr))
            })
            .collect()
    }

    /// Resolves fan-out targets across every connection, room or not.
    pub fn broadcast_targets(&self, exclude: Option<u32>) -> Vec<(u32, SocketAddr)> {
        self.participants
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .map(|(id, participant)| (*id, participant.addr))
            .collect()
    }

    /// Tears down an entire room
    ///
    /// Removes every member (the triggering sender included) and the room
    /// entry itself, returning the drained (id, addr) list so the caller can
    /// notify each terminated connection. Unknown rooms drain to nothing.
    pub fn force_disconnect_room(&mut self, session_id: &str) -> Vec<(u32, SocketAddr)> {
        let Some(members) = self.rooms.remove(session_id) else {
            return Vec::new();
        };

        let mut drained = Vec::with_capacity(members.len());
        for connection_id in members {
            if let Some(participant) = self.participants.remove(&connection_id) {
                drained.push((connection_id, participant.addr));
            }
        }
        info!(
            "Room {} force-disconnected ({} connections)",
            session_id,
            drained.len()
        );
        drained
    }

    /// Checks for and removes timed-out connections
    ///
    /// Dropped transports are indistinguishable from graceful leaves here:
    /// both converge on `remove`. Returns the ids that were swept.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .participants
            .iter()
            .filter(|(_, participant)| participant.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for connection_id in &timed_out {
            info!("Connection {} timed out", connection_id);
            self.remove(*connection_id);
        }

        timed_out
    }

    /// Returns the number of currently registered connections
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Returns true if no connections are registered
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Returns the number of live rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
