//! Broker network layer handling UDP communications and event routing

use crate::registry::RoomRegistry;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, CLIENT_TIMEOUT};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// How often the sweep task looks for silent connections
const TIMEOUT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
/// How often the main loop reports registry occupancy at debug level
const STATS_INTERVAL: Duration = Duration::from_secs(30);

/// Reason sent to every room member when the walk owner ends the session
const TEARDOWN_REASON: &str = "walk ended";
/// Reason sent to a connection refused at capacity
const CAPACITY_REASON: &str = "Server full";

/// Messages sent from network tasks to the main router loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        connection_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the router to the outbound sender task
///
/// Fan-out targets are resolved while the registry lock is held, so a target
/// list is a snapshot of the room at routing time. The channel is FIFO, which
/// is what guarantees a relayed terminal timer update reaches replicas before
/// the teardown notices queued right after it.
#[derive(Debug)]
pub enum RelayMessage {
    Send {
        packet: Packet,
        addr: SocketAddr,
    },
    Fanout {
        packet: Packet,
        targets: Vec<(u32, SocketAddr)>,
    },
}

/// Main broker coordinating connection lifecycle and event fan-out
///
/// Relayed payloads pass through untouched; the broker only inspects packet
/// type and the sender's room membership to decide who receives what.
pub struct Server {
    socket: Arc<UdpSocket>,
    registry: Arc<RwLock<RoomRegistry>>,
    scoped_messages: bool,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    relay_tx: mpsc::UnboundedSender<RelayMessage>,
    relay_rx: mpsc::UnboundedReceiver<RelayMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_participants: usize,
        scoped_messages: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Broker listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            registry: Arc::new(RwLock::new(RoomRegistry::new(max_participants))),
            scoped_messages,
            server_tx,
            server_rx,
            relay_tx,
            relay_rx,
        })
    }

    /// The address the broker actually bound, useful when binding port 0
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that drains the outgoing relay queue in order
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut relay_rx = std::mem::replace(&mut self.relay_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = relay_rx.recv().await {
                match message {
                    RelayMessage::Send { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    RelayMessage::Fanout { packet, targets } => {
                        for (connection_id, addr) in targets {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!(
                                    "Failed to relay packet to connection {} at {}: {}",
                                    connection_id, addr, e
                                );
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that periodically sweeps out silent connections
    async fn spawn_timeout_checker(&self) {
        let registry = Arc::clone(&self.registry);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut sweep_interval = interval(TIMEOUT_SWEEP_INTERVAL);

            loop {
                sweep_interval.tick().await;

                let timed_out = {
                    let mut registry_guard = registry.write().await;
                    registry_guard.check_timeouts(CLIENT_TIMEOUT)
                };

                for connection_id in timed_out {
                    if let Err(e) =
                        server_tx.send(ServerMessage::ClientTimeout { connection_id })
                    {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Queues a packet for one receiver
    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        let message = RelayMessage::Send {
            packet: packet.clone(),
            addr,
        };
        if let Err(e) = self.relay_tx.send(message) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Queues a packet for a resolved target list; empty lists are a no-op
    async fn fanout_packet(&self, packet: &Packet, targets: Vec<(u32, SocketAddr)>) {
        if targets.is_empty() {
            return;
        }
        let message = RelayMessage::Fanout {
            packet: packet.clone(),
            targets,
        };
        if let Err(e) = self.relay_tx.send(message) {
            error!("Failed to queue fan-out: {}", e);
        }
    }

    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                session_id,
            } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                let mut registry = self.registry.write().await;

                // A reconnecting transport registers fresh; drop the stale entry
                if let Some(existing) = registry.find_by_addr(addr) {
                    info!("Removing existing connection {} from {}", existing, addr);
                    registry.remove(existing);
                }

                match registry.register(addr) {
                    Some(connection_id) => {
                        if let Some(session) = session_id.as_deref() {
                            registry.join(connection_id, session);
                        }
                        drop(registry);

                        self.send_packet(&Packet::Connected { connection_id }, addr)
                            .await;
                    }
                    None => {
                        drop(registry);
                        warn!("Rejecting connection from {}: at capacity", addr);
                        self.send_packet(
                            &Packet::Disconnected {
                                reason: CAPACITY_REASON.to_string(),
                            },
                            addr,
                        )
                        .await;
                    }
                }
            }

            Packet::Heartbeat { timestamp: _ } => {
                let mut registry = self.registry.write().await;
                if let Some(connection_id) = registry.find_by_addr(addr) {
                    registry.refresh(connection_id);
                }
            }

            Packet::Message { body } => {
                let targets = {
                    let mut registry = self.registry.write().await;
                    let Some(sender) = registry.find_by_addr(addr) else {
                        warn!("Message from unregistered address {}", addr);
                        return;
                    };
                    registry.refresh(sender);

                    if self.scoped_messages {
                        // Scoped mode keeps chatter inside the sender's room;
                        // a session-less sender reaches nobody
                        match registry.session_of(sender) {
                            Some(session) => registry.room_members(&session, Some(sender)),
                            None => Vec::new(),
                        }
                    } else {
                        registry.broadcast_targets(Some(sender))
                    }
                };

                debug!("Relaying message to {} receivers", targets.len());
                self.fanout_packet(&Packet::Message { body }, targets)
                    .await;
            }

            Packet::LocationUpdate {
                latitude,
                longitude,
            } => {
                // Requires a session; ignored without one
                let targets = {
                    let mut registry = self.registry.write().await;
                    let Some(sender) = registry.find_by_addr(addr) else {
                        return;
                    };
                    registry.refresh(sender);

                    let Some(session) = registry.session_of(sender) else {
                        return;
                    };
                    registry.room_members(&session, Some(sender))
                };

                debug!(
                    "Relaying location ({:.5}, {:.5}) to {} receivers",
                    latitude,
                    longitude,
                    targets.len()
                );
                self.fanout_packet(
                    &Packet::LocationUpdate {
                        latitude,
                        longitude,
                    },
                    targets,
                )
                .await;
            }

            Packet::TimerUpdate {
                is_walking,
                elapsed_seconds,
                has_ended,
            } => {
                // On a terminal update the room is drained under the same
                // lock that resolved the relay targets, so no member joins
                // or leaves between the two
                let (targets, drained, session) = {
                    let mut registry = self.registry.write().await;
                    let Some(sender) = registry.find_by_addr(addr) else {
                        return;
                    };
                    registry.refresh(sender);

                    let Some(session) = registry.session_of(sender) else {
                        return;
                    };
                    let targets = registry.room_members(&session, Some(sender));
                    let drained = if has_ended {
                        registry.force_disconnect_room(&session)
                    } else {
                        Vec::new()
                    };
                    (targets, drained, session)
                };

                // Replicas must see the final timer state before any teardown
                // notice, so the relay is queued first
                self.fanout_packet(
                    &Packet::TimerUpdate {
                        is_walking,
                        elapsed_seconds,
                        has_ended,
                    },
                    targets,
                )
                .await;

                if has_ended {
                    info!(
                        "Walk ended in room {} at {}s, disconnecting {} connections",
                        session,
                        elapsed_seconds,
                        drained.len()
                    );
                    let notice = Packet::Disconnected {
                        reason: TEARDOWN_REASON.to_string(),
                    };
                    for (connection_id, target_addr) in drained {
                        debug!(
                            "Disconnecting connection {} at {}",
                            connection_id, target_addr
                        );
                        self.send_packet(&notice, target_addr).await;
                    }
                }
            }

            Packet::Leave => {
                let mut registry = self.registry.write().await;
                if let Some(connection_id) = registry.find_by_addr(addr) {
                    info!("Connection {} leaving", connection_id);
                    registry.remove(connection_id);
                }
            }

            Packet::Connected { .. } | Packet::Disconnected { .. } => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut stats_interval = interval(STATS_INTERVAL);
        // Skip the first tick since it fires immediately
        stats_interval.tick().await;

        info!("Broker started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        Some(ServerMessage::ClientTimeout { connection_id }) => {
                            debug!("Connection {} removed by timeout sweep", connection_id);
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Broker shutting down");
                            break;
                        }
                    }
                }

                _ = stats_interval.tick() => {
                    let (connections, rooms) = {
                        let registry = self.registry.read().await;
                        (registry.len(), registry.room_count())
                    };
                    if connections > 0 {
                        debug!("{} connections across {} rooms", connections, rooms);
                    }
                }
            }
        }

        Ok(())
    }
}
