use crate::conditioner::SignalConditioner;
use crate::location::{initial_position, GeoWatch, LocationSource, SimulatedWalk};
use crate::timer::{format_elapsed, TimerReplica, WalkTimer};
use crate::track::Tracker;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{
    Packet, Position, TimerState, DEFAULT_POSITION, HEARTBEAT_INTERVAL, PROTOCOL_VERSION,
    TIMER_TICK_INTERVAL,
};
use std::net::SocketAddr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, timeout};

/// Connection attempts before giving up on the server
const CONNECT_ATTEMPTS: u32 = 5;
/// Delay between connection attempts
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);
/// How long a walker waits for the broker's teardown notice after ending
const TEARDOWN_GRACE: Duration = Duration::from_secs(5);

/// Which side of a session this client plays
///
/// The wire protocol is role-agnostic; the role only decides which event
/// streams this client drives. A walker samples, conditions and transmits
/// positions and owns the walk timer. An observer accumulates the path and
/// mirrors the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Walker,
    Observer,
}

/// Everything the binary decides before the session starts
pub struct ClientConfig {
    pub server_addr: String,
    pub session_id: Option<String>,
    pub role: Role,
    pub walk_duration: Duration,
    pub sample_interval: Duration,
    pub announce: Option<String>,
    pub seed: Option<u64>,
}

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    connection_id: Option<u32>,
    connected: bool,

    role: Role,
    session_id: Option<String>,
    walk_duration: Duration,
    sample_interval: Duration,
    announce: Option<String>,

    conditioner: SignalConditioner,
    timer: WalkTimer,
    replica: TimerReplica,
    tracker: Tracker,

    source: Option<Box<dyn LocationSource + Sync>>,
    watch: Option<GeoWatch>,
}

impl Client {
    pub async fn new(config: ClientConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = config.server_addr.parse()?;

        let mut source = SimulatedWalk::new(DEFAULT_POSITION, config.seed);
        // Walkers place the map at their own first fix; observers start from
        // the default coordinate until samples arrive
        let view_center = match config.role {
            Role::Walker => initial_position(&mut source),
            Role::Observer => DEFAULT_POSITION,
        };

        Ok(Client {
            socket,
            server_addr,
            connection_id: None,
            connected: false,
            role: config.role,
            session_id: config.session_id,
            walk_duration: config.walk_duration,
            sample_interval: config.sample_interval,
            announce: config.announce,
            conditioner: SignalConditioner::default(),
            timer: WalkTimer::new(),
            replica: TimerReplica::new(),
            tracker: Tracker::new(view_center),
            source: Some(Box::new(source)),
            watch: None,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let hello = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            session_id: self.session_id.clone(),
        };
        let mut buffer = [0u8; 2048];

        for attempt in 1..=CONNECT_ATTEMPTS {
            info!(
                "Connecting to {} (attempt {}/{})",
                self.server_addr, attempt, CONNECT_ATTEMPTS
            );
            self.send_packet(&hello).await?;

            match timeout(CONNECT_RETRY_DELAY, self.socket.recv_from(&mut buffer)).await {
                Ok(Ok((len, _))) => match deserialize::<Packet>(&buffer[0..len]) {
                    Ok(Packet::Connected { connection_id }) => {
                        info!("Connected! Connection ID: {}", connection_id);
                        self.connection_id = Some(connection_id);
                        self.connected = true;
                        return Ok(());
                    }
                    Ok(Packet::Disconnected { reason }) => {
                        return Err(format!("Server refused connection: {}", reason).into());
                    }
                    Ok(_) => debug!("Ignoring packet received during handshake"),
                    Err(_) => warn!("Failed to deserialize handshake response"),
                },
                Ok(Err(e)) => error!("Error receiving packet: {}", e),
                Err(_) => debug!("Connection attempt {} timed out", attempt),
            }
        }

        Err("No response from server".into())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    /// Starts the walk: announces the timer state and opens the position watch
    async fn start_walk(
        &mut self,
        watch_tx: &mpsc::UnboundedSender<Position>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let Some(state) = self.timer.start() else {
            warn!("Walk already started or ended");
            return Ok(());
        };
        self.send_packet(&state.into_packet()).await?;

        match self.source.take() {
            Some(source) => {
                self.watch = Some(GeoWatch::spawn(
                    source,
                    self.sample_interval,
                    watch_tx.clone(),
                ));
                info!("Walk started");
            }
            None => warn!("Position source already consumed"),
        }

        Ok(())
    }

    /// Ends the walk: releases the watch and announces the terminal state
    async fn end_walk(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(watch) = self.watch.take() {
            watch.stop();
        }

        if let Some(state) = self.timer.end() {
            self.send_packet(&state.into_packet()).await?;
            info!("Walk ended after {}", format_elapsed(state.elapsed_seconds));
        }

        Ok(())
    }

    /// Runs a raw fix through the conditioner and transmits what survives
    async fn handle_fix(&mut self, raw: Position) {
        let Some(smoothed) = self.conditioner.offer(raw, Instant::now()) else {
            return;
        };

        let packet = Packet::LocationUpdate {
            latitude: smoothed.latitude,
            longitude: smoothed.longitude,
        };
        if let Err(e) = self.send_packet(&packet).await {
            error!("Error sending location update: {}", e);
            return;
        }

        // The walker draws its own path from the same conditioned stream it
        // transmits, so both sides render identical lines
        self.tracker.record(smoothed);
        debug!(
            "Sent location ({:.5}, {:.5}), path length {}",
            smoothed.latitude,
            smoothed.longitude,
            self.tracker.path_len()
        );
    }

    /// Returns true when the session is over and the loop should exit
    async fn handle_packet(&mut self, packet: Packet) -> bool {
        match packet {
            Packet::Connected { connection_id } => {
                self.connection_id = Some(connection_id);
                self.connected = true;
                false
            }

            Packet::Message { body } => {
                info!("Message: {}", body);
                false
            }

            Packet::LocationUpdate {
                latitude,
                longitude,
            } => {
                let position = Position::new(latitude, longitude);
                self.tracker.record(position);
                debug!(
                    "Path now {} points around {:?}",
                    self.tracker.path_len(),
                    self.tracker.bounds()
                );
                false
            }

            Packet::TimerUpdate {
                is_walking,
                elapsed_seconds,
                has_ended,
            } => {
                let update = TimerState {
                    is_walking,
                    elapsed_seconds,
                    has_ended,
                };
                if self.replica.apply(update) {
                    if has_ended {
                        info!("Walk ended at {}", format_elapsed(elapsed_seconds));
                    } else {
                        debug!("Walk timer: {}", format_elapsed(elapsed_seconds));
                    }
                } else {
                    warn!("Ignoring timer update that restarts an ended walk");
                }
                false
            }

            Packet::Disconnected { reason } => {
                match self.connection_id.take() {
                    Some(id) => info!("Connection {} disconnected by server: {}", id, reason),
                    None => info!("Disconnected by server: {}", reason),
                }
                self.connected = false;
                true
            }

            _ => {
                warn!("Unexpected packet type");
                false
            }
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        if let Some(text) = self.announce.take() {
            self.send_packet(&Packet::Message { body: text }).await?;
        }

        let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();

        if self.role == Role::Walker {
            self.start_walk(&watch_tx).await?;
        }

        let mut tick_interval = interval(TIMER_TICK_INTERVAL);
        // Skip the first tick since it fires immediately
        tick_interval.tick().await;
        let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);

        let walk_deadline = sleep(self.walk_duration);
        tokio::pin!(walk_deadline);

        let mut buffer = [0u8; 2048];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                if self.handle_packet(packet).await {
                                    break;
                                }
                            } else {
                                warn!("Failed to deserialize packet from server");
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                Some(raw) = watch_rx.recv() => {
                    self.handle_fix(raw).await;
                },

                _ = tick_interval.tick() => {
                    if let Some(state) = self.timer.tick() {
                        if let Err(e) = self.send_packet(&state.into_packet()).await {
                            error!("Error sending timer update: {}", e);
                        }
                    }
                },

                _ = heartbeat_interval.tick() => {
                    if self.connected {
                        let packet = Packet::Heartbeat { timestamp: unix_millis() };
                        if let Err(e) = self.send_packet(&packet).await {
                            error!("Error sending heartbeat: {}", e);
                        }
                    }
                },

                _ = &mut walk_deadline, if self.role == Role::Walker => {
                    if self.timer.is_walking() {
                        self.end_walk().await?;
                        if self.session_id.is_none() {
                            // No room, so no teardown notice will ever come
                            let _ = self.send_packet(&Packet::Leave).await;
                            break;
                        }
                        // Give the broker's teardown notice time to arrive
                        walk_deadline.as_mut().reset(
                            tokio::time::Instant::now() + TEARDOWN_GRACE,
                        );
                    } else {
                        warn!("No teardown received from server, leaving");
                        let _ = self.send_packet(&Packet::Leave).await;
                        break;
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    if self.timer.is_walking() {
                        self.end_walk().await?;
                        if self.session_id.is_none() {
                            let _ = self.send_packet(&Packet::Leave).await;
                            break;
                        }
                        walk_deadline.as_mut().reset(
                            tokio::time::Instant::now() + TEARDOWN_GRACE,
                        );
                    } else {
                        let _ = self.send_packet(&Packet::Leave).await;
                        break;
                    }
                },
            }
        }

        if let Some(watch) = self.watch.take() {
            watch.stop();
        }

        Ok(())
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
