use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const PROTOCOL_VERSION: u32 = 1;

/// Minimum wall-clock gap between accepted location samples; faster samples are dropped.
pub const LOCATION_MIN_INTERVAL: Duration = Duration::from_secs(3);
/// Trailing window length for the location smoother.
pub const SMOOTHING_WINDOW: usize = 3;
/// Cadence of timer state emissions while a walk is active.
pub const TIMER_TICK_INTERVAL: Duration = Duration::from_secs(1);
/// Cadence of client keep-alives.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);
/// A connection silent for this long is treated as dropped.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fallback coordinate used when no position source is available (Seoul City Hall).
pub const DEFAULT_POSITION: Position = Position {
    latitude: 37.5665,
    longitude: 126.978,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    // Client -> server
    Connect {
        client_version: u32,
        session_id: Option<String>,
    },
    Heartbeat {
        timestamp: u64,
    },
    Leave,

    // Client -> server -> other clients (relayed verbatim)
    Message {
        body: String,
    },
    LocationUpdate {
        latitude: f64,
        longitude: f64,
    },
    TimerUpdate {
        is_walking: bool,
        elapsed_seconds: u32,
        has_ended: bool,
    },

    // Server -> client
    Connected {
        connection_id: u32,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Axis-aligned region spanned by a set of positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl GeoBounds {
    pub fn from_point(position: Position) -> Self {
        Self {
            min_latitude: position.latitude,
            max_latitude: position.latitude,
            min_longitude: position.longitude,
            max_longitude: position.longitude,
        }
    }

    /// Builds bounds spanning all given positions, or None for an empty path.
    pub fn from_points(points: &[Position]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self::from_point(*first);
        for point in rest {
            bounds.extend(*point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, position: Position) {
        self.min_latitude = self.min_latitude.min(position.latitude);
        self.max_latitude = self.max_latitude.max(position.latitude);
        self.min_longitude = self.min_longitude.min(position.longitude);
        self.max_longitude = self.max_longitude.max(position.longitude);
    }

    pub fn center(&self) -> Position {
        Position {
            latitude: (self.min_latitude + self.max_latitude) / 2.0,
            longitude: (self.min_longitude + self.max_longitude) / 2.0,
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        position.latitude >= self.min_latitude
            && position.latitude <= self.max_latitude
            && position.longitude >= self.min_longitude
            && position.longitude <= self.max_longitude
    }
}

/// Replicated walk timer state. Exactly one participant per session mutates it;
/// everyone else overwrites their copy with whatever the relay delivers.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct TimerState {
    pub is_walking: bool,
    pub elapsed_seconds: u32,
    pub has_ended: bool,
}

impl TimerState {
    pub fn into_packet(self) -> Packet {
        Packet::TimerUpdate {
            is_walking: self.is_walking,
            elapsed_seconds: self.elapsed_seconds,
            has_ended: self.has_ended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_position_creation() {
        let position = Position::new(37.5665, 126.978);
        assert_eq!(position.latitude, 37.5665);
        assert_eq!(position.longitude, 126.978);
    }

    #[test]
    fn test_bounds_from_single_point() {
        let position = Position::new(10.0, 20.0);
        let bounds = GeoBounds::from_point(position);

        assert_eq!(bounds.min_latitude, 10.0);
        assert_eq!(bounds.max_latitude, 10.0);
        assert_eq!(bounds.min_longitude, 20.0);
        assert_eq!(bounds.max_longitude, 20.0);
        assert!(bounds.contains(position));
    }

    #[test]
    fn test_bounds_extend() {
        let mut bounds = GeoBounds::from_point(Position::new(10.0, 20.0));
        bounds.extend(Position::new(12.0, 18.0));
        bounds.extend(Position::new(8.0, 22.0));

        assert_eq!(bounds.min_latitude, 8.0);
        assert_eq!(bounds.max_latitude, 12.0);
        assert_eq!(bounds.min_longitude, 18.0);
        assert_eq!(bounds.max_longitude, 22.0);
    }

    #[test]
    fn test_bounds_center() {
        let mut bounds = GeoBounds::from_point(Position::new(10.0, 20.0));
        bounds.extend(Position::new(14.0, 28.0));

        let center = bounds.center();
        assert_approx_eq!(center.latitude, 12.0);
        assert_approx_eq!(center.longitude, 24.0);
    }

    #[test]
    fn test_bounds_from_points() {
        let points = vec![
            Position::new(1.0, 1.0),
            Position::new(3.0, 3.0),
            Position::new(2.0, 5.0),
        ];

        let bounds = GeoBounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_latitude, 1.0);
        assert_eq!(bounds.max_latitude, 3.0);
        assert_eq!(bounds.min_longitude, 1.0);
        assert_eq!(bounds.max_longitude, 5.0);

        assert!(GeoBounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_bounds_contains() {
        let points = vec![Position::new(0.0, 0.0), Position::new(10.0, 10.0)];
        let bounds = GeoBounds::from_points(&points).unwrap();

        assert!(bounds.contains(Position::new(5.0, 5.0)));
        assert!(bounds.contains(Position::new(0.0, 10.0)));
        assert!(!bounds.contains(Position::new(-1.0, 5.0)));
        assert!(!bounds.contains(Position::new(5.0, 10.1)));
    }

    #[test]
    fn test_timer_state_default() {
        let state = TimerState::default();
        assert!(!state.is_walking);
        assert_eq!(state.elapsed_seconds, 0);
        assert!(!state.has_ended);
    }

    #[test]
    fn test_timer_state_into_packet() {
        let state = TimerState {
            is_walking: true,
            elapsed_seconds: 42,
            has_ended: false,
        };

        match state.into_packet() {
            Packet::TimerUpdate {
                is_walking,
                elapsed_seconds,
                has_ended,
            } => {
                assert!(is_walking);
                assert_eq!(elapsed_seconds, 42);
                assert!(!has_ended);
            }
            _ => panic!("Wrong packet type"),
        }
    }

    #[test]
    fn test_packet_serialization_connect() {
        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            session_id: Some("board-17".to_string()),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Connect {
                client_version,
                session_id,
            } => {
                assert_eq!(client_version, PROTOCOL_VERSION);
                assert_eq!(session_id.as_deref(), Some("board-17"));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_sessionless_connect() {
        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            session_id: None,
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Connect { session_id, .. } => assert!(session_id.is_none()),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_location_update() {
        let packet = Packet::LocationUpdate {
            latitude: 37.5665,
            longitude: 126.978,
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::LocationUpdate {
                latitude,
                longitude,
            } => {
                assert_eq!(latitude, 37.5665);
                assert_eq!(longitude, 126.978);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_timer_update() {
        let packet = Packet::TimerUpdate {
            is_walking: true,
            elapsed_seconds: 125,
            has_ended: false,
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::TimerUpdate {
                is_walking,
                elapsed_seconds,
                has_ended,
            } => {
                assert!(is_walking);
                assert_eq!(elapsed_seconds, 125);
                assert!(!has_ended);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_message() {
        let packet = Packet::Message {
            body: "walker is on the way".to_string(),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Message { body } => assert_eq!(body, "walker is on the way"),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_disconnected() {
        let packet = Packet::Disconnected {
            reason: "walk ended".to_string(),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Disconnected { reason } => assert_eq!(reason, "walk ended"),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
