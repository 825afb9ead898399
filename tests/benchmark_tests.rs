//! Performance benchmarks for critical relay and conditioning paths

use shared::{Position, TimerState, LOCATION_MIN_INTERVAL, SMOOTHING_WINDOW};
use std::time::Instant;

/// Benchmarks signal conditioning throughput when every sample is accepted
#[test]
fn benchmark_signal_conditioning() {
    use client::conditioner::SignalConditioner;

    let mut conditioner = SignalConditioner::new(LOCATION_MIN_INTERVAL, SMOOTHING_WINDOW);
    let base = Instant::now();

    let iterations = 100_000u32;
    let start = Instant::now();

    for i in 0..iterations {
        // Synthetic clock spaced exactly one interval apart, so the throttle
        // passes every sample and the window churns on each call
        let now = base + LOCATION_MIN_INTERVAL * i;
        let raw = Position::new(37.5 + f64::from(i) * 0.0001, 126.9);
        let _ = conditioner.offer(raw, now);
    }

    let duration = start.elapsed();
    println!(
        "Signal conditioning: {} samples in {:?} ({:.2} ns/sample)",
        iterations,
        duration,
        duration.as_nanos() as f64 / f64::from(iterations)
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks the throttle rejection fast path
#[test]
fn benchmark_throttle_rejection() {
    use client::conditioner::SignalConditioner;

    let mut conditioner = SignalConditioner::new(LOCATION_MIN_INTERVAL, SMOOTHING_WINDOW);
    let base = Instant::now();
    let raw = Position::new(37.5665, 126.978);

    // Prime the throttle clock
    let _ = conditioner.offer(raw, base);

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        // Same instant every time, always inside the minimum interval
        assert!(conditioner.offer(raw, base).is_none());
    }

    let duration = start.elapsed();
    println!(
        "Throttle rejection: {} samples in {:?} ({:.2} ns/sample)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 100ms for 100k rejections
    assert!(duration.as_millis() < 100);
}

/// Benchmarks fan-out target resolution for a full room
#[test]
fn benchmark_fanout_resolution() {
    use server::registry::RoomRegistry;

    let mut registry = RoomRegistry::new(64);
    let mut ids = Vec::new();

    for i in 0..64 {
        let addr = format!("127.0.0.1:{}", 9000 + i).parse().unwrap();
        let id = registry.register(addr).unwrap();
        registry.join(id, "board-bench");
        ids.push(id);
    }

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let excluded = ids[i % ids.len()];
        let targets = registry.room_members("board-bench", Some(excluded));
        assert_eq!(targets.len(), 63);
    }

    let duration = start.elapsed();
    println!(
        "Fan-out resolution: {} resolutions in {:?} ({:.2} μs/resolution)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks registration and room membership churn
#[test]
fn benchmark_registration_churn() {
    use server::registry::RoomRegistry;

    let mut registry = RoomRegistry::new(64);
    let addr = "127.0.0.1:9500".parse().unwrap();

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let id = registry.register(addr).unwrap();
        registry.join(id, if i % 2 == 0 { "board-a" } else { "board-b" });
        assert!(registry.remove(id));
    }

    let duration = start.elapsed();
    println!(
        "Registration churn: {} cycles in {:?} ({:.2} μs/cycle)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks network packet serialization performance
#[test]
fn benchmark_packet_serialization() {
    use bincode::{deserialize, serialize};
    use shared::Packet;

    let packets = vec![
        Packet::LocationUpdate {
            latitude: 37.5665,
            longitude: 126.978,
        },
        Packet::TimerUpdate {
            is_walking: true,
            elapsed_seconds: 3600,
            has_ended: false,
        },
        Packet::Message {
            body: "heading out for the evening walk".to_string(),
        },
        Packet::Heartbeat {
            timestamp: 1234567890,
        },
    ];

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        for packet in &packets {
            let serialized = serialize(packet).unwrap();
            let _deserialized: Packet = deserialize(&serialized).unwrap();
        }
    }

    let duration = start.elapsed();
    println!(
        "Packet serialization: {} roundtrips in {:?} ({:.2} μs/roundtrip)",
        iterations * packets.len(),
        duration,
        duration.as_micros() as f64 / (iterations * packets.len()) as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks path accumulation and bounds recomputation over a long walk
#[test]
fn benchmark_path_accumulation() {
    use client::track::Tracker;

    let mut tracker = Tracker::new(Position::new(37.5665, 126.978));

    let samples = 5_000;
    let start = Instant::now();

    for i in 0..samples {
        let step = f64::from(i) * 0.0001;
        tracker.record(Position::new(37.5665 + step, 126.978 + step));
    }

    let duration = start.elapsed();
    println!(
        "Path accumulation: {} samples in {:?} ({:.2} μs/sample)",
        samples,
        duration,
        duration.as_micros() as f64 / f64::from(samples)
    );

    assert_eq!(tracker.path_len(), samples as usize);
    assert!(tracker.auto_centered());
    assert!(tracker.bounds().is_some());

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Stress tests replica state application under a flood of updates
#[test]
fn stress_test_replica_updates() {
    use client::timer::TimerReplica;

    let mut replica = TimerReplica::new();

    let iterations = 100_000u32;
    let start = Instant::now();

    for i in 0..iterations {
        let applied = replica.apply(TimerState {
            is_walking: true,
            elapsed_seconds: i,
            has_ended: false,
        });
        assert!(applied);
    }

    let duration = start.elapsed();
    println!(
        "Replica updates: {} applies in {:?} ({:.2} ns/apply)",
        iterations,
        duration,
        duration.as_nanos() as f64 / f64::from(iterations)
    );

    assert_eq!(replica.state().elapsed_seconds, iterations - 1);

    // Should complete in under 100ms
    assert!(duration.as_millis() < 100);
}

/// Benchmarks elapsed time formatting
#[test]
fn benchmark_elapsed_formatting() {
    use client::timer::format_elapsed;

    let iterations = 100_000u32;
    let start = Instant::now();

    for i in 0..iterations {
        let formatted = format_elapsed(i);
        assert_eq!(formatted.len(), 8);
    }

    let duration = start.elapsed();
    println!(
        "Elapsed formatting: {} formats in {:?} ({:.2} ns/format)",
        iterations,
        duration,
        duration.as_nanos() as f64 / f64::from(iterations)
    );

    // Should complete in under 500ms
    assert!(duration.as_millis() < 500);
}
