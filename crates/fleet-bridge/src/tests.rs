//! Unit tests for fleet-bridge.
//!
//! Registry and monitor tests run on paused time.  Twin tests use real
//! loopback sockets with short timeouts, since paused time auto-advances
//! while a task waits on I/O.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::TcpStream;
    use tokio::sync::watch;

    use fleet_core::{BridgeConfig, VehicleId};
    use fleet_protocol::SessionFrame;

    use crate::{Bus, DigitalTwin, InMemoryBus};

    pub const VEHICLE: VehicleId = VehicleId(1);

    pub fn fast_config() -> BridgeConfig {
        BridgeConfig {
            staleness_threshold_ms: 60_000,
            hop_timeout_ms:         2_000,
            watchdog_interval_ms:   50,
            client_queue:           16,
        }
    }

    /// A running twin on an ephemeral port.  Dropping `shutdown` stops it.
    pub struct TwinFixture {
        pub bus:      InMemoryBus,
        pub addr:     std::net::SocketAddr,
        pub shutdown: watch::Sender<bool>,
    }

    pub async fn start_twin(config: BridgeConfig) -> TwinFixture {
        let bus = InMemoryBus::new();
        let shared: Arc<dyn Bus> = Arc::new(bus.clone());
        let twin = DigitalTwin::bind(VEHICLE, "127.0.0.1:0".parse().unwrap(), shared, config)
            .await
            .expect("bind");
        let addr = twin.local_addr().unwrap();
        let (shutdown, rx) = watch::channel(false);
        tokio::spawn(twin.run(rx));
        TwinFixture { bus, addr, shutdown }
    }

    /// Raw line-level session, for asserting exact frames.
    pub struct Session {
        lines:  Lines<BufReader<OwnedReadHalf>>,
        writer: OwnedWriteHalf,
    }

    impl Session {
        pub async fn open(addr: std::net::SocketAddr) -> Session {
            let stream = TcpStream::connect(addr).await.expect("connect");
            let (read, writer) = stream.into_split();
            let mut session = Session { lines: BufReader::new(read).lines(), writer };
            // The status reply proves the twin has registered this client.
            session.send(&SessionFrame::GetStatus { request_id: Some("hello".into()) }).await;
            match session.recv().await {
                SessionFrame::Status { request_id, .. } => assert_eq!(request_id.as_deref(), Some("hello")),
                other => panic!("expected status, got {other:?}"),
            }
            session
        }

        pub async fn send(&mut self, frame: &SessionFrame) {
            self.send_raw(&frame.encode_line().unwrap()).await;
        }

        pub async fn send_raw(&mut self, line: &str) {
            self.writer.write_all(line.as_bytes()).await.unwrap();
        }

        pub async fn recv(&mut self) -> SessionFrame {
            let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
                .await
                .expect("frame within 5s")
                .unwrap()
                .expect("session open");
            SessionFrame::decode_line(&line).unwrap()
        }
    }

    pub fn telemetry_json(progress: f64, next: &str, prev: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "progress": progress,
            "next_location": next,
            "previous_location": prev,
            "x_coordinate": 1.0,
            "y_coordinate": 2.0,
        }))
        .unwrap()
    }
}

// ── PendingRegistry ───────────────────────────────────────────────────────────

#[cfg(test)]
mod pending {
    use std::time::Duration;

    use tokio::time::Instant;

    use fleet_protocol::TransportError;

    use crate::PendingRegistry;

    #[tokio::test(start_paused = true)]
    async fn resolves_exactly_once() {
        let reg = PendingRegistry::<u32>::new();
        let handle = reg.register("r1", "B", Duration::from_secs(5));
        assert!(reg.resolve("r1", 7));
        assert!(!reg.resolve("r1", 8));
        assert_eq!(handle.wait().await.unwrap(), 7);
        assert!(reg.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_at_the_bound_not_later() {
        let reg = PendingRegistry::<u32>::new();
        let handle = reg.register("r1", "B", Duration::from_secs(10));
        let start = Instant::now();
        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(d) if d == Duration::from_secs(10)));
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(10) && waited < Duration::from_millis(10_010));
        // The dropped handle removed its slot; a late resolve finds nothing.
        assert!(reg.is_empty());
        assert!(!reg.resolve("r1", 1));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_handle_cleans_up() {
        let reg = PendingRegistry::<u32>::new();
        let handle = reg.register("r1", "B", Duration::from_secs(10));
        assert_eq!(reg.len(), 1);
        drop(handle);
        assert!(reg.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_label_hits_only_matching_slots() {
        let reg = PendingRegistry::<String>::new();
        let b1 = reg.register("r1", "B", Duration::from_secs(10));
        let _c = reg.register("r2", "C", Duration::from_secs(10));
        let b2 = reg.register("r3", "B", Duration::from_secs(10));
        assert_eq!(reg.resolve_label("B", "B".into()), 2);
        assert_eq!(b1.wait().await.unwrap(), "B");
        assert_eq!(b2.wait().await.unwrap(), "B");
        assert!(reg.contains("r2"));
    }

    #[tokio::test(start_paused = true)]
    async fn replaced_slot_survives_old_handle_drop() {
        let reg = PendingRegistry::<u32>::new();
        let old = reg.register("r1", "B", Duration::from_secs(10));
        let new = reg.register("r1", "C", Duration::from_secs(10));
        assert!(matches!(old.wait().await, Err(TransportError::Disconnected)));
        assert!(reg.contains("r1"));
        assert!(reg.resolve("r1", 3));
        assert_eq!(new.wait().await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired() {
        let reg = PendingRegistry::<u32>::new();
        let _short = reg.register("short", "B", Duration::from_secs(1));
        let _long = reg.register("long", "C", Duration::from_secs(60));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(reg.sweep_expired(), 1);
        assert!(reg.contains("long"));
    }
}

// ── Canonicalisation and staleness ────────────────────────────────────────────

#[cfg(test)]
mod telemetry {
    use std::time::Duration;

    use tokio::time::Instant;

    use fleet_core::VehicleId;
    use fleet_protocol::{RawNode, RawTelemetry};

    use crate::{canonicalize, StalenessMonitor};

    fn raw(progress: f64) -> RawTelemetry {
        RawTelemetry {
            progress:          Some(progress),
            next_location:     Some("B".into()),
            previous_location: Some("A".into()),
            current_node:      Some(RawNode::Name("Mid".into())),
            x_coordinate:      Some(3.0),
            y_coordinate:      Some(4.0),
        }
    }

    #[test]
    fn arrival_uses_next_location() {
        let t = canonicalize(&raw(100.0), VehicleId(1), 0);
        assert_eq!(t.current_location.as_deref(), Some("B"));
        assert!(t.arrived());
    }

    #[test]
    fn in_transit_prefers_raw_current_node() {
        let t = canonicalize(&raw(40.0), VehicleId(1), 0);
        assert_eq!(t.current_location.as_deref(), Some("Mid"));
        assert_eq!(t.position.map(|p| (p.x, p.y)), Some((3.0, 4.0)));
    }

    #[test]
    fn falls_back_to_previous_then_unknown() {
        let mut r = raw(40.0);
        r.current_node = None;
        assert_eq!(canonicalize(&r, VehicleId(1), 0).current_location.as_deref(), Some("A"));

        r.previous_location = None;
        let t = canonicalize(&r, VehicleId(1), 0);
        assert_eq!(t.current_location, None);
        assert_eq!(t.location_or_unknown(), "unknown");
    }

    #[test]
    fn arrival_without_next_location_uses_current_node() {
        let mut r = raw(100.0);
        r.next_location = None;
        r.current_node = Some(RawNode::Index(4));
        assert_eq!(canonicalize(&r, VehicleId(1), 0).current_location.as_deref(), Some("Node4"));
    }

    #[tokio::test(start_paused = true)]
    async fn staleness_flags_once_per_episode() {
        let start = Instant::now();
        let mut mon = StalenessMonitor::new(Duration::from_secs(15), start);
        assert!(!mon.check(start + Duration::from_secs(10)));
        assert!(mon.check(start + Duration::from_secs(16)));
        assert!(!mon.check(start + Duration::from_secs(20)));
        assert!(mon.is_stale(start + Duration::from_secs(20)));

        assert!(mon.record(start + Duration::from_secs(21)));
        assert!(!mon.is_stale(start + Duration::from_secs(22)));
        assert!(!mon.record(start + Duration::from_secs(23)));
        assert!(mon.check(start + Duration::from_secs(40)));
    }
}

// ── Journey counters ──────────────────────────────────────────────────────────

#[cfg(test)]
mod journey {
    use fleet_core::{Point2, VehicleId};
    use fleet_protocol::Telemetry;

    use crate::journey::{JourneyTracker, CARBON_PER_UNIT, COST_PER_SECOND, COST_PER_UNIT};

    fn fix(x: f64, progress: f64, at: &str, ts: i64) -> Telemetry {
        Telemetry {
            vehicle_id:        VehicleId(1),
            progress,
            current_location:  Some(at.into()),
            next_location:     None,
            previous_location: None,
            position:          Some(Point2::new(x, 0.0)),
            timestamp:         ts,
        }
    }

    #[test]
    fn accumulates_distance_cost_and_visits() {
        let mut j = JourneyTracker::new();
        j.observe(&fix(0.0, 100.0, "A", 0));
        j.observe(&fix(5.0, 50.0, "A", 1_000));
        j.observe(&fix(10.0, 100.0, "B", 3_000));
        j.observe(&fix(10.0, 100.0, "B", 4_000));

        let s = j.summary();
        assert_eq!(s.distance, 10.0);
        assert!((s.carbon - 10.0 * CARBON_PER_UNIT).abs() < 1e-9);
        assert!((s.cost - (10.0 * COST_PER_UNIT + 3.0 * COST_PER_SECOND)).abs() < 1e-9);
        assert_eq!(s.peak_velocity, 5.0);
        assert_eq!(s.node_visits.get("A"), Some(&1));
        assert_eq!(s.node_visits.get("B"), Some(&1));
        assert_eq!(s.edge_usage.get("A->B"), Some(&1));
    }

    #[test]
    fn mission_counters() {
        let mut j = JourneyTracker::new();
        j.mission_forwarded();
        j.mission_forwarded();
        j.mission_completed();
        let s = j.summary();
        assert_eq!((s.missions_forwarded, s.missions_completed), (2, 1));
    }
}

// ── InMemoryBus ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod bus {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use crate::{Bus, InMemoryBus};

    #[tokio::test]
    async fn delivers_in_order_to_exact_topic() {
        let bus = InMemoryBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe("vehicle/1/telemetry-update", Arc::new(move |topic: &str, payload: &[u8]| {
            let _ = tx.send((topic.to_owned(), payload.to_vec()));
        }));
        assert_eq!(bus.subscriber_count("vehicle/1/telemetry-update"), 1);

        bus.publish("vehicle/2/telemetry-update", b"other".to_vec()).unwrap();
        bus.publish("vehicle/1/telemetry-update", b"one".to_vec()).unwrap();
        bus.publish("vehicle/1/telemetry-update", b"two".to_vec()).unwrap();

        assert_eq!(rx.recv().await.unwrap().1, b"one");
        assert_eq!(rx.recv().await.unwrap().1, b"two");
        assert!(rx.try_recv().is_err());
    }
}

// ── DigitalTwin ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod twin {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use fleet_protocol::topics::topic;
    use fleet_protocol::{Channel, SessionFrame};

    use super::helpers::*;
    use crate::Bus;

    #[tokio::test]
    async fn malformed_telemetry_yields_error_then_recovers() {
        let fx = start_twin(fast_config()).await;
        let mut session = Session::open(fx.addr).await;
        let telemetry = topic(VEHICLE, Channel::Telemetry);

        fx.bus.publish(&telemetry, b"{not json".to_vec()).unwrap();
        match session.recv().await {
            SessionFrame::Error { request_id: None, message } => assert!(message.contains("malformed")),
            other => panic!("expected error frame, got {other:?}"),
        }

        fx.bus.publish(&telemetry, telemetry_json(100.0, "B", "A")).unwrap();
        match session.recv().await {
            SessionFrame::VehicleData { data } => {
                assert_eq!(data.current_location.as_deref(), Some("B"));
                assert_eq!(data.vehicle_id, VEHICLE);
            }
            other => panic!("expected vehicleData, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn assign_mission_acks_publishes_and_completes() {
        let fx = start_twin(fast_config()).await;
        let (cmd_tx, mut commands) = mpsc::unbounded_channel();
        fx.bus.subscribe(&topic(VEHICLE, Channel::Command), Arc::new(move |_: &str, payload: &[u8]| {
            let _ = cmd_tx.send(String::from_utf8_lossy(payload).into_owned());
        }));
        let mut session = Session::open(fx.addr).await;

        session
            .send(&SessionFrame::AssignMission { destination_node: "B".into(), request_id: "r1".into() })
            .await;
        assert_eq!(session.recv().await, SessionFrame::TaskAck { request_id: "r1".into() });
        assert_eq!(commands.recv().await.as_deref(), Some("B"));

        fx.bus.publish(&topic(VEHICLE, Channel::Telemetry), telemetry_json(100.0, "B", "A")).unwrap();
        let mut saw_complete = false;
        for _ in 0..2 {
            match session.recv().await {
                SessionFrame::HopComplete { request_id, node } => {
                    assert_eq!((request_id.as_str(), node.as_str()), ("r1", "B"));
                    saw_complete = true;
                }
                SessionFrame::VehicleData { .. } => {}
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(saw_complete);
    }

    #[tokio::test]
    async fn unconfirmed_hop_reports_error_with_request_id() {
        let mut config = fast_config();
        config.hop_timeout_ms = 100;
        let fx = start_twin(config).await;
        let mut session = Session::open(fx.addr).await;

        session
            .send(&SessionFrame::AssignMission { destination_node: "C".into(), request_id: "r9".into() })
            .await;
        assert_eq!(session.recv().await, SessionFrame::TaskAck { request_id: "r9".into() });
        match session.recv().await {
            SessionFrame::Error { request_id, message } => {
                assert_eq!(request_id.as_deref(), Some("r9"));
                assert!(message.contains("timed out"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_frames_get_error_replies_and_session_survives() {
        let fx = start_twin(fast_config()).await;
        let mut session = Session::open(fx.addr).await;

        session.send_raw("this is not json\n").await;
        assert!(matches!(session.recv().await, SessionFrame::Error { .. }));

        session.send_raw("{\"type\":\"launchRockets\"}\n").await;
        assert!(matches!(session.recv().await, SessionFrame::Error { .. }));

        session.send(&SessionFrame::TaskAck { request_id: "x".into() }).await;
        match session.recv().await {
            SessionFrame::Error { message, .. } => assert!(message.contains("taskAck")),
            other => panic!("expected error, got {other:?}"),
        }

        session.send(&SessionFrame::GetStatus { request_id: Some("s2".into()) }).await;
        assert!(matches!(session.recv().await, SessionFrame::Status { .. }));
    }

    #[tokio::test]
    async fn telemetry_reaches_every_client() {
        let fx = start_twin(fast_config()).await;
        let mut a = Session::open(fx.addr).await;
        let mut b = Session::open(fx.addr).await;

        fx.bus.publish(&topic(VEHICLE, Channel::Telemetry), telemetry_json(30.0, "B", "A")).unwrap();
        for session in [&mut a, &mut b] {
            assert!(matches!(session.recv().await, SessionFrame::VehicleData { .. }));
        }
    }

    #[tokio::test]
    async fn disconnected_client_does_not_affect_others() {
        let fx = start_twin(fast_config()).await;
        let gone = Session::open(fx.addr).await;
        let mut stays = Session::open(fx.addr).await;
        drop(gone);

        for progress in [10.0, 20.0, 30.0] {
            fx.bus.publish(&topic(VEHICLE, Channel::Telemetry), telemetry_json(progress, "B", "A")).unwrap();
        }
        for _ in 0..3 {
            assert!(matches!(stays.recv().await, SessionFrame::VehicleData { .. }));
        }
    }

    #[tokio::test]
    async fn status_reports_journey_counters() {
        let fx = start_twin(fast_config()).await;
        let mut session = Session::open(fx.addr).await;
        session
            .send(&SessionFrame::AssignMission { destination_node: "B".into(), request_id: "r1".into() })
            .await;
        assert!(matches!(session.recv().await, SessionFrame::TaskAck { .. }));
        session.send(&SessionFrame::MissionComplete { task_id: Some("t1".into()) }).await;
        session.send(&SessionFrame::GetStatus { request_id: None }).await;
        match session.recv().await {
            SessionFrame::Status { journey, stale, .. } => {
                assert_eq!(journey.missions_forwarded, 1);
                assert_eq!(journey.missions_completed, 1);
                assert!(!stale);
            }
            other => panic!("expected status, got {other:?}"),
        }
        let _ = fx.shutdown.send(true);
    }
}

// ── BridgeClient ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod client {
    use std::time::Duration;

    use tokio::net::TcpListener;

    use fleet_protocol::topics::topic;
    use fleet_protocol::{Channel, TransportError};

    use super::helpers::*;
    use crate::{BridgeClient, BridgeEvent, Bus};

    #[tokio::test]
    async fn assign_hop_returns_after_ack() {
        let fx = start_twin(fast_config()).await;
        let (client, mut events) = BridgeClient::connect(fx.addr, VEHICLE, Duration::from_secs(2)).await.unwrap();

        let request_id = client.assign_hop("B").await.expect("acked");
        assert!(!request_id.is_empty());

        fx.bus.publish(&topic(VEHICLE, Channel::Telemetry), telemetry_json(100.0, "B", "A")).unwrap();
        let mut got_telemetry = false;
        let mut got_complete = false;
        while !(got_telemetry && got_complete) {
            match tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap() {
                BridgeEvent::Telemetry(t) => {
                    assert_eq!(t.current_location.as_deref(), Some("B"));
                    got_telemetry = true;
                }
                BridgeEvent::HopComplete { request_id: id, node } => {
                    assert_eq!(id, request_id);
                    assert_eq!(node, "B");
                    got_complete = true;
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn status_request_yields_status_event() {
        let fx = start_twin(fast_config()).await;
        let (client, mut events) = BridgeClient::connect(fx.addr, VEHICLE, Duration::from_secs(2)).await.unwrap();
        client.assign_hop("B").await.expect("acked");

        client.request_status().await.unwrap();
        match tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap() {
            BridgeEvent::Status { telemetry, stale, journey } => {
                assert!(telemetry.is_none());
                assert!(!stale);
                assert_eq!(journey.missions_forwarded, 1);
            }
            other => panic!("expected status, got {other:?}"),
        }
        let _ = fx.shutdown.send(true);
    }

    #[tokio::test]
    async fn missing_ack_times_out() {
        // Accepts the connection but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let (client, _events) = BridgeClient::connect(addr, VEHICLE, Duration::from_millis(100)).await.unwrap();
        let err = client.assign_hop("B").await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(d) if d == Duration::from_millis(100)));
        server.abort();
    }
}
