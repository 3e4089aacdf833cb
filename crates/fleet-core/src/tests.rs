//! Unit tests for fleet-core primitives.

#[cfg(test)]
mod ids {
    use crate::{NodeIdx, TaskId, VehicleId};

    #[test]
    fn index_roundtrip() {
        let id = VehicleId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(VehicleId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering_drives_tie_breaks() {
        assert!(VehicleId(1) < VehicleId(2));
        assert!(NodeIdx(100) > NodeIdx(99));
    }

    #[test]
    fn display() {
        assert_eq!(VehicleId(7).to_string(), "VehicleId(7)");
        assert_eq!(TaskId::from("ab12cd34").to_string(), "ab12cd34");
    }

    #[test]
    fn fresh_task_ids_are_short_and_distinct() {
        let a = TaskId::fresh();
        let b = TaskId::fresh();
        assert_eq!(a.as_str().len(), TaskId::TOKEN_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}

#[cfg(test)]
mod geo {
    use crate::Point2;

    #[test]
    fn euclidean_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(b.distance(a), 5.0);
    }

    #[test]
    fn lerp_clamps() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        assert_eq!(a.lerp(b, 0.5), Point2::new(5.0, 0.0));
        assert_eq!(a.lerp(b, 2.0), b);
        assert_eq!(a.lerp(b, -1.0), a);
    }
}

#[cfg(test)]
mod criterion {
    use crate::Criterion;

    #[test]
    fn parse_by_name_and_priority() {
        assert_eq!("carbon".parse::<Criterion>().unwrap(), Criterion::Carbon);
        assert_eq!("TIME".parse::<Criterion>().unwrap(), Criterion::Time);
        assert_eq!("1".parse::<Criterion>().unwrap(), Criterion::Distance);
        assert_eq!("3".parse::<Criterion>().unwrap(), Criterion::Cost);
        assert!("5".parse::<Criterion>().is_err());
        assert!("speed".parse::<Criterion>().is_err());
    }

    #[test]
    fn priority_roundtrip() {
        for c in [Criterion::Distance, Criterion::Carbon, Criterion::Cost, Criterion::Time] {
            assert_eq!(Criterion::from_priority(c.priority()), Some(c));
        }
    }

    #[test]
    fn time_evaluation_order() {
        assert_eq!(
            Criterion::WEIGHTED,
            [Criterion::Distance, Criterion::Carbon, Criterion::Cost]
        );
    }
}

#[cfg(test)]
mod weights {
    use crate::weights::{edge_key, CARBON_FACTOR_RANGE, COST_FACTOR_RANGE};
    use crate::EdgeRng;

    #[test]
    fn edge_key_is_order_independent() {
        assert_eq!(edge_key("Node1", "Node2"), edge_key("Node2", "Node1"));
        assert_ne!(edge_key("Node1", "Node2"), edge_key("Node1", "Node3"));
    }

    #[test]
    fn edge_key_separates_names() {
        // Concatenation alone would make these equal.
        assert_ne!(edge_key("ab", "c"), edge_key("a", "bc"));
    }

    #[test]
    fn factors_are_deterministic() {
        let a = EdgeRng::new(42, "Node1", "Node2").factors();
        let b = EdgeRng::new(42, "Node2", "Node1").factors();
        assert_eq!(a, b);
    }

    /// Pinned values: any process, on any target, must derive exactly these.
    #[test]
    fn factors_match_reference_values() {
        assert_eq!(edge_key("Node1", "Node2"), 0xb46a_63c5_56c7_eaf1);
        let f = EdgeRng::new(42, "Node1", "Node2").factors();
        assert_eq!(f.carbon, 0.6496347751638974);
        assert_eq!(f.cost, 2.397996093277023);
    }

    #[test]
    fn salt_changes_factors() {
        let a = EdgeRng::new(42, "Node1", "Node2").factors();
        let b = EdgeRng::new(43, "Node1", "Node2").factors();
        assert_ne!(a, b);
    }

    #[test]
    fn factors_within_ranges() {
        for i in 0..200 {
            let f = EdgeRng::new(7, &format!("N{i}"), &format!("N{}", i + 1)).factors();
            assert!(CARBON_FACTOR_RANGE.contains(&f.carbon), "carbon {}", f.carbon);
            assert!(COST_FACTOR_RANGE.contains(&f.cost), "cost {}", f.cost);
        }
    }
}

#[cfg(test)]
mod config {
    use std::time::Duration;

    use crate::{CoreError, FleetConfig};

    #[test]
    fn defaults_validate() {
        let cfg = FleetConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.coordinator.max_tasks, Some(30));
        assert_eq!(cfg.coordinator.response_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.agent.status_interval(), Duration::from_secs(5));
        assert_eq!(cfg.agent.hop_ack_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut cfg = FleetConfig::default();
        cfg.agent.hop_ack_timeout_ms = 0;
        assert!(matches!(cfg.validate(), Err(CoreError::Config(msg)) if msg.contains("hop_ack_timeout_ms")));
    }

    #[test]
    fn zero_in_flight_cap_rejected() {
        let mut cfg = FleetConfig::default();
        cfg.coordinator.max_in_flight = Some(0);
        assert!(cfg.validate().is_err());
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_forms {
    use crate::{AgentConfig, Criterion, FleetConfig, TaskId, VehicleId};

    #[test]
    fn ids_serialise_transparently() {
        assert_eq!(serde_json::to_string(&VehicleId(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&TaskId::from("t1")).unwrap(), "\"t1\"");
        assert_eq!(serde_json::to_string(&Criterion::Carbon).unwrap(), "\"carbon\"");
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let cfg: FleetConfig =
            serde_json::from_str(r#"{"coordinator": {"max_tasks": 5}, "weight_salt": 9}"#).unwrap();
        assert_eq!(cfg.coordinator.max_tasks, Some(5));
        assert_eq!(cfg.coordinator.response_timeout_ms, 10_000);
        assert_eq!(cfg.weight_salt, 9);
        assert_eq!(cfg.agent, AgentConfig::default());
    }
}
