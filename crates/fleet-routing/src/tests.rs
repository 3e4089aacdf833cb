//! Unit tests for fleet-routing.
//!
//! All tests use hand-built graphs so they run without map files.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use fleet_core::{Point2, VehicleId};

    use crate::{FleetRoster, NetworkGraph, NetworkGraphBuilder, RoutingEngine, VehicleSpec};

    /// Straight line A–B–C with unit spacing.
    ///
    /// ```text
    ///   A(0,0) ── B(1,0) ── C(2,0)
    /// ```
    pub fn line() -> NetworkGraph {
        let mut b = NetworkGraphBuilder::new();
        b.add_node("A", Point2::new(0.0, 0.0));
        b.add_node("B", Point2::new(1.0, 0.0));
        b.add_node("C", Point2::new(2.0, 0.0));
        b.add_link("A", "B");
        b.add_link("B", "C");
        b.build(42)
    }

    /// Square with one diagonal, so distance and hop count disagree.
    ///
    /// ```text
    ///   N3(0,10) ──── N4(10,10)
    ///     │          ╱   │
    ///     │      ╱       │
    ///   N1(0,0) ──── N2(10,0)
    /// ```
    ///
    /// N1→N4 direct diagonal is ~14.14; via N2 or N3 it is 20.
    pub fn square() -> NetworkGraph {
        let mut b = NetworkGraphBuilder::new();
        b.add_node("N1", Point2::new(0.0, 0.0));
        b.add_node("N2", Point2::new(10.0, 0.0));
        b.add_node("N3", Point2::new(0.0, 10.0));
        b.add_node("N4", Point2::new(10.0, 10.0));
        b.add_link("N1", "N2");
        b.add_link("N1", "N3");
        b.add_link("N1", "N4");
        b.add_link("N2", "N4");
        b.add_link("N3", "N4");
        b.build(42)
    }

    pub fn engine(network: NetworkGraph, vehicles: Vec<(u32, f64, &str)>) -> RoutingEngine {
        let specs = vehicles
            .into_iter()
            .map(|(id, speed, start)| VehicleSpec::new(VehicleId(id), speed, start))
            .collect();
        let roster = FleetRoster::new(specs, &network).expect("valid roster");
        RoutingEngine::dijkstra(Arc::new(network), Arc::new(roster))
    }
}

// ── Graph construction ────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use fleet_core::Point2;

    use crate::{NetworkGraph, NetworkGraphBuilder};

    #[test]
    fn empty_build() {
        let net = NetworkGraph::empty();
        assert_eq!(net.node_count(), 0);
        assert_eq!(net.edge_count(), 0);
        assert!(net.is_empty());
    }

    #[test]
    fn one_way_declaration_is_bidirectional() {
        let net = super::helpers::line();
        let a = net.node("A").unwrap();
        let b = net.node("B").unwrap();
        let c = net.node("C").unwrap();
        assert_eq!(net.edge_count(), 4);
        assert_eq!(net.neighbors(a).collect::<Vec<_>>(), vec![b]);
        assert_eq!(net.neighbors(c).collect::<Vec<_>>(), vec![b]);
        // B declared C itself, and got A from A's declaration.
        assert_eq!(net.neighbors(b).collect::<Vec<_>>(), vec![c, a]);
    }

    #[test]
    fn mutual_declaration_not_doubled() {
        let mut b = NetworkGraphBuilder::new();
        b.add_node("A", Point2::new(0.0, 0.0));
        b.add_node("B", Point2::new(1.0, 0.0));
        b.add_link("A", "B");
        b.add_link("B", "A");
        let net = b.build(1);
        assert_eq!(net.edge_count(), 2);
    }

    #[test]
    fn dangling_and_self_links_dropped() {
        let mut b = NetworkGraphBuilder::new();
        b.add_node("A", Point2::new(0.0, 0.0));
        b.add_link("A", "Ghost");
        b.add_link("A", "A");
        let net = b.build(1);
        assert_eq!(net.node_count(), 1);
        assert_eq!(net.edge_count(), 0);
    }

    #[test]
    fn redeclared_node_keeps_index() {
        let mut b = NetworkGraphBuilder::new();
        let first = b.add_node("A", Point2::new(0.0, 0.0));
        let again = b.add_node("A", Point2::new(5.0, 5.0));
        assert_eq!(first, again);
        let net = b.build(1);
        assert_eq!(net.position_of("A"), Some(Point2::new(5.0, 5.0)));
    }

    #[test]
    fn both_directions_share_weights() {
        let net = super::helpers::square();
        let n1 = net.node("N1").unwrap();
        let n4 = net.node("N4").unwrap();
        let fwd = net.find_edge(n1, n4).unwrap().index();
        let back = net.find_edge(n4, n1).unwrap().index();
        assert_eq!(net.edge_distance[fwd], net.edge_distance[back]);
        assert_eq!(net.edge_carbon[fwd], net.edge_carbon[back]);
        assert_eq!(net.edge_cost[fwd], net.edge_cost[back]);
    }

    #[test]
    fn weights_identical_across_independent_builds() {
        // Declaration order differs; weights must not.
        let mut b1 = NetworkGraphBuilder::new();
        b1.add_node("X", Point2::new(0.0, 0.0));
        b1.add_node("Y", Point2::new(3.0, 4.0));
        b1.add_link("X", "Y");
        let g1 = b1.build(42);

        let mut b2 = NetworkGraphBuilder::new();
        b2.add_node("Y", Point2::new(3.0, 4.0));
        b2.add_node("X", Point2::new(0.0, 0.0));
        b2.add_link("Y", "X");
        let g2 = b2.build(42);

        let e1 = g1.find_edge(g1.node("X").unwrap(), g1.node("Y").unwrap()).unwrap().index();
        let e2 = g2.find_edge(g2.node("X").unwrap(), g2.node("Y").unwrap()).unwrap().index();
        assert_eq!(g1.edge_distance[e1], 5.0);
        assert_eq!(g1.edge_carbon[e1], g2.edge_carbon[e2]);
        assert_eq!(g1.edge_cost[e1], g2.edge_cost[e2]);
    }

    #[test]
    fn carbon_and_cost_scale_with_distance() {
        let net = super::helpers::square();
        for e in 0..net.edge_count() {
            let d = net.edge_distance[e];
            assert!(net.edge_carbon[e] >= 0.1 * d && net.edge_carbon[e] < 2.0 * d);
            assert!(net.edge_cost[e] >= 0.5 * d && net.edge_cost[e] < 3.0 * d);
        }
    }
}

// ── Dijkstra ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod dijkstra {
    use fleet_core::Point2;

    use crate::{DijkstraRouter, EdgeWeight, NetworkGraphBuilder, Router, RoutingError};

    #[test]
    fn trivial_route() {
        let net = super::helpers::line();
        let a = net.node("A").unwrap();
        let r = DijkstraRouter.route(&net, a, a, EdgeWeight::Distance).unwrap();
        assert!(r.is_trivial());
        assert_eq!(r.nodes, vec![a]);
        assert_eq!(r.distance, 0.0);
    }

    #[test]
    fn shortest_distance_takes_diagonal() {
        let net = super::helpers::square();
        let n1 = net.node("N1").unwrap();
        let n4 = net.node("N4").unwrap();
        let r = DijkstraRouter.route(&net, n1, n4, EdgeWeight::Distance).unwrap();
        assert_eq!(r.nodes, vec![n1, n4]);
        assert!((r.distance - 200f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn totals_cover_all_weights() {
        let net = super::helpers::line();
        let a = net.node("A").unwrap();
        let c = net.node("C").unwrap();
        let r = DijkstraRouter.route(&net, a, c, EdgeWeight::Distance).unwrap();
        let expected_carbon: f64 = (0..net.edge_count())
            .filter(|&e| net.edge_from[e] < net.edge_to[e])
            .map(|e| net.edge_carbon[e])
            .sum();
        assert_eq!(r.hops(), 2);
        assert!((r.carbon - expected_carbon).abs() < 1e-9);
    }

    #[test]
    fn equal_cost_tie_goes_to_first_discovered() {
        // S→L→T and S→R→T both have length 2; S declared L first.
        let mut b = NetworkGraphBuilder::new();
        b.add_node("S", Point2::new(0.0, 0.0));
        b.add_node("L", Point2::new(1.0, 0.0));
        b.add_node("R", Point2::new(0.0, 1.0));
        b.add_node("T", Point2::new(1.0, 1.0));
        b.add_link("S", "L");
        b.add_link("S", "R");
        b.add_link("L", "T");
        b.add_link("R", "T");
        let net = b.build(7);
        let (s, l, t) = (net.node("S").unwrap(), net.node("L").unwrap(), net.node("T").unwrap());
        let r = DijkstraRouter.route(&net, s, t, EdgeWeight::Distance).unwrap();
        assert_eq!(r.nodes, vec![s, l, t]);
    }

    #[test]
    fn disconnected_is_no_path() {
        let mut b = NetworkGraphBuilder::new();
        b.add_node("A", Point2::new(0.0, 0.0));
        b.add_node("Z", Point2::new(9.0, 9.0));
        let net = b.build(1);
        let err = DijkstraRouter
            .route(&net, net.node("A").unwrap(), net.node("Z").unwrap(), EdgeWeight::Cost)
            .unwrap_err();
        assert_eq!(err, RoutingError::NoPath { from: "A".into(), to: "Z".into() });
    }
}

// ── RoutingEngine::find_path ──────────────────────────────────────────────────

#[cfg(test)]
mod engine {
    use fleet_core::{Criterion, VehicleId};

    use crate::RoutingError;

    use super::helpers::{engine, line, square};

    #[test]
    fn line_path_priced_at_vehicle_speed() {
        let eng = engine(line(), vec![(1, 1.0, "A")]);
        let plan = eng.find_path(VehicleId(1), "A", "C", Criterion::Distance).unwrap();
        assert_eq!(plan.path, vec!["A", "B", "C"]);
        assert_eq!(plan.distance, 2.0);
        assert_eq!(plan.travel_time, 2.0);
        assert_eq!(plan.destination(), Some("C"));
    }

    #[test]
    fn speed_scales_travel_time_only() {
        let eng = engine(line(), vec![(1, 1.0, "A"), (2, 4.0, "A")]);
        let slow = eng.find_path(VehicleId(1), "A", "C", Criterion::Distance).unwrap();
        let fast = eng.find_path(VehicleId(2), "A", "C", Criterion::Distance).unwrap();
        assert_eq!(slow.path, fast.path);
        assert_eq!(fast.travel_time, 0.5);
    }

    #[test]
    fn find_path_is_deterministic() {
        let eng = engine(square(), vec![(1, 30.0, "N1")]);
        for criterion in [Criterion::Distance, Criterion::Carbon, Criterion::Cost, Criterion::Time] {
            let a = eng.find_path(VehicleId(1), "N1", "N4", criterion).unwrap();
            let b = eng.find_path(VehicleId(1), "N1", "N4", criterion).unwrap();
            assert_eq!(a, b, "criterion {criterion}");
        }
    }

    #[test]
    fn time_criterion_never_slower_than_any_weight() {
        let eng = engine(square(), vec![(1, 2.0, "N1")]);
        let timed = eng.find_path(VehicleId(1), "N1", "N4", Criterion::Time).unwrap();
        for criterion in Criterion::WEIGHTED {
            let other = eng.find_path(VehicleId(1), "N1", "N4", criterion).unwrap();
            assert!(timed.travel_time <= other.travel_time, "{criterion} beat time");
        }
        // Travel time is distance-driven, so the distance-optimal path wins.
        let by_distance = eng.find_path(VehicleId(1), "N1", "N4", Criterion::Distance).unwrap();
        assert_eq!(timed.path, by_distance.path);
    }

    #[test]
    fn same_node_is_zero_cost() {
        let eng = engine(line(), vec![(1, 1.0, "A")]);
        let plan = eng.find_path(VehicleId(1), "B", "B", Criterion::Time).unwrap();
        assert_eq!(plan.path, vec!["B"]);
        assert_eq!(plan.travel_time, 0.0);
    }

    #[test]
    fn unknown_vehicle_checked_first() {
        let eng = engine(line(), vec![(1, 1.0, "A")]);
        let err = eng.find_path(VehicleId(9), "Nowhere", "C", Criterion::Time).unwrap_err();
        assert_eq!(err, RoutingError::UnknownVehicle(VehicleId(9)));
    }

    #[test]
    fn unknown_nodes() {
        let eng = engine(line(), vec![(1, 1.0, "A")]);
        assert_eq!(
            eng.find_path(VehicleId(1), "Q", "C", Criterion::Time).unwrap_err(),
            RoutingError::UnknownNode("Q".into())
        );
        assert_eq!(
            eng.find_path(VehicleId(1), "A", "Q", Criterion::Time).unwrap_err(),
            RoutingError::UnknownNode("Q".into())
        );
    }
}

// ── Roster validation ─────────────────────────────────────────────────────────

#[cfg(test)]
mod roster {
    use fleet_core::VehicleId;

    use crate::{FleetRoster, RoutingError, VehicleSpec};

    #[test]
    fn rejects_duplicates_speed_and_unknown_start() {
        let net = super::helpers::line();
        let dup = vec![VehicleSpec::new(VehicleId(1), 1.0, "A"), VehicleSpec::new(VehicleId(1), 2.0, "B")];
        assert!(matches!(FleetRoster::new(dup, &net), Err(RoutingError::InvalidRoster(_))));

        let zero = vec![VehicleSpec::new(VehicleId(1), 0.0, "A")];
        assert!(matches!(FleetRoster::new(zero, &net), Err(RoutingError::InvalidRoster(_))));

        let lost = vec![VehicleSpec::new(VehicleId(1), 1.0, "Z")];
        assert_eq!(FleetRoster::new(lost, &net).unwrap_err(), RoutingError::UnknownNode("Z".into()));
    }

    #[test]
    fn lookup_preserves_order() {
        let net = super::helpers::line();
        let roster = FleetRoster::new(
            vec![VehicleSpec::new(VehicleId(5), 1.0, "A"), VehicleSpec::new(VehicleId(2), 1.0, "C")],
            &net,
        )
        .unwrap();
        assert_eq!(roster.ids().collect::<Vec<_>>(), vec![VehicleId(5), VehicleId(2)]);
        assert_eq!(roster.get(VehicleId(2)).unwrap().start_node, "C");
        assert!(roster.get(VehicleId(3)).is_none());
    }
}

// ── Loaders ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use std::io::Cursor;

    use fleet_core::{Point2, VehicleId};

    use crate::{load_network_reader, load_roster_reader, LoadError};

    const MAP: &str = r#"
% three-node test map
{{"Node1", {250,50}},["Node2"]}.
{{"Node2", {250,150}},["Node3"]}.
{{"Node3", {350.5,150}},[]}.
"#;

    #[test]
    fn parses_map_records() {
        let net = load_network_reader(Cursor::new(MAP), 42).unwrap();
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.edge_count(), 4);
        assert_eq!(net.position_of("Node3"), Some(Point2::new(350.5, 150.0)));
        let n1 = net.node("Node1").unwrap();
        let n2 = net.node("Node2").unwrap();
        assert_eq!(net.edge_distance[net.find_edge(n1, n2).unwrap().index()], 100.0);
    }

    #[test]
    fn parses_roster_records() {
        let net = load_network_reader(Cursor::new(MAP), 42).unwrap();
        let roster = load_roster_reader(Cursor::new("{1, 30, \"Node1\"}.\n{2, 12.5, Node3}.\n"), &net).unwrap();
        assert_eq!(roster.len(), 2);
        let v2 = roster.get(VehicleId(2)).unwrap();
        assert_eq!(v2.speed, 12.5);
        assert_eq!(v2.start_node, "Node3");
    }

    #[test]
    fn record_may_span_lines() {
        let src = "{{\"A\", {0,0}},\n [\"B\"]}.\n{{\"B\", {0,1}}, []}.";
        let net = load_network_reader(Cursor::new(src), 1).unwrap();
        assert_eq!(net.edge_count(), 2);
    }

    #[test]
    fn syntax_error_reports_line() {
        let src = "{{\"A\", {0,0}},[]}.\n{{\"B\", {0,1}},[]\n";
        match load_network_reader(Cursor::new(src), 1) {
            Err(LoadError::Syntax { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_shape_is_syntax_error() {
        let net = load_network_reader(Cursor::new(MAP), 42).unwrap();
        let err = load_roster_reader(Cursor::new("{1, \"Node1\"}."), &net).unwrap_err();
        assert!(matches!(err, LoadError::Syntax { line: 1, .. }));
    }

    #[test]
    fn roster_validation_surfaces() {
        let net = load_network_reader(Cursor::new(MAP), 42).unwrap();
        let err = load_roster_reader(Cursor::new("{1, -3, \"Node1\"}."), &net).unwrap_err();
        assert!(matches!(err, LoadError::Routing(_)));
    }
}
