//! Routing trait and default Dijkstra implementation.
//!
//! # Pluggability
//!
//! [`RoutingEngine`](crate::RoutingEngine) calls routing via the [`Router`]
//! trait, so deployments can swap in A* or a cached router without touching
//! the negotiation code.  The default [`DijkstraRouter`] is sufficient for
//! maps of a few thousand nodes.
//!
//! # Costs
//!
//! A query minimises exactly one [`EdgeWeight`].  The returned [`Route`]
//! always reports all three totals along the chosen path, whichever weight
//! selected it.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use fleet_core::{Criterion, EdgeIdx, NodeIdx};

use crate::network::NetworkGraph;
use crate::{RoutingError, RoutingResult};

// ── EdgeWeight ────────────────────────────────────────────────────────────────

/// The per-edge quantity a single Dijkstra run minimises.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum EdgeWeight {
    Distance,
    Carbon,
    Cost,
}

impl EdgeWeight {
    /// The weight a criterion minimises directly.  `None` for `Time`, which
    /// the engine resolves by comparing the other three.
    pub fn for_criterion(criterion: Criterion) -> Option<EdgeWeight> {
        match criterion {
            Criterion::Distance => Some(EdgeWeight::Distance),
            Criterion::Carbon   => Some(EdgeWeight::Carbon),
            Criterion::Cost     => Some(EdgeWeight::Cost),
            Criterion::Time     => None,
        }
    }

    #[inline]
    fn of(self, network: &NetworkGraph, edge: EdgeIdx) -> f64 {
        match self {
            EdgeWeight::Distance => network.edge_distance[edge.index()],
            EdgeWeight::Carbon   => network.edge_carbon[edge.index()],
            EdgeWeight::Cost     => network.edge_cost[edge.index()],
        }
    }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a routing query.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Nodes to visit in order, including both endpoints.
    pub nodes: Vec<NodeIdx>,
    pub distance: f64,
    pub carbon:   f64,
    pub cost:     f64,
}

impl Route {
    /// `true` if the source and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Number of hops (edges) along the route.
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable shortest-path algorithm.
///
/// Implementations must be `Send + Sync`: one engine is shared by every
/// agent task.
pub trait Router: Send + Sync {
    /// Compute the route from `from` to `to` minimising `weight`.
    ///
    /// `from == to` is a trivial single-node route, not an error.
    fn route(
        &self,
        network: &NetworkGraph,
        from: NodeIdx,
        to: NodeIdx,
        weight: EdgeWeight,
    ) -> RoutingResult<Route>;
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Standard Dijkstra over the CSR graph.
///
/// Equal-cost alternatives resolve to whichever was discovered first: the
/// heap carries a push sequence number as its secondary key, and relaxation
/// only replaces a tentative distance on a strict improvement.
#[derive(Copy, Clone, Debug, Default)]
pub struct DijkstraRouter;

impl Router for DijkstraRouter {
    fn route(
        &self,
        network: &NetworkGraph,
        from: NodeIdx,
        to: NodeIdx,
        weight: EdgeWeight,
    ) -> RoutingResult<Route> {
        dijkstra(network, from, to, weight)
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

fn dijkstra(
    network: &NetworkGraph,
    from: NodeIdx,
    to: NodeIdx,
    weight: EdgeWeight,
) -> RoutingResult<Route> {
    if from == to {
        return Ok(Route { nodes: vec![from], distance: 0.0, carbon: 0.0, cost: 0.0 });
    }

    let n = network.node_count();
    let mut dist      = vec![f64::INFINITY; n];
    let mut prev_edge = vec![EdgeIdx::INVALID; n];
    let mut seq: u64  = 0;

    dist[from.index()] = 0.0;

    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, NodeIdx)>> = BinaryHeap::new();
    heap.push(Reverse((OrderedFloat(0.0), seq, from)));

    while let Some(Reverse((OrderedFloat(cost), _, node))) = heap.pop() {
        if node == to {
            return Ok(reconstruct(network, &prev_edge, to));
        }

        // Skip stale heap entries.
        if cost > dist[node.index()] {
            continue;
        }

        for edge in network.out_edges(node) {
            let neighbor = network.edge_to[edge.index()];
            let new_cost = cost + weight.of(network, edge);

            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev_edge[neighbor.index()] = edge;
                seq += 1;
                heap.push(Reverse((OrderedFloat(new_cost), seq, neighbor)));
            }
        }
    }

    Err(RoutingError::NoPath {
        from: network.name(from).to_owned(),
        to:   network.name(to).to_owned(),
    })
}

fn reconstruct(network: &NetworkGraph, prev_edge: &[EdgeIdx], to: NodeIdx) -> Route {
    let mut edges = Vec::new();
    let mut cur = to;
    loop {
        let e = prev_edge[cur.index()];
        if e == EdgeIdx::INVALID {
            break;
        }
        edges.push(e);
        cur = network.edge_from[e.index()];
    }
    edges.reverse();

    let mut nodes = Vec::with_capacity(edges.len() + 1);
    nodes.push(cur);
    let (mut distance, mut carbon, mut cost) = (0.0, 0.0, 0.0);
    for e in &edges {
        nodes.push(network.edge_to[e.index()]);
        distance += network.edge_distance[e.index()];
        carbon   += network.edge_carbon[e.index()];
        cost     += network.edge_cost[e.index()];
    }
    Route { nodes, distance, carbon, cost }
}
