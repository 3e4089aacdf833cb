//! Map graph representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeIdx n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edge_to[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! Map files declare neighbors one-directionally, but every declared link is
//! traversable both ways.  The builder materialises both directions as
//! separate CSR edges carrying identical weights.
//!
//! # Edge order
//!
//! Within a node's slice, edges the node declared itself come first (in
//! declaration order), followed by reverse edges contributed by other nodes'
//! declarations (in their declaration order).  Dijkstra breaks equal-cost
//! ties by discovery order, so this order is part of the routing contract.

use std::collections::{HashMap, HashSet};

use fleet_core::{EdgeIdx, EdgeRng, NodeIdx, Point2};

// ── NetworkGraph ──────────────────────────────────────────────────────────────

/// Bidirectional weighted map graph in CSR format.
///
/// All array fields are `pub` for direct indexed access on hot paths.  Do not
/// construct directly; use [`NetworkGraphBuilder`].
#[derive(Debug)]
pub struct NetworkGraph {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Name of each node.  Indexed by `NodeIdx`.
    pub node_names: Vec<String>,

    /// Map position of each node.  Indexed by `NodeIdx`.
    pub node_pos: Vec<Point2>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// CSR row pointer.  Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    // ── Edge data (indexed by EdgeIdx) ────────────────────────────────────
    pub edge_from: Vec<NodeIdx>,
    pub edge_to:   Vec<NodeIdx>,

    /// Euclidean length between the endpoint positions.
    pub edge_distance: Vec<f64>,

    /// Carbon emitted traversing the edge (`factor × distance`).
    pub edge_carbon: Vec<f64>,

    /// Monetary cost of traversing the edge (`factor × distance`).
    pub edge_cost: Vec<f64>,

    /// Salt the carbon/cost factors were derived with.
    pub weight_salt: u64,

    by_name: HashMap<String, NodeIdx>,
}

impl NetworkGraph {
    /// Construct a graph with no nodes.  Every query against it fails with
    /// `UnknownNode`.
    pub fn empty() -> Self {
        NetworkGraphBuilder::new().build(fleet_core::DEFAULT_WEIGHT_SALT)
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    // ── Name lookup ───────────────────────────────────────────────────────

    /// Resolve a node name to its index.
    #[inline]
    pub fn node(&self, name: &str) -> Option<NodeIdx> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    #[inline]
    pub fn name(&self, node: NodeIdx) -> &str {
        &self.node_names[node.index()]
    }

    #[inline]
    pub fn position(&self, node: NodeIdx) -> Point2 {
        self.node_pos[node.index()]
    }

    /// Position of a node looked up by name.
    pub fn position_of(&self, name: &str) -> Option<Point2> {
        self.node(name).map(|n| self.position(n))
    }

    /// Iterator over all node names in index order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.node_names.iter().map(String::as_str)
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeIdx`s of all outgoing edges from `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeIdx) -> impl Iterator<Item = EdgeIdx> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeIdx(i as u32))
    }

    /// Neighbors of `node` in edge order.
    pub fn neighbors(&self, node: NodeIdx) -> impl Iterator<Item = NodeIdx> + '_ {
        self.out_edges(node).map(|e| self.edge_to[e.index()])
    }

    /// First edge from `from` to `to`, if the two are adjacent.
    pub fn find_edge(&self, from: NodeIdx, to: NodeIdx) -> Option<EdgeIdx> {
        self.out_edges(from).find(|e| self.edge_to[e.index()] == to)
    }
}

// ── NetworkGraphBuilder ───────────────────────────────────────────────────────

/// Construct a [`NetworkGraph`] incrementally, then call [`build`](Self::build).
///
/// Nodes are named; links may reference nodes declared later.  Links whose
/// endpoints are never declared are dropped at build time with a warning.
///
/// # Example
///
/// ```
/// use fleet_core::Point2;
/// use fleet_routing::NetworkGraphBuilder;
///
/// let mut b = NetworkGraphBuilder::new();
/// b.add_node("A", Point2::new(0.0, 0.0));
/// b.add_node("B", Point2::new(3.0, 4.0));
/// b.add_link("A", "B");
/// let net = b.build(42);
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// assert_eq!(net.edge_distance[0], 5.0);
/// ```
pub struct NetworkGraphBuilder {
    names:     Vec<String>,
    positions: Vec<Point2>,
    by_name:   HashMap<String, NodeIdx>,
    links:     Vec<(String, String)>,
}

struct RawEdge {
    from:     NodeIdx,
    to:       NodeIdx,
    distance: f64,
    carbon:   f64,
    cost:     f64,
}

impl NetworkGraphBuilder {
    pub fn new() -> Self {
        Self {
            names:     Vec::new(),
            positions: Vec::new(),
            by_name:   HashMap::new(),
            links:     Vec::new(),
        }
    }

    /// Add a named node and return its index.
    ///
    /// Re-declaring an existing name moves that node to `pos` and returns
    /// its original index.
    pub fn add_node(&mut self, name: impl Into<String>, pos: Point2) -> NodeIdx {
        let name = name.into();
        if let Some(&idx) = self.by_name.get(&name) {
            self.positions[idx.index()] = pos;
            return idx;
        }
        let idx = NodeIdx(self.names.len() as u32);
        self.by_name.insert(name.clone(), idx);
        self.names.push(name);
        self.positions.push(pos);
        idx
    }

    /// Declare `neighbor` as adjacent to `node`.  Traversable both ways.
    pub fn add_link(&mut self, node: impl Into<String>, neighbor: impl Into<String>) {
        self.links.push((node.into(), neighbor.into()));
    }

    pub fn node_count(&self) -> usize { self.names.len() }
    pub fn link_count(&self) -> usize { self.links.len() }

    /// Consume the builder and produce a [`NetworkGraph`], deriving carbon
    /// and cost weights from `salt`.
    pub fn build(self, salt: u64) -> NetworkGraph {
        let node_count = self.names.len();

        let resolve = |name: &str| self.by_name.get(name).copied();
        let weigh = |from: NodeIdx, to: NodeIdx| {
            let distance = self.positions[from.index()].distance(self.positions[to.index()]);
            let factors  = EdgeRng::new(salt, &self.names[from.index()], &self.names[to.index()]).factors();
            RawEdge {
                from,
                to,
                distance,
                carbon: factors.carbon * distance,
                cost:   factors.cost * distance,
            }
        };

        let mut resolved: Vec<(NodeIdx, NodeIdx)> = Vec::with_capacity(self.links.len());
        let mut dangling = 0usize;
        for (a, b) in &self.links {
            match (resolve(a), resolve(b)) {
                (Some(a), Some(b)) if a != b => resolved.push((a, b)),
                (Some(_), Some(_)) => {} // self-loop
                _ => dangling += 1,
            }
        }
        if dangling > 0 {
            tracing::warn!(dangling, "ignoring links to undeclared nodes");
        }

        // Declared direction first, then reverse, skipping pairs already
        // present so mutual declarations do not double the edge.
        let mut seen: HashSet<(NodeIdx, NodeIdx)> = HashSet::with_capacity(resolved.len() * 2);
        let mut raw: Vec<RawEdge> = Vec::with_capacity(resolved.len() * 2);
        for &(a, b) in &resolved {
            if seen.insert((a, b)) {
                raw.push(weigh(a, b));
            }
        }
        for &(a, b) in &resolved {
            if seen.insert((b, a)) {
                raw.push(weigh(b, a));
            }
        }

        // Stable sort keeps the per-node order described in the module docs.
        raw.sort_by_key(|e| e.from.0);

        let edge_from:     Vec<NodeIdx> = raw.iter().map(|e| e.from).collect();
        let edge_to:       Vec<NodeIdx> = raw.iter().map(|e| e.to).collect();
        let edge_distance: Vec<f64>     = raw.iter().map(|e| e.distance).collect();
        let edge_carbon:   Vec<f64>     = raw.iter().map(|e| e.carbon).collect();
        let edge_cost:     Vec<f64>     = raw.iter().map(|e| e.cost).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, raw.len());

        NetworkGraph {
            node_names: self.names,
            node_pos: self.positions,
            node_out_start,
            edge_from,
            edge_to,
            edge_distance,
            edge_carbon,
            edge_cost,
            weight_salt: salt,
            by_name: self.by_name,
        }
    }
}

impl Default for NetworkGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
