//! Graph adapter trait and the undirected graph walked by the simulation.
//!
//! Public invariants:
//! - Adjacency is symmetric: `v ∈ neighbors(u) ⇔ u ∈ neighbors(v)`.
//! - Neighbor lists are ascending and duplicate-free, so iteration order is
//!   the vertex order (the simulator relies on this for reproducible draws).
//! - With self loops enabled every vertex is its own neighbor.

use crate::{Error, Result};

/// Vertex identifier in `[0, n)`.
pub type Vertex = usize;

/// A graph view that can return **borrowed** neighbor slices.
///
/// The simulator only needs this much of a graph. Implementations must
/// return neighbors in ascending order.
pub trait GraphRef {
    fn node_count(&self) -> usize;
    fn neighbors_ref(&self, node: Vertex) -> &[Vertex];
    fn out_degree(&self, node: Vertex) -> usize {
        self.neighbors_ref(node).len()
    }
}

/// Simple undirected graph over `n` vertices.
///
/// Two construction modes are supported:
/// - **complete**: every pair `(i, j), i ≠ j` is connected at construction time;
/// - **partitioned**: starts without edges (except self loops) and receives
///   clique edges per partition window through [`Graph::add_partition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    adj: Vec<Vec<Vertex>>,
    self_loops: bool,
}

impl Graph {
    pub fn new(nvertices: usize, complete: bool, self_loops: bool) -> Self {
        let mut adj: Vec<Vec<Vertex>> = vec![Vec::new(); nvertices];
        if complete {
            for (i, nbrs) in adj.iter_mut().enumerate() {
                // Already ascending, no need to go through `add_edge`.
                nbrs.extend((0..nvertices).filter(|&j| j != i || self_loops));
            }
        } else if self_loops {
            for (i, nbrs) in adj.iter_mut().enumerate() {
                nbrs.push(i);
            }
        }
        Self { adj, self_loops }
    }

    pub fn complete(nvertices: usize, self_loops: bool) -> Self {
        Self::new(nvertices, true, self_loops)
    }

    pub fn partitioned(nvertices: usize, self_loops: bool) -> Self {
        Self::new(nvertices, false, self_loops)
    }

    /// Number of vertices.
    pub fn order(&self) -> usize {
        self.adj.len()
    }

    pub fn has_self_loops(&self) -> bool {
        self.self_loops
    }

    /// All vertex ids, ascending.
    pub fn vertices(&self) -> Vec<Vertex> {
        (0..self.order()).collect()
    }

    /// Ascending neighbor list of `v`.
    pub fn neighbors(&self, v: Vertex) -> Result<&[Vertex]> {
        self.check(v)?;
        Ok(&self.adj[v])
    }

    pub fn has_edge(&self, u: Vertex, v: Vertex) -> bool {
        self.adj
            .get(u)
            .is_some_and(|nbrs| nbrs.binary_search(&v).is_ok())
    }

    /// Number of undirected edges, self loops counted once.
    pub fn edge_count(&self) -> usize {
        let mut twice = 0usize;
        let mut loops = 0usize;
        for (u, nbrs) in self.adj.iter().enumerate() {
            twice += nbrs.len();
            if nbrs.binary_search(&u).is_ok() {
                loops += 1;
            }
        }
        // Each self loop appears once in the adjacency, other edges twice.
        (twice - loops) / 2 + loops
    }

    /// Insert the undirected edge `{u, v}`. Duplicates are a no-op.
    pub fn add_edge(&mut self, u: Vertex, v: Vertex) -> Result<()> {
        self.check(u)?;
        self.check(v)?;
        insert_sorted(&mut self.adj[u], v);
        if u != v {
            insert_sorted(&mut self.adj[v], u);
        }
        Ok(())
    }

    /// Window of `k` consecutive vertices starting at `i`, wrapping modulo `n`.
    ///
    /// The result is ascending, so a wrapped window such as `{2, 0}` for
    /// `n = 3, k = 2` comes back as `[0, 2]`. `k == 0` selects every vertex.
    pub fn partition(&self, i: Vertex, k: usize) -> Result<Vec<Vertex>> {
        let n = self.order();
        if k > n {
            return Err(Error::Config(format!(
                "partition size {k} exceeds number of vertices {n}"
            )));
        }
        self.check(i)?;
        if k == 0 {
            return Ok(self.vertices());
        }
        let mut window: Vec<Vertex> = (i..i + k).map(|v| v % n).collect();
        window.sort_unstable();
        window.dedup();
        Ok(window)
    }

    /// Compute `partition(i, k)` and make it a complete subgraph.
    pub fn add_partition(&mut self, i: Vertex, k: usize) -> Result<Vec<Vertex>> {
        let window = self.partition(i, k)?;
        for (a, &u) in window.iter().enumerate() {
            for &v in &window[a + 1..] {
                self.add_edge(u, v)?;
            }
        }
        Ok(window)
    }

    fn check(&self, v: Vertex) -> Result<()> {
        if v < self.order() {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                vertex: v,
                order: self.order(),
            })
        }
    }
}

impl GraphRef for Graph {
    fn node_count(&self) -> usize {
        self.order()
    }

    fn neighbors_ref(&self, node: Vertex) -> &[Vertex] {
        self.adj.get(node).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn insert_sorted(list: &mut Vec<Vertex>, v: Vertex) {
    if let Err(pos) = list.binary_search(&v) {
        list.insert(pos, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_symmetric(g: &Graph) {
        for u in g.vertices() {
            for &v in g.neighbors(u).unwrap() {
                assert!(g.has_edge(v, u), "edge {u} -> {v} has no reverse");
            }
        }
    }

    #[test]
    fn complete_graph_with_self_loops() {
        let g = Graph::complete(3, true);
        assert_eq!(g.order(), 3);
        for v in 0..3 {
            assert_eq!(g.neighbors(v).unwrap(), &[0, 1, 2]);
        }
        assert_eq!(g.edge_count(), 6);
        assert_symmetric(&g);
    }

    #[test]
    fn complete_graph_without_self_loops() {
        let g = Graph::complete(3, false);
        assert_eq!(g.neighbors(1).unwrap(), &[0, 2]);
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn partitioned_graph_starts_with_self_loops_only() {
        let g = Graph::partitioned(4, true);
        for v in 0..4 {
            assert_eq!(g.neighbors(v).unwrap(), &[v]);
        }
        let g = Graph::partitioned(4, false);
        assert!(g.neighbors(2).unwrap().is_empty());
    }

    #[test]
    fn add_edge_is_idempotent_and_symmetric() {
        let mut g = Graph::partitioned(3, false);
        g.add_edge(2, 0).unwrap();
        g.add_edge(0, 2).unwrap();
        g.add_edge(2, 0).unwrap();
        assert_eq!(g.neighbors(0).unwrap(), &[2]);
        assert_eq!(g.neighbors(2).unwrap(), &[0]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn out_of_range_is_reported() {
        let mut g = Graph::complete(2, true);
        assert!(matches!(
            g.neighbors(2),
            Err(Error::OutOfRange { vertex: 2, order: 2 })
        ));
        assert!(g.add_edge(0, 5).is_err());
        assert!(g.neighbors_ref(9).is_empty());
    }

    #[test]
    fn partition_wraps_around() {
        let g = Graph::partitioned(3, true);
        assert_eq!(g.partition(0, 2).unwrap(), vec![0, 1]);
        assert_eq!(g.partition(1, 2).unwrap(), vec![1, 2]);
        assert_eq!(g.partition(2, 2).unwrap(), vec![0, 2]);
    }

    #[test]
    fn partition_zero_is_whole_graph_and_oversize_fails() {
        let g = Graph::partitioned(3, true);
        assert_eq!(g.partition(1, 0).unwrap(), vec![0, 1, 2]);
        assert_eq!(g.partition(2, 3).unwrap(), vec![0, 1, 2]);
        assert!(matches!(g.partition(0, 4), Err(Error::Config(_))));
    }

    #[test]
    fn add_partition_builds_cliques() {
        let mut g = Graph::partitioned(5, true);
        for i in 0..5 {
            g.add_partition(i, 3).unwrap();
        }
        assert_symmetric(&g);
        // Window {4, 0, 1} links 4 and 1 across the wrap.
        assert!(g.has_edge(4, 1));
        // {3, 4, 0}
        assert!(g.has_edge(0, 3));
        assert_eq!(g.neighbors(2).unwrap(), &[0, 1, 2, 3, 4]);
    }
}
