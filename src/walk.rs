//! Walker state: allowed support, current location and visit counts.

use crate::graph::Vertex;
use crate::{Error, Result};

/// Visit count every support vertex starts with.
///
/// The phantom visit keeps every normalizing total at least 1.
pub const INITIAL_VISITS: u64 = 1;

/// One walker.
///
/// `support` is ascending and duplicate-free; `visits[i]` is the count for
/// `support[i]` and is never below [`INITIAL_VISITS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    id: usize,
    support: Vec<Vertex>,
    visits: Vec<u64>,
    location: Vertex,
}

impl Walk {
    pub fn new(id: usize, mut support: Vec<Vertex>, start: Vertex) -> Result<Self> {
        support.sort_unstable();
        support.dedup();
        if support.is_empty() {
            return Err(Error::Contract(format!("walk w{id} has an empty support")));
        }
        if support.binary_search(&start).is_err() {
            return Err(Error::Contract(format!(
                "walk w{id} starts at v{start}, outside its support {support:?}"
            )));
        }
        let visits = vec![INITIAL_VISITS; support.len()];
        Ok(Self {
            id,
            support,
            visits,
            location: start,
        })
    }

    /// Walk with explicit initial visit counts, one `(vertex, count)` pair
    /// per support vertex.
    ///
    /// Counts below [`INITIAL_VISITS`] and repeated vertices are rejected.
    pub fn with_visits(id: usize, mut counts: Vec<(Vertex, u64)>, start: Vertex) -> Result<Self> {
        counts.sort_unstable_by_key(|&(v, _)| v);
        if let Some(pair) = counts.windows(2).find(|p| p[0].0 == p[1].0) {
            return Err(Error::Contract(format!(
                "walk w{id} lists v{} twice",
                pair[0].0
            )));
        }
        if let Some(&(v, n)) = counts.iter().find(|&&(_, n)| n < INITIAL_VISITS) {
            return Err(Error::Contract(format!(
                "walk w{id} starts with {n} visits at v{v}, at least {INITIAL_VISITS} required"
            )));
        }
        let (support, visits): (Vec<Vertex>, Vec<u64>) = counts.into_iter().unzip();
        let mut walk = Self::new(id, support, start)?;
        walk.visits = visits;
        Ok(walk)
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn location(&self) -> Vertex {
        self.location
    }

    pub fn support(&self) -> &[Vertex] {
        &self.support
    }

    /// Visit counts aligned with [`Walk::support`].
    pub fn visits(&self) -> &[u64] {
        &self.visits
    }

    pub fn supports(&self, v: Vertex) -> bool {
        self.support.binary_search(&v).is_ok()
    }

    /// Move to `v` and count the visit.
    ///
    /// # Panics
    ///
    /// If `v` is not in the support. Destinations are drawn from the support,
    /// so reaching this is a bug in the caller.
    pub fn visit(&mut self, v: Vertex) {
        let idx = match self.support.binary_search(&v) {
            Ok(idx) => idx,
            Err(_) => panic!(
                "walk w{} cannot visit v{v}: not in support {:?}",
                self.id, self.support
            ),
        };
        self.visits[idx] += 1;
        self.location = v;
    }

    /// Visits to `v`, or 0 when `v` is outside the support.
    pub fn nvisits(&self, v: Vertex) -> u64 {
        self.support
            .binary_search(&v)
            .map(|idx| self.visits[idx])
            .unwrap_or(0)
    }

    pub fn total_visits(&self) -> u64 {
        self.visits.iter().sum()
    }

    /// Fraction of this walk's own visits that landed on `v`.
    pub fn share(&self, v: Vertex) -> f64 {
        self.nvisits(v) as f64 / self.total_visits() as f64
    }
}

/// Ordered collection of walks plus a vertex → supporting walks index.
///
/// Supports are fixed once a walk exists, so the index is built once.
#[derive(Debug, Clone)]
pub struct WalkSet {
    walks: Vec<Walk>,
    supporters: Vec<Vec<usize>>,
}

impl WalkSet {
    /// `order` is the vertex count of the graph the walks live on.
    pub fn new(walks: Vec<Walk>, order: usize) -> Result<Self> {
        let mut supporters: Vec<Vec<usize>> = vec![Vec::new(); order];
        for (i, walk) in walks.iter().enumerate() {
            if walk.id != i {
                return Err(Error::Contract(format!(
                    "walk at position {i} has id w{}",
                    walk.id
                )));
            }
            for &v in &walk.support {
                match supporters.get_mut(v) {
                    Some(list) => list.push(i),
                    None => {
                        return Err(Error::Contract(format!(
                            "walk w{i} supports v{v}, graph has {order} vertices"
                        )))
                    }
                }
            }
        }
        Ok(Self { walks, supporters })
    }

    pub fn len(&self) -> usize {
        self.walks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walks.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Walk> {
        self.walks.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Walk> {
        self.walks.iter()
    }

    pub fn as_slice(&self) -> &[Walk] {
        &self.walks
    }

    pub fn locations(&self) -> Vec<Vertex> {
        self.walks.iter().map(Walk::location).collect()
    }

    /// Walks allowed to occupy `v`, in walk order.
    ///
    /// Fails when no walk supports `v`: every reachable vertex must belong to
    /// at least one support.
    pub fn walks_supporting(&self, v: Vertex) -> Result<Vec<&Walk>> {
        let idx = self.supporters.get(v).map(Vec::as_slice).unwrap_or(&[]);
        if idx.is_empty() {
            return Err(Error::Contract(format!("no walk supports vertex v{v}")));
        }
        Ok(idx.iter().map(|&i| &self.walks[i]).collect())
    }

    /// Sum of `nvisits(v)` over all walks, optionally skipping walk `excluding`.
    pub fn aggregate_visits(&self, v: Vertex, excluding: Option<usize>) -> u64 {
        let idx = self.supporters.get(v).map(Vec::as_slice).unwrap_or(&[]);
        idx.iter()
            .filter(|&&i| Some(i) != excluding)
            .map(|&i| self.walks[i].nvisits(v))
            .sum()
    }

    /// Apply one destination per walk, in walk order.
    ///
    /// # Panics
    ///
    /// If `destinations.len() != self.len()` or a destination is outside the
    /// corresponding support.
    pub fn commit(&mut self, destinations: &[Vertex]) {
        assert_eq!(
            destinations.len(),
            self.walks.len(),
            "one destination per walk"
        );
        for (walk, &v) in self.walks.iter_mut().zip(destinations) {
            walk.visit(v);
        }
    }
}

impl<'a> IntoIterator for &'a WalkSet {
    type Item = &'a Walk;
    type IntoIter = std::slice::Iter<'a, Walk>;

    fn into_iter(self) -> Self::IntoIter {
        self.walks.iter()
    }
}
