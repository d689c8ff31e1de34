//! `rrwg`: repelling vertex-reinforced random walks on graphs.
//!
//! Several walkers move in lock-step over an undirected graph. Each one is
//! drawn toward vertices the *other* walkers have visited less, following an
//! exponential or power reinforcement law.
//!
//! Public invariants (must not drift):
//! - **Seeded counts**: every vertex of a walk's support starts with one
//!   visit, so normalizing totals are never zero.
//! - **Batched commit**: all walks decide on the state of the previous step
//!   before any of them moves.
//! - **Determinism**: a fixed seed reproduces the full trajectory, with or
//!   without the `parallel` feature.
//! - **Node order**: neighbors and supports are iterated in ascending vertex
//!   order.
//!
//! ```
//! use rrwg::{Graph, ProbabilityEngine, ReinforcementLaw, Simulator, Walk, WalkSet};
//!
//! let graph = Graph::complete(3, true);
//! let walks = (0..3)
//!     .map(|i| Walk::new(i, graph.vertices(), i))
//!     .collect::<rrwg::Result<Vec<_>>>()?;
//! let walks = WalkSet::new(walks, graph.order())?;
//! let engine = ProbabilityEngine::new(ReinforcementLaw::Exponential, 1.0, 0.0);
//!
//! let mut sim = Simulator::new(&graph, walks, engine, 42);
//! let paths = sim.run(100, &mut ())?;
//! assert!(paths.iter().all(|p| p.len() == 101));
//! # Ok::<(), rrwg::Error>(())
//! ```

pub mod config;
pub mod graph;
pub mod layout;
pub mod output;
pub mod probability;
pub mod setup;
pub mod simulate;
pub mod walk;

pub use config::{Config, GraphType, RawConfig, DEFAULT_CONFIG_FILE, MAX_SEED};
pub use graph::{Graph, GraphRef, Vertex};
pub use layout::Layout;
pub use output::{DataFormat, TraceLog, Trajectory, VisitTable};
pub use probability::{normalize, normalize_log, ProbabilityEngine, ReinforcementLaw};
pub use setup::{build, Model};
pub use simulate::{Candidate, Decision, Simulator, StepObserver, PROBABILITY_TOLERANCE};
pub use walk::{Walk, WalkSet, INITIAL_VISITS};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vertex {vertex} out of range for a graph of order {order}")]
    OutOfRange { vertex: usize, order: usize },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("contract violation: {0}")]
    Contract(String),
    #[error("step {step}: transition probabilities of walk w{walk} sum to {sum}")]
    Normalization { step: usize, walk: usize, sum: f64 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
