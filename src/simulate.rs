//! Discrete-time stepping of the repelling walks.
//!
//! Each step has two phases:
//! 1. **Decide** (read-only): every walk gets a probability distribution over
//!    the neighbors of its location that lie in its support, computed from the
//!    visit counts as they were at the end of the previous step.
//! 2. **Commit**: one uniform draw per walk, taken in walk order from the
//!    shared generator, picks each destination; only then are all moves applied.
//!
//! Decisions never observe moves from the same step, so the order in which
//! walks are processed does not bias the outcome and a fixed seed reproduces
//! the whole trajectory. With the `parallel` feature the decide phase runs on
//! rayon; draws and commits stay serial.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::graph::{GraphRef, Vertex};
use crate::probability::{normalize_log, ProbabilityEngine};
use crate::walk::WalkSet;
use crate::{Error, Result};

/// Allowed deviation of a walk's probability sum from 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-3;

/// One candidate destination considered by a walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub vertex: Vertex,
    /// Unnormalized weight from the reinforcement law. May underflow to 0
    /// for large `alpha`; `probability` is computed from its logarithm.
    pub weight: f64,
    pub probability: f64,
}

/// Everything the simulator decided for one walk in one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Step being decided, starting at 1.
    pub step: usize,
    pub walk: usize,
    pub location: Vertex,
    /// Candidates in ascending vertex order.
    pub candidates: Vec<Candidate>,
    /// Uniform draw in `[0, 1)`.
    pub draw: f64,
    pub destination: Vertex,
}

/// Side channel notified as the simulation progresses.
///
/// Observers never feed back into the algorithm. `finish` is called exactly
/// once per [`Simulator::run`], also when the run aborts.
pub trait StepObserver {
    fn on_start(&mut self, _walks: &WalkSet) -> Result<()> {
        Ok(())
    }

    fn on_decision(&mut self, _decision: &Decision) -> Result<()> {
        Ok(())
    }

    fn on_commit(&mut self, _step: usize, _walks: &WalkSet) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl StepObserver for () {}

impl<T: StepObserver + ?Sized> StepObserver for &mut T {
    fn on_start(&mut self, walks: &WalkSet) -> Result<()> {
        (**self).on_start(walks)
    }

    fn on_decision(&mut self, decision: &Decision) -> Result<()> {
        (**self).on_decision(decision)
    }

    fn on_commit(&mut self, step: usize, walks: &WalkSet) -> Result<()> {
        (**self).on_commit(step, walks)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

impl<A: StepObserver, B: StepObserver> StepObserver for (A, B) {
    fn on_start(&mut self, walks: &WalkSet) -> Result<()> {
        self.0.on_start(walks)?;
        self.1.on_start(walks)
    }

    fn on_decision(&mut self, decision: &Decision) -> Result<()> {
        self.0.on_decision(decision)?;
        self.1.on_decision(decision)
    }

    fn on_commit(&mut self, step: usize, walks: &WalkSet) -> Result<()> {
        self.0.on_commit(step, walks)?;
        self.1.on_commit(step, walks)
    }

    fn finish(&mut self) -> Result<()> {
        // Both sides must get the chance to flush.
        let first = self.0.finish();
        let second = self.1.finish();
        first.and(second)
    }
}

/// The stepping loop over a graph, a set of walks and a reinforcement law.
#[derive(Debug)]
pub struct Simulator<'g, G: ?Sized> {
    graph: &'g G,
    walks: WalkSet,
    engine: ProbabilityEngine,
    rng: ChaCha8Rng,
    seed: u64,
    time: usize,
}

impl<'g, G: GraphRef + Sync + ?Sized> Simulator<'g, G> {
    pub fn new(graph: &'g G, walks: WalkSet, engine: ProbabilityEngine, seed: u64) -> Self {
        Self {
            graph,
            walks,
            engine,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            time: 0,
        }
    }

    /// Steps committed so far.
    pub fn time(&self) -> usize {
        self.time
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn graph(&self) -> &G {
        self.graph
    }

    pub fn walks(&self) -> &WalkSet {
        &self.walks
    }

    pub fn engine(&self) -> &ProbabilityEngine {
        &self.engine
    }

    /// Normalized transition distribution of walk `walk` at its location.
    pub fn transition_probabilities(&self, walk: usize) -> Result<Vec<Candidate>> {
        let cur = self
            .walks
            .get(walk)
            .ok_or_else(|| Error::Contract(format!("no walk w{walk}")))?;
        let location = cur.location();

        let mut candidates = Vec::new();
        let mut probs = Vec::new();
        for &v in self.graph.neighbors_ref(location) {
            if !cur.supports(v) {
                continue;
            }
            let reference = self.walks.walks_supporting(v)?;
            let log_weight = self.engine.log_weight(&reference, cur, v);
            candidates.push(Candidate {
                vertex: v,
                weight: log_weight.exp(),
                probability: 0.0,
            });
            probs.push(log_weight);
        }
        if candidates.is_empty() {
            return Err(Error::Contract(format!(
                "walk w{walk} at v{location} has no neighbor inside its support"
            )));
        }

        normalize_log(&mut probs);
        let sum: f64 = probs.iter().sum();
        if !((sum - 1.0).abs() <= PROBABILITY_TOLERANCE) {
            return Err(Error::Normalization {
                step: self.time + 1,
                walk,
                sum,
            });
        }
        for (c, p) in candidates.iter_mut().zip(probs) {
            c.probability = p;
        }
        Ok(candidates)
    }

    #[cfg(not(feature = "parallel"))]
    fn decide(&self) -> Result<Vec<Vec<Candidate>>> {
        (0..self.walks.len())
            .map(|i| self.transition_probabilities(i))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn decide(&self) -> Result<Vec<Vec<Candidate>>> {
        use rayon::prelude::*;

        (0..self.walks.len())
            .into_par_iter()
            .map(|i| self.transition_probabilities(i))
            .collect()
    }

    /// Advance every walk by one step.
    pub fn step<O: StepObserver + ?Sized>(&mut self, observer: &mut O) -> Result<()> {
        let plans = self.decide()?;
        let step = self.time + 1;

        let mut destinations = Vec::with_capacity(plans.len());
        for (walk, candidates) in plans.into_iter().enumerate() {
            let draw: f64 = self.rng.random();
            let destination = choose(&candidates, draw).ok_or_else(|| {
                Error::Contract(format!("walk w{walk} has no candidate at step {step}"))
            })?;
            let decision = Decision {
                step,
                walk,
                location: self.walks.as_slice()[walk].location(),
                candidates,
                draw,
                destination,
            };
            observer.on_decision(&decision)?;
            destinations.push(destination);
        }

        self.walks.commit(&destinations);
        self.time = step;
        debug!(step, ?destinations, "step committed");
        observer.on_commit(step, &self.walks)
    }

    /// Run `nsteps` steps and return every walk's path, `nsteps + 1`
    /// locations long (the start location included).
    pub fn run<O: StepObserver + ?Sized>(
        &mut self,
        nsteps: usize,
        observer: &mut O,
    ) -> Result<Vec<Vec<Vertex>>> {
        info!(
            vertices = self.graph.node_count(),
            walks = self.walks.len(),
            law = %self.engine.law(),
            alpha = self.engine.alpha(),
            epsilon = self.engine.epsilon(),
            seed = self.seed,
            nsteps,
            "starting simulation"
        );
        let outcome = self.run_steps(nsteps, observer);
        let flushed = observer.finish();
        let paths = outcome?;
        flushed?;
        info!(steps = self.time, "simulation finished");
        Ok(paths)
    }

    fn run_steps<O: StepObserver + ?Sized>(
        &mut self,
        nsteps: usize,
        observer: &mut O,
    ) -> Result<Vec<Vec<Vertex>>> {
        observer.on_start(&self.walks)?;
        let mut paths: Vec<Vec<Vertex>> = self
            .walks
            .iter()
            .map(|w| {
                let mut path = Vec::with_capacity(nsteps + 1);
                path.push(w.location());
                path
            })
            .collect();
        for _ in 0..nsteps {
            self.step(observer)?;
            for (path, walk) in paths.iter_mut().zip(self.walks.iter()) {
                path.push(walk.location());
            }
        }
        Ok(paths)
    }
}

/// First candidate whose cumulative probability exceeds `draw`.
///
/// Rounding can leave the cumulative sum just below `draw`; the last
/// candidate with positive probability is taken then.
fn choose(candidates: &[Candidate], draw: f64) -> Option<Vertex> {
    let mut cumulative = 0.0;
    for c in candidates {
        cumulative += c.probability;
        if cumulative > draw {
            return Some(c.vertex);
        }
    }
    candidates
        .iter()
        .rev()
        .find(|c| c.probability > 0.0)
        .or(candidates.last())
        .map(|c| c.vertex)
}
