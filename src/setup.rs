//! Builds the graph, the walks and the engine described by a [`Config`].

use rand::Rng;
use tracing::{debug, info};

use crate::config::{Config, GraphType, MAX_SEED};
use crate::graph::Graph;
use crate::layout::Layout;
use crate::probability::ProbabilityEngine;
use crate::simulate::Simulator;
use crate::walk::{Walk, WalkSet};
use crate::{Error, Result};

/// Everything a run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct Model {
    pub graph: Graph,
    pub walks: WalkSet,
    pub engine: ProbabilityEngine,
    /// Seed actually used: the configured one, or a fresh random one.
    pub seed: u64,
}

impl Model {
    /// Hand the walks to a simulator borrowing this model's graph.
    pub fn simulator(&self) -> Simulator<'_, Graph> {
        Simulator::new(&self.graph, self.walks.clone(), self.engine, self.seed)
    }
}

/// Build the model for `config`.
///
/// - complete: one complete graph, `config.walks` walks over all vertices,
///   walk `i` starting at `i mod n`;
/// - partitions: walk `i` lives on `partition(i, k)`, starts at `i`, and the
///   window is turned into a clique before the walk is created;
/// - file: graph, walks and initial counts come from the layout file.
///
/// Fails with a `Config` error when some walk could reach a vertex with no
/// neighbor inside its support.
pub fn build(config: &Config) -> Result<Model> {
    let n = config.vertices;
    let (graph, walks) = match config.graph_type {
        GraphType::Complete => {
            let graph = Graph::complete(n, config.self_loops);
            let walks = (0..config.walks)
                .map(|i| Walk::new(i, graph.vertices(), i % n))
                .collect::<Result<Vec<_>>>()?;
            (graph, WalkSet::new(walks, n)?)
        }
        GraphType::Partitions => {
            let k = config.partition_size.unwrap_or(0);
            let mut graph = Graph::partitioned(n, config.self_loops);
            let mut walks = Vec::with_capacity(n);
            for i in 0..n {
                let window = graph.add_partition(i, k)?;
                debug!(walk = i, ?window, "partition");
                walks.push(Walk::new(i, window, i)?);
            }
            (graph, WalkSet::new(walks, n)?)
        }
        GraphType::File => {
            let path = config
                .input
                .as_deref()
                .ok_or_else(|| Error::Config("required key \"input\" is not set".into()))?;
            let Layout { graph, walks } = Layout::load(path, config.self_loops)?;
            for (key, want, got) in [
                ("vertices", config.vertices, graph.order()),
                ("walks", config.walks, walks.len()),
            ] {
                if want != 0 && want != got {
                    return Err(Error::Config(format!(
                        "{path} has {got} {key}, configuration says {want}"
                    )));
                }
            }
            (graph, walks)
        }
    };
    check_moves(&graph, &walks)?;
    let engine = ProbabilityEngine::new(config.law(), config.alpha, config.epsilon);
    let seed = config
        .seed
        .unwrap_or_else(|| rand::rng().random_range(0..=MAX_SEED));

    info!(
        graph_type = %config.graph_type,
        vertices = graph.order(),
        edges = graph.edge_count(),
        self_loops = graph.has_self_loops(),
        walks = walks.len(),
        seed,
        "model built"
    );
    Ok(Model {
        graph,
        walks,
        engine,
        seed,
    })
}

/// Every support vertex of every walk must have a neighbor in that support.
///
/// Walks only move inside their support, so this rules out a walk getting
/// stuck at any point of the run.
fn check_moves(graph: &Graph, walks: &WalkSet) -> Result<()> {
    for walk in walks {
        for &v in walk.support() {
            let nbrs = graph.neighbors(v)?;
            if !nbrs.iter().any(|&u| walk.supports(u)) {
                return Err(Error::Config(format!(
                    "walk w{} would be stuck at v{v}: no neighbor inside its support{}",
                    walk.id(),
                    if graph.has_self_loops() {
                        ""
                    } else {
                        " (self_loops is off)"
                    }
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probability::ReinforcementLaw;

    fn config(text: &str) -> Config {
        Config::from_toml_str(text).unwrap()
    }

    #[test]
    fn complete_mode_places_walk_i_at_vertex_i() {
        let cfg = config("vertices = 3\ntime = 5\nfunction = \"EXP\"\nseed = 1");
        let model = build(&cfg).unwrap();
        assert_eq!(model.graph.order(), 3);
        assert_eq!(model.walks.len(), 3);
        assert_eq!(model.walks.locations(), vec![0, 1, 2]);
        for w in &model.walks {
            assert_eq!(w.support(), &[0, 1, 2]);
        }
        assert_eq!(model.engine.law(), ReinforcementLaw::Exponential);
        assert_eq!(model.seed, 1);
    }

    #[test]
    fn extra_walks_wrap_around_vertices() {
        let cfg = config("vertices = 2\ntime = 5\nfunction = \"POW\"\nwalks = 5");
        let model = build(&cfg).unwrap();
        assert_eq!(model.walks.locations(), vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn partitioned_mode_uses_windows() {
        let cfg = config(
            "type = \"partitions\"\nvertices = 3\ntime = 5\npartition_size = 2\nalpha = 2.0\nepsilon = 0.5",
        );
        let model = build(&cfg).unwrap();
        let supports: Vec<Vec<usize>> = model.walks.iter().map(|w| w.support().to_vec()).collect();
        assert_eq!(supports, vec![vec![0, 1], vec![1, 2], vec![0, 2]]);
        assert_eq!(model.walks.locations(), vec![0, 1, 2]);
        assert!(model.graph.has_edge(2, 0));
        assert_eq!(model.engine.law(), ReinforcementLaw::Power);
        assert_eq!(model.engine.alpha(), 2.0);
        assert_eq!(model.engine.epsilon(), 0.5);
    }

    #[test]
    fn model_runs() {
        let cfg = config("type = \"partitions\"\nvertices = 6\ntime = 50\npartition_size = 3\nseed = 4");
        let model = build(&cfg).unwrap();
        let mut sim = model.simulator();
        let paths = sim.run(cfg.time, &mut ()).unwrap();
        for (walk, path) in sim.walks().iter().zip(&paths) {
            assert!(path.iter().all(|&v| walk.supports(v)));
        }
    }

    #[test]
    fn file_layout_builds_the_described_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triangle.txt");
        std::fs::write(&path, "1,2 *1 3\n0,2 2 -\n0,1 1 *1\n").unwrap();
        let text = format!(
            "type = \"file\"\ninput = {:?}\ntime = 10\nfunction = \"EXP\"\nseed = 2",
            path.display().to_string()
        );
        let model = build(&config(&text)).unwrap();
        assert_eq!(model.graph.order(), 3);
        assert_eq!(model.walks.locations(), vec![0, 2]);
        assert_eq!(model.walks.get(1).unwrap().visits(), &[3, 1]);
        let paths = model.simulator().run(10, &mut ()).unwrap();
        assert!(paths[1].iter().all(|&v| v != 1));

        let err = build(&config(&format!("{text}\nvertices = 4"))).unwrap_err();
        assert!(err.to_string().contains("3 vertices"), "{err}");
    }

    #[test]
    fn stuck_walks_are_a_configuration_error() {
        // w0 may visit v0 and v2, which are not adjacent.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("split.txt");
        std::fs::write(&path, "1 *1\n0,2 -\n1 1\n").unwrap();
        let text = format!(
            "type = \"file\"\ninput = {:?}\ntime = 10\nfunction = \"EXP\"\nself_loops = false",
            path.display().to_string()
        );
        let err = build(&config(&text)).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err}");
        assert!(err.to_string().contains("w0 would be stuck at v0"), "{err}");
    }

    #[test]
    fn unseeded_models_draw_a_replayable_seed() {
        let cfg = config("vertices = 2\ntime = 5\nfunction = \"EXP\"");
        assert!(build(&cfg).unwrap().seed <= MAX_SEED);
    }
}
