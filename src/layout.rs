//! Graphs and walks read from a layout file.
//!
//! One row per vertex, whitespace separated. The first column lists the
//! neighbors of the vertex (`1,2,3`, or `-` for none); each remaining column
//! belongs to one walk and holds its initial visit count at that vertex.
//! A leading `*` marks the walk's start location, and `-` leaves the vertex
//! out of the walk's support. Blank lines and lines starting with `#` are
//! skipped.
//!
//! ```text
//! # adjacency  w0   w1
//! 1,2          *1   3
//! 0,2          2    -
//! 0,1          1    *1
//! ```
//!
//! Edges are undirected, so listing each one on either endpoint's row is
//! enough. Counts must be at least [`INITIAL_VISITS`]; every walk needs
//! exactly one start marker.

use std::path::Path;

use tracing::debug;

use crate::graph::{Graph, Vertex};
use crate::walk::{Walk, WalkSet, INITIAL_VISITS};
use crate::{Error, Result};

const START_MARK: char = '*';
const NONE_MARK: &str = "-";

/// A graph and the walks placed on it.
#[derive(Debug, Clone)]
pub struct Layout {
    pub graph: Graph,
    pub walks: WalkSet,
}

/// One parsed row, before the graph exists.
struct Row {
    line: usize,
    neighbors: Vec<Vertex>,
    /// Per walk: `None` outside the support, else `(count, is_start)`.
    cells: Vec<Option<(u64, bool)>>,
}

impl Layout {
    /// Read a layout file.
    pub fn load(path: impl AsRef<Path>, self_loops: bool) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read layout file {}: {e}", path.display()))
        })?;
        Self::parse(&text, self_loops)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), config_message(e))))
    }

    /// Parse the layout format described in the module docs.
    pub fn parse(text: &str, self_loops: bool) -> Result<Self> {
        let mut rows: Vec<Row> = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let row = raw.trim();
            if row.is_empty() || row.starts_with('#') {
                continue;
            }
            let cols: Vec<&str> = row.split_whitespace().collect();
            if cols.len() < 2 {
                return Err(bad(line, "no walk column"));
            }
            if let Some(first) = rows.first() {
                if cols.len() - 1 != first.cells.len() {
                    return Err(bad(
                        line,
                        &format!(
                            "expected {} columns, found {}",
                            first.cells.len() + 1,
                            cols.len()
                        ),
                    ));
                }
            }
            rows.push(Row {
                line,
                neighbors: parse_neighbors(line, cols[0])?,
                cells: cols[1..]
                    .iter()
                    .map(|c| parse_cell(line, c))
                    .collect::<Result<_>>()?,
            });
        }
        if rows.is_empty() {
            return Err(Error::Config("layout has no vertices".into()));
        }

        let n = rows.len();
        let mut graph = Graph::partitioned(n, self_loops);
        for (u, row) in rows.iter().enumerate() {
            for &v in &row.neighbors {
                if v >= n {
                    return Err(bad(
                        row.line,
                        &format!("neighbor v{v} out of range for {n} vertices"),
                    ));
                }
                graph.add_edge(u, v)?;
            }
        }

        let nwalks = rows[0].cells.len();
        let mut walks = Vec::with_capacity(nwalks);
        for w in 0..nwalks {
            let mut counts = Vec::new();
            let mut start: Option<Vertex> = None;
            for (v, row) in rows.iter().enumerate() {
                let Some((count, is_start)) = row.cells[w] else {
                    continue;
                };
                if is_start {
                    if start.is_some() {
                        return Err(bad(
                            row.line,
                            &format!("second start marker for walk w{w}"),
                        ));
                    }
                    start = Some(v);
                }
                counts.push((v, count));
            }
            let start = start
                .ok_or_else(|| Error::Config(format!("walk w{w} has no start marker")))?;
            walks.push(Walk::with_visits(w, counts, start)?);
        }
        let walks = WalkSet::new(walks, n)?;
        debug!(vertices = n, walks = walks.len(), edges = graph.edge_count(), "layout parsed");
        Ok(Self { graph, walks })
    }
}

fn parse_neighbors(line: usize, col: &str) -> Result<Vec<Vertex>> {
    if col == NONE_MARK {
        return Ok(Vec::new());
    }
    col.split(',')
        .map(|tok| {
            tok.trim()
                .parse::<Vertex>()
                .map_err(|_| bad(line, &format!("invalid neighbor \"{tok}\"")))
        })
        .collect()
}

fn parse_cell(line: usize, col: &str) -> Result<Option<(u64, bool)>> {
    if col == NONE_MARK {
        return Ok(None);
    }
    let (digits, is_start) = match col.strip_prefix(START_MARK) {
        Some(rest) => (rest, true),
        None => (col, false),
    };
    let count: u64 = digits
        .parse()
        .map_err(|_| bad(line, &format!("invalid visit count \"{col}\"")))?;
    if count < INITIAL_VISITS {
        return Err(bad(
            line,
            &format!("visit count {count} below {INITIAL_VISITS}"),
        ));
    }
    Ok(Some((count, is_start)))
}

fn bad(line: usize, msg: &str) -> Error {
    Error::Config(format!("line {line}: {msg}"))
}

/// Message of a `Config` error without its prefix, for re-wrapping.
fn config_message(e: Error) -> String {
    match e {
        Error::Config(msg) => msg,
        other => other.to_string(),
    }
}
