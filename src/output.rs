//! Observers that turn a run into files: a textual trace and a visit table.
//!
//! Both writers take any [`Write`] sink. Callers own the sink; `finish`
//! flushes it and is invoked by [`Simulator::run`](crate::Simulator::run)
//! on every exit path.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::graph::Vertex;
use crate::simulate::{Decision, StepObserver};
use crate::walk::WalkSet;
use crate::{Error, Result};

/// How a visit-table cell is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// `nvisits(w, v) / Σ_w' nvisits(w', v)`, three decimals.
    #[default]
    Normalized,
    /// Raw visit count.
    Raw,
    /// Per-walk view: `nvisits(w, v) / total_visits(w)`, three decimals.
    Share,
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normalized => "normalized",
            Self::Raw => "raw",
            Self::Share => "share",
        })
    }
}

impl FromStr for DataFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normalized" | "norm" => Ok(Self::Normalized),
            "raw" | "count" | "counts" => Ok(Self::Raw),
            "share" => Ok(Self::Share),
            other => Err(Error::Config(format!(
                "unknown data format \"{other}\" (expected normalized, raw or share)"
            ))),
        }
    }
}

/// Step × (walk, vertex) table, tab separated.
///
/// The header names one column per vertex of each walk's support
/// (`w0v0`, `w0v1`, …) after a leading `t` column. One row is written for
/// the initial state and one per committed step.
pub struct VisitTable<W: Write> {
    out: W,
    format: DataFormat,
}

impl<W: Write> VisitTable<W> {
    pub fn new(out: W, format: DataFormat) -> Self {
        Self { out, format }
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_header(&mut self, walks: &WalkSet) -> Result<()> {
        write!(self.out, "t")?;
        for walk in walks {
            for &v in walk.support() {
                write!(self.out, "\tw{}v{}", walk.id(), v)?;
            }
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn write_row(&mut self, step: usize, walks: &WalkSet) -> Result<()> {
        write!(self.out, "{step}")?;
        for walk in walks {
            for &v in walk.support() {
                let nvis = walk.nvisits(v);
                match self.format {
                    DataFormat::Raw => write!(self.out, "\t{nvis}")?,
                    DataFormat::Normalized => {
                        let total = walks.aggregate_visits(v, None);
                        write!(self.out, "\t{:.3}", nvis as f64 / total as f64)?
                    }
                    DataFormat::Share => write!(self.out, "\t{:.3}", walk.share(v))?,
                }
            }
        }
        writeln!(self.out)?;
        Ok(())
    }
}

impl<W: Write> StepObserver for VisitTable<W> {
    fn on_start(&mut self, walks: &WalkSet) -> Result<()> {
        self.write_header(walks)?;
        self.write_row(0, walks)
    }

    fn on_commit(&mut self, step: usize, walks: &WalkSet) -> Result<()> {
        self.write_row(step, walks)
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Ordered, human-readable trace of every decision.
///
/// ```text
/// loc(w0, t=0)=v0
/// G(w0)=[0, 1]
/// t=1
///   loc(w0)=v0
///     Pr(w0, v0)=0.6225 (weight 0.6065)
///     Pr(w0, v1)=0.3775 (weight 0.3679)
///     rand=0.412, w0 goto v1
/// ```
pub struct TraceLog<W: Write> {
    out: W,
    last_step: usize,
}

impl<W: Write> TraceLog<W> {
    pub fn new(out: W) -> Self {
        Self { out, last_step: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StepObserver for TraceLog<W> {
    fn on_start(&mut self, walks: &WalkSet) -> Result<()> {
        for walk in walks {
            writeln!(self.out, "loc(w{}, t=0)=v{}", walk.id(), walk.location())?;
            writeln!(self.out, "G(w{})={:?}", walk.id(), walk.support())?;
        }
        Ok(())
    }

    fn on_decision(&mut self, d: &Decision) -> Result<()> {
        if d.step != self.last_step {
            writeln!(self.out, "t={}", d.step)?;
            self.last_step = d.step;
        }
        writeln!(self.out, "  loc(w{})=v{}", d.walk, d.location)?;
        for c in &d.candidates {
            writeln!(
                self.out,
                "    Pr(w{}, v{})={:.4} (weight {:.4})",
                d.walk, c.vertex, c.probability, c.weight
            )?;
        }
        writeln!(
            self.out,
            "    rand={:.3}, w{} goto v{}",
            d.draw, d.walk, d.destination
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// In-memory record of committed destinations, `(step, walk, vertex)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trajectory {
    moves: Vec<(usize, usize, Vertex)>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moves(&self) -> &[(usize, usize, Vertex)] {
        &self.moves
    }

    /// Destinations of one walk, in step order.
    pub fn destinations(&self, walk: usize) -> Vec<Vertex> {
        self.moves
            .iter()
            .filter(|&&(_, w, _)| w == walk)
            .map(|&(_, _, v)| v)
            .collect()
    }
}

impl StepObserver for Trajectory {
    fn on_decision(&mut self, d: &Decision) -> Result<()> {
        self.moves.push((d.step, d.walk, d.destination));
        Ok(())
    }
}
