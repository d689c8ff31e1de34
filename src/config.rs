//! Simulation configuration.
//!
//! Configuration files are TOML. Keys live either at the top level or in a
//! `[default]` table:
//!
//! ```toml
//! [default]
//! type = "partitions"
//! vertices = 5
//! time = 1000
//! alpha = 1.5
//! epsilon = 0.1
//! partition_size = 3
//! seed = 42
//! ```
//!
//! Everything is validated here, before any graph or walk is built. With
//! `type = "file"` the graph and the walks come from the layout file named by
//! `input` (see [`crate::layout`]); that file is read and checked by
//! [`crate::build`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::output::DataFormat;
use crate::probability::ReinforcementLaw;
use crate::{Error, Result};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "rrwg.conf";

/// Default prefix of the `.dat` / `.log` output files.
pub const DEFAULT_OUTPUT: &str = "rrwg";

/// Largest accepted seed. TOML integers are signed 64-bit, so larger seeds
/// could not be written back to a configuration file.
pub const MAX_SEED: u64 = i64::MAX as u64;

/// How walks and edges are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    /// Complete graph; every walk may visit every vertex.
    #[default]
    Complete,
    /// Overlapping complete windows; walk `i` lives on `partition(i, k)`.
    Partitions,
    /// Graph, walks and initial counts read from a layout file.
    File,
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Complete => "complete",
            Self::Partitions => "partitions",
            Self::File => "file",
        })
    }
}

impl FromStr for GraphType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "complete" => Ok(Self::Complete),
            "partitions" | "partitioned" => Ok(Self::Partitions),
            "file" => Ok(Self::File),
            other => Err(Error::Config(format!(
                "unknown graph type \"{other}\" (expected complete, partitions or file)"
            ))),
        }
    }
}

/// Keys as they appear in the file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(rename = "type")]
    pub graph_type: Option<String>,
    pub vertices: Option<usize>,
    pub time: Option<usize>,
    pub function: Option<String>,
    pub alpha: Option<f64>,
    pub epsilon: Option<f64>,
    pub partition_size: Option<usize>,
    pub seed: Option<u64>,
    pub self_loops: Option<bool>,
    pub walks: Option<usize>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub data: Option<String>,
    pub trace: Option<bool>,
}

/// Validated, immutable configuration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "type")]
    pub graph_type: GraphType,
    /// Number of vertices; 0 for file layouts means "whatever the file has".
    pub vertices: usize,
    /// Number of steps.
    pub time: usize,
    pub function: ReinforcementLawName,
    pub alpha: f64,
    pub epsilon: f64,
    /// Window size; only set for [`GraphType::Partitions`].
    pub partition_size: Option<usize>,
    pub seed: Option<u64>,
    pub self_loops: bool,
    /// Number of walks; equals `vertices` for partitioned graphs. 0 for file
    /// layouts means "whatever the file has".
    pub walks: usize,
    /// Layout file, only set for [`GraphType::File`].
    pub input: Option<String>,
    pub output: String,
    pub data: DataFormat,
    pub trace: bool,
}

/// Serializable wrapper around [`ReinforcementLaw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReinforcementLawName(pub ReinforcementLaw);

impl TryFrom<String> for ReinforcementLawName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Ok(Self(s.parse()?))
    }
}

impl From<ReinforcementLawName> for String {
    fn from(name: ReinforcementLawName) -> Self {
        name.0.as_str().to_string()
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut table: toml::Table = text.parse()?;
        // Accept the INI-style `[default]` section as well as top-level keys.
        if let Some(toml::Value::Table(section)) = table.remove("default") {
            table.extend(section);
        }
        let raw: RawConfig = toml::Value::Table(table).try_into()?;
        Self::from_raw(raw)
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read configuration file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_raw(raw: RawConfig) -> Result<Self> {
        let graph_type = match raw.graph_type.as_deref() {
            Some(s) => s.parse()?,
            None => GraphType::default(),
        };

        let vertices = match (graph_type, raw.vertices) {
            (GraphType::File, Some(0) | None) => 0,
            (_, Some(0)) => {
                return Err(Error::Config("\"vertices\" must be at least 1".into()));
            }
            (_, Some(n)) => n,
            (_, None) => return Err(missing("vertices")),
        };
        let time = raw.time.ok_or_else(|| missing("time"))?;

        let alpha = raw.alpha.unwrap_or(1.0);
        let epsilon = raw.epsilon.unwrap_or(0.0);
        for (key, value) in [("alpha", alpha), ("epsilon", epsilon)] {
            if !value.is_finite() {
                return Err(Error::Config(format!("\"{key}\" must be finite, got {value}")));
            }
        }
        if let Some(seed) = raw.seed.filter(|&s| s > MAX_SEED) {
            return Err(Error::Config(format!(
                "\"seed\" {seed} exceeds the largest accepted seed {MAX_SEED}"
            )));
        }
        let self_loops = raw.self_loops.unwrap_or(true);

        let (function, partition_size, walks) = match graph_type {
            GraphType::Complete | GraphType::File => {
                let function: ReinforcementLaw = raw
                    .function
                    .as_deref()
                    .ok_or_else(|| missing("function"))?
                    .parse()?;
                let walks = match (graph_type, raw.walks) {
                    (GraphType::File, Some(0) | None) => 0,
                    (_, Some(0)) => {
                        return Err(Error::Config("\"walks\" must be at least 1".into()));
                    }
                    (_, Some(w)) => w,
                    (_, None) => vertices,
                };
                (function, None, walks)
            }
            GraphType::Partitions => {
                let k = raw
                    .partition_size
                    .ok_or_else(|| missing("partition_size"))?;
                if k > vertices {
                    return Err(Error::Config(format!(
                        "partition_size {k} exceeds number of vertices {vertices}"
                    )));
                }
                if let Some(name) = raw.function.as_deref() {
                    let requested: ReinforcementLaw = name.parse()?;
                    if requested != ReinforcementLaw::Power {
                        warn!(%requested, "partitioned graphs always use the POW law");
                    }
                }
                if raw.walks.is_some_and(|w| w != vertices) {
                    warn!(vertices, "partitioned graphs run one walk per vertex; \"walks\" ignored");
                }
                (ReinforcementLaw::Power, Some(k), vertices)
            }
        };

        // A walk confined to one vertex can only stay put, which needs a loop.
        let window = match graph_type {
            GraphType::Complete => Some(vertices),
            GraphType::Partitions => partition_size.map(|k| if k == 0 { vertices } else { k }),
            GraphType::File => None,
        };
        if !self_loops && window == Some(1) {
            let what = match graph_type {
                GraphType::Complete => "a single vertex",
                _ => "partition_size 1",
            };
            return Err(Error::Config(format!(
                "self_loops = false with {what} leaves every walk without a move"
            )));
        }

        let input = match graph_type {
            GraphType::File => Some(raw.input.ok_or_else(|| missing("input"))?),
            _ => {
                if raw.input.is_some() {
                    warn!(%graph_type, "\"input\" is only read for file layouts; ignored");
                }
                None
            }
        };

        let data = match raw.data.as_deref() {
            Some(s) => s.parse()?,
            None => DataFormat::default(),
        };

        Ok(Self {
            graph_type,
            vertices,
            time,
            function: ReinforcementLawName(function),
            alpha,
            epsilon,
            partition_size,
            seed: raw.seed,
            self_loops,
            walks,
            input,
            output: raw.output.unwrap_or_else(|| DEFAULT_OUTPUT.to_string()),
            data,
            trace: raw.trace.unwrap_or(true),
        })
    }

    pub fn law(&self) -> ReinforcementLaw {
        self.function.0
    }
}

fn missing(key: &str) -> Error {
    Error::Config(format!("required key \"{key}\" is not set"))
}
