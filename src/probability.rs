//! Transition weights: the repelling reinforcement laws.
//!
//! For a candidate vertex `v`, let `walks_v` be the walks whose support
//! contains `v`, `T = Σ_{w ∈ walks_v} nvisits(w, v)` and
//! `s(w) = nvisits(w, v) / T` the normalized visit share.
//!
//! - **Exponential**: \(e^{-\alpha \sum_{w \ne cur} s(w)}\)
//! - **Power**: \(s(cur) \cdot (M - \epsilon\, s(cur) - \sum_{w \ne cur} s(w))^{\alpha}\),
//!   with `M = |walks_v|`.
//!
//! Weights are unnormalized; the simulator normalizes them over the
//! candidate neighbors of the current location.

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::graph::Vertex;
use crate::walk::Walk;
use crate::{Error, Result};

/// Which reinforcement law turns competitor pressure into a weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReinforcementLaw {
    Exponential,
    Power,
}

impl ReinforcementLaw {
    /// Short name used in configuration files and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exponential => "EXP",
            Self::Power => "POW",
        }
    }
}

impl fmt::Display for ReinforcementLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReinforcementLaw {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EXP" | "EXPONENTIAL" => Ok(Self::Exponential),
            "POW" | "POWER" => Ok(Self::Power),
            other => Err(Error::Config(format!(
                "unknown reinforcement function \"{other}\" (expected EXP or POW)"
            ))),
        }
    }
}

/// Computes unnormalized transition weights for one law.
///
/// The law is fixed at construction; `alpha` and `epsilon` may be tuned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityEngine {
    law: ReinforcementLaw,
    alpha: f64,
    epsilon: f64,
}

impl Default for ProbabilityEngine {
    fn default() -> Self {
        Self::new(ReinforcementLaw::Exponential, 1.0, 0.0)
    }
}

impl ProbabilityEngine {
    pub fn new(law: ReinforcementLaw, alpha: f64, epsilon: f64) -> Self {
        Self {
            law,
            alpha,
            epsilon,
        }
    }

    /// Resolve the law by name. Unknown names fail here, not on first use.
    pub fn from_name(name: &str, alpha: f64, epsilon: f64) -> Result<Self> {
        Ok(Self::new(name.parse()?, alpha, epsilon))
    }

    pub fn law(&self) -> ReinforcementLaw {
        self.law
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Weight of `cur` moving to `v_dest`.
    ///
    /// `reference` is the set of walks supporting `v_dest` (it normally
    /// contains `cur`). Walks are told apart by id.
    pub fn calculate(&self, reference: &[&Walk], cur: &Walk, v_dest: Vertex) -> f64 {
        self.log_weight(reference, cur, v_dest).exp()
    }

    /// Natural logarithm of [`ProbabilityEngine::calculate`].
    ///
    /// Steep laws (large `alpha`) push every weight below the smallest
    /// `f64`; their logarithms stay finite, so distributions are normalized
    /// from these values instead. A zero weight is `-inf`.
    pub fn log_weight(&self, reference: &[&Walk], cur: &Walk, v_dest: Vertex) -> f64 {
        let pressure = Pressure::measure(reference, cur, v_dest);
        let log_weight = match self.law {
            ReinforcementLaw::Exponential => -self.alpha * pressure.others,
            ReinforcementLaw::Power => {
                let m = reference.len() as f64;
                // Negative bases only arise with epsilon > 1 on a lone supporter.
                let base = (m - self.epsilon * pressure.own - pressure.others).max(0.0);
                if self.alpha == 0.0 {
                    pressure.own.ln()
                } else {
                    pressure.own.ln() + self.alpha * base.ln()
                }
            }
        };
        trace!(
            walk = cur.id(),
            vertex = v_dest,
            total = pressure.total,
            own = pressure.own,
            others = pressure.others,
            log_weight,
            law = %self.law,
            "transition weight"
        );
        log_weight
    }
}

/// Normalized visit pressure at one vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pressure {
    /// `T`: visits from every walk in the reference set.
    total: u64,
    /// `s(cur)`.
    own: f64,
    /// `Σ_{w ≠ cur} s(w)`.
    others: f64,
}

impl Pressure {
    fn measure(reference: &[&Walk], cur: &Walk, v: Vertex) -> Self {
        let total: u64 = reference.iter().map(|w| w.nvisits(v)).sum();
        if total == 0 {
            return Self {
                total,
                own: 0.0,
                others: 0.0,
            };
        }
        let t = total as f64;
        let mut own = 0.0;
        let mut others = 0.0;
        for w in reference {
            let share = w.nvisits(v) as f64 / t;
            if w.id() == cur.id() {
                own = share;
            } else {
                others += share;
            }
        }
        Self { total, own, others }
    }
}

/// Scale `weights` in place to sum to 1. Returns the original sum.
///
/// Weights are left untouched when the sum is not a positive finite number.
pub fn normalize(weights: &mut [f64]) -> f64 {
    let sum: f64 = weights.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for w in weights.iter_mut() {
            *w /= sum;
        }
    }
    sum
}

/// Turn log weights into probabilities in place. Returns the sum of the
/// rescaled weights before normalization.
///
/// The largest log weight is shifted to 0 first, so the result does not
/// depend on how far below 1 the raw weights are. When no weight is finite
/// and positive the values are left as `exp(log_weight)` (all zeros for an
/// all `-inf` input).
pub fn normalize_log(log_weights: &mut [f64]) -> f64 {
    let max = log_weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let shift = if max.is_finite() { max } else { 0.0 };
    for w in log_weights.iter_mut() {
        *w = (*w - shift).exp();
    }
    normalize(log_weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk_with_visits(id: usize, support: &[Vertex], extra: &[(Vertex, u64)]) -> Walk {
        let mut w = Walk::new(id, support.to_vec(), support[0]).unwrap();
        for &(v, n) in extra {
            for _ in 0..n {
                w.visit(v);
            }
        }
        w
    }

    #[test]
    fn law_names_parse() {
        assert_eq!("exp".parse::<ReinforcementLaw>().unwrap(), ReinforcementLaw::Exponential);
        assert_eq!("POWER".parse::<ReinforcementLaw>().unwrap(), ReinforcementLaw::Power);
        assert_eq!(ReinforcementLaw::Power.to_string(), "POW");
    }

    #[test]
    fn unknown_law_fails_at_construction() {
        let err = ProbabilityEngine::from_name("LOG", 1.0, 0.0).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err}");
    }

    #[test]
    fn exponential_matches_closed_form() {
        // A: 1 visit at v0; B: 3 visits at v0 -> T = 4, others = 3/4.
        let a = walk_with_visits(0, &[0, 1], &[]);
        let b = walk_with_visits(1, &[0, 1], &[(0, 2)]);
        let engine = ProbabilityEngine::new(ReinforcementLaw::Exponential, 2.0, 0.0);
        let got = engine.calculate(&[&a, &b], &a, 0);
        assert!((got - (-2.0f64 * 0.75).exp()).abs() < 1e-12);
    }

    #[test]
    fn power_matches_closed_form() {
        // A: 3 visits at v1 (1 seeded + 2); B: 1 visit -> s(A) = 3/4, others = 1/4.
        let a = walk_with_visits(0, &[0, 1], &[(1, 2)]);
        let b = walk_with_visits(1, &[0, 1], &[]);
        let engine = ProbabilityEngine::new(ReinforcementLaw::Power, 2.0, 0.5);
        let got = engine.calculate(&[&a, &b], &a, 1);
        let base: f64 = 2.0 - 0.5 * 0.75 - 0.25;
        assert!((got - 0.75 * base.powf(2.0)).abs() < 1e-12);
    }

    #[test]
    fn alpha_zero_exponential_is_uniform() {
        let a = walk_with_visits(0, &[0, 1], &[]);
        let b = walk_with_visits(1, &[0, 1], &[(1, 40)]);
        let engine = ProbabilityEngine::new(ReinforcementLaw::Exponential, 0.0, 0.0);
        assert_eq!(engine.calculate(&[&a, &b], &a, 0), 1.0);
        assert_eq!(engine.calculate(&[&a, &b], &a, 1), 1.0);
    }

    #[test]
    fn repulsion_prefers_under_visited_vertex() {
        // A at v0, B with visits {v0: 1, v1: 50}.
        let a = walk_with_visits(0, &[0, 1], &[]);
        let b = walk_with_visits(1, &[0, 1], &[(1, 49)]);
        assert_eq!(b.nvisits(0), 1);
        assert_eq!(b.nvisits(1), 50);
        let engine = ProbabilityEngine::new(ReinforcementLaw::Exponential, 1.0, 0.0);
        let to_v0 = engine.calculate(&[&a, &b], &a, 0);
        let to_v1 = engine.calculate(&[&a, &b], &a, 1);
        assert!(to_v1 < to_v0, "to_v0={to_v0} to_v1={to_v1}");
    }

    #[test]
    fn lone_supporter_power_weight() {
        // Only the current walk supports v: s = 1, M = 1 -> (1 - eps)^alpha.
        let a = walk_with_visits(0, &[0], &[]);
        let engine = ProbabilityEngine::new(ReinforcementLaw::Power, 2.0, 0.5);
        assert!((engine.calculate(&[&a], &a, 0) - 0.25).abs() < 1e-12);

        let engine = ProbabilityEngine::new(ReinforcementLaw::Power, 0.5, 2.0);
        assert_eq!(engine.calculate(&[&a], &a, 0), 0.0);
    }

    #[test]
    fn setters_tune_parameters() {
        let mut engine = ProbabilityEngine::default();
        engine.set_alpha(3.0);
        engine.set_epsilon(0.25);
        assert_eq!(engine.alpha(), 3.0);
        assert_eq!(engine.epsilon(), 0.25);
        assert_eq!(engine.law(), ReinforcementLaw::Exponential);
    }

    #[test]
    fn normalize_scales_to_one() {
        let mut v = vec![1.0, 1.0, 2.0];
        let sum = normalize(&mut v);
        assert_eq!(sum, 4.0);
        assert!((v.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((v[2] - 0.5).abs() < 1e-12);

        let mut zeros = vec![0.0, 0.0];
        assert_eq!(normalize(&mut zeros), 0.0);
        assert_eq!(zeros, vec![0.0, 0.0]);
    }

    #[test]
    fn normalize_log_survives_underflow() {
        // exp(-1333) and exp(-1334) are both 0.0 as f64.
        assert_eq!((-1333.0f64).exp(), 0.0);
        let mut v = vec![-1333.0, -1334.0];
        normalize_log(&mut v);
        let p0 = 1.0 / (1.0 + (-1.0f64).exp());
        assert!((v[0] - p0).abs() < 1e-12);
        assert!((v[0] + v[1] - 1.0).abs() < 1e-12);

        let mut dead = vec![f64::NEG_INFINITY, f64::NEG_INFINITY];
        assert_eq!(normalize_log(&mut dead), 0.0);
        assert_eq!(dead, vec![0.0, 0.0]);
    }

    #[test]
    fn log_weight_matches_calculate() {
        let a = walk_with_visits(0, &[0, 1], &[(1, 3)]);
        let b = walk_with_visits(1, &[0, 1], &[(0, 2)]);
        for law in [ReinforcementLaw::Exponential, ReinforcementLaw::Power] {
            let engine = ProbabilityEngine::new(law, 1.5, 0.25);
            for v in [0, 1] {
                let direct = engine.calculate(&[&a, &b], &a, v);
                let via_log = engine.log_weight(&[&a, &b], &a, v).exp();
                assert!((direct - via_log).abs() < 1e-12, "{law} v{v}");
            }
        }
        // Large alpha: the weight underflows, its logarithm does not.
        let engine = ProbabilityEngine::new(ReinforcementLaw::Exponential, 2000.0, 0.0);
        assert_eq!(engine.calculate(&[&a, &b], &a, 0), 0.0);
        assert!(engine.log_weight(&[&a, &b], &a, 0).is_finite());
    }
}
