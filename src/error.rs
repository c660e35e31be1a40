//! Error type for the solver. One enum, one variant per failure class;
//! every variant carries the offending values so the caller can report or
//! recover without re-running the solve.

use std::fmt;

use crate::trajectory::Trajectory;
use crate::units::{Dimension, Quantity};

/// Why an integration run stopped before reaching the requested range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Speed fell below the configured minimum velocity.
    MinimumVelocity,
    /// Height fell below the configured maximum drop.
    MaximumDrop,
    /// Altitude fell below the configured minimum altitude.
    MinimumAltitude,
    /// Mach number fell below the configured stop-at-Mach threshold.
    BelowStopMach,
    /// The sample cap was reached.
    SampleLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::MinimumVelocity => "minimum velocity reached",
            StopReason::MaximumDrop => "maximum drop exceeded",
            StopReason::MinimumAltitude => "minimum altitude reached",
            StopReason::BelowStopMach => "speed fell below the stop-at-Mach threshold",
            StopReason::SampleLimit => "sample limit reached",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub enum Error {
    /// Unit arithmetic across incompatible dimensions, or an input outside
    /// its physical domain.
    Dimension {
        expected: Dimension,
        found: Dimension,
    },
    /// Structurally invalid shot input.
    SolverInput { reason: String },
    /// The trajectory terminated before reaching the requested range.
    Range {
        reason: StopReason,
        last_distance: Option<Quantity>,
        trajectory: Box<Trajectory>,
    },
    /// Numerical breakdown: non-finite state or step collapse.
    Instability { time: f64, detail: String },
    /// The zero solver did not converge.
    ZeroFinding {
        elevation: Quantity,
        residual: Quantity,
        iterations: usize,
    },
    /// Engine registry lookup miss.
    UnknownEngine { name: String },
    /// Cooperative cancellation; carries the partial trajectory.
    Cancelled { trajectory: Box<Trajectory> },
}

impl Error {
    /// Shorthand for an input-validation failure.
    pub(crate) fn input(reason: impl Into<String>) -> Error {
        Error::SolverInput {
            reason: reason.into(),
        }
    }

    /// Process exit code for command-line collaborators:
    /// 0 ok, 1 input validation, 2 solve failed, 3 zero not found,
    /// 4 cancelled.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Dimension { .. } | Error::SolverInput { .. } | Error::UnknownEngine { .. } => 1,
            Error::Range { .. } | Error::Instability { .. } => 2,
            Error::ZeroFinding { .. } => 3,
            Error::Cancelled { .. } => 4,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Dimension { expected, found } => {
                write!(f, "dimension mismatch: expected {expected:?}, found {found:?}")
            }
            Error::SolverInput { reason } => write!(f, "invalid solver input: {reason}"),
            Error::Range {
                reason,
                last_distance,
                ..
            } => match last_distance {
                Some(d) => write!(f, "trajectory ended early ({reason}) at {d}"),
                None => write!(f, "trajectory ended early ({reason})"),
            },
            Error::Instability { time, detail } => {
                write!(f, "numerical instability at t={time:.6}s: {detail}")
            }
            Error::ZeroFinding {
                elevation,
                residual,
                iterations,
            } => write!(
                f,
                "zero not found after {iterations} iterations: elevation {elevation}, residual {residual}"
            ),
            Error::UnknownEngine { name } => write!(f, "unknown engine '{name}'"),
            Error::Cancelled { trajectory } => write!(
                f,
                "cancelled after {} samples",
                trajectory.samples().len()
            ),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_the_cli_contract() {
        let input = Error::input("empty drag curve");
        assert_eq!(input.exit_code(), 1);
        let unknown = Error::UnknownEngine {
            name: "warp_engine".to_string(),
        };
        assert_eq!(unknown.exit_code(), 1);
        let zero = Error::ZeroFinding {
            elevation: crate::units::Unit::Radian.new(0.01),
            residual: crate::units::Unit::Foot.new(0.2),
            iterations: 20,
        };
        assert_eq!(zero.exit_code(), 3);
    }

    #[test]
    fn display_mentions_the_offending_values() {
        let err = Error::UnknownEngine {
            name: "rk9_engine".to_string(),
        };
        assert!(err.to_string().contains("rk9_engine"));
    }
}
