//! Mach-indexed drag model.
//!
//! A [`DragCurve`] is an immutable, strictly increasing sequence of
//! (Mach, Cd) samples starting at Mach 0. Lookups go through a per-solve
//! [`CdLookup`] that remembers the last bracket: during a shot the Mach
//! number walks downward through adjacent brackets, so the common case is
//! O(1) with a binary-search fallback for arbitrary queries. The shared
//! curve itself carries no mutable state and can back any number of
//! concurrent solves.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::tables;

/// One sample of a drag curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragPoint {
    pub mach: f64,
    pub cd: f64,
}

/// Identifiers for the built-in standard drag functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardCurve {
    G1,
    G2,
    G5,
    G6,
    G7,
    G8,
    /// Ingalls.
    GI,
    /// Smooth sphere.
    GS,
}

/// Capability contract the integrator needs from a drag model.
pub trait CdModel {
    /// Drag coefficient at the given Mach number.
    fn cd_at_mach(&mut self, mach: f64) -> f64;
}

/// An immutable piecewise-linear Cd(Mach) curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragCurve {
    points: Vec<DragPoint>,
}

impl DragCurve {
    /// Build a curve from an ordered (Mach, Cd) sequence.
    ///
    /// The sequence must be non-empty, start at Mach 0, be strictly
    /// increasing in Mach, and hold finite positive coefficients.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Result<DragCurve, Error> {
        let points: Vec<DragPoint> = points
            .into_iter()
            .map(|(mach, cd)| DragPoint { mach, cd })
            .collect();
        if points.is_empty() {
            return Err(Error::input("drag curve is empty"));
        }
        if points[0].mach != 0.0 {
            return Err(Error::input(format!(
                "drag curve must start at Mach 0, got {}",
                points[0].mach
            )));
        }
        for pair in points.windows(2) {
            if pair[1].mach <= pair[0].mach {
                return Err(Error::input(format!(
                    "drag curve Mach values must be strictly increasing ({} then {})",
                    pair[0].mach, pair[1].mach
                )));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.cd.is_finite() || p.cd <= 0.0) {
            return Err(Error::input(format!(
                "drag coefficient at Mach {} is not a positive finite number: {}",
                bad.mach, bad.cd
            )));
        }
        Ok(DragCurve { points })
    }

    /// One of the built-in standard curves.
    pub fn standard(which: StandardCurve) -> DragCurve {
        let data = match which {
            StandardCurve::G1 => tables::G1,
            StandardCurve::G2 => tables::G2,
            StandardCurve::G5 => tables::G5,
            StandardCurve::G6 => tables::G6,
            StandardCurve::G7 => tables::G7,
            StandardCurve::G8 => tables::G8,
            StandardCurve::GI => tables::GI,
            StandardCurve::GS => tables::GS,
        };
        DragCurve {
            points: data
                .iter()
                .map(|&(mach, cd)| DragPoint { mach, cd })
                .collect(),
        }
    }

    /// The curve's samples.
    pub fn points(&self) -> &[DragPoint] {
        &self.points
    }

    /// Largest Mach the curve covers; beyond it Cd is clamped.
    pub fn mach_max(&self) -> f64 {
        self.points[self.points.len() - 1].mach
    }

    /// Minimum and maximum Cd on the curve.
    pub fn cd_bounds(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for p in &self.points {
            lo = lo.min(p.cd);
            hi = hi.max(p.cd);
        }
        (lo, hi)
    }

    /// A fresh per-solve lookup over this curve.
    pub fn lookup(&self) -> CdLookup<'_> {
        CdLookup {
            curve: self,
            bracket: 0,
            warned_above_table: false,
        }
    }
}

/// Per-solve drag lookup holding the cached bracket index.
#[derive(Debug)]
pub struct CdLookup<'a> {
    curve: &'a DragCurve,
    bracket: usize,
    warned_above_table: bool,
}

impl CdLookup<'_> {
    /// Interpolated Cd at `mach`. Outside the table the boundary value is
    /// used; the first query above the table maximum is logged.
    pub fn cd(&mut self, mach: f64) -> f64 {
        let points = &self.curve.points;
        let last = points.len() - 1;

        if mach >= points[last].mach {
            if mach > points[last].mach && !self.warned_above_table {
                self.warned_above_table = true;
                log::warn!(
                    "Mach {mach:.3} beyond drag table maximum {:.3}; clamping Cd to {:.4}",
                    points[last].mach,
                    points[last].cd
                );
            }
            self.bracket = last.saturating_sub(1);
            return points[last].cd;
        }
        if mach <= points[0].mach {
            self.bracket = 0;
            return points[0].cd;
        }

        // Same or adjacent bracket covers the typical monotone Mach walk.
        if !self.in_bracket(self.bracket, mach) {
            if self.bracket > 0 && self.in_bracket(self.bracket - 1, mach) {
                self.bracket -= 1;
            } else if self.in_bracket(self.bracket + 1, mach) {
                self.bracket += 1;
            } else {
                self.bracket = points.partition_point(|p| p.mach <= mach) - 1;
            }
        }

        let a = points[self.bracket];
        let b = points[self.bracket + 1];
        let t = (mach - a.mach) / (b.mach - a.mach);
        a.cd + t * (b.cd - a.cd)
    }

    fn in_bracket(&self, index: usize, mach: f64) -> bool {
        let points = &self.curve.points;
        index + 1 < points.len() && points[index].mach <= mach && mach < points[index + 1].mach
    }
}

impl CdModel for CdLookup<'_> {
    fn cd_at_mach(&mut self, mach: f64) -> f64 {
        self.cd(mach)
    }
}
