//! Trajectory samples, flags, and queries over a finished solve.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::units::{Quantity, Unit};

/// Bitmask of the events a sample was emitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajFlag(u32);

impl TrajFlag {
    pub const NONE: TrajFlag = TrajFlag(0);
    /// Crossing up through the sight line.
    pub const ZERO_UP: TrajFlag = TrajFlag(1 << 0);
    /// Crossing back down through the sight line.
    pub const ZERO_DOWN: TrajFlag = TrajFlag(1 << 1);
    /// Either sight-line crossing.
    pub const ZERO: TrajFlag = TrajFlag(Self::ZERO_UP.0 | Self::ZERO_DOWN.0);
    /// Downward crossing of a Mach band (Mach 1 by default).
    pub const MACH: TrajFlag = TrajFlag(1 << 2);
    /// Regular down-range output slice.
    pub const RANGE: TrajFlag = TrajFlag(1 << 3);
    /// Vertical apex: vertical velocity changes sign.
    pub const APEX: TrajFlag = TrajFlag(1 << 4);
    /// Minimum time-to-target annotation.
    pub const MRT: TrajFlag = TrajFlag(1 << 5);
    /// Maximum requested range reached.
    pub const MAX: TrajFlag = TrajFlag(1 << 6);
    pub const ALL: TrajFlag = TrajFlag(0x7f);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when any of `other`'s bits are set in `self`.
    pub fn intersects(self, other: TrajFlag) -> bool {
        self.0 & other.0 != 0
    }

    /// True when all of `other`'s bits are set in `self`.
    pub fn contains(self, other: TrajFlag) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for TrajFlag {
    type Output = TrajFlag;
    fn bitor(self, rhs: TrajFlag) -> TrajFlag {
        TrajFlag(self.0 | rhs.0)
    }
}

impl BitOrAssign for TrajFlag {
    fn bitor_assign(&mut self, rhs: TrajFlag) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TrajFlag {
    type Output = TrajFlag;
    fn bitand(self, rhs: TrajFlag) -> TrajFlag {
        TrajFlag(self.0 & rhs.0)
    }
}

impl fmt::Display for TrajFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let names = [
            (TrajFlag::ZERO_UP, "ZERO_UP"),
            (TrajFlag::ZERO_DOWN, "ZERO_DOWN"),
            (TrajFlag::MACH, "MACH"),
            (TrajFlag::RANGE, "RANGE"),
            (TrajFlag::APEX, "APEX"),
            (TrajFlag::MRT, "MRT"),
            (TrajFlag::MAX, "MAX"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.intersects(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// One emitted point of a trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectorySample {
    /// Time of flight, seconds.
    pub time: f64,
    /// Horizontal down-range distance.
    pub distance: Quantity,
    /// Distance along the sight line.
    pub slant_distance: Quantity,
    /// Height above the sight line.
    pub height: Quantity,
    /// Lateral deflection, positive to the right.
    pub windage: Quantity,
    /// Velocity vector in the body frame, ft/s.
    pub velocity: Vector3<f64>,
    /// Speed over the air mass.
    pub speed: Quantity,
    /// Mach number.
    pub mach: f64,
    /// Kinetic energy.
    pub energy: Quantity,
    /// Sight correction to the trajectory height.
    pub drop_angle: Quantity,
    /// Sight correction to the windage.
    pub windage_angle: Quantity,
    /// Down-range distance measured along the look direction.
    pub look_distance: Quantity,
    /// Local air density over the sea-level standard, minus one.
    pub density_ratio: f64,
    /// Drag retardation per unit velocity, 1/s.
    pub drag: f64,
    /// Events this sample was emitted for.
    pub flags: TrajFlag,
}

/// Linear interpolation between two samples; the result carries no flags.
fn lerp(a: &TrajectorySample, b: &TrajectorySample, t: f64) -> TrajectorySample {
    let f = |x: f64, y: f64| x + t * (y - x);
    let q = |x: Quantity, y: Quantity| Quantity::from_raw(f(x.raw(), y.raw()), x.unit());
    TrajectorySample {
        time: f(a.time, b.time),
        distance: q(a.distance, b.distance),
        slant_distance: q(a.slant_distance, b.slant_distance),
        height: q(a.height, b.height),
        windage: q(a.windage, b.windage),
        velocity: a.velocity.lerp(&b.velocity, t),
        speed: q(a.speed, b.speed),
        mach: f(a.mach, b.mach),
        energy: q(a.energy, b.energy),
        drop_angle: q(a.drop_angle, b.drop_angle),
        windage_angle: q(a.windage_angle, b.windage_angle),
        look_distance: q(a.look_distance, b.look_distance),
        density_ratio: f(a.density_ratio, b.density_ratio),
        drag: f(a.drag, b.drag),
        flags: TrajFlag::NONE,
    }
}

/// Aggregate figures for a finished trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub time_of_flight: f64,
    pub max_range: Quantity,
    pub apex_height: Quantity,
    pub apex_distance: Quantity,
    /// Distances of the sight-line crossings, up then down.
    pub zero_crossings: Vec<Quantity>,
    pub terminal_velocity: Quantity,
}

/// The range interval over which the trajectory stays within a target of
/// a given vertical extent centred on the sight line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DangerSpace {
    pub at_range: Quantity,
    pub target_height: Quantity,
    pub begin: Quantity,
    pub end: Quantity,
}

impl DangerSpace {
    /// Interval length.
    pub fn length(&self) -> Quantity {
        Quantity::from_raw(self.end.raw() - self.begin.raw(), self.begin.unit())
    }
}

impl fmt::Display for DangerSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "danger space for a {} target at {}: {} to {} ({})",
            self.target_height, self.at_range, self.begin, self.end,
            self.length()
        )
    }
}

/// The ordered sequence of samples produced by one solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
}

impl Trajectory {
    pub(crate) fn new(samples: Vec<TrajectorySample>) -> Trajectory {
        Trajectory { samples }
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    /// Samples carrying any of the given flags.
    pub fn flagged(&self, flag: TrajFlag) -> impl Iterator<Item = &TrajectorySample> {
        self.samples.iter().filter(move |s| s.flags.intersects(flag))
    }

    /// First sample carrying any of the given flags.
    pub fn first_flag(&self, flag: TrajFlag) -> Option<&TrajectorySample> {
        self.flagged(flag).next()
    }

    /// State at a time of flight, interpolated between bracketing samples.
    pub fn sample_at_time(&self, time: f64) -> Option<TrajectorySample> {
        let first = self.samples.first()?;
        if time <= first.time {
            return Some(first.clone());
        }
        let last = self.samples.last()?;
        if time >= last.time {
            return Some(last.clone());
        }
        let hi = self.samples.partition_point(|s| s.time <= time);
        let (a, b) = (&self.samples[hi - 1], &self.samples[hi]);
        let t = (time - a.time) / (b.time - a.time);
        Some(lerp(a, b, t))
    }

    /// State at a horizontal down-range distance, interpolated between
    /// bracketing samples.
    pub fn sample_at_range(&self, range: Quantity) -> Result<Option<TrajectorySample>, Error> {
        let range_raw = range.get_in(Unit::Inch)?;
        let first = match self.samples.first() {
            Some(s) => s,
            None => return Ok(None),
        };
        if range_raw <= first.distance.raw() {
            return Ok(Some(first.clone()));
        }
        let last = self.samples.last().expect("non-empty");
        if range_raw > last.distance.raw() {
            return Ok(None);
        }
        let hi = self
            .samples
            .partition_point(|s| s.distance.raw() < range_raw)
            .max(1);
        let (a, b) = (&self.samples[hi - 1], &self.samples[hi]);
        let t = (range_raw - a.distance.raw()) / (b.distance.raw() - a.distance.raw());
        Ok(Some(lerp(a, b, t)))
    }

    /// Flag and return the earliest sample at or past `range` — the
    /// minimum time at which the target range is reached.
    pub fn flag_min_time_to_target(
        &mut self,
        range: Quantity,
    ) -> Result<Option<&TrajectorySample>, Error> {
        let range_in = range.get_in(Unit::Inch)?;
        let index = self
            .samples
            .iter()
            .position(|s| s.distance.raw() >= range_in);
        match index {
            Some(i) => {
                self.samples[i].flags |= TrajFlag::MRT;
                Ok(Some(&self.samples[i]))
            }
            None => Ok(None),
        }
    }

    /// The range interval over which the trajectory stays within a target
    /// of height `target_height` centred on the trajectory's height at
    /// `at_range`. For a shot zeroed at the reference range this is the
    /// window around the sight line.
    pub fn danger_space(
        &self,
        at_range: Quantity,
        target_height: Quantity,
    ) -> Result<DangerSpace, Error> {
        let center = self.sample_at_range(at_range)?.ok_or_else(|| {
            Error::input(format!("danger-space reference {at_range} is beyond the trajectory"))
        })?;
        let half_in = target_height.get_in(Unit::Inch)? / 2.0;
        let top_in = center.height.raw() + half_in;
        let bottom_in = center.height.raw() - half_in;
        let center_idx = self
            .samples
            .partition_point(|s| s.distance.raw() <= center.distance.raw())
            .saturating_sub(1);

        // Walk back to where the trajectory rises above the top edge.
        let mut begin = self.samples[0].distance;
        for i in (0..=center_idx).rev() {
            if self.samples[i].height.raw() > top_in && i + 1 < self.samples.len() {
                let (a, b) = (&self.samples[i], &self.samples[i + 1]);
                let t = (a.height.raw() - top_in) / (a.height.raw() - b.height.raw());
                begin = lerp(a, b, t).distance;
                break;
            }
        }
        // Walk forward to where it falls below the bottom edge.
        let mut end = self.samples[self.samples.len() - 1].distance;
        for i in center_idx..self.samples.len() {
            if self.samples[i].height.raw() < bottom_in && i > 0 {
                let (a, b) = (&self.samples[i - 1], &self.samples[i]);
                let t = (a.height.raw() - bottom_in) / (a.height.raw() - b.height.raw());
                end = lerp(a, b, t).distance;
                break;
            }
        }
        Ok(DangerSpace {
            at_range,
            target_height,
            begin,
            end,
        })
    }

    /// Aggregate figures: time of flight, reach, apex, crossings, terminal
    /// velocity.
    pub fn summary(&self) -> Option<Summary> {
        let last = self.samples.last()?;
        let mut apex_height = f64::NEG_INFINITY;
        let mut apex_distance = 0.0;
        for s in &self.samples {
            if s.height.raw() > apex_height {
                apex_height = s.height.raw();
                apex_distance = s.distance.raw();
            }
        }
        let zero_crossings = self
            .flagged(TrajFlag::ZERO)
            .map(|s| s.distance)
            .collect();
        Some(Summary {
            time_of_flight: last.time,
            max_range: last.distance,
            apex_height: Quantity::from_raw(apex_height, Unit::Inch),
            apex_distance: Quantity::from_raw(apex_distance, Unit::Yard),
            zero_crossings,
            terminal_velocity: last.speed,
        })
    }
}
