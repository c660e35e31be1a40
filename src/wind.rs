//! Piecewise-constant wind indexed by down-range distance.
//!
//! Wind is a list of segments, each holding until an upper-bound down-range
//! distance; the last segment is unbounded. During a solve the engine reads
//! wind through a [`WindField`], which precomputes body-frame vectors and
//! keeps a cached segment index: queries at monotonically increasing range
//! advance it in O(1), out-of-order queries fall back to a binary search.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::units::{Quantity, Unit};

/// A constant wind holding out to an upper-bound down-range distance.
///
/// `direction_from` is the world-frame bearing the wind blows from,
/// clockwise from the direction of fire at azimuth 0: 0 is a tailwind from
/// behind the shooter, 90° blows from the shooter's right (3 o'clock).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSegment {
    pub velocity: Quantity,
    pub direction_from: Quantity,
    pub until_distance: Quantity,
}

impl WindSegment {
    pub fn new(velocity: Quantity, direction_from: Quantity, until_distance: Quantity) -> Self {
        WindSegment {
            velocity,
            direction_from,
            until_distance,
        }
    }

    /// A wind with no range bound; by convention the last segment.
    pub fn unbounded(velocity: Quantity, direction_from: Quantity) -> Self {
        WindSegment {
            velocity,
            direction_from,
            until_distance: Unit::Foot.new(f64::INFINITY),
        }
    }
}

/// Per-solve wind reader: segments resolved to body-frame vectors in ft/s,
/// ordered by upper bound, with a cached current index.
#[derive(Debug, Clone)]
pub struct WindField {
    /// (upper bound ft, wind vector ft/s), sorted by bound.
    segments: Vec<(f64, Vector3<f64>)>,
    current: usize,
}

impl WindField {
    /// Resolve segments against the shot's azimuth. The body-frame vector is
    /// the velocity of the air mass: a tailwind points +x, wind from the
    /// shooter's right points −z.
    pub fn new(winds: &[WindSegment], azimuth: Quantity) -> Result<WindField, Error> {
        let azimuth_rad = azimuth.get_in(Unit::Radian)?;
        let mut segments = Vec::with_capacity(winds.len());
        for wind in winds {
            let speed_fps = wind.velocity.get_in(Unit::Fps)?;
            let bearing = wind.direction_from.get_in(Unit::Radian)? - azimuth_rad;
            let until_ft = wind.until_distance.get_in(Unit::Foot)?;
            segments.push((
                until_ft,
                Vector3::new(speed_fps * bearing.cos(), 0.0, -speed_fps * bearing.sin()),
            ));
        }
        segments.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(WindField {
            segments,
            current: 0,
        })
    }

    /// Wind vector for the segment whose upper bound first exceeds
    /// `range_ft`; zero wind beyond the last bounded segment.
    pub fn vector_at(&mut self, range_ft: f64) -> Vector3<f64> {
        if self.segments.is_empty() || range_ft.is_nan() {
            return Vector3::zeros();
        }
        // Rewind on an out-of-order query, then advance the cache.
        if range_ft < self.lower_bound(self.current) {
            self.current = self.segments.partition_point(|s| s.0 <= range_ft);
        }
        while self.current < self.segments.len() && range_ft >= self.segments[self.current].0 {
            self.current += 1;
        }
        match self.segments.get(self.current) {
            Some(&(_, vector)) => vector,
            None => Vector3::zeros(),
        }
    }

    fn lower_bound(&self, index: usize) -> f64 {
        if index == 0 {
            f64::NEG_INFINITY
        } else {
            self.segments[index - 1].0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn field(winds: &[WindSegment]) -> WindField {
        WindField::new(winds, Unit::Radian.new(0.0)).unwrap()
    }

    #[test]
    fn empty_field_is_calm() {
        let mut field = field(&[]);
        assert_eq!(field.vector_at(150.0), Vector3::zeros());
    }

    #[test]
    fn tailwind_points_downrange() {
        let mut field = field(&[WindSegment::unbounded(
            Unit::Mph.new(10.0),
            Unit::Degree.new(0.0),
        )]);
        let v = field.vector_at(0.0);
        assert!(v.x > 0.0);
        assert!(v.z.abs() < 1e-12);
        assert_relative_eq!(
            v.norm(),
            Unit::Mph.new(10.0).get_in(Unit::Fps).unwrap(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn wind_from_the_right_moves_air_left() {
        let mut field = field(&[WindSegment::unbounded(
            Unit::Mph.new(10.0),
            Unit::Degree.new(90.0),
        )]);
        let v = field.vector_at(500.0);
        assert!(v.z < 0.0);
        assert!(v.x.abs() < 1e-9);
    }

    #[test]
    fn segments_switch_at_their_bounds() {
        let mut field = field(&[
            WindSegment::new(
                Unit::Mph.new(10.0),
                Unit::Degree.new(90.0),
                Unit::Foot.new(300.0),
            ),
            WindSegment::new(
                Unit::Mph.new(5.0),
                Unit::Degree.new(270.0),
                Unit::Foot.new(900.0),
            ),
        ]);
        assert!(field.vector_at(100.0).z < 0.0);
        assert!(field.vector_at(500.0).z > 0.0);
        // Beyond every bound the air is calm.
        assert_eq!(field.vector_at(1200.0), Vector3::zeros());
    }

    #[test]
    fn out_of_order_queries_rewind_the_cache() {
        let mut field = field(&[
            WindSegment::new(
                Unit::Mph.new(10.0),
                Unit::Degree.new(90.0),
                Unit::Foot.new(300.0),
            ),
            WindSegment::unbounded(Unit::Mph.new(20.0), Unit::Degree.new(90.0)),
        ]);
        let far = field.vector_at(2000.0);
        let near = field.vector_at(100.0);
        assert!(near.norm() < far.norm());
    }

    #[test]
    fn azimuth_rotates_the_bearing_into_the_body_frame() {
        // Wind from bearing 90 fired at azimuth 90 is a tailwind.
        let mut field = WindField::new(
            &[WindSegment::unbounded(
                Unit::Mph.new(10.0),
                Unit::Degree.new(90.0),
            )],
            Unit::Degree.new(90.0),
        )
        .unwrap();
        let v = field.vector_at(0.0);
        assert!(v.x > 0.0);
        assert!(v.z.abs() < 1e-9);
    }
}
