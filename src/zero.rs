//! Zero solver: finds the barrel elevation that puts the trajectory on the
//! sight line at a chosen distance.
//!
//! Bracketed secant with a bisection fallback. The engine is the oracle:
//! each candidate elevation runs a short trajectory to just past the zero
//! distance and reads the height above the sight line there. A trajectory
//! that terminates early reads as a large negative residual, which keeps a
//! failed reach on the "aim higher" side of the bracket.

use crate::engine::Engine;
use crate::error::Error;
use crate::shot::Shot;
use crate::trajectory::TrajFlag;
use crate::units::{Quantity, Unit};

/// Initial upper bracket width above the look angle, radians (30 mrad).
const INITIAL_BRACKET_RAD: f64 = 0.030;

/// The bracket is widened geometrically up to this elevation above the
/// look angle (60°).
const MAX_BRACKET_RAD: f64 = std::f64::consts::FRAC_PI_3;

/// Secondary convergence criterion on the elevation update, radians.
const MIN_ANGLE_STEP_RAD: f64 = 1e-6;

/// Residual reported for a candidate whose trajectory never reaches the
/// zero distance, feet.
const UNREACHABLE_RESIDUAL_FT: f64 = -1e6;

impl Engine {
    /// Solve for the barrel elevation adjustment (above the look angle)
    /// that zeroes `shot` at the slant `distance`.
    ///
    /// The result is what belongs in `shot.weapon.zero_elevation`; the
    /// passed shot is not modified.
    pub fn zero_elevation(&self, shot: &Shot, distance: Quantity) -> Result<Quantity, Error> {
        shot.validate()?;
        let distance_ft = distance.get_in(Unit::Foot)?;
        if !(distance_ft > 0.0) {
            return Err(Error::input(format!(
                "zero distance must be positive, got {distance_ft} ft"
            )));
        }
        let look = shot.look_angle.get_in(Unit::Radian)?;
        let zero_x_ft = distance_ft * look.cos();
        // Half the output resolution past the zero point is enough margin
        // for the final interpolated read.
        let max_range = Unit::Foot.new(zero_x_ft + self.config().chart_resolution_ft.max(1.0));

        let mut probe = shot.clone();
        probe.relative_angle = Unit::Radian.new(0.0);

        let tolerance_ft = 0.5 * self.config().zero_finding_accuracy_ft;
        let mut evaluations = 0usize;
        let mut height_at = |elevation_rad: f64| -> Result<f64, Error> {
            let mut candidate = probe.clone();
            candidate.weapon.zero_elevation = Unit::Radian.new(elevation_rad);
            evaluations += 1;
            let step = Unit::Foot.new(zero_x_ft);
            match self.fire_with(
                &candidate,
                max_range,
                step,
                TrajFlag::RANGE | TrajFlag::MAX,
                || true,
            ) {
                Ok(trajectory) => match trajectory.sample_at_range(Unit::Foot.new(zero_x_ft))? {
                    Some(sample) => Ok(sample.height.get_in(Unit::Foot)?),
                    None => Ok(UNREACHABLE_RESIDUAL_FT),
                },
                // An early stop means the candidate cannot reach the zero
                // distance; treat it as far below the sight line.
                Err(Error::Range { trajectory, .. }) => {
                    match trajectory.sample_at_range(Unit::Foot.new(zero_x_ft))? {
                        Some(sample) => Ok(sample.height.get_in(Unit::Foot)?),
                        None => Ok(UNREACHABLE_RESIDUAL_FT),
                    }
                }
                Err(other) => Err(other),
            }
        };

        // Bracket the root between the look angle and a geometrically
        // widening upper bound.
        let mut lo = 0.0;
        let mut f_lo = height_at(lo)?;
        if f_lo.abs() <= tolerance_ft {
            return Ok(Unit::Radian.new(lo));
        }
        let mut width = INITIAL_BRACKET_RAD;
        let mut hi = width;
        let mut f_hi = height_at(hi)?;
        while f_lo.signum() == f_hi.signum() {
            width *= 2.0;
            if width > MAX_BRACKET_RAD {
                return Err(Error::ZeroFinding {
                    elevation: Unit::Radian.new(hi),
                    residual: Unit::Foot.new(f_hi),
                    iterations: evaluations,
                });
            }
            lo = hi;
            f_lo = f_hi;
            hi = width;
            f_hi = height_at(hi)?;
        }

        // Secant iteration, falling back to bisection whenever the secant
        // candidate leaves the bracket.
        let (mut x_prev, mut f_prev) = (lo, f_lo);
        let (mut x_cur, mut f_cur) = (hi, f_hi);
        for iteration in 0..self.config().max_iterations {
            let secant_ok = (f_cur - f_prev).abs() > f64::EPSILON;
            let mut x_next = if secant_ok {
                x_cur - f_cur * (x_cur - x_prev) / (f_cur - f_prev)
            } else {
                0.5 * (lo + hi)
            };
            if !(x_next > lo && x_next < hi) {
                x_next = 0.5 * (lo + hi);
            }
            let f_next = height_at(x_next)?;
            log::debug!(
                "zero iteration {iteration}: elevation {x_next:.8} rad, residual {f_next:.8} ft"
            );

            if f_next.abs() <= tolerance_ft || (x_next - x_cur).abs() <= MIN_ANGLE_STEP_RAD {
                return Ok(Unit::Radian.new(x_next));
            }
            if f_next.signum() == f_lo.signum() {
                lo = x_next;
                f_lo = f_next;
            } else {
                hi = x_next;
            }
            x_prev = x_cur;
            f_prev = f_cur;
            x_cur = x_next;
            f_cur = f_next;
        }

        Err(Error::ZeroFinding {
            elevation: Unit::Radian.new(x_cur),
            residual: Unit::Foot.new(f_cur),
            iterations: self.config().max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::Atmosphere;
    use crate::drag::{DragCurve, StandardCurve};
    use crate::engine::{Config, Method};
    use crate::shot::{Ammo, Projectile, Weapon};

    fn test_shot() -> Shot {
        let projectile = Projectile::new(
            Unit::Grain.new(168.0),
            Unit::Inch.new(0.308),
            0.45,
            DragCurve::standard(StandardCurve::G1),
        );
        let ammo = Ammo::new(projectile, Unit::Fps.new(2600.0));
        let weapon = Weapon::new(Unit::Inch.new(2.0), Unit::Inch.new(10.0));
        Shot::new(weapon, ammo, Atmosphere::sea_level())
    }

    #[test]
    fn zeroed_shot_crosses_the_sight_line_at_the_zero_distance() {
        let engine = Engine::new(Method::RungeKutta4, Config::default());
        let shot = test_shot();
        let zero = engine
            .zero_elevation(&shot, Unit::Yard.new(100.0))
            .unwrap();
        assert!(zero.get_in(Unit::Radian).unwrap() > 0.0);

        let mut zeroed = shot.clone();
        zeroed.weapon.zero_elevation = zero;
        let traj = engine
            .fire(&zeroed, Unit::Yard.new(101.0), Unit::Yard.new(100.0))
            .unwrap();
        let at_zero = traj
            .sample_at_range(Unit::Yard.new(100.0))
            .unwrap()
            .unwrap();
        let accuracy = engine.config().zero_finding_accuracy_ft;
        assert!(at_zero.height.get_in(Unit::Foot).unwrap().abs() <= accuracy);
    }

    #[test]
    fn longer_zeros_need_more_elevation() {
        let engine = Engine::new(Method::RungeKutta4, Config::default());
        let shot = test_shot();
        let near = engine
            .zero_elevation(&shot, Unit::Yard.new(100.0))
            .unwrap();
        let far = engine
            .zero_elevation(&shot, Unit::Yard.new(400.0))
            .unwrap();
        assert!(far.get_in(Unit::Radian).unwrap() > near.get_in(Unit::Radian).unwrap());
    }

    #[test]
    fn hopeless_zero_reports_failure() {
        let engine = Engine::new(Method::RungeKutta4, Config::default());
        let mut shot = test_shot();
        // A pistol-weight charge cannot reach 3000 yd at any elevation in
        // the searched band.
        shot.ammo.muzzle_velocity = Unit::Fps.new(350.0);
        let result = engine.zero_elevation(&shot, Unit::Yard.new(3000.0));
        assert!(matches!(result, Err(Error::ZeroFinding { .. })));
    }
}
