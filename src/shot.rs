//! Projectile, ammunition, weapon and shot aggregates.
//!
//! A [`Shot`] owns everything one solve needs by value; the engine borrows
//! it for the duration of the solve and nothing keeps references across
//! solves. Geometry follows a single rotation order: cant first (splitting
//! the elevation adjustment into vertical and lateral components), then look
//! angle (pitching the sight line), then azimuth (orienting the body frame
//! for wind and Coriolis only).

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::atmosphere::Atmosphere;
use crate::constants::{EARTH_ROTATION_RATE, GRAINS_TO_POUNDS};
use crate::drag::DragCurve;
use crate::error::Error;
use crate::units::{Quantity, Unit};
use crate::wind::WindSegment;

/// A projectile: mass, caliber, ballistic coefficient and its reference
/// drag curve, plus the optional dimensions spin models need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub weight: Quantity,
    pub diameter: Quantity,
    /// Overall length; only consulted by spin-stability estimates.
    pub length: Option<Quantity>,
    /// Ballistic coefficient relative to `curve`, lb/in².
    pub bc: f64,
    pub curve: DragCurve,
}

impl Projectile {
    pub fn new(weight: Quantity, diameter: Quantity, bc: f64, curve: DragCurve) -> Projectile {
        Projectile {
            weight,
            diameter,
            length: None,
            bc,
            curve,
        }
    }

    /// Sectional density in lb/in².
    pub fn sectional_density(&self) -> Result<f64, Error> {
        let weight_lb = self.weight.get_in(Unit::Grain)? * GRAINS_TO_POUNDS;
        let diameter_in = self.diameter.get_in(Unit::Inch)?;
        Ok(weight_lb / (diameter_in * diameter_in))
    }

    /// Form factor i = sectional density / BC: the dimensionless scale on
    /// the reference curve's drag, so Cd(M) = i · curve(M).
    pub fn form_factor(&self) -> Result<f64, Error> {
        Ok(self.sectional_density()? / self.bc)
    }
}

/// A projectile loaded to a muzzle velocity, with optional powder
/// temperature sensitivity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ammo {
    pub projectile: Projectile,
    pub muzzle_velocity: Quantity,
    /// Temperature the muzzle velocity was measured at.
    pub powder_temp: Quantity,
    /// Fractional velocity change per 15-degree (°C) departure from
    /// `powder_temp`.
    pub temp_modifier: f64,
}

impl Ammo {
    pub fn new(projectile: Projectile, muzzle_velocity: Quantity) -> Ammo {
        Ammo {
            projectile,
            muzzle_velocity,
            powder_temp: Unit::Celsius.new(15.0),
            temp_modifier: 0.0,
        }
    }

    /// Muzzle velocity adjusted for powder temperature.
    pub fn velocity_for_temp(&self, air_temp: Quantity) -> Result<Quantity, Error> {
        let t = air_temp.get_in(Unit::Celsius)?;
        let t0 = self.powder_temp.get_in(Unit::Celsius)?;
        let scale = 1.0 + self.temp_modifier * (t - t0) / 15.0;
        Ok(self.muzzle_velocity * scale)
    }
}

/// Sight and barrel geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    /// Sight height above the bore axis.
    pub sight_height: Quantity,
    /// Rifling twist length per turn; positive is right-hand twist.
    pub twist: Quantity,
    /// Barrel elevation above the sight line that zeroes the weapon; the
    /// cached output of the zero solver.
    pub zero_elevation: Quantity,
}

impl Weapon {
    pub fn new(sight_height: Quantity, twist: Quantity) -> Weapon {
        Weapon {
            sight_height,
            twist,
            zero_elevation: Unit::Radian.new(0.0),
        }
    }
}

impl Default for Weapon {
    fn default() -> Self {
        Weapon::new(Unit::Inch.new(2.0), Unit::Inch.new(0.0))
    }
}

/// Everything one solve consumes: weapon, ammunition, atmosphere, winds
/// and aiming geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shot {
    pub weapon: Weapon,
    pub ammo: Ammo,
    pub atmo: Atmosphere,
    /// Ordered by `until_distance`; empty means calm air.
    pub winds: Vec<WindSegment>,
    /// Pitch of the sight line above horizontal.
    pub look_angle: Quantity,
    /// Rotation of the sight plane around the bore.
    pub cant_angle: Quantity,
    /// Additional elevation on top of the weapon's zero.
    pub relative_angle: Quantity,
    /// World-frame bearing of fire, used by wind and Coriolis.
    pub azimuth: Quantity,
    /// Shooter latitude; `None` disables the Coriolis term.
    pub latitude: Option<Quantity>,
}

impl Shot {
    /// A level shot with no wind, no cant, and Coriolis disabled.
    pub fn new(weapon: Weapon, ammo: Ammo, atmo: Atmosphere) -> Shot {
        Shot {
            weapon,
            ammo,
            atmo,
            winds: Vec::new(),
            look_angle: Unit::Radian.new(0.0),
            cant_angle: Unit::Radian.new(0.0),
            relative_angle: Unit::Radian.new(0.0),
            azimuth: Unit::Radian.new(0.0),
            latitude: None,
        }
    }

    /// Validate the structural invariants the solver depends on.
    pub fn validate(&self) -> Result<(), Error> {
        let mv = self.ammo.muzzle_velocity.get_in(Unit::Fps)?;
        if !(mv > 0.0) {
            return Err(Error::input(format!(
                "muzzle velocity must be positive, got {mv} ft/s"
            )));
        }
        let weight = self.ammo.projectile.weight.get_in(Unit::Grain)?;
        if !(weight > 0.0) {
            return Err(Error::input(format!(
                "projectile weight must be positive, got {weight} gr"
            )));
        }
        let bc = self.ammo.projectile.bc;
        if !(bc > 0.0 && bc.is_finite()) {
            return Err(Error::input(format!(
                "ballistic coefficient must be positive, got {bc}"
            )));
        }
        let look = self.look_angle.get_in(Unit::Radian)?;
        if look <= -std::f64::consts::FRAC_PI_2 || look >= std::f64::consts::FRAC_PI_2 {
            return Err(Error::input(format!(
                "look angle must lie within (-90°, 90°), got {look} rad"
            )));
        }
        Ok(())
    }

    /// Total barrel elevation in the vertical plane: look angle plus the
    /// vertical component of the canted (zero + relative) adjustment.
    pub fn barrel_elevation(&self) -> Result<f64, Error> {
        let look = self.look_angle.get_in(Unit::Radian)?;
        let cant = self.cant_angle.get_in(Unit::Radian)?;
        let adjustment =
            self.weapon.zero_elevation.get_in(Unit::Radian)? + self.relative_angle.get_in(Unit::Radian)?;
        Ok(look + cant.cos() * adjustment)
    }

    /// Lateral component of the canted elevation adjustment, positive to
    /// the right.
    pub fn barrel_azimuth_offset(&self) -> Result<f64, Error> {
        let cant = self.cant_angle.get_in(Unit::Radian)?;
        let adjustment =
            self.weapon.zero_elevation.get_in(Unit::Radian)? + self.relative_angle.get_in(Unit::Radian)?;
        Ok(cant.sin() * adjustment)
    }

    /// Muzzle position in the body frame, feet: the sight sits at the
    /// origin, the bore below it, rotated by cant.
    pub fn muzzle_position_ft(&self) -> Result<Vector3<f64>, Error> {
        let sight_ft = self.weapon.sight_height.get_in(Unit::Foot)?;
        let cant = self.cant_angle.get_in(Unit::Radian)?;
        Ok(Vector3::new(0.0, -cant.cos() * sight_ft, -cant.sin() * sight_ft))
    }

    /// Earth-rotation vector in the body frame (rad/s), or `None` when no
    /// latitude is set.
    pub fn omega_body(&self) -> Result<Option<Vector3<f64>>, Error> {
        let Some(latitude) = self.latitude else {
            return Ok(None);
        };
        let lat = latitude.get_in(Unit::Radian)?;
        let az = self.azimuth.get_in(Unit::Radian)?;
        Ok(Some(
            EARTH_ROTATION_RATE
                * Vector3::new(lat.cos() * az.cos(), lat.sin(), -lat.cos() * az.sin()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::StandardCurve;
    use approx::assert_relative_eq;

    fn test_shot() -> Shot {
        let projectile = Projectile::new(
            Unit::Grain.new(168.0),
            Unit::Inch.new(0.308),
            0.45,
            DragCurve::standard(StandardCurve::G1),
        );
        let ammo = Ammo::new(projectile, Unit::Fps.new(2600.0));
        Shot::new(ammo_weapon(), ammo, Atmosphere::sea_level())
    }

    fn ammo_weapon() -> Weapon {
        Weapon::new(Unit::Inch.new(2.0), Unit::Inch.new(10.0))
    }

    #[test]
    fn valid_shot_passes_validation() {
        assert!(test_shot().validate().is_ok());
    }

    #[test]
    fn rejects_nonpositive_muzzle_velocity() {
        let mut shot = test_shot();
        shot.ammo.muzzle_velocity = Unit::Fps.new(0.0);
        assert!(matches!(
            shot.validate(),
            Err(Error::SolverInput { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_look_angle() {
        let mut shot = test_shot();
        shot.look_angle = Unit::Degree.new(90.0);
        assert!(shot.validate().is_err());
    }

    #[test]
    fn sectional_density_and_form_factor() {
        let shot = test_shot();
        // 168 gr / 7000 / 0.308² = 0.253 lb/in².
        assert_relative_eq!(
            shot.ammo.projectile.sectional_density().unwrap(),
            0.253,
            max_relative = 1e-3
        );
        let ff = shot.ammo.projectile.form_factor().unwrap();
        assert_relative_eq!(ff, 0.253 / 0.45, max_relative = 1e-3);
    }

    #[test]
    fn powder_sensitivity_scales_velocity() {
        let mut shot = test_shot();
        shot.ammo.temp_modifier = 0.01;
        shot.ammo.powder_temp = Unit::Celsius.new(15.0);
        let hot = shot
            .ammo
            .velocity_for_temp(Unit::Celsius.new(30.0))
            .unwrap();
        assert_relative_eq!(hot.get_in(Unit::Fps).unwrap(), 2626.0, max_relative = 1e-9);
        let same = shot
            .ammo
            .velocity_for_temp(Unit::Celsius.new(15.0))
            .unwrap();
        assert_relative_eq!(same.get_in(Unit::Fps).unwrap(), 2600.0, max_relative = 1e-12);
    }

    #[test]
    fn cant_splits_the_elevation_adjustment() {
        let mut shot = test_shot();
        shot.weapon.zero_elevation = Unit::MRad.new(10.0);
        shot.cant_angle = Unit::Degree.new(90.0);
        // Fully canted: the whole adjustment becomes lateral.
        assert_relative_eq!(
            shot.barrel_elevation().unwrap(),
            shot.look_angle.get_in(Unit::Radian).unwrap(),
            epsilon = 1e-12
        );
        assert_relative_eq!(shot.barrel_azimuth_offset().unwrap(), 0.010, epsilon = 1e-9);
        // And the muzzle swings sideways under the sight.
        let muzzle = shot.muzzle_position_ft().unwrap();
        assert!(muzzle.y.abs() < 1e-12);
        assert_relative_eq!(muzzle.z, -2.0 / 12.0, epsilon = 1e-9);
    }

    #[test]
    fn omega_points_up_at_the_pole() {
        let mut shot = test_shot();
        assert!(shot.omega_body().unwrap().is_none());
        shot.latitude = Some(Unit::Degree.new(90.0));
        let omega = shot.omega_body().unwrap().unwrap();
        assert_relative_eq!(omega.y, EARTH_ROTATION_RATE, max_relative = 1e-9);
        assert!(omega.x.abs() < 1e-12);
    }
}
