//! # exterior-ballistics
//!
//! A point-mass exterior-ballistics solver: it integrates a projectile's
//! equations of motion through a standard atmosphere against a Mach-indexed
//! drag table and answers questions about the resulting trajectory — drop,
//! windage, energy, time of flight, Coriolis deflection, zeroing and danger
//! space.
//!
//! The pieces:
//!
//! - [`units`]: dimensioned quantities every public value flows through.
//! - [`atmosphere`]: ICAO standard atmosphere with Tetens humidity.
//! - [`drag`] and [`tables`]: piecewise Cd(Mach) curves, built-in G1–GS
//!   reference tables, and the per-solve cached lookup.
//! - [`wind`]: piecewise-constant winds indexed by down-range distance.
//! - [`shot`]: the projectile / ammunition / weapon / shot data model.
//! - [`engine`]: fixed-step Euler, RK4 and Verlet integration with
//!   event-driven sampling, cooperative cancellation and parallel batches.
//! - [`trajectory`]: the sample record and queries over it.
//! - [`zero`]: the elevation solver.
//! - [`registry`]: engine factories by name.
//!
//! ```no_run
//! use exterior_ballistics::prelude::*;
//!
//! # fn main() -> Result<(), exterior_ballistics::Error> {
//! let projectile = Projectile::new(
//!     Unit::Grain.new(168.0),
//!     Unit::Inch.new(0.308),
//!     0.462,
//!     DragCurve::standard(StandardCurve::G1),
//! );
//! let ammo = Ammo::new(projectile, Unit::Fps.new(2600.0));
//! let weapon = Weapon::new(Unit::Inch.new(2.0), Unit::Inch.new(11.25));
//! let mut shot = Shot::new(weapon, ammo, Atmosphere::sea_level());
//!
//! let engine = registry::create("rk4_engine", Config::default())?;
//! shot.weapon.zero_elevation = engine.zero_elevation(&shot, Unit::Yard.new(100.0))?;
//!
//! let trajectory = engine.fire(&shot, Unit::Yard.new(1000.0), Unit::Yard.new(100.0))?;
//! for sample in trajectory.samples() {
//!     println!("{}  {}  {}", sample.distance, sample.height, sample.windage);
//! }
//! # Ok(())
//! # }
//! ```

pub mod atmosphere;
pub mod constants;
pub mod drag;
pub mod engine;
pub mod error;
pub mod registry;
pub mod shot;
pub mod tables;
pub mod trajectory;
pub mod units;
pub mod wind;
pub mod zero;

pub use atmosphere::{Atmosphere, LocalAtmosphere};
pub use drag::{CdModel, DragCurve, DragPoint, StandardCurve};
pub use engine::{Config, Engine, Method};
pub use error::{Error, StopReason};
pub use shot::{Ammo, Projectile, Shot, Weapon};
pub use trajectory::{DangerSpace, Summary, TrajFlag, Trajectory, TrajectorySample};
pub use units::{Dimension, Quantity, Unit};
pub use wind::{WindField, WindSegment};

/// The common imports in one place.
pub mod prelude {
    pub use crate::atmosphere::Atmosphere;
    pub use crate::drag::{DragCurve, StandardCurve};
    pub use crate::engine::{Config, Engine, Method};
    pub use crate::error::Error;
    pub use crate::registry;
    pub use crate::shot::{Ammo, Projectile, Shot, Weapon};
    pub use crate::trajectory::{TrajFlag, Trajectory, TrajectorySample};
    pub use crate::units::{Quantity, Unit};
    pub use crate::wind::WindSegment;
}
