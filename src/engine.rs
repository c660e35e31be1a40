//! The integration engine: step kernels, event detection, sampling.
//!
//! All internal state is in feet, ft/s and seconds; `Quantity` values cross
//! the boundary on the way in and out. The body frame puts +x down-range
//! along the horizontal projection of the sight line, +y vertically up and
//! +z to the shooter's right.
//!
//! The engine is synchronous and borrows the [`Shot`] for exactly one solve.
//! Per-solve mutable state (drag bracket cache, wind segment cache, stage
//! scratch) lives in a [`Solve`] value created inside the call, so shots,
//! curves and engines can be shared freely across threads;
//! [`Engine::fire_parallel`] leans on that.

use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::atmosphere::LocalAtmosphere;
use crate::constants::*;
use crate::drag::{CdLookup, CdModel};
use crate::error::{Error, StopReason};
use crate::shot::Shot;
use crate::trajectory::{TrajFlag, Trajectory, TrajectorySample};
use crate::units::{Quantity, Unit};
use crate::wind::WindField;

/// Step kernel selection; chosen once per engine, dispatched once per solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Euler,
    RungeKutta4,
    Verlet,
}

impl Method {
    /// Unscaled base time step, seconds.
    pub fn base_step(self) -> f64 {
        match self {
            Method::Euler => 0.5e-3,
            Method::RungeKutta4 => 2.5e-3,
            Method::Verlet => 1.0e-3,
        }
    }
}

/// Engine configuration. A plain value bundle handed to the factory; there
/// is no process-wide mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scales the method's base integrator step.
    pub step_multiplier: f64,
    /// Terminate when speed drops below this (ft/s).
    pub minimum_velocity_fps: f64,
    /// Terminate when height drops below this (ft, negative).
    pub maximum_drop_ft: f64,
    /// Terminate when altitude drops below this (ft).
    pub minimum_altitude_ft: f64,
    /// Zero-solver iteration cap.
    pub max_iterations: usize,
    /// Zero-solver residual tolerance (ft).
    pub zero_finding_accuracy_ft: f64,
    /// Gravitational acceleration magnitude (ft/s²).
    pub gravity_fps2: f64,
    /// Output length resolution (ft); event refinement targets 1% of this.
    pub chart_resolution_ft: f64,
    /// Terminate when the Mach number falls below this.
    pub stop_at_mach: Option<f64>,
    /// Mach numbers whose downward crossings emit MACH samples.
    pub mach_bands: Vec<f64>,
    /// Hard cap on emitted samples.
    pub max_samples: usize,
    /// Adjust muzzle velocity for powder temperature.
    pub use_powder_sensitivity: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            step_multiplier: 1.0,
            minimum_velocity_fps: 50.0,
            maximum_drop_ft: -15_000.0,
            minimum_altitude_ft: -1_500.0,
            max_iterations: 20,
            zero_finding_accuracy_ft: 0.000005,
            gravity_fps2: G_ACCEL_FPS2,
            chart_resolution_ft: 1.0,
            stop_at_mach: None,
            mach_bands: vec![1.0],
            max_samples: 1_000_000,
            use_powder_sensitivity: false,
        }
    }
}

/// A configured trajectory engine.
#[derive(Debug, Clone)]
pub struct Engine {
    method: Method,
    config: Config,
}

impl Engine {
    pub fn new(method: Method, config: Config) -> Engine {
        Engine { method, config }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Integrate out to `max_range`, emitting a sample every `step` of
    /// down-range distance plus the final MAX sample.
    pub fn fire(
        &self,
        shot: &Shot,
        max_range: Quantity,
        step: Quantity,
    ) -> Result<Trajectory, Error> {
        self.fire_with(shot, max_range, step, TrajFlag::RANGE | TrajFlag::MAX, || true)
    }

    /// Integrate with full event output: sight-line crossings, apex and
    /// Mach transitions in addition to the range slices.
    pub fn fire_extra(
        &self,
        shot: &Shot,
        max_range: Quantity,
        step: Quantity,
    ) -> Result<Trajectory, Error> {
        self.fire_with(shot, max_range, step, TrajFlag::ALL, || true)
    }

    /// Integrate with an explicit flag filter and a cooperative-cancellation
    /// predicate, consulted once per emitted sample.
    pub fn fire_with(
        &self,
        shot: &Shot,
        max_range: Quantity,
        step: Quantity,
        filter: TrajFlag,
        should_continue: impl FnMut() -> bool,
    ) -> Result<Trajectory, Error> {
        shot.validate()?;
        let max_range_ft = max_range.get_in(Unit::Foot)?;
        let step_ft = step.get_in(Unit::Foot)?;
        if !(max_range_ft > 0.0) {
            return Err(Error::input(format!(
                "maximum range must be positive, got {max_range_ft} ft"
            )));
        }
        if !(step_ft > 0.0) {
            return Err(Error::input(format!(
                "range step must be positive, got {step_ft} ft"
            )));
        }
        let solve = Solve::prepare(self, shot)?;
        solve.run(max_range_ft, step_ft, filter, should_continue)
    }

    /// Solve many independent shots in parallel. Each solve owns its
    /// scratch state; shots and the engine are only read.
    pub fn fire_parallel(
        &self,
        shots: &[Shot],
        max_range: Quantity,
        step: Quantity,
    ) -> Vec<Result<Trajectory, Error>> {
        shots
            .par_iter()
            .map(|shot| self.fire(shot, max_range, step))
            .collect()
    }
}

/// Integration state at one instant.
#[derive(Debug, Clone, Copy)]
struct State {
    time: f64,
    pos: Vector3<f64>,
    vel: Vector3<f64>,
}

impl State {
    fn is_finite(&self) -> bool {
        self.time.is_finite()
            && self.pos.iter().all(|c| c.is_finite())
            && self.vel.iter().all(|c| c.is_finite())
    }
}

/// Local flow conditions at a state.
struct Flow {
    mach: f64,
    density_ratio: f64,
    /// Retardation per unit velocity, 1/s.
    drag: f64,
}

/// The event monitors. Each is a scalar function of state whose sign change
/// across a step marks the event.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Monitor {
    /// x crossing of the next output slice (upward).
    Range(f64),
    /// x crossing of the maximum range (upward).
    Max(f64),
    /// Height above sight line crossing zero upward.
    ZeroUp,
    /// Height above sight line crossing zero downward.
    ZeroDown,
    /// Vertical velocity crossing zero downward.
    Apex,
    /// Mach number falling through a band.
    Mach(f64),
}

impl Monitor {
    fn flag(self) -> TrajFlag {
        match self {
            Monitor::Range(_) => TrajFlag::RANGE,
            Monitor::Max(_) => TrajFlag::MAX,
            Monitor::ZeroUp => TrajFlag::ZERO_UP,
            Monitor::ZeroDown => TrajFlag::ZERO_DOWN,
            Monitor::Apex => TrajFlag::APEX,
            Monitor::Mach(_) => TrajFlag::MACH,
        }
    }

    /// Did the monitor cross in its firing direction between `fa` and `fb`?
    fn crosses(self, fa: f64, fb: f64) -> bool {
        match self {
            Monitor::Range(_) | Monitor::Max(_) | Monitor::ZeroUp => fa < 0.0 && fb >= 0.0,
            Monitor::ZeroDown | Monitor::Apex | Monitor::Mach(_) => fa > 0.0 && fb <= 0.0,
        }
    }
}

/// All per-solve state: scratch caches, precomputed constants, and the
/// sample buffer.
struct Solve<'a> {
    method: Method,
    cfg: &'a Config,
    atmo: &'a dyn LocalAtmosphere,
    drag: CdLookup<'a>,
    wind: WindField,
    /// CD_TO_RETARD / BC, 1/ft.
    k: f64,
    gravity: Vector3<f64>,
    omega: Option<Vector3<f64>>,
    alt0_ft: f64,
    look_tan: f64,
    look_cos: f64,
    look_sin: f64,
    weight_slugs: f64,
    state: State,
    samples: Vec<TrajectorySample>,
    // Event bookkeeping.
    seen_zero: TrajFlag,
    seen_apex: bool,
    fired_bands: Vec<bool>,
    next_range_ft: f64,
}

impl<'a> Solve<'a> {
    fn prepare(engine: &'a Engine, shot: &'a Shot) -> Result<Solve<'a>, Error> {
        let cfg = &engine.config;
        let projectile = &shot.ammo.projectile;
        let muzzle_velocity = if cfg.use_powder_sensitivity {
            shot.ammo.velocity_for_temp(shot.atmo.temperature())?
        } else {
            shot.ammo.muzzle_velocity
        };
        let mv_fps = muzzle_velocity.get_in(Unit::Fps)?;

        let elevation = shot.barrel_elevation()?;
        let azimuth_offset = shot.barrel_azimuth_offset()?;
        let pos = shot.muzzle_position_ft()?;
        let vel = Vector3::new(
            elevation.cos() * azimuth_offset.cos(),
            elevation.sin(),
            elevation.cos() * azimuth_offset.sin(),
        ) * mv_fps;

        let look = shot.look_angle.get_in(Unit::Radian)?;
        let weight_lb = projectile.weight.get_in(Unit::Grain)? * GRAINS_TO_POUNDS;

        Ok(Solve {
            method: engine.method,
            cfg,
            atmo: &shot.atmo,
            drag: projectile.curve.lookup(),
            wind: WindField::new(&shot.winds, shot.azimuth)?,
            k: CD_TO_RETARD / projectile.bc,
            gravity: Vector3::new(0.0, -cfg.gravity_fps2, 0.0),
            omega: shot.omega_body()?,
            alt0_ft: shot.atmo.altitude().get_in(Unit::Foot)?,
            look_tan: look.tan(),
            look_cos: look.cos(),
            look_sin: look.sin(),
            weight_slugs: weight_lb / G_ACCEL_FPS2,
            state: State {
                time: 0.0,
                pos,
                vel,
            },
            samples: Vec::new(),
            seen_zero: TrajFlag::NONE,
            seen_apex: false,
            fired_bands: vec![false; cfg.mach_bands.len()],
            next_range_ft: 0.0,
        })
    }

    /// Local flow conditions at a position/velocity pair.
    fn flow(&mut self, pos: &Vector3<f64>, vel: &Vector3<f64>) -> Flow {
        let wind = self.wind.vector_at(pos.x);
        let airspeed = (vel - wind).norm();
        let (density_ratio, mach1) = self.atmo.conditions_at(self.alt0_ft + pos.y);
        let mach = airspeed / mach1;
        let drag = if airspeed > MIN_SPEED_THRESHOLD {
            density_ratio * airspeed * self.drag.cd_at_mach(mach) * self.k
        } else {
            0.0
        };
        Flow {
            mach,
            density_ratio,
            drag,
        }
    }

    /// The shared derivative: drag against the relative wind, gravity, and
    /// the Coriolis term.
    fn acceleration(&mut self, pos: &Vector3<f64>, vel: &Vector3<f64>) -> Vector3<f64> {
        let wind = self.wind.vector_at(pos.x);
        let relative = vel - wind;
        let airspeed = relative.norm();
        let mut accel = self.gravity;
        if airspeed > MIN_SPEED_THRESHOLD {
            let (density_ratio, mach1) = self.atmo.conditions_at(self.alt0_ft + pos.y);
            let cd = self.drag.cd_at_mach(airspeed / mach1);
            accel -= relative * (density_ratio * airspeed * cd * self.k);
        }
        if let Some(omega) = self.omega {
            accel -= 2.0 * omega.cross(vel);
        }
        accel
    }

    /// One step of the selected kernel from `s` over `h` seconds.
    fn step(&mut self, s: &State, h: f64) -> State {
        match self.method {
            Method::Euler => {
                let a = self.acceleration(&s.pos, &s.vel);
                State {
                    time: s.time + h,
                    pos: s.pos + s.vel * h,
                    vel: s.vel + a * h,
                }
            }
            Method::RungeKutta4 => {
                let k1v = self.acceleration(&s.pos, &s.vel);
                let k1p = s.vel;
                let k2v = self.acceleration(&(s.pos + k1p * (h / 2.0)), &(s.vel + k1v * (h / 2.0)));
                let k2p = s.vel + k1v * (h / 2.0);
                let k3v = self.acceleration(&(s.pos + k2p * (h / 2.0)), &(s.vel + k2v * (h / 2.0)));
                let k3p = s.vel + k2v * (h / 2.0);
                let k4v = self.acceleration(&(s.pos + k3p * h), &(s.vel + k3v * h));
                let k4p = s.vel + k3v * h;
                State {
                    time: s.time + h,
                    pos: s.pos + (k1p + k2p * 2.0 + k3p * 2.0 + k4p) * (h / 6.0),
                    vel: s.vel + (k1v + k2v * 2.0 + k3v * 2.0 + k4v) * (h / 6.0),
                }
            }
            Method::Verlet => {
                let a0 = self.acceleration(&s.pos, &s.vel);
                let pos = s.pos + s.vel * h + a0 * (0.5 * h * h);
                let a1 = self.acceleration(&pos, &(s.vel + a0 * h));
                State {
                    time: s.time + h,
                    pos,
                    vel: s.vel + (a0 + a1) * (0.5 * h),
                }
            }
        }
    }

    fn monitor_value(&mut self, monitor: Monitor, s: &State) -> f64 {
        match monitor {
            Monitor::Range(x) | Monitor::Max(x) => s.pos.x - x,
            Monitor::ZeroUp | Monitor::ZeroDown => s.pos.y - s.pos.x * self.look_tan,
            Monitor::Apex => s.vel.y,
            Monitor::Mach(band) => self.flow(&s.pos, &s.vel).mach - band,
        }
    }

    /// Monitors that are armed given the current bookkeeping.
    fn armed_monitors(&self, max_range_ft: f64) -> Vec<Monitor> {
        let mut monitors = Vec::with_capacity(4 + self.cfg.mach_bands.len());
        monitors.push(Monitor::Range(self.next_range_ft));
        monitors.push(Monitor::Max(max_range_ft));
        if !self.seen_zero.contains(TrajFlag::ZERO_UP) {
            monitors.push(Monitor::ZeroUp);
        } else if !self.seen_zero.contains(TrajFlag::ZERO_DOWN) {
            monitors.push(Monitor::ZeroDown);
        }
        if !self.seen_apex {
            monitors.push(Monitor::Apex);
        }
        for (i, &band) in self.cfg.mach_bands.iter().enumerate() {
            if !self.fired_bands[i] {
                monitors.push(Monitor::Mach(band));
            }
        }
        monitors
    }

    /// Shrink the bracket around the earliest crossing of `monitor`, then
    /// place the event state by linear interpolation and one kernel call.
    fn locate_event(&mut self, monitor: Monitor, lo_in: State, hi_in: State) -> State {
        let mut lo = lo_in;
        let mut hi = hi_in;
        let tolerance_ft = 0.01 * self.cfg.chart_resolution_ft;
        let mut halvings = 0;
        while halvings < 3 && (hi.pos.x - lo.pos.x).abs() > tolerance_ft {
            let h_half = 0.5 * (hi.time - lo.time);
            if h_half < MIN_TIME_STEP {
                break;
            }
            let mid = self.step(&lo, h_half);
            let f_lo = self.monitor_value(monitor, &lo);
            let f_mid = self.monitor_value(monitor, &mid);
            if monitor.crosses(f_lo, f_mid) {
                hi = mid;
            } else {
                lo = mid;
            }
            halvings += 1;
        }
        let f_lo = self.monitor_value(monitor, &lo);
        let f_hi = self.monitor_value(monitor, &hi);
        let h_bracket = hi.time - lo.time;
        let tau = if (f_lo - f_hi).abs() < f64::EPSILON {
            0.5
        } else {
            (f_lo / (f_lo - f_hi)).clamp(0.0, 1.0)
        };
        if tau * h_bracket < MIN_TIME_STEP {
            lo
        } else {
            self.step(&lo, tau * h_bracket)
        }
    }

    /// Build a sample from a state.
    fn make_sample(&mut self, s: &State, flags: TrajFlag) -> TrajectorySample {
        let flow = self.flow(&s.pos, &s.vel);
        let reference_height = s.pos.x * self.look_tan;
        let height_ft = s.pos.y - reference_height;
        let windage_ft = s.pos.z;
        let speed_fps = s.vel.norm();
        let energy_ftlb = 0.5 * self.weight_slugs * speed_fps * speed_fps;
        let drop_angle = if s.pos.x > 0.0 {
            (height_ft / s.pos.x).atan()
        } else {
            0.0
        };
        let windage_angle = if s.pos.x > 0.0 {
            (windage_ft / s.pos.x).atan()
        } else {
            0.0
        };
        TrajectorySample {
            time: s.time,
            distance: Quantity::from_raw(s.pos.x * 12.0, Unit::Yard),
            slant_distance: Quantity::from_raw(
                (s.pos.x * self.look_cos + s.pos.y * self.look_sin) * 12.0,
                Unit::Yard,
            ),
            height: Quantity::from_raw(height_ft * 12.0, Unit::Inch),
            windage: Quantity::from_raw(windage_ft * 12.0, Unit::Inch),
            velocity: s.vel,
            speed: Quantity::from_raw(speed_fps * FEET_TO_METERS, Unit::Fps),
            mach: flow.mach,
            energy: Quantity::from_raw(energy_ftlb, Unit::FootPound),
            drop_angle: Quantity::from_raw(drop_angle, Unit::Moa),
            windage_angle: Quantity::from_raw(windage_angle, Unit::Moa),
            look_distance: Quantity::from_raw(s.pos.x / self.look_cos * 12.0, Unit::Yard),
            density_ratio: flow.density_ratio - 1.0,
            drag: flow.drag,
            flags,
        }
    }

    /// Record that a monitor fired: advance the range slice, retire
    /// single-shot monitors.
    fn note_fired(&mut self, monitor: Monitor, step_ft: f64) {
        match monitor {
            Monitor::Range(_) => self.next_range_ft += step_ft,
            Monitor::Max(_) => {}
            Monitor::Apex => self.seen_apex = true,
            Monitor::ZeroUp => self.seen_zero |= TrajFlag::ZERO_UP,
            Monitor::ZeroDown => self.seen_zero |= TrajFlag::ZERO_DOWN,
            Monitor::Mach(band) => {
                if let Some(i) = self
                    .cfg
                    .mach_bands
                    .iter()
                    .position(|&b| b == band)
                {
                    self.fired_bands[i] = true;
                }
            }
        }
    }

    /// Check the termination floors against the current state.
    fn stop_reason(&mut self) -> Option<StopReason> {
        if self.state.vel.norm() < self.cfg.minimum_velocity_fps {
            return Some(StopReason::MinimumVelocity);
        }
        if self.state.pos.y < self.cfg.maximum_drop_ft {
            return Some(StopReason::MaximumDrop);
        }
        if self.alt0_ft + self.state.pos.y < self.cfg.minimum_altitude_ft {
            return Some(StopReason::MinimumAltitude);
        }
        if let Some(limit) = self.cfg.stop_at_mach {
            let pos = self.state.pos;
            let vel = self.state.vel;
            if self.flow(&pos, &vel).mach < limit {
                return Some(StopReason::BelowStopMach);
            }
        }
        if self.samples.len() >= self.cfg.max_samples {
            return Some(StopReason::SampleLimit);
        }
        None
    }

    fn run(
        mut self,
        max_range_ft: f64,
        step_ft: f64,
        filter: TrajFlag,
        mut should_continue: impl FnMut() -> bool,
    ) -> Result<Trajectory, Error> {
        let capacity = (max_range_ft / step_ft).ceil() as usize + 8;
        self.samples = Vec::with_capacity(capacity.min(self.cfg.max_samples));

        let h = self.method.base_step() * self.cfg.step_multiplier;
        if h < MIN_TIME_STEP {
            return Err(Error::Instability {
                time: 0.0,
                detail: format!("integration step collapsed to {h} s"),
            });
        }

        // Starting above the sight line means the only crossing left is
        // downward; starting below and pointing down means there are none.
        let height0 = self.state.pos.y - self.state.pos.x * self.look_tan;
        if height0 >= 0.0 {
            self.seen_zero |= TrajFlag::ZERO_UP;
        }

        // Muzzle sample: the zeroth range slice.
        self.next_range_ft = step_ft;
        let muzzle = self.state;
        let sample = self.make_sample(&muzzle, TrajFlag::RANGE);
        if filter.intersects(TrajFlag::RANGE) {
            self.samples.push(sample);
            if !should_continue() {
                return Err(Error::Cancelled {
                    trajectory: Box::new(Trajectory::new(self.samples)),
                });
            }
        }

        let stopped = loop {
            if let Some(reason) = self.stop_reason() {
                break Some(reason);
            }
            if !self.state.is_finite() {
                return Err(Error::Instability {
                    time: self.state.time,
                    detail: "state is no longer finite".to_string(),
                });
            }

            let prev = self.state;
            let next = self.step(&prev, h);
            if !next.is_finite() {
                return Err(Error::Instability {
                    time: prev.time,
                    detail: "step produced a non-finite state".to_string(),
                });
            }

            // Evaluate every armed monitor across the step.
            let monitors = self.armed_monitors(max_range_ft);
            let mut crossings: Vec<(f64, Monitor)> = Vec::new();
            for monitor in monitors {
                let fa = self.monitor_value(monitor, &prev);
                let fb = self.monitor_value(monitor, &next);
                if monitor.crosses(fa, fb) {
                    let tau = if (fa - fb).abs() < f64::EPSILON {
                        0.5
                    } else {
                        (fa / (fa - fb)).clamp(0.0, 1.0)
                    };
                    crossings.push((tau, monitor));
                }
            }

            if crossings.is_empty() {
                self.state = next;
                continue;
            }

            // The earliest crossing leads and places the sample. Any other
            // monitor that has already crossed by the event state shares the
            // sample; it would be lost otherwise, because integration
            // resumes from the event state.
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));
            let (tau_lead, lead) = crossings[0];
            let event = self.locate_event(lead, prev, next);
            let mut flags = lead.flag();
            self.note_fired(lead, step_ft);
            for &(tau, monitor) in &crossings[1..] {
                let fa = self.monitor_value(monitor, &prev);
                let fe = self.monitor_value(monitor, &event);
                if monitor.crosses(fa, fe) || (tau - tau_lead) * h < 1e-9 {
                    flags |= monitor.flag();
                    self.note_fired(monitor, step_ft);
                }
            }

            if flags.intersects(filter) {
                let sample = self.make_sample(&event, flags);
                // A second event resolving to the same instant folds into
                // the previous sample; time stays strictly increasing.
                let merged = matches!(self.samples.last(), Some(last) if sample.time <= last.time);
                if merged {
                    if let Some(last) = self.samples.last_mut() {
                        last.flags |= flags;
                    }
                } else {
                    self.samples.push(sample);
                    if !should_continue() {
                        return Err(Error::Cancelled {
                            trajectory: Box::new(Trajectory::new(self.samples)),
                        });
                    }
                }
            }

            if flags.intersects(TrajFlag::MAX) {
                break None;
            }
            self.state = event;
        };

        match stopped {
            None => Ok(Trajectory::new(self.samples)),
            Some(reason) => {
                let last_distance = self
                    .samples
                    .last()
                    .map(|s| s.distance);
                Err(Error::Range {
                    reason,
                    last_distance,
                    trajectory: Box::new(Trajectory::new(self.samples)),
                })
            }
        }
    }
}
