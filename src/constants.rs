/// Physical constants used throughout the trajectory calculations.

/// Standard gravitational acceleration in ft/s².
pub const G_ACCEL_FPS2: f64 = 32.17405;

/// Standard gravitational acceleration in m/s².
pub const G_ACCEL_MPS2: f64 = 9.80665;

/// ICAO temperature lapse rate in the troposphere (K/m).
pub const LAPSE_RATE_K_PER_M: f64 = 0.0065;

/// Molar mass of dry air (kg/mol), ICAO value.
pub const MOLAR_MASS_AIR: f64 = 0.0289644;

/// Molar mass of water vapor (kg/mol).
pub const MOLAR_MASS_VAPOR: f64 = 0.01801528;

/// Universal gas constant (J/(mol·K)), ICAO value.
pub const GAS_CONSTANT: f64 = 8.31432;

/// Heat capacity ratio of air.
pub const GAMMA_AIR: f64 = 1.4;

/// ICAO sea-level standard temperature (K).
pub const STANDARD_TEMPERATURE_K: f64 = 288.15;

/// ICAO sea-level standard pressure (Pa).
pub const STANDARD_PRESSURE_PA: f64 = 101_325.0;

/// Air density at ICAO sea-level standard conditions (kg/m³).
pub const STANDARD_AIR_DENSITY: f64 = 1.225;

/// Drag-coefficient to retardation conversion constant (1/ft when divided
/// by a ballistic coefficient in lb/in²).
///
/// Retardation per unit airspeed = Cd · (ρ/ρ₀) · CD_TO_RETARD / BC, with
/// airspeed in ft/s. Derivation: standard air density 0.076474 lb/ft³ times
/// π / (4 · 2 · 144), the 144 converting the BC's lb/in² sectional density
/// to lb/ft².
pub const CD_TO_RETARD: f64 = 2.08551e-04;

/// Earth rotation rate (rad/s).
pub const EARTH_ROTATION_RATE: f64 = 7.292_115e-5;

/// Conversion factor: meters to feet.
pub const METERS_TO_FEET: f64 = 1.0 / 0.3048;

/// Conversion factor: feet to meters.
pub const FEET_TO_METERS: f64 = 0.3048;

/// Conversion factor: grains to pounds.
pub const GRAINS_TO_POUNDS: f64 = 1.0 / 7000.0;

/// Minimum airspeed magnitude treated as motion (ft/s); guards divisions
/// by the relative-wind speed.
pub const MIN_SPEED_THRESHOLD: f64 = 1e-6;

/// Smallest integration step the engine will take before reporting a
/// numerical breakdown (seconds).
pub const MIN_TIME_STEP: f64 = 1e-9;
