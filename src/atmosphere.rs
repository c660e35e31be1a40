//! Standard-atmosphere model.
//!
//! An [`Atmosphere`] is created once per shot from altitude, pressure,
//! temperature and humidity, and is read-only during integration. The
//! integrator queries it through [`LocalAtmosphere`]: density ratio against
//! the ICAO sea-level standard and local speed of sound, both as pure
//! functions of the altitude offset from the reference conditions.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::Error;
use crate::units::{Quantity, Unit};

/// Pressure-altitude exponent g·M / (R·L) for the ICAO troposphere.
const PRESSURE_EXPONENT: f64 =
    G_ACCEL_MPS2 * MOLAR_MASS_AIR / (GAS_CONSTANT * LAPSE_RATE_K_PER_M);

/// Capability contract the integrator needs from an atmosphere model.
pub trait LocalAtmosphere {
    /// Air density at `altitude_ft` as a ratio against the ICAO sea-level
    /// standard (1.225 kg/m³).
    fn density_ratio_at(&self, altitude_ft: f64) -> f64;

    /// Local speed of sound at `altitude_ft`, in ft/s.
    fn mach1_at(&self, altitude_ft: f64) -> f64;

    /// Both flow conditions in one query; implementors with a fused
    /// computation override this.
    fn conditions_at(&self, altitude_ft: f64) -> (f64, f64) {
        (self.density_ratio_at(altitude_ft), self.mach1_at(altitude_ft))
    }
}

/// Atmospheric conditions at a reference altitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atmosphere {
    altitude: Quantity,
    pressure: Quantity,
    temperature: Quantity,
    /// Relative humidity, 0..1.
    humidity: f64,
    // Derived at construction, all in the engine's working units.
    altitude_ft: f64,
    temperature_k: f64,
    density_kg_m3: f64,
    mach_fps: f64,
}

impl Atmosphere {
    /// Build an atmosphere from explicit conditions. Temperature and
    /// pressure must be physically positive; humidity is clamped to [0, 1].
    pub fn new(
        altitude: Quantity,
        pressure: Quantity,
        temperature: Quantity,
        humidity: f64,
    ) -> Result<Atmosphere, Error> {
        let temperature_k = temperature.get_in(Unit::Kelvin)?;
        let pressure_pa = pressure.get_in(Unit::HPa)? * 100.0;
        if temperature_k <= 0.0 {
            return Err(Error::input(format!(
                "temperature must be above absolute zero, got {temperature_k} K"
            )));
        }
        if pressure_pa <= 0.0 {
            return Err(Error::input(format!(
                "pressure must be positive, got {pressure_pa} Pa"
            )));
        }
        let humidity = humidity.clamp(0.0, 1.0);
        let density_kg_m3 = moist_air_density(pressure_pa, temperature_k, humidity);
        let mach_fps = speed_of_sound_mps(temperature_k) * METERS_TO_FEET;

        Ok(Atmosphere {
            altitude_ft: altitude.get_in(Unit::Foot)?,
            altitude,
            pressure,
            temperature,
            humidity,
            temperature_k,
            density_kg_m3,
            mach_fps,
        })
    }

    /// ICAO standard atmosphere at the given altitude, dry air.
    pub fn icao(altitude: Quantity) -> Result<Atmosphere, Error> {
        let alt_m = altitude.get_in(Unit::Meter)?;
        let t_k = STANDARD_TEMPERATURE_K - LAPSE_RATE_K_PER_M * alt_m;
        let p_pa = STANDARD_PRESSURE_PA * (t_k / STANDARD_TEMPERATURE_K).powf(PRESSURE_EXPONENT);
        Atmosphere::new(
            altitude,
            Unit::HPa.new(p_pa / 100.0),
            Unit::Kelvin.new(t_k),
            0.0,
        )
    }

    /// ICAO standard atmosphere at sea level.
    pub fn sea_level() -> Atmosphere {
        // Constant inputs, cannot fail.
        Atmosphere::icao(Unit::Foot.new(0.0)).expect("sea-level standard atmosphere")
    }

    /// Reference altitude.
    pub fn altitude(&self) -> Quantity {
        self.altitude
    }

    /// Reference pressure.
    pub fn pressure(&self) -> Quantity {
        self.pressure
    }

    /// Reference temperature.
    pub fn temperature(&self) -> Quantity {
        self.temperature
    }

    /// Relative humidity, 0..1.
    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    /// Air density at the reference altitude (kg/m³).
    pub fn density(&self) -> f64 {
        self.density_kg_m3
    }

    /// Density ratio at the reference altitude against the sea-level
    /// standard.
    pub fn density_ratio(&self) -> f64 {
        self.density_kg_m3 / STANDARD_AIR_DENSITY
    }

    /// Speed of sound at the reference altitude, as a velocity quantity.
    pub fn speed_of_sound(&self) -> Quantity {
        Unit::Fps.new(self.mach_fps)
    }

    /// Density ratio and speed of sound (ft/s) at an altitude, applying the
    /// ICAO lapse as a delta from the reference conditions.
    pub fn density_factor_and_mach_at(&self, altitude_ft: f64) -> (f64, f64) {
        let delta_m = (altitude_ft - self.altitude_ft) * FEET_TO_METERS;
        // 1 − L·Δh/T₀, floored away from zero so extreme drops stay finite.
        let lapse = (1.0 - LAPSE_RATE_K_PER_M * delta_m / self.temperature_k).max(1e-6);
        let density = self.density_kg_m3 * lapse.powf(PRESSURE_EXPONENT - 1.0);
        let mach = speed_of_sound_mps(self.temperature_k * lapse) * METERS_TO_FEET;
        (density / STANDARD_AIR_DENSITY, mach)
    }
}

impl LocalAtmosphere for Atmosphere {
    fn density_ratio_at(&self, altitude_ft: f64) -> f64 {
        self.density_factor_and_mach_at(altitude_ft).0
    }

    fn mach1_at(&self, altitude_ft: f64) -> f64 {
        self.density_factor_and_mach_at(altitude_ft).1
    }

    fn conditions_at(&self, altitude_ft: f64) -> (f64, f64) {
        self.density_factor_and_mach_at(altitude_ft)
    }
}

/// Speed of sound in dry air at the given temperature, m/s.
fn speed_of_sound_mps(temperature_k: f64) -> f64 {
    (GAMMA_AIR * GAS_CONSTANT * temperature_k / MOLAR_MASS_AIR).sqrt()
}

/// Saturation vapor pressure by the Tetens approximation, in Pa.
fn tetens_saturation_pa(temperature_k: f64) -> f64 {
    let t_c = temperature_k - 273.15;
    611.2 * 10f64.powf(7.5 * t_c / (t_c + 237.3))
}

/// Moist-air density: the dry-air ideal-gas density reduced by the vapor
/// mole fraction weighted with the molar-mass ratio.
fn moist_air_density(pressure_pa: f64, temperature_k: f64, humidity: f64) -> f64 {
    let vapor_pa = (humidity * tetens_saturation_pa(temperature_k)).min(pressure_pa);
    let dry = pressure_pa * MOLAR_MASS_AIR / (GAS_CONSTANT * temperature_k);
    dry * (1.0 - (vapor_pa / pressure_pa) * (1.0 - MOLAR_MASS_VAPOR / MOLAR_MASS_AIR))
}
