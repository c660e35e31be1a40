//! Dimensioned quantities for the public data model.
//!
//! Every value that crosses the crate boundary is a [`Quantity`]: a canonical
//! magnitude plus the unit it was defined in, which is kept only for display.
//! Construction normalizes to a per-dimension canonical unit (radian, inch,
//! m/s, grain, °F, mmHg, ft·lb) and all arithmetic happens on the canonical
//! magnitude. Mixing dimensions is a [`Error::Dimension`] at the call site,
//! never a silent conversion.

use std::fmt;
use std::ops::{Mul, Neg};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Relative tolerance for quantity equality.
const EQ_RELATIVE_TOLERANCE: f64 = 1e-6;

/// Physical dimension of a unit of measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Angular,
    Distance,
    Velocity,
    Weight,
    Temperature,
    Pressure,
    Energy,
}

/// A unit of measure. The variant identifies both the dimension and the
/// specific unit within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    // Angular (canonical: radian)
    Radian,
    Degree,
    Moa,
    /// NATO mil, 1/6400 of a turn.
    Mil,
    MRad,
    /// Inches of subtension per 100 yards (atan mapping, not a linear factor).
    InchesPer100Yd,
    /// Centimeters of subtension per 100 meters (atan mapping).
    CmPer100M,

    // Distance (canonical: inch)
    Inch,
    Foot,
    Yard,
    Mile,
    Millimeter,
    Centimeter,
    Meter,
    Kilometer,

    // Velocity (canonical: m/s)
    Mps,
    Kmh,
    Fps,
    Mph,
    Knot,

    // Weight (canonical: grain)
    Grain,
    Gram,
    Kilogram,
    Pound,
    Ounce,

    // Temperature (canonical: °F, affine conversions)
    Fahrenheit,
    Celsius,
    Kelvin,
    Rankine,

    // Pressure (canonical: mmHg)
    MmHg,
    InHg,
    Bar,
    HPa,
    Psi,

    // Energy (canonical: ft·lb)
    FootPound,
    Joule,
}

impl Unit {
    /// Dimension this unit measures.
    pub fn dimension(self) -> Dimension {
        use Unit::*;
        match self {
            Radian | Degree | Moa | Mil | MRad | InchesPer100Yd | CmPer100M => Dimension::Angular,
            Inch | Foot | Yard | Mile | Millimeter | Centimeter | Meter | Kilometer => {
                Dimension::Distance
            }
            Mps | Kmh | Fps | Mph | Knot => Dimension::Velocity,
            Grain | Gram | Kilogram | Pound | Ounce => Dimension::Weight,
            Fahrenheit | Celsius | Kelvin | Rankine => Dimension::Temperature,
            MmHg | InHg | Bar | HPa | Psi => Dimension::Pressure,
            FootPound | Joule => Dimension::Energy,
        }
    }

    /// Short display symbol.
    pub fn symbol(self) -> &'static str {
        use Unit::*;
        match self {
            Radian => "rad",
            Degree => "°",
            Moa => "MOA",
            Mil => "mil",
            MRad => "mrad",
            InchesPer100Yd => "in/100yd",
            CmPer100M => "cm/100m",
            Inch => "in",
            Foot => "ft",
            Yard => "yd",
            Mile => "mi",
            Millimeter => "mm",
            Centimeter => "cm",
            Meter => "m",
            Kilometer => "km",
            Mps => "m/s",
            Kmh => "km/h",
            Fps => "ft/s",
            Mph => "mph",
            Knot => "kt",
            Grain => "gr",
            Gram => "g",
            Kilogram => "kg",
            Pound => "lb",
            Ounce => "oz",
            Fahrenheit => "°F",
            Celsius => "°C",
            Kelvin => "K",
            Rankine => "°R",
            MmHg => "mmHg",
            InHg => "inHg",
            Bar => "bar",
            HPa => "hPa",
            Psi => "psi",
            FootPound => "ft·lb",
            Joule => "J",
        }
    }

    /// Default number of decimals when formatting in this unit.
    pub fn decimals(self) -> usize {
        use Unit::*;
        match self {
            Radian => 6,
            Degree => 4,
            Moa | MRad | InchesPer100Yd | CmPer100M => 2,
            Mil => 3,
            Inch | Yard | Meter => 1,
            Foot => 2,
            Mile | Millimeter | Centimeter | Kilometer => 3,
            Mps => 0,
            Kmh | Fps | Mph | Knot => 1,
            Grain | Gram => 1,
            Kilogram => 3,
            Pound | Ounce => 1,
            Fahrenheit | Celsius | Kelvin | Rankine => 1,
            MmHg => 0,
            InHg => 2,
            Bar | HPa | Psi => 2,
            FootPound | Joule => 0,
        }
    }

    /// Create a quantity of `value` in this unit: `Unit::Yard.new(100.0)`.
    pub fn new(self, value: f64) -> Quantity {
        Quantity::new(value, self)
    }

    /// Convert a value expressed in this unit to the canonical magnitude of
    /// its dimension.
    fn to_raw(self, value: f64) -> f64 {
        use std::f64::consts::PI;
        use Unit::*;
        match self {
            Radian => value,
            Degree => value * PI / 180.0,
            Moa => value * PI / 180.0 / 60.0,
            Mil => value * PI / 3200.0,
            MRad => value / 1000.0,
            InchesPer100Yd => (value / 3600.0).atan(),
            CmPer100M => (value / 10000.0).atan(),

            Inch => value,
            Foot => value * 12.0,
            Yard => value * 36.0,
            Mile => value * 63360.0,
            Millimeter => value / 25.4,
            Centimeter => value / 2.54,
            Meter => value * 1000.0 / 25.4,
            Kilometer => value * 1_000_000.0 / 25.4,

            Mps => value,
            Kmh => value / 3.6,
            Fps => value * 0.3048,
            Mph => value * 0.44704,
            Knot => value * 1852.0 / 3600.0,

            Grain => value,
            Gram => value * 15.4323584,
            Kilogram => value * 15432.3584,
            Pound => value * 7000.0,
            Ounce => value * 437.5,

            Fahrenheit => value,
            Celsius => value * 9.0 / 5.0 + 32.0,
            Kelvin => (value - 273.15) * 9.0 / 5.0 + 32.0,
            Rankine => value - 459.67,

            MmHg => value,
            InHg => value * 25.4,
            Bar => value * 750.061683,
            HPa => value * 0.750061683,
            Psi => value * 51.714924102396,

            FootPound => value,
            Joule => value * 0.7375621492772654,
        }
    }

    /// Convert a canonical magnitude back into this unit.
    fn from_raw(self, raw: f64) -> f64 {
        use std::f64::consts::PI;
        use Unit::*;
        match self {
            Radian => raw,
            Degree => raw * 180.0 / PI,
            Moa => raw * 180.0 / PI * 60.0,
            Mil => raw * 3200.0 / PI,
            MRad => raw * 1000.0,
            InchesPer100Yd => raw.tan() * 3600.0,
            CmPer100M => raw.tan() * 10000.0,

            Inch => raw,
            Foot => raw / 12.0,
            Yard => raw / 36.0,
            Mile => raw / 63360.0,
            Millimeter => raw * 25.4,
            Centimeter => raw * 2.54,
            Meter => raw * 25.4 / 1000.0,
            Kilometer => raw * 25.4 / 1_000_000.0,

            Mps => raw,
            Kmh => raw * 3.6,
            Fps => raw / 0.3048,
            Mph => raw / 0.44704,
            Knot => raw * 3600.0 / 1852.0,

            Grain => raw,
            Gram => raw / 15.4323584,
            Kilogram => raw / 15432.3584,
            Pound => raw / 7000.0,
            Ounce => raw / 437.5,

            Fahrenheit => raw,
            Celsius => (raw - 32.0) * 5.0 / 9.0,
            Kelvin => (raw - 32.0) * 5.0 / 9.0 + 273.15,
            Rankine => raw + 459.67,

            MmHg => raw,
            InHg => raw / 25.4,
            Bar => raw / 750.061683,
            HPa => raw / 0.750061683,
            Psi => raw / 51.714924102396,

            FootPound => raw,
            Joule => raw / 0.7375621492772654,
        }
    }
}

/// An immutable dimensioned scalar: canonical magnitude plus preferred
/// display unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quantity {
    raw: f64,
    unit: Unit,
}

impl Quantity {
    /// Construct from a value expressed in `unit`.
    pub fn new(value: f64, unit: Unit) -> Quantity {
        Quantity {
            raw: unit.to_raw(value),
            unit,
        }
    }

    /// The preferred display unit this quantity was defined in.
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// The quantity's dimension.
    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Canonical magnitude (radian / inch / m/s / grain / °F / mmHg / ft·lb).
    pub fn raw(&self) -> f64 {
        self.raw
    }

    /// The magnitude in the preferred display unit.
    pub fn value(&self) -> f64 {
        self.unit.from_raw(self.raw)
    }

    /// Read the magnitude in a requested unit of the same dimension.
    pub fn get_in(&self, unit: Unit) -> Result<f64, Error> {
        if unit.dimension() != self.dimension() {
            return Err(Error::Dimension {
                expected: self.dimension(),
                found: unit.dimension(),
            });
        }
        Ok(unit.from_raw(self.raw))
    }

    /// A copy of this quantity with a different preferred display unit.
    pub fn convert(self, unit: Unit) -> Result<Quantity, Error> {
        if unit.dimension() != self.dimension() {
            return Err(Error::Dimension {
                expected: self.dimension(),
                found: unit.dimension(),
            });
        }
        Ok(Quantity {
            raw: self.raw,
            unit,
        })
    }

    /// Checked addition; both operands must share a dimension. The result
    /// keeps the left operand's display unit.
    pub fn add(self, other: Quantity) -> Result<Quantity, Error> {
        if other.dimension() != self.dimension() {
            return Err(Error::Dimension {
                expected: self.dimension(),
                found: other.dimension(),
            });
        }
        Ok(Quantity {
            raw: self.raw + other.raw,
            unit: self.unit,
        })
    }

    /// Checked subtraction, same rules as [`Quantity::add`].
    pub fn sub(self, other: Quantity) -> Result<Quantity, Error> {
        self.add(-other)
    }

    /// Construct directly from a canonical magnitude; `unit` only selects
    /// the preferred display unit.
    pub(crate) fn from_raw(raw: f64, unit: Unit) -> Quantity {
        Quantity { raw, unit }
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.dimension() == other.dimension()
            && (self.raw - other.raw).abs()
                <= EQ_RELATIVE_TOLERANCE * self.raw.abs().max(other.raw.abs())
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.dimension() != other.dimension() {
            return None;
        }
        self.raw.partial_cmp(&other.raw)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity {
            raw: -self.raw,
            unit: self.unit,
        }
    }
}

impl Mul<f64> for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: f64) -> Quantity {
        Quantity {
            raw: self.raw * rhs,
            unit: self.unit,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.*}{}",
            self.unit.decimals(),
            self.value(),
            self.unit.symbol()
        )
    }
}
