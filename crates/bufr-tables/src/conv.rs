//! Unit conversion between the unit names used in BUFR/CREX tables.
//!
//! Conversions are looked up in a process-wide registry keyed by the exact
//! `(from, to)` unit strings. Converting a unit to itself never consults the
//! registry.

use crate::error::{TableError, TableResult};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// One registered conversion rule.
#[derive(Debug, Clone, Copy)]
enum Conversion {
    /// `y = x * mul + add`
    Linear { mul: f64, add: f64 },
    /// Two spellings of the same unit
    Ident,
    Function(fn(f64) -> TableResult<f64>),
}

impl Conversion {
    fn apply(&self, value: f64) -> TableResult<f64> {
        match *self {
            Conversion::Linear { mul, add } => Ok(value * mul + add),
            Conversion::Ident => Ok(value),
            Conversion::Function(f) => f(value),
        }
    }
}

/// Conversion rules indexed by source unit, then destination unit.
#[derive(Default)]
struct Registry {
    rules: HashMap<&'static str, HashMap<&'static str, Conversion>>,
}

impl Registry {
    fn insert(&mut self, from: &'static str, to: &'static str, conv: Conversion) {
        self.rules.entry(from).or_default().insert(to, conv);
    }

    /// Register a linear rule. The inverse is added unless an explicit rule
    /// for the reverse direction exists or is added later.
    fn linear(&mut self, from: &'static str, to: &'static str, mul: f64, add: f64) {
        self.insert(from, to, Conversion::Linear { mul, add });
        self.rules
            .entry(to)
            .or_default()
            .entry(from)
            .or_insert(Conversion::Linear {
                mul: 1.0 / mul,
                add: -add / mul,
            });
    }

    fn ident(&mut self, from: &'static str, to: &'static str) {
        self.insert(from, to, Conversion::Ident);
        self.insert(to, from, Conversion::Ident);
    }

    fn function(
        &mut self,
        from: &'static str,
        to: &'static str,
        forward: fn(f64) -> TableResult<f64>,
        backward: fn(f64) -> TableResult<f64>,
    ) {
        self.insert(from, to, Conversion::Function(forward));
        self.insert(to, from, Conversion::Function(backward));
    }

    fn find(&self, from: &str, to: &str) -> Option<Conversion> {
        self.rules.get(from)?.get(to).copied()
    }
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut r = Registry::default();

    r.linear("K", "C", 1.0, -273.15001);
    r.linear("K", "C/10", 10.0, -2731.5001);
    r.linear("C", "C/10", 10.0, 0.0);
    r.linear("minuti", "S", 60.0, 0.0);
    r.linear("MINUTE", "S", 60.0, 0.0);
    r.linear("S", "MINUTE", 1.0 / 60.0, 0.0);
    r.linear("G/M**3", "KG/M**3", 0.001, 0.0);
    r.linear("KG/M**3", "G/M**3", 1000.0, 0.0);
    r.linear("ug/m**3", "KG/M**3", 0.000000001, 0.0);
    r.linear("KG/M**3", "ug/m**3", 1000000000.0, 0.0);
    r.linear("mg/l", "KG/M**3", 0.001, 0.0);
    r.linear("KG/M**3", "mg/l", 1000.0, 0.0);
    r.linear("PA", "KPA", 0.001, 0.0);
    r.linear("KPA", "PA", 1000.0, 0.0);
    r.linear("M", "MM", 1000.0, 0.0);
    r.linear("MM", "M", 0.001, 0.0);
    r.linear("M", "cm", 100.0, 0.0);
    r.linear("cm", "M", 0.01, 0.0);
    r.linear("M", "KM", 0.001, 0.0);
    r.linear("KM", "M", 1000.0, 0.0);
    r.linear("%", "PERCENT", 1.0, 0.0);
    r.linear("PERCENT", "%", 1.0, 0.0);
    r.linear("M", "FT", 3.2808, 0.0);
    r.linear("FT", "M", 0.3048, 0.0);
    r.linear("cal/cm**2", "J/M**2", 41868.0, 0.0);
    r.linear("J/M**2", "cal/cm**2", 0.000023885, 0.0);
    r.linear("J/M**2", "MJ/M**2", 0.000001, 0.0);
    r.linear("MJ/M**2", "J/M**2", 1000000.0, 0.0);
    r.linear("m/s/10", "M/S", 0.1, 0.0);
    r.linear("M/S", "m/s/10", 10.0, 0.0);
    r.linear("nodi", "M/S", 0.51444, 0.0);
    r.linear("M/S", "nodi", 1.94384, 0.0);
    r.linear("PA", "mBar", 0.01, 0.0);
    r.linear("mBar", "PA", 100.0, 0.0);
    r.linear("PA", "hPa", 0.01, 0.0);
    r.linear("hPa", "PA", 100.0, 0.0);
    r.linear("PA", "Bar", 0.00001, 0.0);
    r.linear("Bar", "PA", 100000.0, 0.0);
    r.linear("PA", "NBAR", 0.0001, 0.0);
    r.linear("NBAR", "PA", 10000.0, 0.0);
    r.linear("hm", "M", 100.0, 0.0);
    r.linear("M", "hm", 0.01, 0.0);
    r.linear("mm", "M", 0.001, 0.0);
    r.linear("M", "mm", 1000.0, 0.0);
    r.linear("mV", "V", 0.001, 0.0);
    r.linear("V", "mV", 1000.0, 0.0);
    r.linear("1/8", "%", 12.5, 0.0);
    r.linear("%", "1/8", 0.08, 0.0);
    r.linear("mm/10", "KG/M**2", 0.1, 0.0);
    r.linear("GPM", "m**2/s**2", 9.80665, 0.0);
    r.linear("GPM", "M**2/S**2", 9.80665, 0.0);
    r.linear("MGP", "m**2/s**2", 9.80665, 0.0);
    r.linear("MGP", "M**2/S**2", 9.80665, 0.0);
    r.linear("m**2/s**2", "GPM", 0.101971621, 0.0);
    r.linear("M**2/S**2", "GPM", 0.101971621, 0.0);
    r.linear("m**2/s**2", "MGP", 0.101971621, 0.0);
    r.linear("M**2/S**2", "MGP", 0.101971621, 0.0);
    r.linear("cal/s/cm**2", "W/M**2", 41868.0, 0.0);
    r.linear("cal/h/cm**2", "W/M**2", 11.63, 0.0);
    r.linear("Mj/m**2", "J/M**2", 1000000.0, 0.0);
    r.linear("RATIO", "%", 100.0, 0.0);
    r.linear("%", "RATIO", 0.01, 0.0);
    r.linear("ms/cm", "S/M", 0.1, 0.0);
    r.linear("S/M", "ms/cm", 10.0, 0.0);
    r.linear("mS/cm", "S/M", 0.1, 0.0);
    r.linear("S/M", "mS/cm", 10.0, 0.0);

    r.ident("A", "YEAR");
    r.ident("YEARS", "YEAR");
    r.ident("MON", "MONTH");
    r.ident("MONTHS", "MONTH");
    r.ident("D", "DAY");
    r.ident("DAYS", "DAY");
    r.ident("H", "HOUR");
    r.ident("HOURS", "HOUR");
    r.ident("MIN", "MINUTE");
    r.ident("MINUTES", "MINUTE");
    r.ident("SECONDS", "SECOND");
    r.ident("SECOND", "S");
    r.ident("sec", "S");
    r.ident("G/G", "KG/KG");
    r.ident("m**(2/3)/S", "M**(2/3)/S");
    r.ident("DEGREE**2", "DEGREE2");
    r.ident("KG/M**2", "KGM-2");
    r.ident("KG/M**2", "KG M-2");
    r.ident("J/M**2", "JM-2");
    r.ident("Bq/L", "BQ L-1");
    r.ident("DOBSON", "DU");
    r.ident("LOG(1/M**2)", "LOG (M-2)");
    r.ident("DEGREE", "DEG");
    r.ident("DEGREE TRUE", "DEG");
    r.ident("DEGREE TRUE", "gsess");
    r.ident("m/sec", "M/S");
    r.ident("m", "M");
    r.ident("mm", "KG/M**2");
    r.ident("degree true", "DEGREE TRUE");
    r.ident("GPM", "MGP");
    r.ident("W/m**2", "W/M**2");
    r.ident("J M-2", "J/M**2");
    r.ident("ppt", "PART PER THOUSAND");

    r.function(
        "octants",
        "DEGREE TRUE",
        |v| convert_octants_to_degrees(v.round() as i32),
        |v| convert_degrees_to_octants(v).map(f64::from),
    );

    r
});

fn unsupported(from: &str, to: &str) -> TableError {
    TableError::UnsupportedConversion {
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Convert `value` from unit `from` to unit `to`.
pub fn convert_units(from: &str, to: &str, value: f64) -> TableResult<f64> {
    if from == to {
        return Ok(value);
    }
    REGISTRY
        .find(from, to)
        .ok_or_else(|| unsupported(from, to))?
        .apply(value)
}

/// Check if a conversion between the two units is available.
pub fn convert_units_allowed(from: &str, to: &str) -> bool {
    from == to || REGISTRY.find(from, to).is_some()
}

/// Multiplier used converting from `from` to `to`.
///
/// Only defined for linear and identity conversions.
pub fn convert_units_get_mul(from: &str, to: &str) -> TableResult<f64> {
    if from == to {
        return Ok(1.0);
    }
    match REGISTRY.find(from, to) {
        Some(Conversion::Linear { mul, .. }) => Ok(mul),
        Some(Conversion::Ident) => Ok(1.0),
        _ => Err(unsupported(from, to)),
    }
}

// ============================================================================
// Standalone conversions
// ============================================================================

/// Convert ICAO standard atmosphere height in meters to pressure in hPa.
pub fn convert_icao_to_press(height: f64) -> f64 {
    const ZA: f64 = 5.252368255329;
    const ZB: f64 = 44330.769230769;
    const ZC: f64 = 0.000157583169442;
    const P0: f64 = 1013.25;
    const P11: f64 = 226.547172;

    if height <= 11000.0 {
        P0 * (1.0 - height / ZB).powf(ZA)
    } else {
        P11 * (-ZC * (height - 11000.0)).exp()
    }
}

/// Convert a wind direction in octants (0-8) to degrees.
pub fn convert_octants_to_degrees(octants: i32) -> TableResult<f64> {
    if !(0..=8).contains(&octants) {
        return Err(TableError::OutOfRange(format!(
            "cannot handle octants ({}) values below 0 or above 8",
            octants
        )));
    }
    Ok(octants as f64 * 45.0)
}

/// Convert a wind direction in degrees to octants.
///
/// 0 means calm and maps to 0; north maps to 8.
pub fn convert_degrees_to_octants(degrees: f64) -> TableResult<i32> {
    if !(0.0..=360.0).contains(&degrees) {
        return Err(TableError::OutOfRange(format!(
            "cannot handle degrees ({}) values below 0.0 or above 360.0",
            degrees
        )));
    }
    Ok(if degrees == 0.0 {
        0
    } else if degrees > 337.5 || degrees <= 22.5 {
        8
    } else if degrees <= 67.5 {
        1
    } else if degrees <= 112.5 {
        2
    } else if degrees <= 157.5 {
        3
    } else if degrees <= 202.5 {
        4
    } else if degrees <= 247.5 {
        5
    } else if degrees <= 292.5 {
        6
    } else {
        7
    })
}

// Cloud type code tables: WMO code N maps 0..=9 to base..base+9 in BUFR
// 020012, and '/' (stored as -1) to a dedicated missing code.
fn wmo_cloud_to_bufr(table: &str, base: i32, slash: i32, from: i32) -> TableResult<i32> {
    match from {
        0..=9 => Ok(from + base),
        -1 => Ok(slash),
        _ => Err(TableError::OutOfRange(format!(
            "value {} not found in WMO code table {}",
            from, table
        ))),
    }
}

fn bufr_cloud_to_wmo(table: &str, base: i32, slash: i32, from: i32) -> TableResult<i32> {
    if (base..=base + 9).contains(&from) {
        Ok(from - base)
    } else if from == slash {
        Ok(-1)
    } else {
        Err(TableError::OutOfRange(format!(
            "BUFR 20012 value {} cannot be represented with WMO code table {}",
            from, table
        )))
    }
}

/// Cloud type
pub fn convert_wmo0500_to_bufr20012(from: i32) -> TableResult<i32> {
    wmo_cloud_to_bufr("0500", 0, 59, from)
}

pub fn convert_bufr20012_to_wmo0500(from: i32) -> TableResult<i32> {
    bufr_cloud_to_wmo("0500", 0, 59, from)
}

/// Cloud type (CH)
pub fn convert_wmo0509_to_bufr20012(from: i32) -> TableResult<i32> {
    wmo_cloud_to_bufr("0509", 10, 60, from)
}

pub fn convert_bufr20012_to_wmo0509(from: i32) -> TableResult<i32> {
    bufr_cloud_to_wmo("0509", 10, 60, from)
}

/// Cloud type (CM)
pub fn convert_wmo0515_to_bufr20012(from: i32) -> TableResult<i32> {
    wmo_cloud_to_bufr("0515", 20, 61, from)
}

pub fn convert_bufr20012_to_wmo0515(from: i32) -> TableResult<i32> {
    bufr_cloud_to_wmo("0515", 20, 61, from)
}

/// Cloud type (CL)
pub fn convert_wmo0513_to_bufr20012(from: i32) -> TableResult<i32> {
    wmo_cloud_to_bufr("0513", 30, 62, from)
}

pub fn convert_bufr20012_to_wmo0513(from: i32) -> TableResult<i32> {
    bufr_cloud_to_wmo("0513", 30, 62, from)
}

/// Present weather
pub fn convert_wmo4677_to_bufr20003(from: i32) -> TableResult<i32> {
    if from > 99 {
        return Err(TableError::OutOfRange(format!(
            "cannot handle WMO4677 present weather ({}) values above 99",
            from
        )));
    }
    Ok(from)
}

pub fn convert_bufr20003_to_wmo4677(from: i32) -> TableResult<i32> {
    if from > 99 {
        return Err(TableError::OutOfRange(format!(
            "cannot handle BUFR 20003 present weather ({}) values above 99",
            from
        )));
    }
    Ok(from)
}

/// Past weather
pub fn convert_wmo4561_to_bufr20004(from: i32) -> TableResult<i32> {
    if from > 9 {
        return Err(TableError::OutOfRange(format!(
            "cannot handle WMO4561 past weather ({}) values above 9",
            from
        )));
    }
    Ok(from)
}

pub fn convert_bufr20004_to_wmo4561(from: i32) -> TableResult<i32> {
    if from > 9 {
        return Err(TableError::OutOfRange(format!(
            "cannot handle BUFR 20004 past weather ({}) values above 9",
            from
        )));
    }
    Ok(from)
}

/// Flag bits of BUFR code table 008001 (vertical sounding significance, 7 bits).
pub mod bufr08001 {
    pub const MISSING: u32 = 0x01;
    pub const SIGWIND: u32 = 0x02;
    pub const SIGTH: u32 = 0x04;
    pub const MAXWIND: u32 = 0x08;
    pub const TROPO: u32 = 0x10;
    pub const STD: u32 = 0x20;
    pub const SURFACE: u32 = 0x40;
    pub const ALL_MISSING: u32 = 0x7f;
}

/// Flag bits of BUFR code table 008042 (extended vertical sounding significance, 18 bits).
pub mod bufr08042 {
    pub const MISSING: u32 = 0x00001;
    pub const SIGWIND: u32 = 0x00800;
    pub const SIGHUM: u32 = 0x01000;
    pub const SIGTEMP: u32 = 0x02000;
    pub const MAXWIND: u32 = 0x04000;
    pub const TROPO: u32 = 0x08000;
    pub const STD: u32 = 0x10000;
    pub const SURFACE: u32 = 0x20000;
    pub const ALL_MISSING: u32 = 0x3ffff;
}

/// Vertical sounding significance, 008001 to 008042.
pub fn convert_bufr08001_to_bufr08042(from: u32) -> u32 {
    if from & bufr08001::MISSING != 0 {
        return bufr08042::ALL_MISSING;
    }

    let mut res = 0;
    if from & bufr08001::SIGWIND != 0 {
        res |= bufr08042::SIGWIND;
    }
    if from & bufr08001::SIGTH != 0 {
        res |= bufr08042::SIGTEMP | bufr08042::SIGHUM;
    }
    if from & bufr08001::MAXWIND != 0 {
        res |= bufr08042::MAXWIND;
    }
    if from & bufr08001::TROPO != 0 {
        res |= bufr08042::TROPO;
    }
    if from & bufr08001::STD != 0 {
        res |= bufr08042::STD;
    }
    if from & bufr08001::SURFACE != 0 {
        res |= bufr08042::SURFACE;
    }
    res
}

/// Vertical sounding significance, 008042 to 008001.
pub fn convert_bufr08042_to_bufr08001(from: u32) -> u32 {
    if from & bufr08042::MISSING != 0 {
        return bufr08001::ALL_MISSING;
    }

    let mut res = 0;
    if from & bufr08042::SIGWIND != 0 {
        res |= bufr08001::SIGWIND;
    }
    if from & (bufr08042::SIGHUM | bufr08042::SIGTEMP) != 0 {
        res |= bufr08001::SIGTH;
    }
    if from & bufr08042::MAXWIND != 0 {
        res |= bufr08001::MAXWIND;
    }
    if from & bufr08042::TROPO != 0 {
        res |= bufr08001::TROPO;
    }
    if from & bufr08042::STD != 0 {
        res |= bufr08001::STD;
    }
    if from & bufr08042::SURFACE != 0 {
        res |= bufr08001::SURFACE;
    }
    res
}
