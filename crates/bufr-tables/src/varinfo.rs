//! Metadata about one WMO table B variable.
//!
//! A [`Varinfo`] describes how a physical value is represented: its unit, the
//! decimal scale that turns the real value into an integer count, and the
//! binary reference and width used by BUFR. Values are always held as a
//! scaled integer; the real value is `raw * 10^-scale`.
//!
//! Entries are only ever created by a [`Vartable`](crate::Vartable) while
//! loading a table file, and are shared behind an `Arc` afterwards.

use crate::error::{TableError, TableResult};
use crate::varcode::Varcode;
use std::fmt;

/// Largest supported absolute decimal scale.
pub const MAX_SCALE: i32 = 16;

/// Powers of ten for decimal scaling, indexed by |scale|.
const SCALES: [f64; 17] = [
    1.0,
    10.0,
    100.0,
    1000.0,
    10000.0,
    100000.0,
    1000000.0,
    10000000.0,
    100000000.0,
    1000000000.0,
    10000000000.0,
    100000000000.0,
    1000000000000.0,
    10000000000000.0,
    100000000000000.0,
    1000000000000000.0,
    10000000000000000.0,
];

/// Kind of value a variable holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vartype {
    /// Integer value (scale 0)
    Integer,
    /// Real value stored as a scaled integer
    Decimal,
    /// Text value
    String,
}

impl Vartype {
    fn from_unit(unit: &str, scale: i32) -> Self {
        if unit == "CCITTIA5" || unit == "CHARACTER" {
            Vartype::String
        } else if scale != 0 {
            Vartype::Decimal
        } else {
            Vartype::Integer
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Vartype::Integer => "integer",
            Vartype::Decimal => "decimal",
            Vartype::String => "string",
        }
    }
}

impl fmt::Display for Vartype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of decimal digits of an unsigned value.
pub(crate) fn count_digits(x: u32) -> u32 {
    x.checked_ilog10().map_or(1, |d| d + 1)
}

fn check_scale(code: Varcode, scale: i32) -> TableResult<()> {
    if !(-MAX_SCALE..=MAX_SCALE).contains(&scale) {
        return Err(TableError::OutOfRange(format!(
            "{}: scale {} is outside the supported range [-{},{}]",
            code, scale, MAX_SCALE, MAX_SCALE
        )));
    }
    Ok(())
}

/// Information about a variable, as found in a table B entry.
///
/// Two `Varinfo` compare equal when every field matches, regardless of which
/// table instance they were loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Varinfo {
    code: Varcode,
    vartype: Vartype,
    desc: String,
    unit: String,
    scale: i32,
    len: u32,
    bit_ref: i32,
    bit_len: u32,
    imin: i32,
    imax: i32,
    dmin: f64,
    dmax: f64,
}

impl Varinfo {
    /// Varinfo entries only exist as part of a loaded table.
    ///
    /// Always fails with [`TableError::NotSupported`]; use
    /// [`Vartable::query`](crate::Vartable::query) to obtain one.
    pub fn new() -> TableResult<Self> {
        Err(TableError::NotSupported(
            "Varinfo objects cannot be constructed outside of a Vartable".to_string(),
        ))
    }

    /// Build an entry from the BUFR columns of a table.
    ///
    /// The decimal length and the valid integer domain are computed from the
    /// binary width and reference.
    pub(crate) fn bufr(
        code: Varcode,
        desc: &str,
        unit: &str,
        scale: i32,
        bit_ref: i32,
        bit_len: u32,
    ) -> TableResult<Self> {
        check_scale(code, scale)?;
        let vartype = Vartype::from_unit(unit, scale);

        let mut info = Self {
            code,
            vartype,
            desc: desc.to_string(),
            unit: unit.to_string(),
            scale,
            len: 0,
            bit_ref,
            bit_len,
            imin: 0,
            imax: 0,
            dmin: 0.0,
            dmax: 0.0,
        };

        if vartype == Vartype::String {
            info.len = bit_len.div_ceil(8);
            return Ok(info);
        }

        // All ones is the BUFR missing value, except for the delayed
        // replication counts of class 31
        let mut maxval: i64 = if bit_len >= 31 {
            i32::MAX as i64
        } else {
            (1i64 << bit_len) - 1
        };
        if code.x() != 31 && maxval > 0 {
            maxval -= 1;
        }

        let imax = maxval + bit_ref as i64;
        if imax > i32::MAX as i64 {
            return Err(TableError::OutOfRange(format!(
                "{} scaled value does not fit in a signed 32bit integer ({} bits with a base value of {})",
                code, bit_len, bit_ref
            )));
        }

        info.imin = bit_ref;
        info.imax = imax as i32;
        info.len = if bit_ref == 0 {
            if bit_len == 1 {
                1
            } else {
                count_digits(info.imax as u32)
            }
        } else {
            count_digits(bit_ref.unsigned_abs()).max(count_digits(info.imax.unsigned_abs()))
        };
        info.dmin = info.decode_decimal(info.imin);
        info.dmax = info.decode_decimal(info.imax);

        Ok(info)
    }

    /// Build an entry from the CREX columns of a table.
    ///
    /// CREX carries no binary encoding information, so `bit_ref` and
    /// `bit_len` are zero and the domain comes from the decimal length.
    pub(crate) fn crex(
        code: Varcode,
        desc: &str,
        unit: &str,
        scale: i32,
        len: u32,
    ) -> TableResult<Self> {
        check_scale(code, scale)?;
        let vartype = Vartype::from_unit(unit, scale);

        let mut info = Self {
            code,
            vartype,
            desc: desc.to_string(),
            unit: unit.to_string(),
            scale,
            len,
            bit_ref: 0,
            bit_len: 0,
            imin: 0,
            imax: 0,
            dmin: 0.0,
            dmax: 0.0,
        };

        if vartype == Vartype::String {
            return Ok(info);
        }

        if len >= 10 {
            info.imin = i32::MIN;
            info.imax = i32::MAX;
        } else {
            // All nines is the CREX missing value
            let limit = 10i32.pow(len);
            info.imin = -(limit - 1);
            info.imax = limit - 2;
        }
        info.dmin = info.decode_decimal(info.imin);
        info.dmax = info.decode_decimal(info.imax);

        Ok(info)
    }

    /// Derive a copy with BUFR encoding parameters overridden.
    pub(crate) fn altered(&self, scale: i32, bit_len: u32, bit_ref: i32) -> TableResult<Self> {
        Self::bufr(self.code, &self.desc, &self.unit, scale, bit_ref, bit_len)
    }

    pub fn code(&self) -> Varcode {
        self.code
    }

    pub fn vartype(&self) -> Vartype {
        self.vartype
    }

    pub fn is_string(&self) -> bool {
        self.vartype == Vartype::String
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Decimal scale: the real value is `raw * 10^-scale`.
    pub fn scale(&self) -> i32 {
        self.scale
    }

    /// Length in decimal digits (characters for strings).
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Binary reference value added to the raw BUFR field.
    pub fn bit_ref(&self) -> i32 {
        self.bit_ref
    }

    /// Width of the BUFR field in bits (0 for CREX entries).
    pub fn bit_len(&self) -> u32 {
        self.bit_len
    }

    /// Minimum valid scaled integer value.
    pub fn imin(&self) -> i32 {
        self.imin
    }

    /// Maximum valid scaled integer value.
    pub fn imax(&self) -> i32 {
        self.imax
    }

    pub fn dmin(&self) -> f64 {
        self.dmin
    }

    pub fn dmax(&self) -> f64 {
        self.dmax
    }

    /// Convert a scaled integer count to its real value.
    pub fn decode_decimal(&self, raw: i32) -> f64 {
        match self.scale {
            s if s > 0 => raw as f64 / SCALES[s as usize],
            s if s < 0 => raw as f64 * SCALES[(-s) as usize],
            _ => raw as f64,
        }
    }

    /// Scale a real value to its integer count, rounding half away from zero.
    ///
    /// The result is not range checked; see [`Varinfo::encode_decimal`].
    fn scale_real(&self, value: f64) -> f64 {
        match self.scale {
            s if s > 0 => (value * SCALES[s as usize]).round(),
            s if s < 0 => (value / SCALES[(-s) as usize]).round(),
            _ => value.round(),
        }
    }

    /// Convert a real value to its scaled integer count.
    ///
    /// Fails with `OutOfRange` when the value is NaN or outside the domain
    /// of this entry.
    pub fn encode_decimal(&self, value: f64) -> TableResult<i32> {
        if value.is_nan() {
            return Err(TableError::OutOfRange(format!(
                "NaN cannot be stored in {} ({})",
                self.code, self.desc
            )));
        }
        let scaled = self.scale_real(value);
        if scaled < self.imin as f64 || scaled > self.imax as f64 {
            return Err(TableError::OutOfRange(format!(
                "Value {} is outside the range [{},{}] for {} ({})",
                value, self.dmin, self.dmax, self.code, self.desc
            )));
        }
        Ok(scaled as i32)
    }

    /// Round a real value to the precision given by the scale.
    pub fn round_decimal(&self, value: f64) -> f64 {
        let scaled = self.scale_real(value);
        match self.scale {
            s if s > 0 => scaled / SCALES[s as usize],
            s if s < 0 => scaled * SCALES[(-s) as usize],
            _ => scaled,
        }
    }

    /// Check that a scaled integer fits the domain of this entry.
    pub fn check_raw(&self, raw: i32) -> TableResult<i32> {
        if raw < self.imin || raw > self.imax {
            return Err(TableError::OutOfRange(format!(
                "Value {} is outside the range [{},{}] for {} ({})",
                raw, self.imin, self.imax, self.code, self.desc
            )));
        }
        Ok(raw)
    }

    /// Number of decimal digits needed to write `raw`, checked against `len`.
    pub fn decimal_digits_for(&self, raw: i32) -> TableResult<u32> {
        let digits = count_digits(raw.unsigned_abs());
        if digits > self.len {
            return Err(TableError::OutOfRange(format!(
                "Value {} does not fit in {} digits for {} ({})",
                raw, self.len, self.code, self.desc
            )));
        }
        Ok(digits)
    }

    /// Decode a raw unsigned BUFR field into its real value.
    pub fn decode_binary(&self, raw: u32) -> TableResult<f64> {
        if self.bit_len == 0 {
            return Err(TableError::NotSupported(format!(
                "cannot decode {} from binary: the table in use has no BUFR information for it",
                self.code
            )));
        }
        let value = raw as i64 + self.bit_ref as i64;
        Ok(match self.scale {
            s if s > 0 => value as f64 / SCALES[s as usize],
            s if s < 0 => value as f64 * SCALES[(-s) as usize],
            _ => value as f64,
        })
    }

    /// Encode a real value as a raw unsigned BUFR field.
    pub fn encode_binary(&self, value: f64) -> TableResult<u32> {
        if self.bit_len == 0 {
            return Err(TableError::NotSupported(format!(
                "cannot encode {} to binary: the table in use has no BUFR information for it",
                self.code
            )));
        }
        let raw = self.scale_real(value) - self.bit_ref as f64;
        let limit = if self.bit_len >= 32 {
            u32::MAX as f64
        } else {
            ((1u64 << self.bit_len) - 1) as f64
        };
        if raw.is_nan() || raw < 0.0 || raw > limit {
            return Err(TableError::OutOfRange(format!(
                "Cannot encode {} {} to {} bits using scale {} and ref {}: encoding gives {}",
                self.code, value, self.bit_len, self.scale, self.bit_ref, raw
            )));
        }
        Ok(raw as u32)
    }
}

impl Varinfo {
    /// Constructor-like rendering used by the scripting binding.
    pub fn repr(&self) -> String {
        format!(
            "Varinfo('{}', {:?}, {:?}, scale={}, len={}, bit_ref={}, bit_len={}, type={})",
            self.code,
            self.desc,
            self.unit,
            self.scale,
            self.len,
            self.bit_ref,
            self.bit_len,
            self.vartype
        )
    }
}

impl fmt::Display for Varinfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.code, self.desc, self.unit)
    }
}
