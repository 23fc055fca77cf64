//! Values bound to a table entry.
//!
//! A [`Var`] holds a shared handle to its [`Varinfo`], so the entry (and
//! the table it came from, if still cached) outlives every value built on it.
//! Numeric values are stored as the scaled integer count; real values are
//! computed from it on demand.

use crate::conv::convert_units;
use crate::error::{TableError, TableResult};
use crate::varcode::Varcode;
use crate::varinfo::{Varinfo, Vartype};
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::debug;

/// A value in its natural representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    Decimal(f64),
    Text(String),
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Unset,
    /// Scaled integer count
    Int(i32),
    Text(String),
}

/// A possibly unset value for a table entry, with its attributes.
#[derive(Debug, Clone)]
pub struct Var {
    info: Arc<Varinfo>,
    slot: Slot,
    /// Insertion order, unique by code
    attrs: Vec<Var>,
}

impl Var {
    /// An unset variable.
    pub fn new(info: Arc<Varinfo>) -> Self {
        Self {
            info,
            slot: Slot::Unset,
            attrs: Vec::new(),
        }
    }

    /// A variable set to `value`, with the same rules as [`Var::set_value`].
    pub fn with_value(info: Arc<Varinfo>, value: impl Into<Value>) -> TableResult<Self> {
        let mut var = Self::new(info);
        var.set_value(value.into())?;
        Ok(var)
    }

    pub fn info(&self) -> &Arc<Varinfo> {
        &self.info
    }

    pub fn code(&self) -> Varcode {
        self.info.code()
    }

    pub fn is_set(&self) -> bool {
        self.slot != Slot::Unset
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.info.code(), self.info.desc())
    }

    fn type_error(&self, op: &str) -> TableError {
        TableError::TypeMismatch(format!(
            "{}: {} is a {}",
            op,
            self.describe(),
            self.info.vartype()
        ))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The scaled integer count.
    pub fn as_int(&self) -> TableResult<i32> {
        match &self.slot {
            Slot::Unset => Err(TableError::ValueNotSet(self.describe())),
            Slot::Int(v) => Ok(*v),
            Slot::Text(_) => Err(self.type_error("as_int")),
        }
    }

    /// The real value, computed from the integer count and the scale.
    pub fn as_real(&self) -> TableResult<f64> {
        match &self.slot {
            Slot::Unset => Err(TableError::ValueNotSet(self.describe())),
            Slot::Int(v) => Ok(self.info.decode_decimal(*v)),
            Slot::Text(_) => Err(self.type_error("as_real")),
        }
    }

    /// The text form: the string itself, or the integer count for numeric
    /// entries. `None` when unset.
    pub fn as_text(&self) -> Option<String> {
        match &self.slot {
            Slot::Unset => None,
            Slot::Int(v) => Some(v.to_string()),
            Slot::Text(s) => Some(s.clone()),
        }
    }

    /// The value in the type that suits the entry. `None` when unset.
    pub fn as_native(&self) -> Option<Value> {
        match &self.slot {
            Slot::Unset => None,
            Slot::Int(v) => Some(match self.info.vartype() {
                Vartype::Decimal => Value::Decimal(self.info.decode_decimal(*v)),
                _ => Value::Integer(*v),
            }),
            Slot::Text(s) => Some(Value::Text(s.clone())),
        }
    }

    pub fn get_or(&self, default: Value) -> Value {
        self.as_native().unwrap_or(default)
    }

    /// Human readable value, with as many decimals as the scale, or
    /// `default` when unset.
    pub fn format(&self, default: &str) -> String {
        match &self.slot {
            Slot::Unset => default.to_string(),
            Slot::Int(v) => {
                let decimals = self.info.scale().max(0) as usize;
                format!("{:.*}", decimals, self.info.decode_decimal(*v))
            }
            Slot::Text(s) => s.clone(),
        }
    }

    // ========================================================================
    // Mutators
    // ========================================================================
    //
    // A failed assignment leaves the previous value in place.

    /// Set a scaled integer count.
    pub fn set_int(&mut self, value: i32) -> TableResult<()> {
        if self.info.is_string() {
            return Err(self.type_error("set_int"));
        }
        self.slot = Slot::Int(self.info.check_raw(value)?);
        Ok(())
    }

    /// Set a real value, rounded to the precision of the entry.
    pub fn set_real(&mut self, value: f64) -> TableResult<()> {
        if self.info.is_string() {
            return Err(self.type_error("set_real"));
        }
        self.slot = Slot::Int(self.info.encode_decimal(value)?);
        Ok(())
    }

    /// Set a text value.
    ///
    /// For string entries the length limit counts characters. For numeric
    /// entries the text must be a decimal integer literal, read as the
    /// scaled integer count.
    pub fn set_text(&mut self, value: &str) -> TableResult<()> {
        if self.info.is_string() {
            if value.chars().count() > self.info.len() as usize {
                return Err(TableError::OutOfRange(format!(
                    "{:?} is longer than the {} characters allowed for {}",
                    value,
                    self.info.len(),
                    self.describe()
                )));
            }
            self.slot = Slot::Text(value.to_string());
            return Ok(());
        }

        let raw = parse_integer_literal(value).ok_or_else(|| {
            TableError::TypeMismatch(format!(
                "{:?} is not an integer value for {}",
                value,
                self.describe()
            ))
        })?;
        let raw = i32::try_from(raw).map_err(|_| {
            TableError::OutOfRange(format!(
                "Value {} is outside the range [{},{}] for {}",
                value,
                self.info.imin(),
                self.info.imax(),
                self.describe()
            ))
        })?;
        self.set_int(raw)
    }

    pub fn set_value(&mut self, value: Value) -> TableResult<()> {
        match value {
            Value::Integer(v) => self.set_int(v),
            Value::Decimal(v) => self.set_real(v),
            Value::Text(v) => self.set_text(&v),
        }
    }

    pub fn unset(&mut self) {
        self.slot = Slot::Unset;
    }

    /// Copy the value of a variable for a different entry, converting
    /// between the units of the two entries.
    pub fn set_from(&mut self, src: &Var) -> TableResult<()> {
        if !src.is_set() {
            self.unset();
            return Ok(());
        }
        if self.info.is_string() {
            let text = src.as_text().unwrap_or_default();
            return self.set_text(&text);
        }
        let value = convert_units(src.info.unit(), self.info.unit(), src.as_real()?)?;
        self.set_real(value)
    }

    /// Set the value from the output of [`Var::format`]. The empty string
    /// unsets the variable.
    pub fn parse_formatted(&mut self, text: &str) -> TableResult<()> {
        if text.is_empty() {
            self.unset();
            return Ok(());
        }
        if self.info.is_string() {
            return self.set_text(text);
        }
        let value: f64 = text.trim().parse().map_err(|_| {
            TableError::TypeMismatch(format!(
                "{:?} is not a number for {}",
                text,
                self.describe()
            ))
        })?;
        self.set_real(value)
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Add an attribute, replacing any previous one with the same code.
    ///
    /// Attributes of `attr` itself are dropped.
    pub fn set_attr(&mut self, mut attr: Var) {
        attr.attrs.clear();
        match self.attrs.iter_mut().find(|a| a.code() == attr.code()) {
            Some(existing) => *existing = attr,
            None => self.attrs.push(attr),
        }
    }

    pub fn get_attr(&self, code: Varcode) -> Option<&Var> {
        self.attrs.iter().find(|a| a.code() == code)
    }

    /// Remove an attribute. Does nothing if it is not there.
    pub fn unset_attr(&mut self, code: Varcode) {
        self.attrs.retain(|a| a.code() != code);
    }

    /// Attributes in insertion order.
    pub fn attrs(&self) -> &[Var] {
        &self.attrs
    }

    pub fn clear_attrs(&mut self) {
        self.attrs.clear();
    }

    // ========================================================================
    // Comparison and output
    // ========================================================================

    /// Compare values only, ignoring codes and attributes.
    ///
    /// Integer counts of entries with different scales or types are
    /// compared through their decoded values.
    pub fn value_equals(&self, other: &Var) -> bool {
        match (&self.slot, &other.slot) {
            (Slot::Int(_), Slot::Int(_))
                if self.info.scale() != other.info.scale()
                    || self.info.vartype() != other.info.vartype() =>
            {
                self.as_native() == other.as_native()
            }
            _ => self.slot == other.slot,
        }
    }

    /// Count the differences with `other`, logging each one.
    pub fn diff(&self, other: &Var) -> usize {
        if self.code() != other.code() {
            debug!(left = %self.code(), right = %other.code(), "Variable codes differ");
            return 1;
        }
        if !self.value_equals(other) {
            debug!(
                code = %self.code(),
                left = %self.format("(undef)"),
                right = %other.format("(undef)"),
                "Variable values differ"
            );
            return 1;
        }

        let mut diffs = 0;
        for attr in &self.attrs {
            match other.get_attr(attr.code()) {
                Some(theirs) => diffs += attr.diff(theirs),
                None => {
                    debug!(code = %self.code(), attr = %attr.code(), "Attribute missing on the right");
                    diffs += 1;
                }
            }
        }
        for attr in &other.attrs {
            if self.get_attr(attr.code()).is_none() {
                debug!(code = %self.code(), attr = %attr.code(), "Attribute missing on the left");
                diffs += 1;
            }
        }
        diffs
    }

    /// Constructor-like rendering used by the scripting binding.
    pub fn repr(&self) -> String {
        format!("Var('{}', {})", self.code(), self)
    }

    /// Write `Bxxyyy description(unit): value`, then one indented line per
    /// attribute.
    pub fn print<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_line(out, "")?;
        for attr in &self.attrs {
            attr.print_line(out, "  ")?;
        }
        Ok(())
    }

    fn print_line<W: io::Write>(&self, out: &mut W, indent: &str) -> io::Result<()> {
        writeln!(
            out,
            "{}{} {}({}): {}",
            indent,
            self.code(),
            self.info.desc(),
            self.info.unit(),
            self.format("(undef)")
        )
    }
}

/// Equal code and equal value. Attributes are not compared.
impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code() && self.value_equals(other)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            f.write_str(&self.format(""))
        } else {
            f.write_str("None")
        }
    }
}

/// Read `-?[0-9]+`, nothing else. Literals too long for an `i64` saturate.
fn parse_integer_literal(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = digits.bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if s.starts_with('-') { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn latitude() -> Arc<Varinfo> {
        Arc::new(
            Varinfo::bufr(
                Varcode::b(5, 1),
                "LATITUDE (HIGH ACCURACY)",
                "DEGREE",
                5,
                -9000000,
                25,
            )
            .unwrap(),
        )
    }

    fn block() -> Arc<Varinfo> {
        Arc::new(Varinfo::bufr(Varcode::b(1, 1), "WMO BLOCK NUMBER", "NUMERIC", 0, 0, 7).unwrap())
    }

    fn temperature() -> Arc<Varinfo> {
        Arc::new(
            Varinfo::bufr(
                Varcode::b(12, 101),
                "TEMPERATURE/AIR TEMPERATURE",
                "K",
                2,
                0,
                16,
            )
            .unwrap(),
        )
    }

    fn celsius() -> Arc<Varinfo> {
        Arc::new(
            Varinfo::crex(
                Varcode::b(12, 101),
                "TEMPERATURE/AIR TEMPERATURE",
                "C",
                2,
                4,
            )
            .unwrap(),
        )
    }

    fn station_name() -> Arc<Varinfo> {
        Arc::new(Varinfo::bufr(Varcode::b(1, 19), "LONG STATION OR SITE NAME", "CCITTIA5", 0, 0, 256).unwrap())
    }

    fn confidence() -> Arc<Varinfo> {
        Arc::new(Varinfo::bufr(Varcode::b(33, 7), "PER CENT CONFIDENCE", "%", 0, 0, 7).unwrap())
    }

    #[test]
    fn test_real_value_at_scale_5() {
        let var = Var::with_value(latitude(), 12.4).unwrap();
        assert_eq!(var.as_int().unwrap(), 1240000);
        assert_eq!(var.as_real().unwrap(), 12.4);
        assert_eq!(var.as_text().as_deref(), Some("1240000"));
        assert_eq!(var.format(""), "12.40000");
        assert_eq!(var.to_string(), "12.40000");
        assert_eq!(var.repr(), "Var('B05001', 12.40000)");
        assert_eq!(var.as_native(), Some(Value::Decimal(12.4)));
    }

    #[test]
    fn test_text_value_is_the_integer_count() {
        let var = Var::with_value(latitude(), "123456").unwrap();
        assert_eq!(var.as_int().unwrap(), 123456);
        assert_eq!(var.as_real().unwrap(), 1.23456);

        let var = Var::with_value(latitude(), "-100").unwrap();
        assert_eq!(var.as_int().unwrap(), -100);
    }

    #[test]
    fn test_text_value_must_be_an_integer_literal() {
        for bad in ["12.4", "", "-", "1e3", " 12", "abc"] {
            let err = Var::with_value(latitude(), bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TypeMismatch, "{:?}", bad);
        }
    }

    #[test]
    fn test_integer_value_on_decimal_entry_is_scaled_count() {
        let var = Var::with_value(latitude(), 12).unwrap();
        assert_eq!(var.as_real().unwrap(), 0.00012);
    }

    #[test]
    fn test_real_value_on_integer_entry_rounds() {
        let mut var = Var::new(block());
        var.set_real(3.5).unwrap();
        assert_eq!(var.as_int().unwrap(), 4);
        var.set_real(2.4).unwrap();
        assert_eq!(var.as_int().unwrap(), 2);
        assert_eq!(var.as_native(), Some(Value::Integer(2)));
        assert_eq!(var.format(""), "2");
    }

    #[test]
    fn test_range_errors_keep_previous_value() {
        let mut var = Var::with_value(block(), 10).unwrap();
        assert_eq!(var.set_int(127).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(var.set_int(-1).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(var.set_real(f64::NAN).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(
            var.set_text("99999999999999").unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
        assert_eq!(var.as_int().unwrap(), 10);
        var.set_int(126).unwrap();
        assert_eq!(var.as_int().unwrap(), 126);
    }

    #[test]
    fn test_unset_accessors() {
        let var = Var::new(latitude());
        assert!(!var.is_set());
        assert_eq!(var.as_int().unwrap_err().kind(), ErrorKind::ValueNotSet);
        assert_eq!(var.as_real().unwrap_err().kind(), ErrorKind::ValueNotSet);
        assert_eq!(var.as_text(), None);
        assert_eq!(var.as_native(), None);
        assert_eq!(var.get_or(Value::Integer(-1)), Value::Integer(-1));
        assert_eq!(var.format("missing"), "missing");
        assert_eq!(var.to_string(), "None");
        assert_eq!(var.repr(), "Var('B05001', None)");
        assert_eq!(
            var.as_int().unwrap_err().to_string(),
            "B05001 (LATITUDE (HIGH ACCURACY)) is not set"
        );
    }

    #[test]
    fn test_string_entry() {
        let mut var = Var::with_value(station_name(), "Bologna").unwrap();
        assert_eq!(var.as_text().as_deref(), Some("Bologna"));
        assert_eq!(var.format(""), "Bologna");
        assert_eq!(var.as_native(), Some(Value::Text("Bologna".into())));
        assert_eq!(var.as_int().unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(var.as_real().unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(var.set_int(1).unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(var.set_real(1.0).unwrap_err().kind(), ErrorKind::TypeMismatch);

        let too_long = "x".repeat(33);
        assert_eq!(var.set_text(&too_long).unwrap_err().kind(), ErrorKind::OutOfRange);
        var.set_text(&"x".repeat(32)).unwrap();

        // 32 characters, 64 bytes
        let accented = "è".repeat(32);
        var.set_text(&accented).unwrap();
        assert_eq!(var.as_text(), Some(accented));
        assert_eq!(
            var.set_text(&"è".repeat(33)).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn test_equality() {
        let a = Var::with_value(latitude(), 12.4).unwrap();
        let b = Var::with_value(latitude(), 12.4).unwrap();
        let c = Var::with_value(latitude(), 12.5).unwrap();
        let d = Var::with_value(Arc::new(
            Varinfo::bufr(Varcode::b(6, 1), "LONGITUDE (HIGH ACCURACY)", "DEGREE", 5, -18000000, 26)
                .unwrap(),
        ), 12.4)
        .unwrap();
        let unset = Var::new(latitude());

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a.value_equals(&d));
        assert_ne!(a, unset);
        assert_eq!(unset, Var::new(latitude()));
    }

    #[test]
    fn test_equality_ignores_attributes() {
        let mut a = Var::with_value(block(), 16).unwrap();
        let b = Var::with_value(block(), 16).unwrap();
        a.set_attr(Var::with_value(confidence(), 50).unwrap());
        assert_eq!(a, b);
        assert_eq!(a.diff(&b), 1);
    }

    #[test]
    fn test_attributes() {
        let mut var = Var::with_value(block(), 16).unwrap();
        assert!(var.attrs().is_empty());

        let attr = Var::with_value(confidence(), 50).unwrap();
        var.set_attr(attr.clone());
        assert_eq!(var.get_attr(Varcode::b(33, 7)), Some(&attr));
        assert_eq!(var.get_attr(Varcode::b(33, 2)), None);

        // Last write wins
        var.set_attr(Var::with_value(confidence(), 70).unwrap());
        assert_eq!(var.attrs().len(), 1);
        assert_eq!(var.get_attr(Varcode::b(33, 7)).unwrap().as_int().unwrap(), 70);

        var.unset_attr(Varcode::b(33, 7));
        assert_eq!(var.get_attr(Varcode::b(33, 7)), None);
        assert!(var.attrs().is_empty());

        // Absent code is a no-op
        var.unset_attr(Varcode::b(33, 7));
        assert!(var.attrs().is_empty());
    }

    #[test]
    fn test_attributes_keep_insertion_order_and_drop_nesting() {
        let mut var = Var::with_value(block(), 16).unwrap();

        let mut nested = Var::with_value(confidence(), 50).unwrap();
        nested.set_attr(Var::with_value(block(), 1).unwrap());
        var.set_attr(Var::with_value(temperature(), 273.15).unwrap());
        var.set_attr(nested);

        let codes: Vec<_> = var.attrs().iter().map(|a| a.code()).collect();
        assert_eq!(codes, vec![Varcode::b(12, 101), Varcode::b(33, 7)]);
        assert!(var.get_attr(Varcode::b(33, 7)).unwrap().attrs().is_empty());

        var.clear_attrs();
        assert!(var.attrs().is_empty());
    }

    #[test]
    fn test_set_from_converts_units() {
        let kelvin = Var::with_value(temperature(), 283.15).unwrap();
        let mut var = Var::new(celsius());
        var.set_from(&kelvin).unwrap();
        assert_eq!(var.as_int().unwrap(), 1000);
        assert_eq!(var.format(""), "10.00");

        var.set_from(&Var::new(temperature())).unwrap();
        assert!(!var.is_set());

        let mut name = Var::new(station_name());
        name.set_from(&Var::with_value(block(), 16).unwrap()).unwrap();
        assert_eq!(name.as_text().as_deref(), Some("16"));

        let mut number = Var::new(block());
        let err = number
            .set_from(&Var::with_value(station_name(), "16").unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_parse_formatted() {
        let mut var = Var::new(latitude());
        var.parse_formatted("12.40000").unwrap();
        assert_eq!(var.as_int().unwrap(), 1240000);

        var.parse_formatted("").unwrap();
        assert!(!var.is_set());

        assert_eq!(
            var.parse_formatted("north").unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );

        let mut name = Var::new(station_name());
        name.parse_formatted("Bologna").unwrap();
        assert_eq!(name.format(""), "Bologna");
    }

    #[test]
    fn test_diff_counts_attribute_differences() {
        let mut a = Var::with_value(block(), 16).unwrap();
        let mut b = Var::with_value(block(), 16).unwrap();
        assert_eq!(a.diff(&b), 0);

        a.set_attr(Var::with_value(confidence(), 50).unwrap());
        b.set_attr(Var::with_value(confidence(), 60).unwrap());
        assert_eq!(a.diff(&b), 1);

        b.set_attr(Var::with_value(confidence(), 50).unwrap());
        b.set_attr(Var::with_value(temperature(), 273.15).unwrap());
        assert_eq!(a.diff(&b), 1);

        assert_eq!(a.diff(&Var::with_value(block(), 17).unwrap()), 1);
        assert_eq!(a.diff(&Var::with_value(confidence(), 16).unwrap()), 1);
    }

    #[test]
    fn test_print() {
        let mut var = Var::with_value(block(), 16).unwrap();
        var.set_attr(Var::with_value(confidence(), 50).unwrap());
        var.set_attr(Var::new(temperature()));

        let mut out = Vec::new();
        var.print(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "B01001 WMO BLOCK NUMBER(NUMERIC): 16\n\
             \x20 B33007 PER CENT CONFIDENCE(%): 50\n\
             \x20 B12101 TEMPERATURE/AIR TEMPERATURE(K): (undef)\n"
        );
    }

    #[test]
    fn test_parse_integer_literal() {
        assert_eq!(parse_integer_literal("0"), Some(0));
        assert_eq!(parse_integer_literal("-42"), Some(-42));
        assert_eq!(parse_integer_literal("+42"), None);
        assert_eq!(parse_integer_literal("4 2"), None);
        assert_eq!(parse_integer_literal("99999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_integer_literal("-99999999999999999999"), Some(-i64::MAX));
    }

    #[test]
    fn test_overlong_integer_text_is_out_of_range() {
        let mut var = Var::with_value(latitude(), 12.4).unwrap();
        for text in ["99999999999999", "99999999999999999999", "-123456789012345678901234"] {
            assert_eq!(var.set_text(text).unwrap_err().kind(), ErrorKind::OutOfRange);
        }
        assert_eq!(var.as_int().unwrap(), 1240000);
    }

    #[test]
    fn test_equality_across_scales() {
        let coarse = Arc::new(temperature().altered(1, 16, 0).unwrap());
        let a = Var::with_value(temperature(), 27315).unwrap();
        let b = Var::with_value(Arc::clone(&coarse), 27315).unwrap();
        assert!(!a.value_equals(&b));
        assert_ne!(a, b);

        let a = Var::with_value(temperature(), 273.2).unwrap();
        let b = Var::with_value(coarse, 273.2).unwrap();
        assert!(a.value_equals(&b));
        assert_eq!(a, b);
    }
}
