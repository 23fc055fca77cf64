//! WMO variable codes (table B/C/D descriptors).
//!
//! A descriptor is packed in 16 bits as F (2 bits), X (6 bits) and Y (8 bits).
//! The text form used throughout BUFR/CREX tables is `Fxxyyy`, where F is
//! written as one of `B`, `R`, `C`, `D` (table B entries always use `B`).

use crate::error::{TableError, TableResult};
use std::fmt;
use std::str::FromStr;

/// Packed WMO descriptor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Varcode(u16);

impl Varcode {
    /// Build a code from its F, X and Y parts.
    pub const fn new(f: u8, x: u8, y: u8) -> Self {
        Self((((f & 0x3) as u16) << 14) | (((x & 0x3f) as u16) << 8) | y as u16)
    }

    /// Build a table B code (F = 0).
    pub const fn b(x: u8, y: u8) -> Self {
        Self::new(0, x, y)
    }

    /// The F part: 0 for table B, 1 replication, 2 table C, 3 table D.
    pub const fn f(&self) -> u8 {
        ((self.0 >> 14) & 0x3) as u8
    }

    /// The X part (class).
    pub const fn x(&self) -> u8 {
        ((self.0 >> 8) & 0x3f) as u8
    }

    /// The Y part (element within the class).
    pub const fn y(&self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// The raw packed value.
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// Parse a `Fxxyyy` descriptor such as `"B12101"` or `"012101"`.
    pub fn parse(s: &str) -> TableResult<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 6 || !bytes[1..].iter().all(u8::is_ascii_digit) {
            return Err(TableError::InvalidVarcode(s.to_string()));
        }

        let f = match bytes[0] {
            b'B' | b'0' => 0,
            b'R' | b'1' => 1,
            b'C' | b'2' => 2,
            b'D' | b'3' => 3,
            _ => return Err(TableError::InvalidVarcode(s.to_string())),
        };

        Self::from_xxyyy(&s[1..]).map(|code| Self::new(f, code.x(), code.y()))
    }

    /// Parse the 5 digit `xxyyy` part used inside table files.
    pub(crate) fn from_xxyyy(s: &str) -> TableResult<Self> {
        if s.len() != 5 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TableError::InvalidVarcode(s.to_string()));
        }
        let x: u16 = s[0..2]
            .parse()
            .map_err(|_| TableError::InvalidVarcode(s.to_string()))?;
        let y: u16 = s[2..5]
            .parse()
            .map_err(|_| TableError::InvalidVarcode(s.to_string()))?;
        if x > 63 || y > 255 {
            return Err(TableError::InvalidVarcode(s.to_string()));
        }
        Ok(Self::new(0, x as u8, y as u8))
    }
}

impl FromStr for Varcode {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Varcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = match self.f() {
            0 => 'B',
            1 => 'R',
            2 => 'C',
            _ => 'D',
        };
        write!(f, "{}{:02}{:03}", table, self.x(), self.y())
    }
}
