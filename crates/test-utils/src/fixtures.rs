//! Builders for table files used in tests.
//!
//! Table files are fixed-column text: the BUFR columns end at 118
//! characters, and lines that also carry CREX columns are 156 characters.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// BUFR columns of a table line: unit, scale, reference value, bit length.
pub type BufrColumns<'a> = (&'a str, i32, i32, u32);

/// CREX columns of a table line: unit, scale, length in characters.
pub type CrexColumns<'a> = (&'a str, i32, u32);

/// Format one table line.
///
/// `code` is the six digit descriptor as written in the files (`"012101"`).
pub fn table_line(
    code: &str,
    desc: &str,
    bufr: BufrColumns<'_>,
    crex: Option<CrexColumns<'_>>,
) -> String {
    let (unit, scale, reference, bit_len) = bufr;
    let mut line = format!(
        " {:>6} {:<64} {:<24} {:>3} {:>12} {:>3}",
        code, desc, unit, scale, reference, bit_len
    );
    if let Some((crex_unit, crex_scale, crex_len)) = crex {
        line.push_str(&format!(
            " {:<24} {:>4} {:>7}",
            crex_unit, crex_scale, crex_len
        ));
    }
    line
}

/// Write `<name>.txt` in `dir` with one table line per entry.
pub fn write_table(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(format!("{}.txt", name));
    let mut file = fs::File::create(&path).expect("Failed to create test table");
    for line in lines {
        writeln!(file, "{}", line).expect("Failed to write test table");
    }
    path
}

/// A few entries of the WMO master table, in file order.
pub fn sample_table_lines() -> Vec<String> {
    vec![
        table_line("001001", "WMO BLOCK NUMBER", ("NUMERIC", 0, 0, 7), Some(("NUMERIC", 0, 2))),
        table_line("001002", "WMO STATION NUMBER", ("NUMERIC", 0, 0, 10), Some(("NUMERIC", 0, 3))),
        table_line(
            "001019",
            "LONG STATION OR SITE NAME",
            ("CCITTIA5", 0, 0, 256),
            Some(("CHARACTER", 0, 32)),
        ),
        table_line(
            "005001",
            "LATITUDE (HIGH ACCURACY)",
            ("DEGREE", 5, -9000000, 25),
            Some(("DEGREE", 5, 7)),
        ),
        table_line(
            "012101",
            "TEMPERATURE/AIR TEMPERATURE",
            ("K", 2, 0, 16),
            Some(("C", 2, 4)),
        ),
    ]
}
