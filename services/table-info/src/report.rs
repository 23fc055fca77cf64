//! Text and YAML rendering of table entries.

use bufr_tables::Varinfo;
use serde::Serialize;

/// One table entry, as printed by `dump --yaml`.
#[derive(Debug, Serialize)]
pub struct EntryRow {
    pub code: String,
    pub desc: String,
    pub unit: String,
    #[serde(rename = "type")]
    pub vartype: String,
    pub scale: i32,
    pub len: u32,
    pub bit_ref: i32,
    pub bit_len: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
}

impl From<&Varinfo> for EntryRow {
    fn from(info: &Varinfo) -> Self {
        Self {
            code: info.code().to_string(),
            desc: info.desc().to_string(),
            unit: info.unit().to_string(),
            vartype: info.vartype().to_string(),
            scale: info.scale(),
            len: info.len(),
            bit_ref: info.bit_ref(),
            bit_len: info.bit_len(),
            range: (!info.is_string()).then(|| (info.dmin(), info.dmax())),
        }
    }
}

/// One line per entry, fixed width.
pub fn format_line(info: &Varinfo) -> String {
    format!(
        "{} {:<7} {:>3} {:>3} {:>12} {:>3}  {:<24} {}",
        info.code(),
        info.vartype().as_str(),
        info.scale(),
        info.len(),
        info.bit_ref(),
        info.bit_len(),
        info.unit(),
        info.desc()
    )
}

/// A multi-line description of one entry.
pub fn format_details(info: &Varinfo) -> String {
    let mut out = format!("{}\n", info);
    out.push_str(&format!(
        "  type: {}, scale: {}, len: {}, bit_ref: {}, bit_len: {}\n",
        info.vartype(),
        info.scale(),
        info.len(),
        info.bit_ref(),
        info.bit_len()
    ));
    if !info.is_string() {
        let decimals = info.scale().max(0) as usize;
        out.push_str(&format!(
            "  range: {:.*} to {:.*}\n",
            decimals,
            info.dmin(),
            decimals,
            info.dmax()
        ));
    }
    out
}

pub fn to_yaml(rows: &[EntryRow]) -> anyhow::Result<String> {
    Ok(serde_yaml::to_string(rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bufr_tables::Vartable;
    use test_utils::require_test_file;

    #[test]
    fn test_details_and_rows() {
        let path = require_test_file!("B0000000000000024000.txt");
        let table = Vartable::load_bufr(&path).unwrap();
        let info = table.lookup("t").unwrap();

        let details = format_details(&info);
        assert!(details.starts_with("B12101 TEMPERATURE/AIR TEMPERATURE [K]\n"));
        assert!(details.contains("range: 0.00 to 655.34"));
        assert_eq!(details.lines().count(), 3);

        let line = format_line(&info);
        assert!(line.starts_with("B12101 decimal"));

        let yaml = to_yaml(&[EntryRow::from(&*info)]).unwrap();
        assert!(yaml.contains("code: B12101"));
        assert!(yaml.contains("type: decimal"));
    }

    #[test]
    fn test_string_rows_have_no_range() {
        let path = require_test_file!("B0000000000000024000.txt");
        let table = Vartable::load_bufr(&path).unwrap();
        let info = table.lookup("B01019").unwrap();

        let row = EntryRow::from(&*info);
        assert!(row.range.is_none());
        assert!(!format_details(&info).contains("range"));
    }
}
