//! Table B loading, lookup and the process-wide table cache.
//!
//! A table file holds one fixed-column line per variable. The same file can
//! be read with BUFR semantics (binary width and reference) or CREX
//! semantics (decimal length), and the two readings are cached separately.

use crate::error::{TableError, TableResult};
use crate::tabledir::{BufrTableId, CrexTableId, Tabledir};
use crate::varcode::Varcode;
use crate::varinfo::Varinfo;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, warn};

/// Name of the optional alias file looked up next to a table.
pub const ALIAS_FILE: &str = "aliases.yaml";

/// Aliases available for every table.
const BUILTIN_ALIASES: &[(&str, Varcode)] = &[
    ("block", Varcode::b(1, 1)),
    ("station", Varcode::b(1, 2)),
    ("name", Varcode::b(1, 19)),
    ("lat", Varcode::b(5, 1)),
    ("lon", Varcode::b(6, 1)),
    ("p", Varcode::b(10, 4)),
    ("t", Varcode::b(12, 101)),
    ("td", Varcode::b(12, 103)),
];

/// Minimum length of a line with BUFR columns.
const BUFR_LINE_LEN: usize = 118;
/// Minimum length of a line with CREX columns.
const CREX_LINE_LEN: usize = 156;

/// Which set of columns of a table file to interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Bufr,
    Crex,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Bufr => write!(f, "BUFR"),
            Dialect::Crex => write!(f, "CREX"),
        }
    }
}

/// How to pick a table through the table directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelector {
    /// Exact file stem, such as `"B0000000000000024000"` or `"dballe"`
    Name(String),
    /// Master table version, optionally with a local table version
    Version { master: u8, local: Option<u8> },
}

type AlterationKey = (Varcode, i32, u32, i32);

/// An immutable collection of [`Varinfo`] loaded from one table file.
#[derive(Debug)]
pub struct Vartable {
    dialect: Dialect,
    path: PathBuf,
    id: String,
    /// Sorted by code, in file order
    entries: Vec<Arc<Varinfo>>,
    aliases: HashMap<String, Varcode>,
    alterations: Mutex<HashMap<AlterationKey, Arc<Varinfo>>>,
}

/// Loaded tables, keyed by dialect and resolved path.
static TABLE_CACHE: Lazy<RwLock<HashMap<(Dialect, PathBuf), Arc<Vartable>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

impl Vartable {
    /// Tables only exist as the result of loading a file.
    ///
    /// Always fails with [`TableError::NotSupported`]; use [`Vartable::load`]
    /// or one of the `get_*` functions instead.
    pub fn new() -> TableResult<Self> {
        Err(TableError::NotSupported(
            "Vartable objects can only be obtained by loading a table file".to_string(),
        ))
    }

    /// Load a table file, or return the instance already loaded for it.
    ///
    /// Concurrent first loads of the same file are serialised so that every
    /// caller gets the same shared instance. Failed loads are not cached.
    pub fn load(path: impl AsRef<Path>, dialect: Dialect) -> TableResult<Arc<Vartable>> {
        let path = path.as_ref();
        let key = (
            dialect,
            fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
        );

        {
            let cache = TABLE_CACHE.read().unwrap_or_else(|e| e.into_inner());
            if let Some(table) = cache.get(&key) {
                return Ok(Arc::clone(table));
            }
        }

        let mut cache = TABLE_CACHE.write().unwrap_or_else(|e| e.into_inner());

        // Double-check after acquiring write lock
        if let Some(table) = cache.get(&key) {
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(Self::read(&key.1, dialect)?);
        cache.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Load a table file reading its BUFR columns.
    pub fn load_bufr(path: impl AsRef<Path>) -> TableResult<Arc<Vartable>> {
        Self::load(path, Dialect::Bufr)
    }

    /// Load a table file reading its CREX columns.
    pub fn load_crex(path: impl AsRef<Path>) -> TableResult<Arc<Vartable>> {
        Self::load(path, Dialect::Crex)
    }

    /// Resolve a table through the default table directories and load it.
    pub fn get(dialect: Dialect, selector: &TableSelector) -> TableResult<Arc<Vartable>> {
        match (dialect, selector) {
            (Dialect::Bufr, TableSelector::Name(name)) => Self::get_bufr_by_name(name),
            (Dialect::Crex, TableSelector::Name(name)) => Self::get_crex_by_name(name),
            (Dialect::Bufr, TableSelector::Version { master, local }) => {
                Self::get_bufr(&BufrTableId::new(0, 0, 0, *master, local.unwrap_or(0)))
            }
            (Dialect::Crex, TableSelector::Version { master, local }) => {
                Self::get_crex(&CrexTableId {
                    master_table_version_number_bufr: *master,
                    master_table_version_number_local: local.unwrap_or(0),
                    ..CrexTableId::default()
                })
            }
        }
    }

    /// Load the BUFR table that best matches `id`.
    pub fn get_bufr(id: &BufrTableId) -> TableResult<Arc<Vartable>> {
        Self::get_bufr_in(Tabledir::global(), id)
    }

    /// Load the CREX table that best matches `id`.
    pub fn get_crex(id: &CrexTableId) -> TableResult<Arc<Vartable>> {
        Self::get_crex_in(Tabledir::global(), id)
    }

    /// Load a table by file stem, reading its BUFR columns.
    pub fn get_bufr_by_name(name: &str) -> TableResult<Arc<Vartable>> {
        Self::get_by_name_in(Tabledir::global(), name, Dialect::Bufr)
    }

    /// Load a table by file stem, reading its CREX columns.
    pub fn get_crex_by_name(name: &str) -> TableResult<Arc<Vartable>> {
        Self::get_by_name_in(Tabledir::global(), name, Dialect::Crex)
    }

    /// Like [`Vartable::get_bufr`], searching a specific set of directories.
    pub fn get_bufr_in(tabledir: &Tabledir, id: &BufrTableId) -> TableResult<Arc<Vartable>> {
        let entry = tabledir
            .find_bufr(id)
            .ok_or_else(|| TableError::NotFound(format!("BUFR table for {} not found", id)))?;
        Self::load_bufr(entry.path)
    }

    /// Like [`Vartable::get_crex`], searching a specific set of directories.
    pub fn get_crex_in(tabledir: &Tabledir, id: &CrexTableId) -> TableResult<Arc<Vartable>> {
        let entry = tabledir
            .find_crex(id)
            .ok_or_else(|| TableError::NotFound(format!("CREX table for {} not found", id)))?;
        Self::load_crex(entry.path)
    }

    /// Load a table by file stem from a specific set of directories.
    pub fn get_by_name_in(
        tabledir: &Tabledir,
        name: &str,
        dialect: Dialect,
    ) -> TableResult<Arc<Vartable>> {
        let path = tabledir
            .find(name)
            .ok_or_else(|| TableError::NotFound(format!("{} table {} not found", dialect, name)))?;
        Self::load(path, dialect)
    }

    /// Parse a table file without going through the cache.
    pub(crate) fn read(path: &Path, dialect: Dialect) -> TableResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| TableError::io(path, e))?;
        let entries = parse_entries(path, &contents, dialect)?;
        let aliases = load_aliases(path.parent());

        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(
            path = ?path,
            dialect = %dialect,
            entries = entries.len(),
            "Loaded variable table"
        );

        Ok(Self {
            dialect,
            path: path.to_path_buf(),
            id,
            entries,
            aliases,
            alterations: Mutex::new(HashMap::new()),
        })
    }

    /// Table identifier: the file name without extension.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path the table was loaded from, canonicalised when loaded through
    /// the cache.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repr(&self) -> String {
        format!("Vartable('{}')", self.path.display())
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Number of distinct codes in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in file order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Varinfo>> {
        self.entries.iter()
    }

    /// Entry at the given position in file order.
    pub fn nth(&self, index: usize) -> Option<Arc<Varinfo>> {
        self.entries.get(index).cloned()
    }

    fn position(&self, code: Varcode) -> Option<usize> {
        self.entries
            .binary_search_by(|info| info.code().cmp(&code))
            .ok()
    }

    fn not_found(&self, what: impl fmt::Display) -> TableError {
        TableError::NotFound(format!(
            "variable {} not found in table {}",
            what,
            self.path.display()
        ))
    }

    /// Look up an entry by code.
    pub fn query(&self, code: Varcode) -> TableResult<Arc<Varinfo>> {
        self.position(code)
            .map(|i| Arc::clone(&self.entries[i]))
            .ok_or_else(|| self.not_found(code))
    }

    /// Check if the table has an entry for a code.
    pub fn contains_code(&self, code: Varcode) -> bool {
        self.position(code).is_some()
    }

    /// Turn an alias or a `Bxxyyy` string into a code.
    ///
    /// Aliases are matched exactly and take precedence over code parsing.
    pub fn resolve(&self, name: &str) -> Option<Varcode> {
        self.aliases
            .get(name)
            .copied()
            .or_else(|| Varcode::parse(name).ok())
    }

    /// Look up an entry by alias or code string.
    pub fn lookup(&self, name: &str) -> TableResult<Arc<Varinfo>> {
        match self.resolve(name) {
            Some(code) => self.query(code),
            None => Err(self.not_found(name)),
        }
    }

    /// Check if an alias or code string resolves to an entry. Never fails.
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name)
            .map(|code| self.contains_code(code))
            .unwrap_or(false)
    }

    /// Aliases known to this table, sorted by name.
    pub fn aliases(&self) -> Vec<(&str, Varcode)> {
        let mut res: Vec<_> = self
            .aliases
            .iter()
            .map(|(name, code)| (name.as_str(), *code))
            .collect();
        res.sort();
        res
    }

    /// Look up an entry with its BUFR encoding parameters overridden.
    ///
    /// Equal requests return the same shared entry. Requesting the entry's
    /// own parameters returns the unaltered entry.
    pub fn query_altered(
        &self,
        code: Varcode,
        scale: i32,
        bit_len: u32,
        bit_ref: i32,
    ) -> TableResult<Arc<Varinfo>> {
        let base = self.query(code)?;
        if base.scale() == scale && base.bit_len() == bit_len && base.bit_ref() == bit_ref {
            return Ok(base);
        }

        let mut alterations = self.alterations.lock().unwrap_or_else(|e| e.into_inner());
        let key = (code, scale, bit_len, bit_ref);
        if let Some(altered) = alterations.get(&key) {
            return Ok(Arc::clone(altered));
        }

        if !base.is_string() {
            if !(-16..=16).contains(&scale) {
                return Err(TableError::OutOfRange(format!(
                    "cannot alter variable {} with a new scale of {}",
                    code, scale
                )));
            }
            if bit_len > 32 {
                return Err(TableError::OutOfRange(format!(
                    "cannot alter variable {} with a new bit_len of {}",
                    code, bit_len
                )));
            }
        }

        let altered = Arc::new(base.altered(scale, bit_len, bit_ref)?);
        alterations.insert(key, Arc::clone(&altered));
        Ok(altered)
    }
}

impl fmt::Display for Vartable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl<'a> IntoIterator for &'a Vartable {
    type Item = &'a Arc<Varinfo>;
    type IntoIter = std::slice::Iter<'a, Arc<Varinfo>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ============================================================================
// Table file parsing
// ============================================================================

/// Extract a fixed column, clamped to the line length.
fn column(line: &str, start: usize, end: usize) -> Option<&str> {
    let end = end.min(line.len());
    if start >= end {
        return Some("");
    }
    line.get(start..end)
}

/// Read a right-aligned integer that may be written as `- 5`.
fn parse_number(field: &str) -> Option<i64> {
    let field = field.trim();
    if field.is_empty() {
        return Some(0);
    }
    let (negative, digits) = match field.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, field),
    };
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Normalise the spellings of code and flag table units.
fn normalise_unit(unit: &str) -> String {
    let unit = unit.trim_end();
    if unit.starts_with("CODE TABLE") || unit.starts_with("CODETABLE") {
        "CODE TABLE".to_string()
    } else if unit.starts_with("FLAG TABLE") || unit.starts_with("FLAGTABLE") {
        "FLAG TABLE".to_string()
    } else {
        unit.to_string()
    }
}

struct LineReader<'a> {
    path: &'a Path,
    line_no: usize,
    line: &'a str,
}

impl<'a> LineReader<'a> {
    fn error(&self, reason: impl Into<String>) -> TableError {
        TableError::parse(self.path, self.line_no, reason)
    }

    fn text(&self, start: usize, end: usize) -> TableResult<&'a str> {
        column(self.line, start, end)
            .map(str::trim_end)
            .ok_or_else(|| self.error(format!("invalid characters in columns {}-{}", start, end)))
    }

    fn number(&self, start: usize, end: usize, what: &str) -> TableResult<i64> {
        let field = self.text(start, end)?;
        parse_number(field).ok_or_else(|| self.error(format!("invalid {}: {:?}", what, field.trim())))
    }

    fn int(&self, start: usize, end: usize, what: &str) -> TableResult<i32> {
        i32::try_from(self.number(start, end, what)?)
            .map_err(|_| self.error(format!("{} out of range", what)))
    }

    fn uint(&self, start: usize, end: usize, what: &str) -> TableResult<u32> {
        u32::try_from(self.number(start, end, what)?)
            .map_err(|_| self.error(format!("{} out of range", what)))
    }

    fn code(&self) -> TableResult<Varcode> {
        let field = self.text(2, 7)?;
        Varcode::from_xxyyy(field)
            .map_err(|_| self.error(format!("invalid variable code {:?}", field)))
    }
}

fn parse_entries(path: &Path, contents: &str, dialect: Dialect) -> TableResult<Vec<Arc<Varinfo>>> {
    let mut entries: Vec<Arc<Varinfo>> = Vec::new();

    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let reader = LineReader {
            path,
            line_no: idx + 1,
            line,
        };

        if line.trim().is_empty() {
            continue;
        }

        let info = match dialect {
            Dialect::Bufr => {
                if line.len() < BUFR_LINE_LEN {
                    return Err(reader.error("bufr table line too short"));
                }
                let code = reader.code()?;
                Varinfo::bufr(
                    code,
                    reader.text(8, 72)?,
                    &normalise_unit(reader.text(73, 97)?),
                    reader.int(98, 102, "scale")?,
                    reader.int(102, 115, "reference value")?,
                    reader.uint(115, 118, "bit length")?,
                )
            }
            Dialect::Crex => {
                if line.len() < CREX_LINE_LEN {
                    continue;
                }
                let code = reader.code()?;
                Varinfo::crex(
                    code,
                    reader.text(8, 72)?,
                    &normalise_unit(reader.text(119, 143)?),
                    reader.int(143, 149, "scale")?,
                    reader.uint(149, line.len(), "length")?,
                )
            }
        }
        .map_err(|e| reader.error(e.to_string()))?;

        if let Some(last) = entries.last() {
            if last.code() >= info.code() {
                return Err(reader.error("input file is not sorted"));
            }
        }
        entries.push(Arc::new(info));
    }

    if dialect == Dialect::Crex && entries.is_empty() {
        return Err(TableError::parse(
            path,
            0,
            "table does not contain any CREX information",
        ));
    }

    Ok(entries)
}

// ============================================================================
// Aliases
// ============================================================================

/// Built-in aliases, overridden by the `aliases.yaml` file in `dir`, if any.
fn load_aliases(dir: Option<&Path>) -> HashMap<String, Varcode> {
    let mut aliases: HashMap<String, Varcode> = BUILTIN_ALIASES
        .iter()
        .map(|(name, code)| (name.to_string(), *code))
        .collect();

    let Some(path) = dir.map(|d| d.join(ALIAS_FILE)) else {
        return aliases;
    };
    if !path.exists() {
        return aliases;
    }

    match read_alias_file(&path) {
        Ok(extra) => {
            debug!(path = ?path, aliases = extra.len(), "Loaded alias file");
            aliases.extend(extra);
        }
        Err(e) => {
            warn!(path = ?path, error = %e, "Failed to load alias file");
        }
    }
    aliases
}

fn read_alias_file(path: &Path) -> anyhow::Result<HashMap<String, Varcode>> {
    let contents = fs::read_to_string(path)?;
    let raw: HashMap<String, String> = serde_yaml::from_str(&contents)?;

    let mut aliases = HashMap::new();
    for (name, code) in raw {
        match Varcode::parse(&code) {
            Ok(code) => {
                aliases.insert(name, code);
            }
            Err(e) => {
                warn!(path = ?path, alias = %name, error = %e, "Skipping invalid alias");
            }
        }
    }
    Ok(aliases)
}
