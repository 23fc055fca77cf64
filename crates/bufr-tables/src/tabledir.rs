//! Index of the table files available in the table directories.
//!
//! Table files follow three naming schemes, all with a `.txt` extension:
//!
//! - `B00ddd` `ssss` `cccc` `mmm` `lll`: BUFR edition 4 (subcentre, centre,
//!   master table version, local table version)
//! - `B00000` `sss` `ccc` `mm` `ll`: BUFR edition 3 (same fields)
//! - `B` `tt` `ee` `vv`: CREX (master table number, edition, table version)
//!
//! Any other file can still be found by name with [`Tabledir::find`].

use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Compiled-in table directory, searched last.
pub const DEFAULT_TABLE_DIR: &str = "/usr/share/wreport";

/// Version number meaning "the newest available".
pub const NEWEST: u8 = 0xff;

/// Identification of a BUFR table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufrTableId {
    pub originating_centre: u16,
    pub originating_subcentre: u16,
    pub master_table_number: u8,
    pub master_table_version_number: u8,
    pub master_table_version_number_local: u8,
}

impl BufrTableId {
    pub const fn new(
        originating_centre: u16,
        originating_subcentre: u16,
        master_table_number: u8,
        master_table_version_number: u8,
        master_table_version_number_local: u8,
    ) -> Self {
        Self {
            originating_centre,
            originating_subcentre,
            master_table_number,
            master_table_version_number,
            master_table_version_number_local,
        }
    }
}

impl Default for BufrTableId {
    /// WMO tables, newest master table version, no local table.
    fn default() -> Self {
        Self::new(0, 0, 0, NEWEST, 0)
    }
}

impl fmt::Display for BufrTableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BUFR({:03}:{:02}, {:02}:{:02}:{:02})",
            self.originating_centre,
            self.originating_subcentre,
            self.master_table_number,
            self.master_table_version_number,
            self.master_table_version_number_local
        )
    }
}

/// Identification of a CREX table.
///
/// `master_table_version_number_bufr` allows selecting a CREX reading of a
/// BUFR table file when no CREX table version is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrexTableId {
    pub edition_number: u8,
    pub originating_centre: u16,
    pub originating_subcentre: u16,
    pub master_table_number: u8,
    pub master_table_version_number: u8,
    pub master_table_version_number_bufr: u8,
    pub master_table_version_number_local: u8,
}

impl Default for CrexTableId {
    fn default() -> Self {
        Self {
            edition_number: 2,
            originating_centre: 0,
            originating_subcentre: 0,
            master_table_number: 0,
            master_table_version_number: NEWEST,
            master_table_version_number_bufr: NEWEST,
            master_table_version_number_local: 0,
        }
    }
}

impl fmt::Display for CrexTableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CREX({:02}, {:03}:{:02}, {:02}:{:02}:{:02}:{:02})",
            self.edition_number,
            self.originating_centre,
            self.originating_subcentre,
            self.master_table_number,
            self.master_table_version_number,
            self.master_table_version_number_local,
            self.master_table_version_number_bufr
        )
    }
}

/// What a table file name says about its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFileId {
    Bufr(BufrTableId),
    Crex(CrexTableId),
}

/// A table file found in one of the directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub id: TableFileId,
    pub path: PathBuf,
}

fn field<T: TryFrom<u32>>(s: &str) -> Option<T> {
    s.parse::<u32>().ok().and_then(|v| T::try_from(v).ok())
}

/// Decode a table file name into the table identification it encodes.
pub fn parse_table_name(name: &str) -> Option<TableFileId> {
    let digits = name.strip_suffix(".txt")?.strip_prefix('B')?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    match digits.len() {
        6 => Some(TableFileId::Crex(CrexTableId {
            edition_number: field(&digits[2..4])?,
            originating_centre: 0xffff,
            originating_subcentre: 0xffff,
            master_table_number: field(&digits[0..2])?,
            master_table_version_number: field(&digits[4..6])?,
            master_table_version_number_bufr: NEWEST,
            master_table_version_number_local: NEWEST,
        })),
        15 if digits.starts_with("00000") => Some(TableFileId::Bufr(BufrTableId::new(
            field(&digits[8..11])?,
            field(&digits[5..8])?,
            0,
            field(&digits[11..13])?,
            field(&digits[13..15])?,
        ))),
        19 if digits.starts_with("00") => Some(TableFileId::Bufr(BufrTableId::new(
            field(&digits[9..13])?,
            field(&digits[5..9])?,
            0,
            field(&digits[13..16])?,
            field(&digits[16..19])?,
        ))),
        _ => None,
    }
}

// ============================================================================
// Best match rules
// ============================================================================

/// Compare master table versions of two acceptable candidates.
///
/// Returns `Some(true)` if `cand` is closer to `want` than `cur`, `Some(false)`
/// if it is farther, `None` if they are the same version.
fn closer_version(want: u8, cur: u8, cand: u8) -> Option<bool> {
    if cand == cur {
        None
    } else if want == NEWEST {
        Some(cand > cur)
    } else {
        // Both are at or above what we want: the lowest is the closest
        Some(cand < cur)
    }
}

/// Compare local table versions: the closest at or above `want` wins; below
/// `want`, any higher one is better.
fn closer_local(want: u8, cur: u8, cand: u8) -> Option<bool> {
    if cur < want {
        if cand > cur {
            return Some(true);
        }
        if cand < cur {
            return Some(false);
        }
    } else {
        if cand < want {
            return Some(false);
        }
        if cand < cur {
            return Some(true);
        }
    }
    if cand != cur {
        return Some(false);
    }
    None
}

fn is_better_bufr(want: &BufrTableId, cur: Option<&BufrTableId>, cand: &BufrTableId) -> bool {
    if cand.master_table_number != want.master_table_number {
        return false;
    }
    if want.master_table_version_number != NEWEST
        && cand.master_table_version_number < want.master_table_version_number
    {
        return false;
    }

    let Some(cur) = cur else {
        return true;
    };

    if let Some(better) = closer_version(
        want.master_table_version_number,
        cur.master_table_version_number,
        cand.master_table_version_number,
    ) {
        return better;
    }

    if cur.originating_centre == want.originating_centre {
        // Once the wanted centre is found, only consider that centre
        if cand.originating_centre != want.originating_centre {
            return false;
        }
    } else if cur.originating_centre == 0 {
        // Approximated to WMO: only the exact centre is an improvement
        return cand.originating_centre == want.originating_centre;
    } else {
        return cand.originating_centre == want.originating_centre || cand.originating_centre == 0;
    }

    if let Some(better) = closer_local(
        want.master_table_version_number_local,
        cur.master_table_version_number_local,
        cand.master_table_version_number_local,
    ) {
        return better;
    }

    // Same details: only the exact subcentre is an improvement
    cur.originating_subcentre != want.originating_subcentre
        && cand.originating_subcentre == want.originating_subcentre
}

fn is_better_crex(want: &CrexTableId, cur: Option<&CrexTableId>, cand: &CrexTableId) -> bool {
    if cand.edition_number != want.edition_number
        || cand.master_table_number != want.master_table_number
    {
        return false;
    }
    if want.master_table_version_number != NEWEST
        && cand.master_table_version_number < want.master_table_version_number
    {
        return false;
    }

    let Some(cur) = cur else {
        return true;
    };

    if let Some(better) = closer_version(
        want.master_table_version_number,
        cur.master_table_version_number,
        cand.master_table_version_number,
    ) {
        return better;
    }

    closer_local(
        want.master_table_version_number_local,
        cur.master_table_version_number_local,
        cand.master_table_version_number_local,
    )
    .unwrap_or(false)
}

// ============================================================================
// Directory index
// ============================================================================

#[derive(Debug, Default)]
struct DirIndex {
    bufr: Vec<(BufrTableId, PathBuf)>,
    crex: Vec<(CrexTableId, PathBuf)>,
}

impl DirIndex {
    fn scan(dir: &Path) -> Self {
        let mut index = Self::default();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = ?dir, "Table directory does not exist");
                return index;
            }
            Err(e) => {
                warn!(dir = ?dir, error = %e, "Cannot read table directory");
                return index;
            }
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();

        for name in names {
            match parse_table_name(&name) {
                Some(TableFileId::Bufr(id)) => index.bufr.push((id, dir.join(&name))),
                Some(TableFileId::Crex(id)) => index.crex.push((id, dir.join(&name))),
                None => {}
            }
        }

        debug!(
            dir = ?dir,
            bufr = index.bufr.len(),
            crex = index.crex.len(),
            "Indexed table directory"
        );
        index
    }
}

/// A list of table directories, searched in order.
///
/// The directory contents are indexed on the first query, and the best
/// match for each query is remembered.
#[derive(Debug, Default)]
pub struct Tabledir {
    dirs: Vec<PathBuf>,
    index: OnceCell<Vec<DirIndex>>,
    bufr_matches: Mutex<HashMap<BufrTableId, TableEntry>>,
    crex_matches: Mutex<HashMap<CrexTableId, TableEntry>>,
}

static DEFAULT_TABLEDIR: Lazy<Tabledir> = Lazy::new(Tabledir::with_default_directories);

impl Tabledir {
    /// An empty list of directories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories from `$WREPORT_EXTRA_TABLES`, `$WREPORT_TABLES`, then
    /// [`DEFAULT_TABLE_DIR`].
    pub fn with_default_directories() -> Self {
        let mut tabledir = Self::new();
        for var in ["WREPORT_EXTRA_TABLES", "WREPORT_TABLES"] {
            if let Ok(dir) = env::var(var) {
                tabledir.add_directory(dir);
            }
        }
        tabledir.add_directory(DEFAULT_TABLE_DIR);
        tabledir
    }

    /// Build from an explicit list of directories.
    pub fn from_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut tabledir = Self::new();
        for dir in dirs {
            tabledir.add_directory(dir);
        }
        tabledir
    }

    /// The process-wide instance built from the default directories.
    pub fn global() -> &'static Tabledir {
        &DEFAULT_TABLEDIR
    }

    /// Append a directory. Trailing slashes are ignored, and directories
    /// already in the list are not added again.
    pub fn add_directory(&mut self, dir: impl AsRef<Path>) {
        let raw = dir.as_ref().to_string_lossy();
        let trimmed = raw.trim_end_matches('/');
        let clean = PathBuf::from(if trimmed.is_empty() { "/" } else { trimmed });

        if self.dirs.contains(&clean) {
            return;
        }
        self.dirs.push(clean);

        // Force a rebuild of the index
        self.index = OnceCell::new();
        self.bufr_matches.get_mut().map(|m| m.clear()).ok();
        self.crex_matches.get_mut().map(|m| m.clear()).ok();
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn index(&self) -> &[DirIndex] {
        self.index
            .get_or_init(|| self.dirs.iter().map(|d| DirIndex::scan(d)).collect())
    }

    /// Find `<basename>.txt` in the first directory that has it.
    pub fn find(&self, basename: &str) -> Option<PathBuf> {
        let filename = format!("{}.txt", basename);
        self.dirs
            .iter()
            .map(|dir| dir.join(&filename))
            .find(|path| path.is_file())
    }

    /// Find the BUFR table file that best matches `id`.
    pub fn find_bufr(&self, id: &BufrTableId) -> Option<TableEntry> {
        let mut matches = self.bufr_matches.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = matches.get(id) {
            return Some(entry.clone());
        }

        let mut best: Option<&(BufrTableId, PathBuf)> = None;
        for dir in self.index() {
            for candidate in &dir.bufr {
                if is_better_bufr(id, best.map(|(b, _)| b), &candidate.0) {
                    best = Some(candidate);
                }
            }
        }

        let (found, path) = best?;
        let entry = TableEntry {
            id: TableFileId::Bufr(*found),
            path: path.clone(),
        };
        debug!(query = %id, table = ?entry.path, "Matched BUFR table");
        matches.insert(*id, entry.clone());
        Some(entry)
    }

    /// Find the table file that best matches a CREX query.
    ///
    /// CREX-named files are tried first when a CREX table version is given.
    /// Otherwise, or when none matches, the BUFR table for
    /// `master_table_version_number_bufr` is used, to be read with CREX
    /// semantics.
    pub fn find_crex(&self, id: &CrexTableId) -> Option<TableEntry> {
        let mut matches = self.crex_matches.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = matches.get(id) {
            return Some(entry.clone());
        }

        let mut entry = None;
        if id.master_table_version_number != NEWEST || id.master_table_version_number_bufr == NEWEST
        {
            let mut best: Option<&(CrexTableId, PathBuf)> = None;
            for dir in self.index() {
                for candidate in &dir.crex {
                    if is_better_crex(id, best.map(|(b, _)| b), &candidate.0) {
                        best = Some(candidate);
                    }
                }
            }
            entry = best.map(|(found, path)| TableEntry {
                id: TableFileId::Crex(*found),
                path: path.clone(),
            });
        }

        if entry.is_none() {
            entry = self.find_bufr(&BufrTableId::new(
                id.originating_centre,
                id.originating_subcentre,
                id.master_table_number,
                id.master_table_version_number_bufr,
                id.master_table_version_number_local,
            ));
        }

        let entry = entry?;
        debug!(query = %id, table = ?entry.path, "Matched CREX table");
        matches.insert(*id, entry.clone());
        Some(entry)
    }
}
