//! WMO BUFR/CREX table B handling.
//!
//! This crate loads the fixed-column table files used by BUFR and CREX,
//! describes each variable with a [`Varinfo`], and holds values bound to
//! those descriptions in [`Var`]. Loaded tables are shared process-wide.
//!
//! ```no_run
//! use bufr_tables::{Var, Vartable};
//!
//! let table = Vartable::get_bufr_by_name("B0000000000000024000")?;
//! let var = Var::with_value(table.lookup("t")?, 273.15)?;
//! assert_eq!(var.format(""), "273.15");
//! # Ok::<(), bufr_tables::TableError>(())
//! ```

pub mod conv;
pub mod error;
pub mod tabledir;
pub mod var;
pub mod varcode;
pub mod varinfo;
pub mod vartable;

pub use conv::{convert_units, convert_units_allowed, convert_units_get_mul};
pub use error::{ErrorKind, TableError, TableResult};
pub use tabledir::{BufrTableId, CrexTableId, TableEntry, TableFileId, Tabledir};
pub use var::{Value, Var};
pub use varcode::Varcode;
pub use varinfo::{Varinfo, Vartype};
pub use vartable::{Dialect, TableSelector, Vartable};
