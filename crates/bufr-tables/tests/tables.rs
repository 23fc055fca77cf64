//! Table loading against the checked-in fixture tables.

use bufr_tables::{
    BufrTableId, CrexTableId, Dialect, ErrorKind, TableError, Tabledir, Varcode, Vartable, Vartype,
};
use std::sync::Arc;
use test_utils::{
    require_test_file, require_test_files, sample_table_lines, tables_dir, temp_test_dir,
    write_table,
};

fn fixtures() -> Tabledir {
    Tabledir::from_dirs([tables_dir()])
}

#[test]
fn test_bufr_and_crex_readings_differ() {
    let path = require_test_file!("B0000000000000024000.txt");

    let bufr = Vartable::load_bufr(&path).unwrap();
    let crex = Vartable::load_crex(&path).unwrap();

    let t_bufr = bufr.lookup("B12101").unwrap();
    let t_crex = crex.lookup("B12101").unwrap();
    assert_eq!(t_bufr.unit(), "K");
    assert_eq!(t_crex.unit(), "C");
    assert_eq!(t_bufr.bit_len(), 16);
    assert_eq!(t_crex.bit_len(), 0);
    assert_eq!(t_crex.len(), 4);
    assert_eq!(bufr.dialect(), Dialect::Bufr);
    assert_eq!(crex.dialect(), Dialect::Crex);
}

#[test]
fn test_master_table_contents() {
    let table = Vartable::get_bufr_in(&fixtures(), &BufrTableId::new(0, 0, 0, 24, 0)).unwrap();
    assert_eq!(table.id(), "B0000000000000024000");
    assert!(table.to_string().ends_with("B0000000000000024000.txt"));
    assert_eq!(table.len(), 14);

    let first = table.nth(0).unwrap();
    assert_eq!(first.code(), Varcode::b(1, 1));
    assert_eq!(first.unit(), "NUMERIC");
    assert!(!first.is_string());
    assert_eq!(first.len(), 3);
    assert!(table.nth(table.len()).is_none());

    let name = table.lookup("B01019").unwrap();
    assert_eq!(name.vartype(), Vartype::String);
    assert_eq!(name.len(), 32);

    let lat = table.lookup("lat").unwrap();
    assert_eq!(lat.scale(), 5);
    assert_eq!(lat.bit_ref(), -9000000);
    assert_eq!(lat.dmin(), -90.0);

    let cloud = table.lookup("B20012").unwrap();
    assert_eq!(cloud.unit(), "CODE TABLE");

    // Class 31 keeps the all-ones value
    assert_eq!(table.lookup("B31001").unwrap().imax(), 255);
    assert_eq!(table.lookup("B33007").unwrap().imax(), 126);
}

#[test]
fn test_iteration_is_file_order_and_restartable() {
    let path = require_test_file!("B0000000000000024000.txt");
    let table = Vartable::load_bufr(&path).unwrap();

    let codes: Vec<Varcode> = table.iter().map(|info| info.code()).collect();
    assert_eq!(codes.len(), table.len());
    assert!(codes.windows(2).all(|w| w[0] < w[1]));
    assert!(codes.contains(&Varcode::b(12, 101)));

    let again: Vec<Varcode> = (&*table).into_iter().map(|info| info.code()).collect();
    assert_eq!(codes, again);
}

#[test]
fn test_missing_code() {
    let path = require_test_file!("dballe.txt");
    let table = Vartable::load_bufr(&path).unwrap();

    assert!(table.contains("B01001"));
    assert!(!table.contains("B63254"));
    assert!(!table.contains("not a code"));

    let err = table.lookup("B63254").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("B63254"));
}

#[test]
fn test_aliases_from_directory_file() {
    let path = require_test_file!("dballe.txt");
    let table = Vartable::load_bufr(&path).unwrap();

    assert_eq!(table.lookup("t").unwrap().code(), Varcode::b(12, 101));
    assert_eq!(
        table.lookup("temperature").unwrap().code(),
        Varcode::b(12, 101)
    );

    // Known alias, but the dballe fixture has no pressure entry
    assert_eq!(table.resolve("pressure"), Some(Varcode::b(10, 4)));
    assert!(!table.contains("pressure"));

    let names: Vec<&str> = table.aliases().into_iter().map(|(name, _)| name).collect();
    assert!(names.contains(&"temperature"));
    assert!(names.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_same_file_is_the_same_instance() {
    let td = fixtures();
    let by_version = Vartable::get_bufr_in(&td, &BufrTableId::new(0, 0, 0, 20, 0)).unwrap();
    let by_name = Vartable::get_by_name_in(&td, "B0000000000000024000", Dialect::Bufr).unwrap();
    let by_path = Vartable::load_bufr(tables_dir().join("B0000000000000024000.txt")).unwrap();

    assert!(Arc::ptr_eq(&by_version, &by_name));
    assert!(Arc::ptr_eq(&by_version, &by_path));
}

#[test]
fn test_concurrent_first_load_shares_one_instance() {
    let dir = temp_test_dir();
    let path = write_table(dir.path(), "concurrent", &sample_table_lines());

    let tables: Vec<Arc<Vartable>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| Vartable::load_bufr(&path).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for table in &tables[1..] {
        assert!(Arc::ptr_eq(&tables[0], table));
    }
}

#[test]
fn test_local_tables() {
    let td = fixtures();

    let ecmwf = Vartable::get_bufr_in(&td, &BufrTableId::new(98, 0, 0, 6, 1)).unwrap();
    assert_eq!(ecmwf.id(), "B0000000000098006001");
    assert!(ecmwf.contains("B63254"));

    // Edition 3 naming, closest master table version at or above 10
    let old = Vartable::get_bufr_in(&td, &BufrTableId::new(0, 0, 0, 10, 0)).unwrap();
    assert_eq!(old.id(), "B000000000001100");
    assert!(old.contains("B12001"));

    let err = Vartable::get_bufr_in(&td, &BufrTableId::new(0, 0, 0, 30, 0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_every_naming_scheme_loads() {
    let paths = require_test_files!(
        "B000000000001100.txt",
        "B0000000000098006001.txt",
        "B000103.txt",
    );

    for path in &paths {
        let table = Vartable::load_bufr(path).unwrap();
        let stem = path.file_stem().unwrap().to_str().unwrap();
        assert_eq!(table.id(), stem);
        assert!(table.contains("B01001"));
        assert!(table.contains("B12001"));
    }
}

#[test]
fn test_path_is_canonical() {
    let path = require_test_file!("dballe.txt");
    let dir = path.parent().unwrap();
    let spelled = dir.join(".").join("dballe.txt");

    let table = Vartable::load_crex(&spelled).unwrap();
    let canonical = std::fs::canonicalize(&path).unwrap();
    assert_eq!(table.path(), canonical);
    assert_eq!(table.to_string(), canonical.display().to_string());
    assert_eq!(table.repr(), format!("Vartable('{}')", canonical.display()));
    assert!(Arc::ptr_eq(&table, &Vartable::load_crex(&path).unwrap()));
}

#[test]
fn test_crex_tables() {
    let td = fixtures();

    let crex = Vartable::get_crex_in(
        &td,
        &CrexTableId {
            edition_number: 1,
            master_table_version_number: 3,
            ..CrexTableId::default()
        },
    )
    .unwrap();
    assert_eq!(crex.id(), "B000103");
    assert_eq!(crex.lookup("B12001").unwrap().unit(), "C");

    let from_bufr = Vartable::get_crex_in(
        &td,
        &CrexTableId {
            master_table_version_number_bufr: 24,
            ..CrexTableId::default()
        },
    )
    .unwrap();
    assert_eq!(from_bufr.id(), "B0000000000000024000");
    assert_eq!(from_bufr.dialect(), Dialect::Crex);
    assert_eq!(from_bufr.lookup("t").unwrap().unit(), "C");
}

#[test]
fn test_unknown_name() {
    let err = Vartable::get_by_name_in(&fixtures(), "nonexistent", Dialect::Crex).unwrap_err();
    assert!(matches!(err, TableError::NotFound(_)));
    assert_eq!(err.to_string(), "CREX table nonexistent not found");
}

#[test]
fn test_query_altered_shares_entries() {
    let path = require_test_file!("B0000000000000024000.txt");
    let table = Vartable::load_bufr(&path).unwrap();
    let code = Varcode::b(12, 101);

    let a = table.query_altered(code, 1, 12, 0).unwrap();
    let b = table.query_altered(code, 1, 12, 0).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.imax(), 4094);
    assert_eq!(a.unit(), "K");
}
