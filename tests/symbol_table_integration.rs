//! Integration tests for firmware symbol lookup
//!
//! These tests build small ELF images on disk and resolve the pipeline's
//! default variable names against them.

mod common;

use common::builders::ElfBuilder;
use sensorscope::backend::SymbolTable;
use sensorscope::config::{AngularConfig, ThermalConfig};
use sensorscope::error::MonitorError;

#[test]
fn test_default_variables_resolve() {
    let resolver = ElfBuilder::resolver().write_temp();
    let table = SymbolTable::load(resolver.path()).unwrap();
    for def in AngularConfig::default().variables {
        let info = table
            .lookup(&def.name)
            .unwrap_or_else(|| panic!("{} missing", def.name));
        assert!(info.size >= def.var_type.size_bytes() as u64);
    }

    let thermal = ElfBuilder::thermal().write_temp();
    let table = SymbolTable::load(thermal.path()).unwrap();
    for def in ThermalConfig::default().variables {
        let info = table.lookup(&def.name).unwrap();
        assert!(info.size >= def.var_type.size_bytes() as u64);
    }
}

#[test]
fn test_symbols_get_distinct_addresses() {
    let file = ElfBuilder::resolver().write_temp();
    let table = SymbolTable::load(file.path()).unwrap();

    let mut addresses: Vec<u64> = table.symbols().iter().map(|s| s.address).collect();
    addresses.sort_unstable();
    addresses.dedup();
    assert_eq!(addresses.len(), 3);
}

#[test]
fn test_missing_file_is_an_elf_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SymbolTable::load(dir.path().join("absent.elf")).unwrap_err();
    assert!(matches!(err, MonitorError::ElfParsing(_)));
}

#[test]
fn test_garbage_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.elf");
    std::fs::write(&path, b"definitely not an ELF image").unwrap();
    assert!(SymbolTable::load(&path).is_err());
}

#[cfg(feature = "probe")]
mod probe {
    use super::*;
    use sensorscope::backend::{Endpoint, LiveConnector, ProbeConnector};
    use sensorscope::config::ProbeSettings;
    use sensorscope::error::ConnectError;

    #[test]
    fn test_bad_symbol_file_fails_before_touching_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.elf");
        std::fs::write(&path, b"not elf").unwrap();

        let connector = ProbeConnector::new(&ProbeSettings::default());
        let err = connector
            .open(&Endpoint::new("STM32F407VGTx", &path))
            .err()
            .unwrap();
        assert!(matches!(err, ConnectError::SymbolTable { .. }));
    }
}
