//! Firmware symbol table
//!
//! Resolves variable names to addresses using the ELF symbol table. Data
//! symbols are indexed under their raw name and, for C++ and Rust symbols,
//! under the demangled name and the short unqualified name as well.

use crate::error::{MonitorError, Result};
use cpp_demangle::Symbol as CppSymbol;
use object::{Object, ObjectSymbol, SymbolKind};
use rustc_demangle::demangle as rust_demangle;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A data symbol from the firmware image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    /// Raw symbol name
    pub mangled_name: String,
    /// Demangled name (same as the raw name for C symbols)
    pub demangled_name: String,
    /// Memory address
    pub address: u64,
    /// Size in bytes (0 when the toolchain did not record one)
    pub size: u64,
}

/// Demangle a symbol name (supports C++ and Rust mangling)
pub fn demangle_symbol(mangled: &str) -> String {
    if let Ok(symbol) = CppSymbol::new(mangled) {
        if let Ok(demangled) = symbol.demangle(&cpp_demangle::DemangleOptions::default()) {
            return demangled;
        }
    }

    let demangled = format!("{:#}", rust_demangle(mangled));
    if demangled != mangled {
        return demangled;
    }

    mangled.to_string()
}

/// Last path segment of a demangled name
fn short_name(demangled: &str) -> &str {
    demangled.rsplit("::").next().unwrap_or(demangled).trim()
}

/// Name index over the data symbols of one firmware image
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<SymbolInfo>,
    by_name: HashMap<String, usize>,
}

impl SymbolTable {
    /// Load and index an ELF file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| {
            MonitorError::ElfParsing(format!("Failed to read file {}: {}", path.display(), e))
        })?;
        let table = Self::parse_bytes(&data)?;
        tracing::info!(
            "Loaded {} data symbols from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Index ELF data already in memory
    pub fn parse_bytes(data: &[u8]) -> Result<Self> {
        let file = object::File::parse(data)
            .map_err(|e| MonitorError::ElfParsing(format!("Failed to parse ELF: {}", e)))?;

        let mut table = Self::default();
        for symbol in file.symbols().chain(file.dynamic_symbols()) {
            if symbol.kind() != SymbolKind::Data || symbol.is_undefined() {
                continue;
            }
            let Ok(name) = symbol.name() else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            table.insert(SymbolInfo {
                mangled_name: name.to_string(),
                demangled_name: demangle_symbol(name),
                address: symbol.address(),
                size: symbol.size(),
            });
        }
        Ok(table)
    }

    fn insert(&mut self, info: SymbolInfo) {
        if self.by_name.contains_key(&info.mangled_name) {
            return;
        }
        let idx = self.symbols.len();
        self.by_name.insert(info.mangled_name.clone(), idx);
        // Aliases never shadow an exact raw name
        self.by_name
            .entry(info.demangled_name.clone())
            .or_insert(idx);
        self.by_name
            .entry(short_name(&info.demangled_name).to_string())
            .or_insert(idx);
        self.symbols.push(info);
    }

    /// Find a symbol by raw, demangled or short name
    pub fn lookup(&self, name: &str) -> Option<&SymbolInfo> {
        self.by_name.get(name).map(|&idx| &self.symbols[idx])
    }

    pub fn symbols(&self) -> &[SymbolInfo] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
