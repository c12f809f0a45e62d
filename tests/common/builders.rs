//! Test data builders for creating test objects

use object::write::{Object, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};
use std::io::Write;
use tempfile::NamedTempFile;

/// Builder for small ARM ELF images holding data symbols
pub struct ElfBuilder {
    symbols: Vec<(String, u64)>,
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
        }
    }

    /// Firmware image exporting the resolver variables
    pub fn resolver() -> Self {
        Self::new()
            .symbol("sin_calibrated", 4)
            .symbol("cos_calibrated", 4)
            .symbol("resolver_position", 4)
    }

    /// Firmware image exporting the temperature variables
    pub fn thermal() -> Self {
        Self::new()
            .symbol("TemperatureValueX2C", 1)
            .symbol("tempSampleRate", 4)
    }

    pub fn symbol(mut self, name: &str, size: u64) -> Self {
        self.symbols.push((name.to_string(), size));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut obj = Object::new(BinaryFormat::Elf, Architecture::Arm, Endianness::Little);
        let section = obj.add_section(Vec::new(), b".data".to_vec(), SectionKind::Data);
        for (name, size) in &self.symbols {
            let offset = obj.append_section_data(section, &vec![0u8; *size as usize], 4);
            obj.add_symbol(Symbol {
                name: name.as_bytes().to_vec(),
                value: offset,
                size: *size,
                kind: SymbolKind::Data,
                scope: SymbolScope::Linkage,
                weak: false,
                section: SymbolSection::Section(section),
                flags: SymbolFlags::None,
            });
        }
        obj.write().expect("ELF fixture should serialize")
    }

    /// Write the image to a temporary file
    pub fn write_temp(self) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&self.build()).expect("write ELF fixture");
        file.flush().expect("flush ELF fixture");
        file
    }
}

impl Default for ElfBuilder {
    fn default() -> Self {
        Self::new()
    }
}
