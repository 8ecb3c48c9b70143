// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One selectable ticker from the catalog file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub symbol: String,
    pub label: Option<String>,
}

/// Static list of valid symbols, loaded once at start-up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerCatalog {
    entries: Vec<CatalogEntry>,
}

impl TickerCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open ticker catalog: {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to parse ticker catalog: {}", path.display()))
    }

    /// Reads `symbol[,label]` rows after a header row. Blank symbols are skipped
    /// and duplicates keep their first occurrence.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries: Vec<CatalogEntry> = Vec::new();
        for result in reader.records() {
            let record = result?;
            let symbol = match record.get(0) {
                Some(s) if !s.is_empty() => s.to_uppercase(),
                _ => continue,
            };
            if entries.iter().any(|e| e.symbol == symbol) {
                continue;
            }
            let label = record
                .get(1)
                .filter(|l| !l.is_empty())
                .map(|l| l.to_string());
            entries.push(CatalogEntry { symbol, label });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn get(&self, symbol: &str) -> Option<&CatalogEntry> {
        let symbol = symbol.trim().to_uppercase();
        self.entries.iter().find(|e| e.symbol == symbol)
    }

    /// Splits requested symbols into known (normalized) and unknown ones.
    pub fn partition(&self, requested: &[String]) -> (Vec<String>, Vec<String>) {
        let mut known = Vec::new();
        let mut unknown = Vec::new();
        for symbol in requested {
            match self.get(symbol) {
                Some(entry) => {
                    if !known.contains(&entry.symbol) {
                        known.push(entry.symbol.clone());
                    }
                }
                None => unknown.push(symbol.clone()),
            }
        }
        (known, unknown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parses_symbol_and_optional_label() {
        let csv = "symbol,label\nPETR4,Petrobras PN\nVALE3\n itub4 , Itau \n";
        let catalog = TickerCatalog::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.entries()[0].label.as_deref(), Some("Petrobras PN"));
        assert_eq!(catalog.entries()[1].label, None);
        assert_eq!(catalog.entries()[2].symbol, "ITUB4");
        assert_eq!(catalog.entries()[2].label.as_deref(), Some("Itau"));
    }

    #[test]
    fn test_skips_blank_and_duplicate_rows() {
        let csv = "symbol,label\nPETR4,First\n,\npetr4,Second\n";
        let catalog = TickerCatalog::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].label.as_deref(), Some("First"));
    }

    #[test]
    fn test_partition_known_and_unknown() {
        let csv = "symbol\nPETR4\nVALE3\n";
        let catalog = TickerCatalog::from_reader(csv.as_bytes()).unwrap();
        let requested = vec![
            "vale3".to_string(),
            "XXXX3".to_string(),
            "VALE3".to_string(),
        ];

        let (known, unknown) = catalog.partition(&requested);
        assert_eq!(known, vec!["VALE3".to_string()]);
        assert_eq!(unknown, vec!["XXXX3".to_string()]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "symbol,label").unwrap();
        writeln!(file, "WEGE3,WEG ON").unwrap();

        let catalog = TickerCatalog::load(file.path()).unwrap();
        assert!(catalog.contains("wege3"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = TickerCatalog::load(Path::new("/nonexistent/catalog.csv"));
        assert!(result.is_err());
    }
}
