//! Attribute-config parser: CSV and JSON+taxon-index-map variants.
//! Grounded on the codebase's `csv::Reader` usage in its
//! study-population parser and on the original source's
//! `configfile`/`yield_config_lines` (the synthetic `IDX` column for
//! the JSON variant, reserved-attribute filtering).

use std::collections::BTreeSet;
use std::fs;
use std::fs::File;
use std::path::Path;

use compact_str::CompactString;
use csv::ReaderBuilder;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::model::ATTRIBUTE_RESERVED;

#[derive(Debug, Clone)]
pub struct ConfigRecord {
    pub idx: u32,
    pub taxon: CompactString,
    pub taxid: Option<u64>,
    pub is_outgroup: bool,
    /// user-defined attribute name -> level value, in column order.
    pub attributes: FxHashMap<CompactString, CompactString>,
}

#[derive(Debug, Clone)]
pub struct ConfigTable {
    pub records: Vec<ConfigRecord>,
    /// User-defined attribute names in first-appearance order,
    /// excluding `TAXON` and the reserved columns.
    pub attribute_names: Vec<CompactString>,
}

pub fn parse_config_csv(path: &Path) -> Result<ConfigTable> {
    let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(file);

    let header_record = reader
        .headers()
        .map_err(|e| EngineError::input(path, format!("invalid CSV header: {e}")))?
        .clone();
    if header_record.is_empty() {
        return Err(EngineError::input(path, "config file is empty"));
    }
    let headers: Vec<CompactString> = header_record
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('#') } else { h };
            CompactString::from(h.trim())
        })
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| EngineError::input(path, format!("malformed CSV row: {e}")))?;
        rows.push(record.iter().map(|f| f.trim().to_string()).collect::<Vec<String>>());
    }

    build_config_table(path, &headers, rows.into_iter())
}

fn build_config_table(
    path: &Path,
    headers: &[CompactString],
    rows: impl Iterator<Item = Vec<String>>,
) -> Result<ConfigTable> {
    let taxon_col = headers.iter().position(|h| h == "TAXON").ok_or_else(|| {
        EngineError::input(path, "config file is missing required column 'TAXON'")
    })?;
    let idx_col = headers.iter().position(|h| h == "IDX");
    let taxid_col = headers.iter().position(|h| h == "TAXID");
    let out_col = headers.iter().position(|h| h == "OUT");

    let attribute_names: Vec<CompactString> = headers
        .iter()
        .filter(|h| h.as_str() != "TAXON" && !ATTRIBUTE_RESERVED.contains(&h.as_str()))
        .cloned()
        .collect();

    let mut records = Vec::new();
    let mut seen_taxa: BTreeSet<CompactString> = BTreeSet::new();
    let mut next_auto_idx = 0u32;

    for (row_no, fields) in rows.enumerate() {
        if fields.len() == 1 && fields[0].is_empty() {
            continue;
        }
        if fields.len() != headers.len() {
            return Err(EngineError::input(
                path,
                format!(
                    "config row {} has {} fields, expected {}",
                    row_no + 2,
                    fields.len(),
                    headers.len()
                ),
            ));
        }

        let taxon = CompactString::from(fields[taxon_col].as_str());
        if !seen_taxa.insert(taxon.clone()) {
            return Err(EngineError::input(
                path,
                format!("duplicate TAXON value '{}'", taxon),
            ));
        }

        let idx = match idx_col {
            Some(c) => fields[c].parse::<u32>().map_err(|_| {
                EngineError::input(path, format!("non-integer IDX on row {}", row_no + 2))
            })?,
            None => {
                let v = next_auto_idx;
                next_auto_idx += 1;
                v
            }
        };

        let taxid = match taxid_col {
            Some(c) if !fields[c].is_empty() => Some(fields[c].parse::<u64>().map_err(|_| {
                EngineError::input(path, format!("non-integer TAXID on row {}", row_no + 2))
            })?),
            _ => None,
        };

        let is_outgroup = match out_col {
            Some(c) => fields[c].trim() == "1",
            None => false,
        };

        let mut attributes = FxHashMap::default();
        for name in &attribute_names {
            let col = headers.iter().position(|h| h == name).unwrap();
            attributes.insert(name.clone(), CompactString::from(fields[col].as_str()));
        }

        records.push(ConfigRecord {
            idx,
            taxon,
            taxid,
            is_outgroup,
            attributes,
        });
    }

    log::info!("[STATUS]\t- parsed {} proteome config records from {}", records.len(), path.display());

    Ok(ConfigTable {
        records,
        attribute_names,
    })
}

/// JSON variant: an array of objects plus a companion `TAXON -> IDX`
/// mapping.
pub fn parse_config_json(config_path: &Path, taxon_idx_mapping_path: &Path) -> Result<ConfigTable> {
    let mapping_content =
        fs::read_to_string(taxon_idx_mapping_path).map_err(|e| EngineError::io(taxon_idx_mapping_path, e))?;
    let mapping: FxHashMap<String, u32> = serde_json::from_str(&mapping_content)
        .map_err(|e| EngineError::input(taxon_idx_mapping_path, format!("invalid JSON: {e}")))?;

    let config_content = fs::read_to_string(config_path).map_err(|e| EngineError::io(config_path, e))?;
    let items: Vec<Value> = serde_json::from_str(&config_content)
        .map_err(|e| EngineError::input(config_path, format!("invalid JSON: {e}")))?;

    if items.is_empty() {
        return Err(EngineError::input(config_path, "config JSON array is empty"));
    }

    let mut headers: Vec<CompactString> = vec![CompactString::from("IDX")];
    if let Value::Object(map) = &items[0] {
        for key in map.keys() {
            headers.push(CompactString::from(key.as_str()));
        }
    }

    let mut rows = Vec::new();
    for item in &items {
        let Value::Object(map) = item else {
            return Err(EngineError::input(config_path, "config JSON array must contain objects"));
        };
        let taxon_key = if map.contains_key("taxon") { "taxon" } else { "TAXON" };
        let taxon_value = map.get(taxon_key).and_then(Value::as_str).ok_or_else(|| {
            EngineError::input(config_path, "JSON config record missing 'taxon'/'TAXON' field")
        })?;
        let idx = mapping.get(taxon_value).ok_or_else(|| {
            EngineError::input(
                config_path,
                format!("taxon '{}' not present in taxon_idx_mapping", taxon_value),
            )
        })?;

        let mut row = vec![idx.to_string()];
        for header in headers.iter().skip(1) {
            let v = map.get(header.as_str());
            row.push(value_to_string(v));
        }
        rows.push(row);
    }

    build_config_table(config_path, &headers, rows.into_iter())
}

fn value_to_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => {
            if *b {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_minimal_csv() {
        let dir = std::env::temp_dir().join(format!("kinfin-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "#TAXON,g").unwrap();
        writeln!(f, "A,x").unwrap();
        writeln!(f, "B,x").unwrap();
        drop(f);

        let table = parse_config_csv(&path).unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.attribute_names, vec![CompactString::from("g")]);
        assert_eq!(table.records[0].idx, 0);
    }

    #[test]
    fn rejects_duplicate_taxon() {
        let dir = std::env::temp_dir().join(format!("kinfin-config-test2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "TAXON,g").unwrap();
        writeln!(f, "A,x").unwrap();
        writeln!(f, "A,y").unwrap();
        drop(f);

        assert!(parse_config_csv(&path).is_err());
    }

    #[test]
    fn rejects_missing_taxon_column() {
        let dir = std::env::temp_dir().join(format!("kinfin-config-test3-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "IDX,g").unwrap();
        writeln!(f, "0,x").unwrap();
        drop(f);

        assert!(parse_config_csv(&path).is_err());
    }
}
