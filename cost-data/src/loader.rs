//! CSV loaders for the tables that are too long to keep inline in the TOML
//! configuration: program NCM restriction lists and monophasic headings.

use std::collections::BTreeMap;
use std::io::Read;

use cost_core::NcmRestrictionSet;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration CSV files.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Blank {column} on row {row}")]
    BlankValue { column: &'static str, row: usize },
}

impl From<csv::Error> for LoaderError {
    fn from(err: csv::Error) -> Self {
        LoaderError::CsvParse(err.to_string())
    }
}

fn reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// How a restriction row matches NCMs.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RestrictionKind {
    Exact,
    Pattern,
}

/// A single row of the NCM restrictions CSV file.
///
/// - `program_code`: code of the incentive program (e.g. `TTD_409`)
/// - `kind`: `exact` or `pattern`
/// - `value`: NCM (`2203.00.00`) or wildcard pattern (`8703*`)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NcmRestrictionRecord {
    pub program_code: String,
    pub kind: RestrictionKind,
    pub value: String,
}

/// Loader for per-program NCM negative lists.
pub struct NcmRestrictionLoader;

impl NcmRestrictionLoader {
    /// Parse restriction rows from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<NcmRestrictionRecord>, LoaderError> {
        let mut csv_reader = self::reader(reader);
        let mut records = Vec::new();

        for (index, result) in csv_reader.deserialize().enumerate() {
            let record: NcmRestrictionRecord = result?;
            if record.program_code.is_empty() {
                return Err(LoaderError::BlankValue {
                    column: "program_code",
                    row: index + 1,
                });
            }
            if record.value.is_empty() {
                return Err(LoaderError::BlankValue {
                    column: "value",
                    row: index + 1,
                });
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Group rows into one restriction set per program, ordered by code.
    pub fn into_sets(records: Vec<NcmRestrictionRecord>) -> Vec<NcmRestrictionSet> {
        let mut sets: BTreeMap<String, NcmRestrictionSet> = BTreeMap::new();

        for record in records {
            let set = sets
                .entry(record.program_code.clone())
                .or_insert_with(|| NcmRestrictionSet {
                    program_code: record.program_code.clone(),
                    ..Default::default()
                });
            match record.kind {
                RestrictionKind::Exact => set.exact.push(record.value),
                RestrictionKind::Pattern => set.patterns.push(record.value),
            }
        }

        sets.into_values().collect()
    }

    pub fn load<R: Read>(reader: R) -> Result<Vec<NcmRestrictionSet>, LoaderError> {
        Ok(Self::into_sets(Self::parse(reader)?))
    }
}

/// A single row of the monophasic headings CSV file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MonophasicPrefixRecord {
    /// 4-digit NCM heading, dotted or not (`3004`, `30.04`).
    pub prefix: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Loader for the monophasic NCM heading list.
pub struct MonophasicPrefixLoader;

impl MonophasicPrefixLoader {
    pub fn parse<R: Read>(reader: R) -> Result<Vec<MonophasicPrefixRecord>, LoaderError> {
        let mut csv_reader = self::reader(reader);
        let mut records = Vec::new();

        for (index, result) in csv_reader.deserialize().enumerate() {
            let record: MonophasicPrefixRecord = result?;
            if record.prefix.is_empty() {
                return Err(LoaderError::BlankValue {
                    column: "prefix",
                    row: index + 1,
                });
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Heading strings, in file order. Validation happens when the
    /// configuration snapshot is built.
    pub fn load<R: Read>(reader: R) -> Result<Vec<String>, LoaderError> {
        Ok(Self::parse(reader)?
            .into_iter()
            .map(|record| record.prefix)
            .collect())
    }
}
