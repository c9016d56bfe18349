//! CSV loader for import declaration totals.
//!
//! ## CSV Format
//!
//! One row per addition (adição). Headers are matched by name.
//!
//! | Column             | Type    | Notes                                  |
//! |--------------------|---------|----------------------------------------|
//! | `declaration`      | string  | DI/DUIMP number; rows are grouped by it |
//! | `addition`         | integer | addition number within the declaration |
//! | `ncm`              | string  | e.g. `8471.30.12`                      |
//! | `customs_value`    | decimal | BRL, exchange rate already applied     |
//! | `ii_due`           | decimal |                                        |
//! | `ipi_due`          | decimal |                                        |
//! | `pis_due`          | decimal |                                        |
//! | `cofins_due`       | decimal |                                        |
//! | `icms_due`         | decimal |                                        |
//! | `customs_expenses` | decimal | expenses apportioned to the addition   |
//!
//! Amounts of all additions of a declaration are summed. A blank amount on
//! any addition leaves the declaration total absent. A non-numeric amount,
//! or a sum too large for a decimal, is carried through as text. Both are
//! reported by field name when the totals are validated. Zero must be
//! written as `0`.
//!
//! ```csv
//! declaration,addition,ncm,customs_value,ii_due,ipi_due,pis_due,cofins_due,icms_due,customs_expenses
//! 24/0123456-7,1,8471.30.12,6000.00,360.00,120.00,99.00,456.00,1020.00,180.00
//! 24/0123456-7,2,8517.12.31,4000.00,240.00,80.00,66.00,304.00,680.00,120.00
//! ```

use std::io::Read;

use cost_core::calculations::{RawAddition, RawTaxTotals};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::loader::LoaderError;

#[derive(Debug, Deserialize)]
struct CsvRow {
    declaration: String,
    addition: u32,
    ncm: Option<String>,
    customs_value: Option<String>,
    ii_due: Option<String>,
    ipi_due: Option<String>,
    pis_due: Option<String>,
    cofins_due: Option<String>,
    icms_due: Option<String>,
    customs_expenses: Option<String>,
}

/// Running total of one amount column.
#[derive(Debug, Clone)]
enum Amount {
    Sum(Decimal),
    Blank,
    Unparsable(String),
}

impl Amount {
    fn add(
        self,
        cell: Option<&str>,
    ) -> Self {
        let Self::Sum(total) = self else {
            return self;
        };
        match cell.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::Blank,
            Some(text) => match text.parse::<Decimal>() {
                Ok(value) => match total.checked_add(value) {
                    Some(sum) => Self::Sum(sum),
                    None => Self::Unparsable(format!("{total} + {text}")),
                },
                Err(_) => Self::Unparsable(text.to_string()),
            },
        }
    }

    fn into_cell(self) -> Option<String> {
        match self {
            Self::Sum(total) => Some(total.to_string()),
            Self::Blank => None,
            Self::Unparsable(text) => Some(text),
        }
    }
}

#[derive(Debug)]
struct Accumulator {
    declaration: String,
    amounts: [Amount; 7],
    additions: Vec<RawAddition>,
}

impl Accumulator {
    fn new(declaration: String) -> Self {
        Self {
            declaration,
            amounts: std::array::from_fn(|_| Amount::Sum(Decimal::ZERO)),
            additions: Vec::new(),
        }
    }

    fn push(
        &mut self,
        row: CsvRow,
    ) {
        let cells = [
            row.customs_value,
            row.ii_due,
            row.ipi_due,
            row.pis_due,
            row.cofins_due,
            row.icms_due,
            row.customs_expenses,
        ];
        for (amount, cell) in self.amounts.iter_mut().zip(cells.iter()) {
            let current = std::mem::replace(amount, Amount::Blank);
            *amount = current.add(cell.as_deref());
        }
        self.additions.push(RawAddition {
            number: row.addition,
            ncm: row.ncm,
        });
    }

    fn finish(self) -> DeclarationRecord {
        let [
            customs_value,
            ii_due,
            ipi_due,
            pis_due,
            cofins_due,
            icms_due,
            customs_expenses,
        ] = self.amounts.map(Amount::into_cell);

        DeclarationRecord {
            declaration: self.declaration,
            totals: RawTaxTotals {
                customs_value,
                ii_due,
                ipi_due,
                pis_due,
                cofins_due,
                icms_due,
                customs_expenses,
                additions: self.additions,
            },
        }
    }
}

/// Aggregated, still unvalidated totals of one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationRecord {
    pub declaration: String,
    pub totals: RawTaxTotals,
}

/// Loader for declaration rows exported by the upstream extractor.
pub struct DeclarationLoader;

impl DeclarationLoader {
    /// Parse and group declaration rows. Declarations are returned in the
    /// order of their first row.
    ///
    /// # Errors
    ///
    /// [`LoaderError::CsvParse`] when the file is structurally invalid or
    /// an `addition` number is not an integer; [`LoaderError::BlankValue`]
    /// for a row without a declaration number.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<DeclarationRecord>, LoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(reader);

        let mut groups: Vec<Accumulator> = Vec::new();
        for (index, result) in csv_reader.deserialize::<CsvRow>().enumerate() {
            let row = result?;
            if row.declaration.is_empty() {
                return Err(LoaderError::BlankValue {
                    column: "declaration",
                    row: index + 1,
                });
            }
            let position = match groups.iter().position(|g| g.declaration == row.declaration) {
                Some(position) => position,
                None => {
                    groups.push(Accumulator::new(row.declaration.clone()));
                    groups.len() - 1
                }
            };
            groups[position].push(row);
        }

        Ok(groups.into_iter().map(Accumulator::finish).collect())
    }
}
