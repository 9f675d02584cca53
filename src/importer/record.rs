use std::{collections::HashMap, ops::RangeInclusive};

use super::{cell::CellValue, err::RowError};

static EMPTY: CellValue = CellValue::Empty;

/// One data row of a sheet, keyed by header name
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: HashMap<String, CellValue>,
}

impl RawRow {
    pub fn new(cells: HashMap<String, CellValue>) -> Self {
        Self { cells }
    }

    /// the cell under `column`, or an empty cell when the column is missing
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY)
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Validation rules shared by every record kind
#[derive(Debug, Clone)]
pub struct Rules {
    pub email_domain: String,
    pub year_range: RangeInclusive<i64>,
}

impl Rules {
    pub fn new(email_domain: impl Into<String>) -> Self {
        Self {
            email_domain: email_domain.into(),
            year_range: 1..=5,
        }
    }

    /// case-insensitive suffix match, empty never matches
    pub fn is_valid_email(&self, email: &str) -> bool {
        !email.is_empty()
            && email
                .to_lowercase()
                .ends_with(&self.email_domain.to_lowercase())
    }

    fn check_email(&self, kind: &'static str, index: usize, email: &str) -> Result<(), RowError> {
        if self.is_valid_email(email) {
            Ok(())
        } else {
            Err(RowError::EmailDomain {
                kind,
                index,
                domain: self.email_domain.clone(),
                got: email.to_string(),
            })
        }
    }
}

/// A value bound into an upsert statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
}

/// A record kind that can be read from a sheet and upserted into its table.
///
/// The sheet name, table name and error prefix are all `KIND`.
pub trait Record: Sized {
    const KIND: &'static str;
    /// primary key first
    const COLUMNS: &'static [&'static str];

    /// Normalize and validate one row, stopping at the first failing check.
    fn from_row(index: usize, row: &RawRow, rules: &Rules) -> Result<Self, RowError>;

    /// values in `COLUMNS` order
    fn values(&self) -> Vec<SqlValue>;

    fn key(&self) -> SqlValue {
        self.values().swap_remove(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub full_reg_no: String,
    pub name: String,
    pub branch: String,
    pub year: i64,
    pub email: String,
}

impl Record for Student {
    const KIND: &'static str = "students";
    const COLUMNS: &'static [&'static str] = &["full_reg_no", "name", "branch", "year", "email"];

    fn from_row(index: usize, row: &RawRow, rules: &Rules) -> Result<Self, RowError> {
        let full_reg_no = row.get("full_reg_no").to_text();
        let name = row.get("name").to_text();
        let branch = row.get("branch").to_text();
        let raw_year = row.get("year");
        let year = raw_year.to_int();
        let email = row.get("email").to_text();

        if full_reg_no.is_empty() {
            return Err(RowError::MissingKey {
                kind: Self::KIND,
                index,
                field: "full_reg_no",
            });
        }
        let year = match year {
            Some(year) if rules.year_range.contains(&year) => year,
            _ => {
                return Err(RowError::OutOfRange {
                    kind: Self::KIND,
                    index,
                    field: "year",
                    min: *rules.year_range.start(),
                    max: *rules.year_range.end(),
                    got: raw_year.to_string(),
                })
            }
        };
        rules.check_email(Self::KIND, index, &email)?;

        Ok(Self {
            full_reg_no,
            name,
            branch,
            year,
            email,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.full_reg_no.clone()),
            SqlValue::Text(self.name.clone()),
            SqlValue::Text(self.branch.clone()),
            SqlValue::Int(self.year),
            SqlValue::Text(self.email.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Faculty {
    pub full_reg_no: i64,
    pub name: String,
    pub email: String,
}

impl Record for Faculty {
    const KIND: &'static str = "faculty";
    const COLUMNS: &'static [&'static str] = &["full_reg_no", "name", "email"];

    fn from_row(index: usize, row: &RawRow, rules: &Rules) -> Result<Self, RowError> {
        let full_reg_no = row.get("full_reg_no").to_int();
        let name = row.get("name").to_text();
        let email = row.get("email").to_text();

        let Some(full_reg_no) = full_reg_no else {
            return Err(RowError::MissingKey {
                kind: Self::KIND,
                index,
                field: "full_reg_no",
            });
        };
        rules.check_email(Self::KIND, index, &email)?;

        Ok(Self {
            full_reg_no,
            name,
            email,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Int(self.full_reg_no),
            SqlValue::Text(self.name.clone()),
            SqlValue::Text(self.email.clone()),
        ]
    }
}
