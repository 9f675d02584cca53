use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use log::debug;

use super::{cell::CellValue, err::ImportError, record::RawRow};

/// Source of named sheets.
///
/// Either a spreadsheet file, or a directory where every `<sheet>.csv` is
/// one sheet.
pub enum Workbook {
    Spreadsheet {
        path: PathBuf,
        sheets: Sheets<BufReader<File>>,
    },
    CsvDir {
        path: PathBuf,
    },
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self, ImportError> {
        if !path.exists() {
            return Err(ImportError::InputNotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            return Ok(Workbook::CsvDir {
                path: path.to_path_buf(),
            });
        }
        let sheets = open_workbook_auto(path).map_err(|e| ImportError::IllegalWorkbook {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Workbook::Spreadsheet {
            path: path.to_path_buf(),
            sheets,
        })
    }

    pub fn path(&self) -> &Path {
        match self {
            Workbook::Spreadsheet { path, .. } | Workbook::CsvDir { path } => path,
        }
    }

    pub fn sheet_names(&self) -> Result<Vec<String>, ImportError> {
        match self {
            Workbook::Spreadsheet { sheets, .. } => Ok(sheets.sheet_names()),
            Workbook::CsvDir { path } => {
                let mut names = Vec::new();
                for entry in std::fs::read_dir(path)? {
                    let file = entry?.path();
                    if !file.is_file() || file.extension().and_then(|e| e.to_str()) != Some("csv") {
                        continue;
                    }
                    if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
                        names.push(stem.to_string());
                    }
                }
                names.sort();
                Ok(names)
            }
        }
    }

    /// Rows of the named sheet, `None` when the workbook has no such sheet.
    ///
    /// The first row is the header; it is not returned and not counted in
    /// row indices.
    pub fn read_sheet(&mut self, name: &str) -> Result<Option<Vec<RawRow>>, ImportError> {
        if !self.sheet_names()?.iter().any(|s| s == name) {
            return Ok(None);
        }
        let rows = match self {
            Workbook::Spreadsheet { path, sheets } => {
                let range = sheets
                    .worksheet_range(name)
                    .map_err(|e| ImportError::IllegalWorkbook {
                        path: path.clone(),
                        reason: format!("sheet '{}': {}", name, e),
                    })?;
                rows_from_range(&range)
            }
            Workbook::CsvDir { path } => rows_from_csv(&path.join(format!("{}.csv", name)))?,
        };
        debug!("sheet '{}' has {} data rows", name, rows.len());
        Ok(Some(rows))
    }
}

fn rows_from_range(range: &Range<Data>) -> Vec<RawRow> {
    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Vec::new(),
    };
    rows.map(|cells| {
        header
            .iter()
            .zip(cells)
            .filter(|(column, _)| !column.is_empty())
            .map(|(column, cell)| (column.clone(), CellValue::from(cell)))
            .collect::<RawRow>()
    })
    .collect()
}

fn rows_from_csv(path: &Path) -> Result<Vec<RawRow>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let header: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(
            header
                .iter()
                .zip(record.iter())
                .filter(|(column, _)| !column.is_empty())
                .map(|(column, field)| (column.clone(), CellValue::from(field)))
                .collect::<RawRow>(),
        );
    }
    Ok(rows)
}
