use std::fmt;

use serde::Serialize;

use super::{db::UpsertOutcome, err::RowError};

/// What happened to one row
#[derive(Debug, PartialEq)]
pub enum RowOutcome {
    Written(UpsertOutcome),
    Skipped(RowError),
}

/// Counts for one imported sheet
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    /// one message per skipped row, in row order
    pub errors: Vec<String>,
}

impl ImportSummary {
    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Written(UpsertOutcome::Inserted) => self.inserted += 1,
            RowOutcome::Written(UpsertOutcome::Updated) => self.updated += 1,
            RowOutcome::Skipped(err) => {
                self.skipped += 1;
                self.errors.push(err.to_string());
            }
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SheetOutcome {
    Imported(ImportSummary),
    /// the workbook has no such sheet
    Missing,
    /// the sheet exists but could not be read
    Unreadable { reason: String },
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SheetReport {
    pub sheet: String,
    #[serde(flatten)]
    pub outcome: SheetOutcome,
}

/// Per-sheet results of one run, in import order
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub sheets: Vec<SheetReport>,
}

impl ImportReport {
    pub fn push(&mut self, sheet: &str, outcome: SheetOutcome) {
        self.sheets.push(SheetReport {
            sheet: sheet.to_string(),
            outcome,
        });
    }

    #[cfg(test)]
    pub fn sheet(&self, name: &str) -> Option<&SheetOutcome> {
        self.sheets
            .iter()
            .find(|s| s.sheet == name)
            .map(|s| &s.outcome)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for SheetReport { sheet, outcome } in &self.sheets {
            match outcome {
                SheetOutcome::Imported(summary) => {
                    writeln!(f, "\n[INFO] Imported {} ...", sheet)?;
                    writeln!(
                        f,
                        "  Inserted: {}, Updated: {}, Skipped: {}",
                        summary.inserted, summary.updated, summary.skipped
                    )?;
                    if !summary.errors.is_empty() {
                        writeln!(f, "  Issues:")?;
                        for e in &summary.errors {
                            writeln!(f, "   - {}", e)?;
                        }
                    }
                }
                SheetOutcome::Missing => {
                    writeln!(f, "[WARN] '{}' sheet not found in workbook.", sheet)?
                }
                SheetOutcome::Unreadable { reason } => {
                    writeln!(f, "[WARN] '{}' sheet could not be read: {}", sheet, reason)?
                }
            }
        }
        Ok(())
    }
}
