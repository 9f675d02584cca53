use std::fmt;

use calamine::Data;

/// A loosely typed spreadsheet cell.
///
/// Kept as read from the sheet so that blank, malformed and zero cells stay
/// distinguishable until a field asks for a concrete type.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    /// Trimmed string form, `""` for an empty cell
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            other => other.to_string().trim().to_string(),
        }
    }

    /// Integer form, `None` for blank or malformed cells.
    ///
    /// Anything after the first `.` is dropped, so `"3.0"` and `3.7` both
    /// read as 3.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            CellValue::Empty => None,
            CellValue::Int(i) => Some(*i),
            other => {
                let text = other.to_string();
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                text.split('.').next()?.parse().ok()
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, "no value"),
            CellValue::Int(i) => write!(f, "{}", i),
            // 3.0 prints as "3"
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(v) => CellValue::Float(*v),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(field: &str) -> Self {
        if field.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(field.to_string())
        }
    }
}
