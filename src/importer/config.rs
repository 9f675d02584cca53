use std::path::PathBuf;

use clap::Parser;
use simplelog::LevelFilter;

use super::{err::ImportError, record::Rules, SHEETS};

pub const DEFAULT_WORKBOOK: &str = "users.xlsx";
pub const DEFAULT_DATABASE_URL: &str = "mysql://root@localhost:3306/lib_main";
pub const DEFAULT_EMAIL_DOMAIN: &str = "@poornima.edu.in";

/// Import student and faculty rosters from a spreadsheet into a SQL database.
///
/// Every option can also be set through the environment or a `.env` file.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// workbook (.xlsx/.xls/.ods) or a directory of <sheet>.csv files
    #[arg(env = "ROSTER_WORKBOOK", default_value = DEFAULT_WORKBOOK)]
    pub workbook: PathBuf,

    /// sqlite:// or mysql:// connection url
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// institutional email suffix every address must end with
    #[arg(long, env = "ROSTER_EMAIL_DOMAIN", default_value = DEFAULT_EMAIL_DOMAIN)]
    pub email_domain: String,

    /// import only these sheets (faculty, students); repeatable
    #[arg(long = "sheet", value_name = "NAME")]
    pub sheets: Vec<String>,

    #[arg(long, env = "ROSTER_LOG", default_value = "info")]
    pub log_level: LevelFilter,

    /// also write the log to this file
    #[arg(long, env = "ROSTER_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// only test the database connection and list its tables
    #[arg(long)]
    pub check: bool,

    /// print the stored student/faculty rows for this key as JSON and exit
    #[arg(long, value_name = "KEY", conflicts_with = "check")]
    pub show: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from(DEFAULT_WORKBOOK),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            sheets: Vec::new(),
            log_level: LevelFilter::Info,
            log_file: None,
            json: false,
            check: false,
            show: None,
        }
    }
}

impl Config {
    pub fn rules(&self) -> Rules {
        Rules::new(self.email_domain.clone())
    }

    /// Sheets to import in order. Defaults to every known sheet.
    pub fn sheets(&self) -> Result<Vec<String>, ImportError> {
        if self.sheets.is_empty() {
            return Ok(SHEETS.iter().map(|s| s.to_string()).collect());
        }
        let mut sheets = Vec::with_capacity(self.sheets.len());
        for sheet in &self.sheets {
            if !SHEETS.contains(&sheet.as_str()) {
                return Err(ImportError::UnknownSheet(sheet.clone()));
            }
            if !sheets.contains(sheet) {
                sheets.push(sheet.clone());
            }
        }
        Ok(sheets)
    }
}
