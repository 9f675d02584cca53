use log::{error, info, warn};
use serde::Serialize;

pub use config::Config;
pub use db::Database;
pub use err::ImportError;
pub use report::ImportReport;

use db::{FacultyRow, StudentRow};
use record::{Faculty, Record, RawRow, Rules, Student};
use report::{ImportSummary, RowOutcome, SheetOutcome};
use workbook::Workbook;

mod cell;
pub mod config;
mod db;
mod err;
mod record;
mod report;
mod workbook;

/// the record kinds this tool knows, in import order
pub const SHEETS: [&str; 2] = [Faculty::KIND, Student::KIND];

/// Validate and upsert every row of one sheet.
///
/// Rows are handled strictly in order and each one ends as exactly one
/// insert, update or skip; nothing a single row does can stop the batch.
pub async fn import_rows<R: Record>(db: &mut Database, rules: &Rules, rows: &[RawRow]) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for (index, row) in rows.iter().enumerate() {
        let outcome = import_row::<R>(db, rules, index, row).await;
        summary.record(outcome);
    }
    summary
}

async fn import_row<R: Record>(
    db: &mut Database,
    rules: &Rules,
    index: usize,
    row: &RawRow,
) -> RowOutcome {
    let record = match R::from_row(index, row, rules) {
        Ok(record) => record,
        Err(e) => return RowOutcome::Skipped(e),
    };
    match db.upsert(&record).await {
        Ok(outcome) => RowOutcome::Written(outcome),
        Err(e) => RowOutcome::Skipped(err::RowError::Database {
            kind: R::KIND,
            index,
            message: e.to_string(),
        }),
    }
}

async fn import_sheet(
    db: &mut Database,
    rules: &Rules,
    book: &mut Workbook,
    sheet: &str,
) -> Result<SheetOutcome, ImportError> {
    let rows = match book.read_sheet(sheet) {
        Ok(Some(rows)) => rows,
        Ok(None) => {
            warn!("'{}' sheet not found in {}", sheet, book.path().display());
            return Ok(SheetOutcome::Missing);
        }
        Err(e @ (ImportError::IllegalWorkbook { .. } | ImportError::CsvParseError(_))) => {
            error!("{}", e);
            return Ok(SheetOutcome::Unreadable {
                reason: e.to_string(),
            });
        }
        Err(e) => return Err(e),
    };

    info!("Importing {} ...", sheet);
    let summary = if sheet == Faculty::KIND {
        import_rows::<Faculty>(db, rules, &rows).await
    } else if sheet == Student::KIND {
        import_rows::<Student>(db, rules, &rows).await
    } else {
        return Err(ImportError::UnknownSheet(sheet.to_string()));
    };
    info!(
        "{}: inserted {}, updated {}, skipped {}",
        sheet, summary.inserted, summary.updated, summary.skipped
    );
    Ok(SheetOutcome::Imported(summary))
}

/// Import the configured sheets of the workbook into an open database.
pub async fn run_import(
    db: &mut Database,
    book: &mut Workbook,
    rules: &Rules,
    sheets: &[String],
) -> Result<ImportReport, ImportError> {
    db.ensure_schema(rules).await;
    let mut report = ImportReport::default();
    for sheet in sheets {
        let outcome = import_sheet(db, rules, book, sheet).await?;
        report.push(sheet, outcome);
    }
    Ok(report)
}

/// Full run: open the workbook, connect, import, close.
///
/// The workbook is checked before connecting so a missing file never
/// touches the database.
pub async fn run(config: &Config) -> Result<ImportReport, ImportError> {
    let sheets = config.sheets()?;
    let mut book = Workbook::open(&config.workbook)?;
    let mut db = Database::connect(&config.database_url).await?;
    info!("Connected to {:?} database", db.backend());

    let report = run_import(&mut db, &mut book, &config.rules(), &sheets).await;
    finish(report, db.close().await)
}

/// Connect and list the tables, nothing else.
pub async fn check_connection(config: &Config) -> Result<Vec<String>, ImportError> {
    let mut db = Database::connect(&config.database_url).await?;
    let tables = db.list_tables().await.map_err(ImportError::from);
    finish(tables, db.close().await)
}

/// Stored rows matching one key
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lookup {
    pub key: String,
    pub student: Option<StudentRow>,
    /// only looked up when the key is an integer
    pub faculty: Option<FacultyRow>,
}

/// Read back the student and faculty rows stored under `key`.
pub async fn lookup(config: &Config, key: &str) -> Result<Lookup, ImportError> {
    let mut db = Database::connect(&config.database_url).await?;
    let found = find_rows(&mut db, key.trim()).await;
    finish(found, db.close().await)
}

async fn find_rows(db: &mut Database, key: &str) -> Result<Lookup, ImportError> {
    let student = db.fetch_student(key).await?;
    let faculty = match key.parse::<i64>() {
        Ok(id) => db.fetch_faculty(id).await?,
        Err(_) => None,
    };
    Ok(Lookup {
        key: key.to_string(),
        student,
        faculty,
    })
}

/// The work is done once `result` exists; a failed close is only logged.
fn finish<T>(result: Result<T, ImportError>, closed: Result<(), sqlx::Error>) -> Result<T, ImportError> {
    if let Err(e) = closed {
        warn!("Closing the database connection: {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::Data;
    use cell::CellValue;
    use db::tests::memory_db;
    use tempfile::tempdir;

    const DOMAIN: &str = "@poornima.edu.in";

    fn student_row(reg: &str, year: i64, email: &str) -> RawRow {
        RawRow::from_iter([
            ("full_reg_no", CellValue::Text(reg.to_string())),
            ("name", CellValue::Text("Asha".to_string())),
            ("branch", CellValue::Text("CSE".to_string())),
            ("year", CellValue::Float(year as f64)),
            ("email", CellValue::Text(email.to_string())),
        ])
    }

    async fn student_count(db: &mut Database) -> usize {
        match db {
            Database::Sqlite(conn) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
                    .fetch_one(&mut *conn)
                    .await
                    .unwrap() as usize
            }
            Database::MySql(_) => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_scenario_insert_and_missing_key() {
        let rules = Rules::new(DOMAIN);
        let mut db = memory_db(&rules).await;
        let rows = vec![
            student_row("R1", 3, "a@poornima.edu.in"),
            student_row("", 2, "b@poornima.edu.in"),
        ];

        let summary = import_rows::<Student>(&mut db, &rules, &rows).await;
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, vec!["students row 1: full_reg_no is required."]);
        assert_eq!(student_count(&mut db).await, 1);
    }

    #[tokio::test]
    async fn test_scenario_reimport_updates() {
        let rules = Rules::new(DOMAIN);
        let mut db = memory_db(&rules).await;
        let first = vec![student_row("R1", 3, "a@poornima.edu.in")];
        import_rows::<Student>(&mut db, &rules, &first).await;

        let second = vec![student_row("R1", 4, "a@poornima.edu.in")];
        let summary = import_rows::<Student>(&mut db, &rules, &second).await;
        assert_eq!((summary.inserted, summary.updated, summary.skipped), (0, 1, 0));

        let row = db.fetch_student("R1").await.unwrap().unwrap();
        assert_eq!(row.year, 4);
    }

    #[tokio::test]
    async fn test_same_row_twice_in_one_batch() {
        let rules = Rules::new(DOMAIN);
        let mut db = memory_db(&rules).await;
        let second = RawRow::from_iter([
            ("full_reg_no", CellValue::Text("R1".into())),
            ("name", CellValue::Text("Asha Rao".into())),
            ("branch", CellValue::Empty),
            ("year", CellValue::Text("5.0".into())),
            ("email", CellValue::Text("A@POORNIMA.EDU.IN".into())),
        ]);
        let rows = vec![student_row("R1", 3, "a@poornima.edu.in"), second];

        let summary = import_rows::<Student>(&mut db, &rules, &rows).await;
        assert_eq!((summary.inserted, summary.updated), (1, 1));

        let row = db.fetch_student("R1").await.unwrap().unwrap();
        assert_eq!(row.name, "Asha Rao");
        assert_eq!(row.branch, "");
        assert_eq!(row.year, 5);
        assert_eq!(row.email, "A@POORNIMA.EDU.IN");
    }

    #[tokio::test]
    async fn test_invalid_rows_never_reach_the_database() {
        let rules = Rules::new(DOMAIN);
        let mut db = memory_db(&rules).await;
        let rows = vec![
            student_row("R1", 0, "a@poornima.edu.in"),
            student_row("R2", 6, "b@poornima.edu.in"),
            student_row("R3", 2, "c@gmail.com"),
            student_row("   ", 2, "d@poornima.edu.in"),
            student_row("R5", 1, "e@poornima.edu.in"),
        ];

        let summary = import_rows::<Student>(&mut db, &rules, &rows).await;
        assert_eq!((summary.inserted, summary.skipped), (1, 4));
        assert_eq!(
            summary.errors,
            vec![
                "students row 0: year must be 1-5 (got: 0).",
                "students row 1: year must be 1-5 (got: 6).",
                "students row 2: email must end with @poornima.edu.in (got: c@gmail.com).",
                "students row 3: full_reg_no is required.",
            ]
        );
        assert_eq!(student_count(&mut db).await, 1);
    }

    #[tokio::test]
    async fn test_database_error_skips_row_and_continues() {
        let rules = Rules::new(DOMAIN);
        let mut db = memory_db(&rules).await;
        db.execute_raw("DROP TABLE faculty").await.unwrap();

        let rows = vec![
            RawRow::from_iter([
                ("full_reg_no", CellValue::Float(7.0)),
                ("email", CellValue::Text("x@poornima.edu.in".into())),
            ]),
            RawRow::from_iter([
                ("full_reg_no", CellValue::Float(8.0)),
                ("email", CellValue::Text("y@poornima.edu.in".into())),
            ]),
        ];
        let summary = import_rows::<Faculty>(&mut db, &rules, &rows).await;
        assert_eq!((summary.inserted, summary.updated, summary.skipped), (0, 0, 2));
        assert!(summary.errors[0].starts_with("faculty row 0: DB error -> "));
        assert!(summary.errors[0].contains("no such table"));
        assert!(summary.errors[1].starts_with("faculty row 1: DB error -> "));
    }

    #[tokio::test]
    async fn test_missing_sheet_does_not_affect_students() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("users.xlsx");
        workbook::tests::write_xlsx(
            &path,
            &[(
                "students",
                &["full_reg_no", "name", "branch", "year", "email"],
                vec![vec![
                    Data::String("R1".into()),
                    Data::String("Asha".into()),
                    Data::String("CSE".into()),
                    Data::Float(3.0),
                    Data::String("a@poornima.edu.in".into()),
                ]],
            )],
        );

        let rules = Rules::new(DOMAIN);
        let mut db = memory_db(&rules).await;
        let mut book = Workbook::open(&path).unwrap();
        let sheets: Vec<String> = SHEETS.iter().map(|s| s.to_string()).collect();
        let report = run_import(&mut db, &mut book, &rules, &sheets).await.unwrap();

        assert_eq!(report.sheet("faculty"), Some(&SheetOutcome::Missing));
        match report.sheet("students") {
            Some(SheetOutcome::Imported(summary)) => {
                assert_eq!((summary.inserted, summary.updated, summary.skipped), (1, 0, 0));
            }
            other => panic!("unexpected students outcome {:?}", other),
        }
        assert!(db.fetch_faculty(1).await.unwrap().is_none());
        assert!(report.to_string().contains("[WARN] 'faculty' sheet not found"));
    }

    #[tokio::test]
    async fn test_run_against_sqlite_file() {
        let temp_dir = tempdir().unwrap();
        let book_path = temp_dir.path().join("users.xlsx");
        workbook::tests::write_xlsx(
            &book_path,
            &[
                (
                    "faculty",
                    &["full_reg_no", "name", "email"],
                    vec![vec![
                        Data::Float(1042.0),
                        Data::String("Ravi".into()),
                        Data::String("ravi@poornima.edu.in".into()),
                    ]],
                ),
                (
                    "students",
                    &["full_reg_no", "year", "email"],
                    vec![vec![
                        Data::String("R1".into()),
                        Data::String("abc".into()),
                        Data::String("a@poornima.edu.in".into()),
                    ]],
                ),
            ],
        );
        let db_path = temp_dir.path().join("lib_main.db");
        let config = Config {
            workbook: book_path,
            database_url: format!("sqlite://{}", db_path.display()),
            ..Config::default()
        };

        let report = run(&config).await.unwrap();
        match report.sheet("faculty") {
            Some(SheetOutcome::Imported(summary)) => assert_eq!(summary.inserted, 1),
            other => panic!("unexpected faculty outcome {:?}", other),
        }
        match report.sheet("students") {
            Some(SheetOutcome::Imported(summary)) => assert_eq!(
                summary.errors,
                vec!["students row 0: year must be 1-5 (got: abc)."]
            ),
            other => panic!("unexpected students outcome {:?}", other),
        }

        let tables = check_connection(&config).await.unwrap();
        assert_eq!(tables, vec!["faculty".to_string(), "students".to_string()]);

        let found = lookup(&config, " 1042 ").await.unwrap();
        assert_eq!(found.key, "1042");
        assert!(found.student.is_none());
        let faculty = found.faculty.unwrap();
        assert_eq!((faculty.name.as_str(), faculty.email.as_str()), ("Ravi", "ravi@poornima.edu.in"));

        let found = lookup(&config, "R1").await.unwrap();
        assert!(found.student.is_none() && found.faculty.is_none());
        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(json["student"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_lookup_reads_stored_student() {
        let rules = Rules::new(DOMAIN);
        let mut db = memory_db(&rules).await;
        import_rows::<Student>(&mut db, &rules, &[student_row("R1", 3, "a@poornima.edu.in")]).await;

        let found = find_rows(&mut db, "R1").await.unwrap();
        assert!(found.faculty.is_none());
        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(json["student"]["fullRegNo"], "R1");
        assert_eq!(json["student"]["year"], 3);
    }

    #[tokio::test]
    async fn test_failed_schema_creation_skips_rows_and_continues() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("students.csv"),
            "full_reg_no,name,branch,year,email\nR1,Asha,CSE,3,a@poornima.edu.in\n",
        )
        .unwrap();

        let rules = Rules::new(DOMAIN);
        let mut db = Database::connect("sqlite::memory:").await.unwrap();
        // an index already owns the name, so creating the table fails
        db.execute_raw("CREATE TABLE holder (x)").await.unwrap();
        db.execute_raw("CREATE INDEX students ON holder (x)").await.unwrap();

        let mut book = Workbook::open(temp_dir.path()).unwrap();
        let sheets = vec!["students".to_string()];
        let report = run_import(&mut db, &mut book, &rules, &sheets).await.unwrap();

        match report.sheet("students") {
            Some(SheetOutcome::Imported(summary)) => {
                assert_eq!((summary.inserted, summary.updated, summary.skipped), (0, 0, 1));
                assert!(summary.errors[0].starts_with("students row 0: DB error -> "));
            }
            other => panic!("unexpected students outcome {:?}", other),
        }
    }

    #[test]
    fn test_close_failure_keeps_result() {
        let mut report = ImportReport::default();
        report.push("faculty", SheetOutcome::Missing);
        let kept = finish(Ok(report), Err(sqlx::Error::PoolClosed)).unwrap();
        assert_eq!(kept.sheet("faculty"), Some(&SheetOutcome::Missing));

        let failed: Result<ImportReport, _> = finish(
            Err(ImportError::UnknownSheet("staff".to_string())),
            Err(sqlx::Error::PoolClosed),
        );
        assert!(matches!(failed, Err(ImportError::UnknownSheet(_))));
    }

    #[tokio::test]
    async fn test_run_fails_before_connecting_when_workbook_missing() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("never.db");
        let config = Config {
            workbook: temp_dir.path().join("users.xlsx"),
            database_url: format!("sqlite://{}", db_path.display()),
            ..Config::default()
        };

        assert!(matches!(run(&config).await, Err(ImportError::InputNotFound(_))));
        assert!(!db_path.exists());
    }
}
