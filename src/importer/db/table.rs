use serde::Serialize;

use crate::importer::record::{Faculty, Record, Rules, Student};

use super::Backend;

/// a stored `students` row
#[derive(sqlx::FromRow, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub full_reg_no: String,
    pub name: String,
    pub branch: String,
    pub year: i64,
    pub email: String,
}

/// a stored `faculty` row
#[derive(sqlx::FromRow, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FacultyRow {
    pub full_reg_no: i64,
    pub name: String,
    pub email: String,
}

/// `CREATE TABLE IF NOT EXISTS` for every record kind, faculty first
pub fn create_statements(backend: Backend, rules: &Rules) -> Vec<String> {
    let email_check = email_check(backend, &rules.email_domain);
    let (min, max) = (rules.year_range.start(), rules.year_range.end());
    match backend {
        Backend::Sqlite => vec![
            format!(
                r"CREATE TABLE IF NOT EXISTS {} (
                    full_reg_no INTEGER NOT NULL PRIMARY KEY,
                    name TEXT,
                    email TEXT CHECK ({email_check})
                );",
                Faculty::KIND
            ),
            format!(
                r"CREATE TABLE IF NOT EXISTS {} (
                    full_reg_no TEXT NOT NULL PRIMARY KEY,
                    name TEXT,
                    branch TEXT,
                    year INTEGER CHECK (year BETWEEN {min} AND {max}),
                    email TEXT CHECK ({email_check})
                );",
                Student::KIND
            ),
        ],
        Backend::MySql => vec![
            format!(
                r"CREATE TABLE IF NOT EXISTS `{}` (
                    `full_reg_no` BIGINT NOT NULL,
                    `name` VARCHAR(250),
                    `email` VARCHAR(255) CHECK ({email_check}),
                    PRIMARY KEY (`full_reg_no`)
                ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;",
                Faculty::KIND
            ),
            format!(
                r"CREATE TABLE IF NOT EXISTS `{}` (
                    `full_reg_no` VARCHAR(20) NOT NULL,
                    `name` VARCHAR(100),
                    `branch` VARCHAR(50),
                    `year` INT CHECK (`year` BETWEEN {min} AND {max}),
                    `email` VARCHAR(255) CHECK ({email_check}),
                    PRIMARY KEY (`full_reg_no`)
                ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;",
                Student::KIND
            ),
        ],
    }
}

/// insert-or-update by primary key, placeholders in `R::COLUMNS` order
pub fn upsert_statement<R: Record>(backend: Backend) -> String {
    let (key, rest) = (R::COLUMNS[0], &R::COLUMNS[1..]);
    let columns = R::COLUMNS.join(", ");
    let placeholders = vec!["?"; R::COLUMNS.len()].join(", ");
    match backend {
        Backend::Sqlite => {
            let set = rest
                .iter()
                .map(|c| format!("{c} = excluded.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders}) \
                 ON CONFLICT ({key}) DO UPDATE SET {set};",
                R::KIND
            )
        }
        Backend::MySql => {
            let set = rest
                .iter()
                .map(|c| format!("{c} = VALUES({c})"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO `{}` ({columns}) VALUES ({placeholders}) \
                 ON DUPLICATE KEY UPDATE {set};",
                R::KIND
            )
        }
    }
}

pub fn exists_statement<R: Record>() -> String {
    format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?)",
        R::KIND,
        R::COLUMNS[0]
    )
}

pub fn select_statement<R: Record>() -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = ?",
        R::COLUMNS.join(", "),
        R::KIND,
        R::COLUMNS[0]
    )
}

fn email_check(backend: Backend, domain: &str) -> String {
    match backend {
        // sqlite LIKE already ignores ASCII case
        Backend::Sqlite => format!("email LIKE '%{}'", domain.replace('\'', "''")),
        Backend::MySql => format!(
            "LOWER(`email`) LIKE '%{}'",
            domain
                .to_lowercase()
                .replace('\\', "\\\\")
                .replace('\'', "''")
        ),
    }
}
