mod table;

use std::str::FromStr;

use log::{debug, error};
use sqlx::{
    mysql::MySqlConnection,
    sqlite::{SqliteConnectOptions, SqliteConnection},
    ConnectOptions, Connection,
};

pub use table::{FacultyRow, StudentRow};

use super::{
    err::ImportError,
    record::{Faculty, Record, Rules, SqlValue, Student},
};

/// which SQL dialect the connection speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    MySql,
}

/// Whether an upsert created the row or overwrote an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// The single connection used for the whole run.
///
/// Every statement runs outside a transaction and commits on its own.
pub enum Database {
    Sqlite(SqliteConnection),
    MySql(MySqlConnection),
}

/// a write on an existing key is an update, anything else an insert
pub fn upsert_outcome(existed: bool) -> UpsertOutcome {
    if existed {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Inserted
    }
}

impl Database {
    /// connect by url scheme, `sqlite:` or `mysql:`/`mariadb:`
    pub async fn connect(url: &str) -> Result<Self, ImportError> {
        if url.starts_with("sqlite:") {
            let options = SqliteConnectOptions::from_str(url)
                .map_err(ImportError::ConnectError)?
                .create_if_missing(true);
            let conn = options.connect().await.map_err(ImportError::ConnectError)?;
            Ok(Database::Sqlite(conn))
        } else if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            let conn = MySqlConnection::connect(url)
                .await
                .map_err(ImportError::ConnectError)?;
            Ok(Database::MySql(conn))
        } else {
            Err(ImportError::UnsupportedDatabase(url.to_string()))
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Database::Sqlite(_) => Backend::Sqlite,
            Database::MySql(_) => Backend::MySql,
        }
    }

    /// Create the record tables if they are absent.
    ///
    /// Failures are logged only: a compatible table usually exists already,
    /// and if it does not every row will be skipped with the database error.
    pub async fn ensure_schema(&mut self, rules: &Rules) {
        for sql in table::create_statements(self.backend(), rules) {
            let result = match self {
                Database::Sqlite(conn) => sqlx::query(&sql).execute(&mut *conn).await.map(|_| ()),
                Database::MySql(conn) => sqlx::query(&sql).execute(&mut *conn).await.map(|_| ()),
            };
            if let Err(e) = result {
                error!("Creating tables: {}", e);
            }
        }
    }

    /// Insert the record, or overwrite every non-key column if its key exists.
    ///
    /// Whether the key existed is checked before the write: sqlite counts one
    /// change for both branches of `ON CONFLICT`, and sqlx asks MySQL for
    /// found rows, so an unchanged duplicate also reports 1 there.
    pub async fn upsert<R: Record>(&mut self, record: &R) -> Result<UpsertOutcome, sqlx::Error> {
        let sql = table::upsert_statement::<R>(self.backend());
        let exists_sql = table::exists_statement::<R>();
        let existed = match self {
            Database::Sqlite(conn) => {
                let exists = match record.key() {
                    SqlValue::Text(s) => sqlx::query_scalar::<_, i64>(&exists_sql).bind(s),
                    SqlValue::Int(i) => sqlx::query_scalar::<_, i64>(&exists_sql).bind(i),
                };
                let existed = exists.fetch_one(&mut *conn).await? != 0;

                let mut query = sqlx::query(&sql);
                for value in record.values() {
                    query = match value {
                        SqlValue::Text(s) => query.bind(s),
                        SqlValue::Int(i) => query.bind(i),
                    };
                }
                query.execute(&mut *conn).await?;
                existed
            }
            Database::MySql(conn) => {
                let exists = match record.key() {
                    SqlValue::Text(s) => sqlx::query_scalar::<_, i64>(&exists_sql).bind(s),
                    SqlValue::Int(i) => sqlx::query_scalar::<_, i64>(&exists_sql).bind(i),
                };
                let existed = exists.fetch_one(&mut *conn).await? != 0;

                let mut query = sqlx::query(&sql);
                for value in record.values() {
                    query = match value {
                        SqlValue::Text(s) => query.bind(s),
                        SqlValue::Int(i) => query.bind(i),
                    };
                }
                let result = query.execute(&mut *conn).await?;
                debug!("{} upsert affected {} rows", R::KIND, result.rows_affected());
                existed
            }
        };
        Ok(upsert_outcome(existed))
    }

    pub async fn fetch_student(
        &mut self,
        full_reg_no: &str,
    ) -> Result<Option<StudentRow>, sqlx::Error> {
        let sql = table::select_statement::<Student>();
        match self {
            Database::Sqlite(conn) => {
                sqlx::query_as(&sql)
                    .bind(full_reg_no)
                    .fetch_optional(&mut *conn)
                    .await
            }
            Database::MySql(conn) => {
                sqlx::query_as(&sql)
                    .bind(full_reg_no)
                    .fetch_optional(&mut *conn)
                    .await
            }
        }
    }

    pub async fn fetch_faculty(
        &mut self,
        full_reg_no: i64,
    ) -> Result<Option<FacultyRow>, sqlx::Error> {
        let sql = table::select_statement::<Faculty>();
        match self {
            Database::Sqlite(conn) => {
                sqlx::query_as(&sql)
                    .bind(full_reg_no)
                    .fetch_optional(&mut *conn)
                    .await
            }
            Database::MySql(conn) => {
                sqlx::query_as(&sql)
                    .bind(full_reg_no)
                    .fetch_optional(&mut *conn)
                    .await
            }
        }
    }

    /// names of the tables visible on this connection
    pub async fn list_tables(&mut self) -> Result<Vec<String>, sqlx::Error> {
        match self {
            Database::Sqlite(conn) => {
                sqlx::query_scalar(
                    r"SELECT name FROM sqlite_master
                      WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                      ORDER BY name;",
                )
                .fetch_all(&mut *conn)
                .await
            }
            Database::MySql(conn) => {
                sqlx::query_scalar(
                    r"SELECT CAST(table_name AS CHAR) FROM information_schema.tables
                      WHERE table_schema = DATABASE()
                      ORDER BY table_name;",
                )
                .fetch_all(&mut *conn)
                .await
            }
        }
    }

    /// Release the connection
    pub async fn close(self) -> Result<(), sqlx::Error> {
        match self {
            Database::Sqlite(conn) => conn.close().await,
            Database::MySql(conn) => conn.close().await,
        }
    }

    #[cfg(test)]
    pub async fn execute_raw(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        match self {
            Database::Sqlite(conn) => sqlx::query(sql).execute(&mut *conn).await.map(|_| ()),
            Database::MySql(conn) => sqlx::query(sql).execute(&mut *conn).await.map(|_| ()),
        }
    }
}
