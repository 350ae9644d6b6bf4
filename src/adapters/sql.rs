use crate::domain::model::Customer;
use crate::domain::ports::CustomerRepository;
use crate::utils::error::{Result, ShowcaseError};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "SalesLT";

/// SQLite-backed customer table. The database file is attached under the
/// `SalesLT` schema so queries address `SalesLT.Customer`.
pub struct SqliteCustomerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCustomerRepository {
    pub fn open(database_path: &str) -> Result<Self> {
        // ATTACH would silently create an empty file.
        if !Path::new(database_path).is_file() {
            return Err(ShowcaseError::InvalidConfigValueError {
                field: "sql.database_path".to_string(),
                value: database_path.to_string(),
                reason: "Database file does not exist".to_string(),
            });
        }

        let conn = Connection::open_in_memory()?;
        conn.execute(&format!("ATTACH DATABASE ?1 AS {}", SCHEMA), [database_path])?;
        tracing::debug!("Attached {} as schema {}", database_path, SCHEMA);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn query_customers(conn: &Connection, limit: usize) -> Result<Vec<Customer>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT CustomerID, FirstName, LastName FROM {}.Customer LIMIT ?1",
        SCHEMA
    ))?;
    let customers = stmt
        .query_map([limit as i64], |row| {
            Ok(Customer {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(customers)
}

#[async_trait]
impl CustomerRepository for SqliteCustomerRepository {
    async fn first_customers(&self, limit: usize) -> Result<Vec<Customer>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| ShowcaseError::TaskError {
                message: "SQL connection lock poisoned".to_string(),
            })?;
            query_customers(&conn, limit)
        })
        .await
        .map_err(|e| ShowcaseError::TaskError {
            message: format!("SQL query task failed: {}", e),
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_database(rows: usize) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let conn = Connection::open(file.path()).unwrap();
        conn.execute_batch(
            "CREATE TABLE Customer (
                CustomerID INTEGER PRIMARY KEY,
                FirstName TEXT NOT NULL,
                LastName TEXT NOT NULL
            );",
        )
        .unwrap();
        for i in 1..=rows {
            conn.execute(
                "INSERT INTO Customer (CustomerID, FirstName, LastName) VALUES (?1, ?2, ?3)",
                rusqlite::params![i as i64, format!("First{}", i), format!("Last{}", i)],
            )
            .unwrap();
        }
        file
    }

    #[tokio::test]
    async fn test_reads_at_most_limit_rows() {
        let db = seeded_database(25);
        let repo = SqliteCustomerRepository::open(db.path().to_str().unwrap()).unwrap();

        let customers = repo.first_customers(10).await.unwrap();

        assert_eq!(customers.len(), 10);
        assert_eq!(
            customers[0],
            Customer {
                id: 1,
                first_name: "First1".to_string(),
                last_name: "Last1".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_fewer_rows_than_limit() {
        let db = seeded_database(3);
        let repo = SqliteCustomerRepository::open(db.path().to_str().unwrap()).unwrap();
        assert_eq!(repo.first_customers(10).await.unwrap().len(), 3);
    }

    #[test]
    fn test_missing_file_is_rejected_and_not_created() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing.db");

        let result = SqliteCustomerRepository::open(path.to_str().unwrap());

        assert!(matches!(
            result,
            Err(ShowcaseError::InvalidConfigValueError { .. })
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_table_is_sql_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let repo = SqliteCustomerRepository::open(file.path().to_str().unwrap()).unwrap();
        let err = repo.first_customers(10).await.unwrap_err();
        assert!(matches!(err, ShowcaseError::SqlError(_)));
    }
}
