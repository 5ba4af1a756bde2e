//! libSQL backend for the binding store.
//!
//! Embedded SQLite-compatible file, one `users` table keyed by user id.
//! Connections are opened per operation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase};

use crate::db::{Binding, BindingStore};
use crate::error::DatabaseError;

const SCHEMA: &str = "\
    CREATE TABLE IF NOT EXISTS users (\
        user TEXT PRIMARY KEY, \
        namespace TEXT, \
        app TEXT\
    )";

/// libSQL-backed [`BindingStore`].
pub struct LibSqlBindingStore {
    db: Arc<LibSqlDatabase>,
}

impl LibSqlBindingStore {
    /// Open (or create) a local database file.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {}", e))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {}", e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Create a new connection to the database.
    ///
    /// Sets `PRAGMA busy_timeout = 5000` so a second writer waits instead of
    /// failing with "database is locked".
    pub async fn connect(&self) -> Result<Connection, DatabaseError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {}", e)))?;
        conn.query("PRAGMA busy_timeout = 5000", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to set busy_timeout: {}", e)))?;
        Ok(conn)
    }
}

/// Extract a text column, returning empty string for NULL.
fn get_text(row: &libsql::Row, idx: i32) -> String {
    row.get::<String>(idx).unwrap_or_default()
}

#[async_trait]
impl BindingStore for LibSqlBindingStore {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.execute(SCHEMA, ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("Failed to create users table: {}", e)))?;
        Ok(())
    }

    async fn get_binding(&self, user: &str) -> Result<Option<Binding>, DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT app, namespace FROM users WHERE user = ?1",
                libsql::params![user],
            )
            .await?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(Binding {
                user: user.to_string(),
                application: get_text(&row, 0),
                namespace: get_text(&row, 1),
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(e.to_string())),
        }
    }

    async fn put_binding(
        &self,
        user: &str,
        application: &str,
        namespace: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.execute(
            r#"
            INSERT INTO users (user, namespace, app) VALUES (?1, ?2, ?3)
            ON CONFLICT(user) DO UPDATE SET
                namespace = excluded.namespace,
                app = excluded.app
            "#,
            libsql::params![user, namespace, application],
        )
        .await?;
        Ok(())
    }
}
