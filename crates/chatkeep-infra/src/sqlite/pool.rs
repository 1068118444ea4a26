//! Connection pools for the chat message database.
//!
//! Chat turns are appended one at a time while the sidebar and history views
//! read in parallel, so writes go through a single connection and reads get
//! their own read-only pool. The message schema in `migrations/` is applied
//! on open.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Read-only connections for sidebar, preview and history queries.
const READER_CONNECTIONS: u32 = 8;

/// How long a statement waits on the writer's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Reader and writer pools over one SQLite message database.
///
/// The writer has exactly one connection, which serializes the
/// collection-registration + insert transaction of every appended turn.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (or create) the message database at `database_url` and bring its
    /// schema up to date.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let (write_opts, read_opts) = connect_options(database_url)?;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        // The reader opens read-only, so the schema must exist first
        let migrator = sqlx::migrate!("../../migrations");
        migrator.run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(read_opts)
            .await?;

        tracing::debug!(
            migrations = migrator.iter().count(),
            readers = READER_CONNECTIONS,
            "Message database open"
        );
        Ok(Self { reader, writer })
    }

    /// Close both pools, waiting for in-flight statements to finish.
    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }
}

/// Writer and reader options for `database_url`: WAL journal, foreign keys
/// on, a shared busy timeout. The reader copy is read-only.
fn connect_options(
    database_url: &str,
) -> Result<(SqliteConnectOptions, SqliteConnectOptions), sqlx::Error> {
    let writer = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    let reader = writer.clone().read_only(true);
    Ok((writer, reader))
}
