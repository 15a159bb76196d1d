pub mod corpus;
pub mod corpus_models;
pub mod corpus_schema;
pub mod userdata;
pub mod userdata_models;
pub mod userdata_schema;

use std::path::Path;

use anyhow::{Context, Result, Error as AnyhowError};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use parking_lot::Mutex;

use crate::catalog;
use crate::logger::info;

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

pub use corpus::CorpusDbHandle;
pub use userdata::UserdataDbHandle;

/// Enables foreign keys (needed for ON DELETE CASCADE on memo_tags) and
/// a busy timeout on every pooled connection.
#[derive(Debug)]
struct ConnectionCustomizer;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

#[derive(Debug)]
pub struct DatabaseHandle {
    pool: SqlitePool,
    pub write_lock: Mutex<()>,
}

impl DatabaseHandle {
    pub fn new(database_url: &str) -> Result<Self> {
        info(&format!("DatabaseHandle::new() {}", database_url));
        let manager = ConnectionManager::new(database_url);
        let pool = Pool::builder()
            .max_size(5)
            .connection_customizer(Box::new(ConnectionCustomizer))
            .build(manager)
            .with_context(|| format!("Failed to create pool for: {}", database_url))?;

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    pub fn get_conn(&self) -> Result<DbConn> {
        self.pool.get().map_err(AnyhowError::from)
    }

    /// Performs a write operation on the database, guarded by the
    /// write_lock Mutex.
    pub fn do_write<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, diesel::result::Error>,
    {
        let _lock = self.write_lock.lock();
        let mut db_conn = self.pool.get()
            .context("Failed to get connection from pool for write")?;
        operation(&mut db_conn).map_err(AnyhowError::from)
    }

    /// Performs a read operation on the database.
    pub fn do_read<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, diesel::result::Error>,
    {
        let mut db_conn = self.pool.get()
            .context("Failed to get connection from pool for read")?;
        operation(&mut db_conn).map_err(AnyhowError::from)
    }
}

/// The two physically separate stores: the read-mostly corpus and the
/// frequently-written user data. Keeping them apart means bulk verse
/// writes never contend with memo and bookmark traffic.
#[derive(Debug)]
pub struct DbManager {
    pub corpus: CorpusDbHandle,
    pub userdata: UserdataDbHandle,
}

impl DbManager {
    /// Opens (creating if absent) both stores under `assets_dir` and
    /// runs the idempotent schema setup. A failure here is fatal for
    /// the application and is propagated to the caller.
    pub fn open(assets_dir: &Path) -> Result<Self> {
        let corpus_path = crate::corpus_db_path(&assets_dir.to_path_buf());
        let userdata_path = crate::userdata_db_path(&assets_dir.to_path_buf());

        let corpus_url = format!("sqlite://{}", corpus_path.to_str()
            .context("Corpus db path is not valid UTF-8")?);
        let userdata_url = format!("sqlite://{}", userdata_path.to_str()
            .context("Userdata db path is not valid UTF-8")?);

        let manager = Self {
            corpus: DatabaseHandle::new(&corpus_url)?,
            userdata: DatabaseHandle::new(&userdata_url)?,
        };

        manager.initialize()?;
        Ok(manager)
    }

    /// Idempotent: creates schema if absent, applies additive column
    /// upgrades, seeds the fixed book tables, and registers the primary
    /// bundled translation in the download ledger.
    pub fn initialize(&self) -> Result<()> {
        self.corpus.init_corpus_schema().context("Corpus store schema setup failed")?;
        self.userdata.init_userdata_schema().context("Userdata store schema setup failed")?;

        self.corpus.seed_books().context("Book seeding failed")?;

        if let Some(t) = catalog::get_translation(catalog::PRIMARY_BUNDLED_UID) {
            self.userdata
                .register_downloaded_version(t.uid, t.size_bytes, t.verse_count)
                .context("Failed to register bundled translation in the ledger")?;
        }

        Ok(())
    }
}

/// Returns the names of existing columns of a table, for the
/// additive-only schema upgrade on open.
pub(crate) fn existing_columns(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<Vec<String>, diesel::result::Error> {
    use diesel::sql_types::Text;

    #[derive(QueryableByName)]
    struct ColumnRow {
        #[diesel(sql_type = Text)]
        name: String,
    }

    let rows: Vec<ColumnRow> = diesel::sql_query(format!(
        "SELECT name FROM pragma_table_info('{}')",
        table
    ))
    .load(conn)?;

    Ok(rows.into_iter().map(|r| r.name).collect())
}

/// ALTER-adds any column from `wanted` that the table does not have
/// yet. Never drops or rewrites existing columns, so old on-device
/// databases upgrade in place without data loss.
pub(crate) fn ensure_columns(
    conn: &mut SqliteConnection,
    table: &str,
    wanted: &[(&str, &str)],
) -> Result<(), diesel::result::Error> {
    let existing = existing_columns(conn, table)?;

    for (name, decl) in wanted {
        if !existing.iter().any(|c| c == name) {
            info(&format!("Schema upgrade: adding {}.{}", table, name));
            conn.batch_execute(&format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                table, name, decl
            ))?;
        }
    }

    Ok(())
}
