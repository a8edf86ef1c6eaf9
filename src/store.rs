// Copyright 2026 Vocab Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use anyhow::Result;
use fs2::FileExt;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use sha2::Digest;
use sha2::Sha256;
use time::OffsetDateTime;
use tracing::debug;
use tracing::info;

use crate::catalog::CatalogLayout;
use crate::clock;
use crate::schema;
use crate::schema::Migration;

pub struct Store {
    pub conn: Connection,
    pub path: PathBuf,
    layout: CatalogLayout,
    lock: Option<StoreLock>,
}

struct StoreLock {
    _file: File,
    path: PathBuf,
    mode: StoreMode,
}

impl StoreLock {
    fn new(file: File, path: PathBuf, mode: StoreMode) -> Self {
        Self {
            _file: file,
            path,
            mode,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StoreMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub words: i64,
    pub examples: i64,
    pub bookmarks: i64,
    pub exposures: i64,
    pub auto_pools: i64,
    pub injected_items: i64,
    pub db_size_bytes: u64,
}

#[derive(Debug)]
pub struct IntegrityReport {
    pub status: String,
    pub schema_version: i64,
    pub stats: StoreStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub from: i64,
    pub to: i64,
    pub applied: Vec<i64>,
}

impl Store {
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("store already exists at {}", path.display());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create store dir {}", parent.display()))?;
        }
        let _lock = Self::acquire_lock(path, StoreMode::ReadWrite)?;
        let conn = Self::open_connection(path, StoreMode::ReadWrite)?;
        Self::apply_pragmas(&conn, StoreMode::ReadWrite)?;
        let report = Self::migrate(&conn, schema::MIGRATIONS)?;
        info!(
            path = %path.display(),
            from = report.from,
            to = report.to,
            applied = ?report.applied,
            "initialized store"
        );
        Ok(())
    }

    pub fn open(path: &Path, mode: StoreMode) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("store not found at {}; run `vocab init` first", path.display());
        }
        let mut lock = Self::acquire_lock(path, mode)?;
        let mut conn = Self::open_connection(path, mode)?;
        Self::apply_pragmas(&conn, mode)?;
        if matches!(mode, StoreMode::ReadWrite) {
            Self::migrate(&conn, schema::MIGRATIONS)?;
            return Self::finish(conn, path.to_path_buf(), Some(lock));
        }

        let version = Self::schema_version(&conn)?;
        if version != schema::latest_version(schema::MIGRATIONS) {
            drop(conn);
            drop(lock);
            let lock_rw = Self::acquire_lock(path, StoreMode::ReadWrite)?;
            let conn_rw = Self::open_connection(path, StoreMode::ReadWrite)?;
            Self::apply_pragmas(&conn_rw, StoreMode::ReadWrite)?;
            Self::migrate(&conn_rw, schema::MIGRATIONS)?;
            drop(conn_rw);
            drop(lock_rw);

            lock = Self::acquire_lock(path, StoreMode::ReadOnly)?;
            conn = Self::open_connection(path, StoreMode::ReadOnly)?;
            Self::apply_pragmas(&conn, StoreMode::ReadOnly)?;
        }

        Self::finish(conn, path.to_path_buf(), Some(lock))
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory store")?;
        Self::apply_pragmas(&conn, StoreMode::ReadWrite)?;
        Self::migrate(&conn, schema::MIGRATIONS)?;
        Self::finish(conn, PathBuf::from(":memory:"), None)
    }

    /// Opens a read-write handle without the advisory file lock, so several
    /// handles in one process can share a store file.
    #[cfg(test)]
    pub fn attach(path: &Path) -> Result<Self> {
        let conn = Self::open_connection(path, StoreMode::ReadWrite)?;
        Self::apply_pragmas(&conn, StoreMode::ReadWrite)?;
        Self::migrate(&conn, schema::MIGRATIONS)?;
        Self::finish(conn, path.to_path_buf(), None)
    }

    fn finish(conn: Connection, path: PathBuf, lock: Option<StoreLock>) -> Result<Self> {
        let layout = CatalogLayout::resolve(&conn)?;
        debug!(?layout, path = %path.display(), "resolved catalog layout");
        Ok(Self {
            conn,
            path,
            layout,
            lock,
        })
    }

    pub fn layout(&self) -> &CatalogLayout {
        &self.layout
    }

    fn open_connection(path: &Path, mode: StoreMode) -> Result<Connection> {
        let flags = match mode {
            StoreMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            StoreMode::ReadWrite => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        };
        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("open {}", path.display()))?;
        conn.busy_timeout(Duration::from_millis(5000))
            .context("set busy timeout")?;
        Ok(conn)
    }

    fn apply_pragmas(conn: &Connection, mode: StoreMode) -> Result<()> {
        let mut batch = String::from("PRAGMA foreign_keys=ON;");
        if matches!(mode, StoreMode::ReadWrite) {
            batch = format!("PRAGMA journal_mode=DELETE;\nPRAGMA synchronous=NORMAL;\n{batch}");
        }
        conn.execute_batch(&batch).context("apply pragmas")?;
        Ok(())
    }

    fn lock_path_for(path: &Path) -> Result<PathBuf> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        let hash = hex::encode(hasher.finalize());
        let mut dir = std::env::temp_dir();
        dir.push("vocab");
        fs::create_dir_all(&dir).with_context(|| format!("create lock dir {}", dir.display()))?;
        Ok(dir.join(format!("vocab-{hash}.lock")))
    }

    fn acquire_lock(path: &Path, mode: StoreMode) -> Result<StoreLock> {
        let lock_path = Self::lock_path_for(path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("open lock file {}", lock_path.display()))?;
        let deadline = Instant::now() + Duration::from_millis(5000);
        loop {
            let locked = match mode {
                StoreMode::ReadOnly => file.try_lock_shared().map_err(|err| err.to_string()),
                StoreMode::ReadWrite => file.try_lock_exclusive().map_err(|err| err.to_string()),
            };
            match locked {
                Ok(()) => return Ok(StoreLock::new(file, lock_path, mode)),
                Err(_) if Instant::now() >= deadline => {
                    let mode_label = match mode {
                        StoreMode::ReadOnly => "read",
                        StoreMode::ReadWrite => "write",
                    };
                    anyhow::bail!(
                        "store is locked for {mode_label} access; another process may be using {}",
                        path.display()
                    );
                }
                Err(_) => {
                    sleep(Duration::from_millis(50));
                }
            }
        }
    }

    fn bootstrap(conn: &Connection) -> Result<()> {
        conn.execute_batch("CREATE TABLE IF NOT EXISTS meta (\n  key TEXT PRIMARY KEY,\n  value TEXT\n);")
            .context("create meta table")?;
        Ok(())
    }

    fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .context("set meta")?;
        Ok(())
    }

    pub(crate) fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                params![name],
                |row| row.get(0),
            )
            .context("check table")?;
        Ok(count > 0)
    }

    /// Column names of `table`, empty when the table does not exist.
    pub(crate) fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .context("table info")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    pub(crate) fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
        Ok(Self::table_columns(conn, table)?
            .iter()
            .any(|name| name == column))
    }

    pub fn schema_version(conn: &Connection) -> Result<i64> {
        if !Self::table_exists(conn, "meta")? {
            return Ok(0);
        }
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key='schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .context("read schema_version")?;
        Ok(value.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0))
    }

    pub fn current_version(&self) -> Result<i64> {
        Self::schema_version(&self.conn)
    }

    /// Applies every step newer than the stored version, in order. Each step
    /// commits together with its version bump, so a failing step leaves the
    /// marker at the last completed one and is retried in full next time.
    pub fn migrate(conn: &Connection, definitions: &[Migration]) -> Result<MigrationReport> {
        if definitions
            .windows(2)
            .any(|pair| pair[0].version >= pair[1].version)
        {
            anyhow::bail!("migration versions must be strictly ascending");
        }
        let target = schema::latest_version(definitions);

        Self::bootstrap(conn)?;
        let from = Self::schema_version(conn)?;
        if from > target {
            anyhow::bail!(
                "store schema version {} is newer than supported {}",
                from,
                target
            );
        }

        let applied_at = clock::timestamp(OffsetDateTime::now_utc())?;
        let mut report = MigrationReport {
            from,
            to: from,
            applied: Vec::new(),
        };
        for step in definitions.iter().filter(|step| step.version > from) {
            let tx = conn
                .unchecked_transaction()
                .with_context(|| format!("begin migration {}", step.version))?;
            (step.apply)(&tx, &applied_at)
                .with_context(|| format!("migration {} ({}) failed", step.version, step.name))?;
            Self::set_meta(&tx, "schema_version", &step.version.to_string())?;
            tx.commit()
                .with_context(|| format!("commit migration {}", step.version))?;
            info!(version = step.version, name = step.name, "applied migration");
            report.to = step.version;
            report.applied.push(step.version);
        }
        Ok(report)
    }

    fn count(&self, table: &str) -> Result<i64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("count {table}"))
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let db_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        Ok(StoreStats {
            words: self.count("words")?,
            examples: self.count("examples")?,
            bookmarks: self.count("bookmarks")?,
            exposures: self.count("exposures")?,
            auto_pools: self.count("today_auto_pool")?,
            injected_items: self.count("today_injected_items")?,
            db_size_bytes,
        })
    }

    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let status: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .context("integrity_check")?;
        let schema_version = self.current_version()?;
        let stats = self.stats()?;
        Ok(IntegrityReport {
            status,
            schema_version,
            stats,
        })
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            let path = lock.path.clone();
            let mode = lock.mode;
            drop(lock);
            if matches!(mode, StoreMode::ReadWrite) {
                let _ = fs::remove_file(path);
            }
        }
    }
}
