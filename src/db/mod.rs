use crate::config::Config;
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// SQLite caps bound parameters per statement; stay well below the old 999 limit.
const SUBSET_CHUNK: usize = 500;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        if let Some(parent) = std::path::Path::new(&config.database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::open(&config.database_url)
    }

    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection mutex poisoned"))
    }

    /// Run a store call on the blocking pool so the gateway tasks keep moving.
    pub async fn run_blocking<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    pub fn execute_init(&self) -> anyhow::Result<()> {
        info!("Database: Initializing schema...");
        let sql = "
            CREATE TABLE IF NOT EXISTS issued_tracks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                issued_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        ";
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    pub fn is_issued(&self, url: &str) -> anyhow::Result<bool> {
        let conn = self.lock()?;
        let exists = conn
            .prepare("SELECT 1 FROM issued_tracks WHERE url = ?1")?
            .exists([url])?;
        Ok(exists)
    }

    /// Records `url` as issued. Marking an already issued url is a no-op.
    pub fn mark_issued(&self, url: &str) -> anyhow::Result<()> {
        self.claim(url)?;
        Ok(())
    }

    /// Inserts `url` unless it is already present. Returns the new row id only
    /// for the caller whose insert created the row, so two concurrent
    /// selections can never both own the same url.
    pub fn claim(&self, url: &str) -> anyhow::Result<Option<i64>> {
        debug!("Database: Claiming {}", url);
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO issued_tracks (url, issued_at) VALUES (?1, CURRENT_TIMESTAMP)",
            (url,),
        )?;
        if inserted == 1 {
            Ok(Some(conn.last_insert_rowid()))
        } else {
            Ok(None)
        }
    }

    /// Drops a claim whose delivery never went out. Only the row created by
    /// that claim is removed; AUTOINCREMENT keeps ids unique across clears, so
    /// a later claim of the same url survives.
    pub fn release(&self, claim_id: i64) -> anyhow::Result<()> {
        debug!("Database: Releasing claim {}", claim_id);
        let conn = self.lock()?;
        conn.execute("DELETE FROM issued_tracks WHERE id = ?1", (claim_id,))?;
        Ok(())
    }

    pub fn clear_all(&self) -> anyhow::Result<usize> {
        let conn = self.lock()?;
        let count = conn.execute("DELETE FROM issued_tracks", [])?;
        Ok(count)
    }

    /// Returns the members of `urls` that are already issued.
    pub fn issued_subset(&self, urls: &[String]) -> anyhow::Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut issued = HashSet::new();

        for chunk in urls.chunks(SUBSET_CHUNK) {
            let sql = format!(
                "SELECT url FROM issued_tracks WHERE url IN ({})",
                vec!["?"; chunk.len()].join(", ")
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                row.get::<_, String>(0)
            })?;
            for row in rows {
                issued.insert(row?);
            }
        }

        debug!(
            "Database: {} of {} candidates already issued",
            issued.len(),
            urls.len()
        );
        Ok(issued)
    }

    pub fn issued_count(&self) -> anyhow::Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM issued_tracks", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}
