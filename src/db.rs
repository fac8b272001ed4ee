use crate::error::{Result, TrackerError};
use crate::models::{LastKnownChapter, TitleName};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Persistence consumed by the update detector and the API.
///
/// Every call is its own transaction; callers re-read state instead of
/// holding anything across two calls.
pub trait SubscriptionStore: Send + Sync {
    /// Last chapters of subscribed titles whose URL starts with `adapter_domain`.
    fn get_tracked_titles(&self, adapter_domain: &str) -> Result<Vec<LastKnownChapter>>;
    fn get_last_chapter(&self, title_url: &str) -> Result<Option<LastKnownChapter>>;
    fn set_last_chapter(&self, title_url: &str, chapter_url: &str) -> Result<()>;
    fn get_subscribers(&self, title_url: &str) -> Result<Vec<String>>;

    /// Subscribe `user_id` to a title. `last_chapter_url` seeds the title's
    /// last chapter only when none is recorded yet.
    fn subscribe(
        &self,
        user_id: &str,
        title_url: &str,
        name: &str,
        last_chapter_url: Option<&str>,
    ) -> Result<()>;
    fn unsubscribe(&self, user_id: &str, title_url: &str) -> Result<bool>;

    /// Titles `user_id` follows; every filter must match the name or URL.
    fn get_subs(&self, user_id: &str, filters: &[String]) -> Result<Vec<TitleName>>;
    fn erase_subs(&self, user_id: &str) -> Result<usize>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| TrackerError::StoreLock)
    }
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    log::info!("Creating tables if not exists...");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS subscriptions (
            url TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY (url, user_id)
        );
        CREATE TABLE IF NOT EXISTS last_chapters (
            url TEXT PRIMARY KEY,
            chapter_url TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS manga_names (
            url TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id);",
    )?;

    log::info!("Tables ensured.");
    Ok(())
}

impl SubscriptionStore for SqliteStore {
    fn get_tracked_titles(&self, adapter_domain: &str) -> Result<Vec<LastKnownChapter>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT lc.url, lc.chapter_url FROM last_chapters lc
             WHERE substr(lc.url, 1, length(?1)) = ?1
               AND EXISTS (SELECT 1 FROM subscriptions s WHERE s.url = lc.url)
             ORDER BY lc.url",
        )?;
        let rows = stmt.query_map(params![adapter_domain], |row| {
            Ok(LastKnownChapter {
                title_url: row.get(0)?,
                chapter_url: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_last_chapter(&self, title_url: &str) -> Result<Option<LastKnownChapter>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT url, chapter_url FROM last_chapters WHERE url = ?1",
                params![title_url],
                |row| {
                    Ok(LastKnownChapter {
                        title_url: row.get(0)?,
                        chapter_url: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn set_last_chapter(&self, title_url: &str, chapter_url: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO last_chapters (url, chapter_url) VALUES (?1, ?2)
             ON CONFLICT(url) DO UPDATE SET chapter_url = excluded.chapter_url",
            params![title_url, chapter_url],
        )?;
        Ok(())
    }

    fn get_subscribers(&self, title_url: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT user_id FROM subscriptions WHERE url = ?1 ORDER BY user_id")?;
        let rows = stmt.query_map(params![title_url], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    fn subscribe(
        &self,
        user_id: &str,
        title_url: &str,
        name: &str,
        last_chapter_url: Option<&str>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO subscriptions (url, user_id) VALUES (?1, ?2)",
            params![title_url, user_id],
        )?;
        tx.execute(
            "INSERT INTO manga_names (url, name) VALUES (?1, ?2)
             ON CONFLICT(url) DO UPDATE SET name = excluded.name",
            params![title_url, name],
        )?;
        // An empty chapter URL means "nothing seen yet"; the next listing
        // that shows the title will report it as updated.
        tx.execute(
            "INSERT OR IGNORE INTO last_chapters (url, chapter_url) VALUES (?1, ?2)",
            params![title_url, last_chapter_url.unwrap_or("")],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn unsubscribe(&self, user_id: &str, title_url: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM subscriptions WHERE url = ?1 AND user_id = ?2",
            params![title_url, user_id],
        )?;
        Ok(removed > 0)
    }

    fn get_subs(&self, user_id: &str, filters: &[String]) -> Result<Vec<TitleName>> {
        let conn = self.conn()?;
        let mut sql = String::from(
            "SELECT n.url, n.name FROM manga_names n
             JOIN subscriptions s ON s.url = n.url
             WHERE s.user_id = ?1",
        );
        let patterns: Vec<String> = filters
            .iter()
            .map(|f| format!("%{}%", f.to_lowercase()))
            .collect();
        for i in 0..patterns.len() {
            let p = i + 2;
            sql.push_str(&format!(
                " AND (lower(n.name) LIKE ?{p} OR lower(n.url) LIKE ?{p})"
            ));
        }
        sql.push_str(" ORDER BY n.name");

        let mut values: Vec<&dyn rusqlite::ToSql> = vec![&user_id];
        values.extend(patterns.iter().map(|p| p as &dyn rusqlite::ToSql));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(values.as_slice(), |row| {
            Ok(TitleName {
                title_url: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn erase_subs(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM subscriptions WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(removed)
    }
}
