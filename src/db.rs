//! Database handle and schema.
//!
//! A single SQLite connection behind a mutex is the whole "pool": every
//! operation takes the lock for its duration, and SQLite's transaction
//! semantics provide the all-or-nothing guarantees the award workflow needs.
//!
//! Migrations run once, explicitly, from `main` before the server accepts
//! requests — never lazily from request handlers.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

pub mod courses;
pub mod points;
pub mod progress;

/// Shared database handle. Cheap to clone.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn open(path: &str) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by the test suites.
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A poisoned lock only means another request panicked mid-query; the
    /// connection itself is still usable, so we take it anyway.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create the schema. Idempotent; safe to run on every startup.
    ///
    /// The composite unique key on `user_progress` is what lets the
    /// progress recorder use an atomic upsert instead of a racy
    /// check-then-insert.
    pub fn migrate(&self) -> rusqlite::Result<()> {
        let conn = self.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS courses (
                 id                INTEGER PRIMARY KEY AUTOINCREMENT,
                 cid               TEXT    NOT NULL UNIQUE,
                 name              TEXT    NOT NULL,
                 description       TEXT    NOT NULL DEFAULT '',
                 no_of_chapters    INTEGER NOT NULL,
                 include_video     INTEGER NOT NULL DEFAULT 0,
                 level             TEXT    NOT NULL,
                 category          TEXT    NOT NULL DEFAULT '',
                 course_json       TEXT    NOT NULL,
                 user_email        TEXT    NOT NULL,
                 banner_image_url  TEXT    NOT NULL DEFAULT '',
                 created_at        TEXT    NOT NULL
             );

             CREATE TABLE IF NOT EXISTS user_progress (
                 id             INTEGER PRIMARY KEY AUTOINCREMENT,
                 user_email     TEXT    NOT NULL,
                 course_id      INTEGER NOT NULL,
                 chapter_index  INTEGER NOT NULL,
                 chapter_name   TEXT    NOT NULL,
                 is_completed   INTEGER NOT NULL DEFAULT 0,
                 completed_at   TEXT,
                 created_at     TEXT    NOT NULL,
                 UNIQUE (user_email, course_id, chapter_index)
             );

             CREATE TABLE IF NOT EXISTS user_points (
                 user_email                TEXT    PRIMARY KEY,
                 points                    INTEGER NOT NULL DEFAULT 0,
                 total_chapters_completed  INTEGER NOT NULL DEFAULT 0,
                 total_courses_completed   INTEGER NOT NULL DEFAULT 0,
                 last_updated              TEXT    NOT NULL
             );

             CREATE TABLE IF NOT EXISTS points_history (
                 id             INTEGER PRIMARY KEY AUTOINCREMENT,
                 user_email     TEXT    NOT NULL,
                 points_earned  INTEGER NOT NULL,
                 reason         TEXT    NOT NULL,
                 course_id      INTEGER NOT NULL,
                 chapter_index  INTEGER,
                 earned_at      TEXT    NOT NULL
             );",
        )?;
        info!(target: "eduverse_backend", "database schema ready");
        Ok(())
    }
}

/// Timestamp used for every write. RFC 3339 so rows sort lexicographically.
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let db = Db::open_in_memory().expect("open");
        db.migrate().expect("first migrate");
        db.migrate().expect("second migrate");
    }

    #[test]
    fn duplicate_progress_tuple_is_rejected_by_schema() {
        let db = Db::open_in_memory().expect("open");
        db.migrate().expect("migrate");
        let conn = db.lock();
        let insert = "INSERT INTO user_progress
                      (user_email, course_id, chapter_index, chapter_name, is_completed, created_at)
                      VALUES ('a@x.com', 1, 0, 'Intro', 1, 'now')";
        conn.execute(insert, []).expect("first insert");
        assert!(conn.execute(insert, []).is_err(), "unique key should reject the duplicate");
    }
}
