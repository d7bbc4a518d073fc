//! SQL schema for the gradewatch SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per user: the header of the last stored snapshot.
CREATE TABLE IF NOT EXISTS snapshots (
    username      TEXT PRIMARY KEY,
    fetched_at    TEXT NOT NULL,   -- ISO 8601 UTC
    failed_terms  TEXT NOT NULL DEFAULT '[]'
);

-- Replaced wholesale together with the snapshot row; never updated in place.
CREATE TABLE IF NOT EXISTS grade_records (
    username          TEXT NOT NULL REFERENCES snapshots(username) ON DELETE CASCADE,
    term_id           TEXT NOT NULL,
    term_name         TEXT NOT NULL,
    course_code       TEXT NOT NULL,
    course_name       TEXT NOT NULL,
    ects_credits      REAL,
    coursework_score  TEXT NOT NULL,
    final_exam_score  TEXT NOT NULL,
    total_score       TEXT NOT NULL,
    numeric_grade     REAL,
    status            TEXT NOT NULL,   -- 'published' | 'not_published' | 'unknown'
    PRIMARY KEY (username, term_id, course_code)
);

PRAGMA user_version = 1;
";
