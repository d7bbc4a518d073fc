//! The SQLite implementation of [`SnapshotStore`].

use std::path::Path;

use gradewatch_core::{snapshot::GradeSnapshot, store::SnapshotStore};
use rusqlite::OptionalExtension as _;

use crate::{
  Result,
  encode::{
    RawRecord, decode_dt, decode_terms, encode_dt, encode_status, encode_terms,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A snapshot store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SnapshotStore impl ──────────────────────────────────────────────────────

impl SnapshotStore for SqliteStore {
  type Error = crate::Error;

  async fn get_last_snapshot(
    &self,
    username: &str,
  ) -> Result<Option<GradeSnapshot>> {
    let user = username.to_owned();

    let raw: Option<(String, String, Vec<RawRecord>)> = self
      .conn
      .call(move |conn| {
        let header: Option<(String, String)> = conn
          .query_row(
            "SELECT fetched_at, failed_terms FROM snapshots WHERE username = ?1",
            rusqlite::params![user],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;
        let Some((fetched_at, failed_terms)) = header else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT term_id, term_name, course_code, course_name, ects_credits,
                  coursework_score, final_exam_score, total_score,
                  numeric_grade, status
           FROM grade_records
           WHERE username = ?1
           ORDER BY term_id, course_code",
        )?;
        let records = stmt
          .query_map(rusqlite::params![user], |row| {
            Ok(RawRecord {
              term_id:          row.get(0)?,
              term_name:        row.get(1)?,
              course_code:      row.get(2)?,
              course_name:      row.get(3)?,
              ects_credits:     row.get(4)?,
              coursework_score: row.get(5)?,
              final_exam_score: row.get(6)?,
              total_score:      row.get(7)?,
              numeric_grade:    row.get(8)?,
              status:           row.get(9)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((fetched_at, failed_terms, records)))
      })
      .await?;

    let Some((fetched_at, failed_terms, raws)) = raw else {
      return Ok(None);
    };
    let records = raws
      .into_iter()
      .map(|r| r.into_record(username))
      .collect::<Result<Vec<_>>>()?;

    Ok(Some(GradeSnapshot {
      username: username.to_owned(),
      fetched_at: decode_dt(&fetched_at)?,
      records,
      failed_terms: decode_terms(&failed_terms)?,
      empty_terms: Vec::new(),
    }))
  }

  async fn put_snapshot(&self, snapshot: &GradeSnapshot) -> Result<()> {
    let user = snapshot.username.clone();
    let fetched_at = encode_dt(snapshot.fetched_at);
    let failed_terms = encode_terms(&snapshot.failed_terms)?;
    let records = snapshot.records.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM grade_records WHERE username = ?1",
          rusqlite::params![user],
        )?;
        tx.execute(
          "INSERT INTO snapshots (username, fetched_at, failed_terms)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(username) DO UPDATE SET
             fetched_at   = excluded.fetched_at,
             failed_terms = excluded.failed_terms",
          rusqlite::params![user, fetched_at, failed_terms],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO grade_records (
               username, term_id, term_name, course_code, course_name,
               ects_credits, coursework_score, final_exam_score, total_score,
               numeric_grade, status
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          )?;
          for r in &records {
            stmt.execute(rusqlite::params![
              user,
              r.term_id,
              r.term_name,
              r.course_code,
              r.course_name,
              r.ects_credits,
              r.coursework_score,
              r.final_exam_score,
              r.total_score,
              r.numeric_grade,
              encode_status(r.status),
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}
