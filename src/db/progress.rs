//! Progress recorder: the chapter-completion award transaction.
//!
//! All writes for one completion event happen inside a single SQLite
//! transaction; any failure rolls the whole thing back. The composite
//! unique key on (user_email, course_id, chapter_index) turns the old
//! check-then-insert pattern into one atomic upsert.

use rusqlite::{params, OptionalExtension, Row};
use tracing::{info, instrument};

use super::{now, Db};
use crate::domain::{
    CompletionEvent, CompletionOutcome, ProgressRow, CHAPTER_POINTS, COURSE_BONUS_POINTS,
    COURSE_BONUS_REASON,
};
use crate::error::ApiError;

impl<'a> TryFrom<&'a Row<'a>> for ProgressRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_email: row.get("user_email")?,
            course_id: row.get("course_id")?,
            chapter_index: row.get("chapter_index")?,
            chapter_name: row.get("chapter_name")?,
            is_completed: row.get("is_completed")?,
            completed_at: row.get("completed_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl Db {
    /// Record a chapter completion and award points, atomically.
    ///
    /// First completion of a chapter credits `CHAPTER_POINTS` and appends a
    /// history row. A repeat completion only refreshes the completion
    /// timestamp: `points_earned` comes back 0 and no history is written.
    /// When the user's completed-chapter count reaches the course's declared
    /// total, a one-time `COURSE_BONUS_POINTS` bonus is credited, guarded by
    /// the ledger so it can never be paid twice.
    #[instrument(
        level = "info",
        skip(self, ev),
        fields(user = %ev.user_email, course = ev.course_id, chapter = ev.chapter_index)
    )]
    pub fn record_chapter_completion(
        &self,
        ev: &CompletionEvent,
    ) -> Result<CompletionOutcome, ApiError> {
        if ev.user_email.trim().is_empty() || ev.chapter_name.trim().is_empty() {
            return Err(ApiError::Validation("Missing required fields".into()));
        }
        if ev.chapter_index < 0 {
            return Err(ApiError::Validation("chapterIndex must be non-negative".into()));
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let ts = now();

        // Whether points flow depends on prior completion state, read inside
        // the same transaction that writes.
        let already_completed: bool = tx
            .query_row(
                "SELECT is_completed FROM user_progress
                 WHERE user_email = ?1 AND course_id = ?2 AND chapter_index = ?3",
                params![ev.user_email, ev.course_id, ev.chapter_index],
                |r| r.get(0),
            )
            .optional()?
            .unwrap_or(false);

        tx.execute(
            "INSERT INTO user_progress
             (user_email, course_id, chapter_index, chapter_name, is_completed, completed_at, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
             ON CONFLICT (user_email, course_id, chapter_index)
             DO UPDATE SET is_completed = 1, completed_at = excluded.completed_at",
            params![ev.user_email, ev.course_id, ev.chapter_index, ev.chapter_name, ts],
        )?;

        if already_completed {
            tx.commit()?;
            info!(target: "progress", user = %ev.user_email, course = ev.course_id,
                  chapter = ev.chapter_index, "re-completion, no points awarded");
            return Ok(CompletionOutcome { points_earned: 0, bonus_awarded: false });
        }

        // Fixed chapter award into the accumulator row.
        tx.execute(
            "INSERT INTO user_points
             (user_email, points, total_chapters_completed, total_courses_completed, last_updated)
             VALUES (?1, ?2, 1, 0, ?3)
             ON CONFLICT (user_email) DO UPDATE SET
                 points = points + ?2,
                 total_chapters_completed = total_chapters_completed + 1,
                 last_updated = ?3",
            params![ev.user_email, CHAPTER_POINTS, ts],
        )?;

        tx.execute(
            "INSERT INTO points_history
             (user_email, points_earned, reason, course_id, chapter_index, earned_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                ev.user_email,
                CHAPTER_POINTS,
                format!("Completed chapter: {}", ev.chapter_name),
                ev.course_id,
                ev.chapter_index,
                ts
            ],
        )?;

        // Bonus evaluation. An unknown course id skips it without failing
        // the whole call.
        let declared_total: Option<i64> = tx
            .query_row(
                "SELECT no_of_chapters FROM courses WHERE id = ?1",
                params![ev.course_id],
                |r| r.get(0),
            )
            .optional()?;

        let mut bonus_awarded = false;
        if let Some(total) = declared_total {
            let completed: i64 = tx.query_row(
                "SELECT COUNT(*) FROM user_progress
                 WHERE user_email = ?1 AND course_id = ?2 AND is_completed = 1",
                params![ev.user_email, ev.course_id],
                |r| r.get(0),
            )?;

            if completed == total {
                let already_paid = tx
                    .prepare(
                        "SELECT 1 FROM points_history
                         WHERE user_email = ?1 AND course_id = ?2 AND reason = ?3",
                    )?
                    .exists(params![ev.user_email, ev.course_id, COURSE_BONUS_REASON])?;

                if !already_paid {
                    tx.execute(
                        "UPDATE user_points SET
                             points = points + ?1,
                             total_courses_completed = total_courses_completed + 1,
                             last_updated = ?2
                         WHERE user_email = ?3",
                        params![COURSE_BONUS_POINTS, ts, ev.user_email],
                    )?;
                    tx.execute(
                        "INSERT INTO points_history
                         (user_email, points_earned, reason, course_id, earned_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![ev.user_email, COURSE_BONUS_POINTS, COURSE_BONUS_REASON, ev.course_id, ts],
                    )?;
                    bonus_awarded = true;
                }
            }
        }

        tx.commit()?;
        info!(target: "progress", user = %ev.user_email, course = ev.course_id,
              chapter = ev.chapter_index, points = CHAPTER_POINTS, bonus = bonus_awarded,
              "chapter completion recorded");
        Ok(CompletionOutcome { points_earned: CHAPTER_POINTS, bonus_awarded })
    }

    /// All progress rows for a user/course pair, chapter index ascending.
    #[instrument(level = "debug", skip(self))]
    pub fn get_progress(
        &self,
        user_email: &str,
        course_id: i64,
    ) -> Result<Vec<ProgressRow>, ApiError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_email, course_id, chapter_index, chapter_name,
                    is_completed, completed_at, created_at
             FROM user_progress
             WHERE user_email = ?1 AND course_id = ?2
             ORDER BY chapter_index",
        )?;
        let rows = stmt
            .query_map(params![user_email, course_id], |row| ProgressRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::courses::tests::{sample_course, test_db};
    use crate::db::Db;

    const USER: &str = "a@x.com";

    fn event(course_id: i64, chapter: i64) -> CompletionEvent {
        CompletionEvent {
            user_email: USER.into(),
            course_id,
            chapter_index: chapter,
            chapter_name: format!("Chapter {chapter}"),
        }
    }

    fn points_of(db: &Db, user: &str) -> (i64, i64, i64) {
        db.points_summary(user)
            .map(|s| (s.points, s.total_chapters_completed, s.total_courses_completed))
            .expect("summary")
    }

    // Counts the ledger table itself; the summary's history view is capped
    // at 10 rows and would mask over-awarding beyond that.
    fn history_count(db: &Db, user: &str) -> i64 {
        let conn = db.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM points_history WHERE user_email = ?1",
            params![user],
            |r| r.get(0),
        )
        .expect("history count")
    }

    #[test]
    fn first_completion_awards_ten_points_and_one_history_row() {
        let db = test_db();
        let course_id = db.create_course(&sample_course("c-1", 3)).expect("create");

        let out = db.record_chapter_completion(&event(course_id, 0)).expect("record");
        assert_eq!(out, CompletionOutcome { points_earned: 10, bonus_awarded: false });

        assert_eq!(points_of(&db, USER), (10, 1, 0));
        let summary = db.points_summary(USER).expect("summary");
        assert_eq!(summary.history.len(), 1);
        assert_eq!(summary.history[0].reason, "Completed chapter: Chapter 0");
        assert_eq!(summary.history[0].chapter_index, Some(0));
    }

    #[test]
    fn repeat_completion_is_idempotent() {
        let db = test_db();
        let course_id = db.create_course(&sample_course("c-1", 3)).expect("create");

        db.record_chapter_completion(&event(course_id, 0)).expect("first");
        let out = db.record_chapter_completion(&event(course_id, 0)).expect("second");
        assert_eq!(out, CompletionOutcome { points_earned: 0, bonus_awarded: false });

        assert_eq!(points_of(&db, USER), (10, 1, 0));
        assert_eq!(history_count(&db, USER), 1);

        // The row itself was refreshed, not duplicated.
        let rows = db.get_progress(USER, course_id).expect("progress");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_completed);
    }

    #[test]
    fn completing_all_chapters_pays_the_bonus_exactly_once() {
        let db = test_db();
        let course_id = db.create_course(&sample_course("c-1", 3)).expect("create");

        db.record_chapter_completion(&event(course_id, 0)).expect("ch0");
        db.record_chapter_completion(&event(course_id, 1)).expect("ch1");
        assert_eq!(points_of(&db, USER), (20, 2, 0));

        let last = db.record_chapter_completion(&event(course_id, 2)).expect("ch2");
        assert!(last.bonus_awarded);

        // 30 chapter points + 50 bonus, one completed course, 4 ledger rows.
        assert_eq!(points_of(&db, USER), (80, 3, 1));
        assert_eq!(history_count(&db, USER), 4);
        let summary = db.points_summary(USER).expect("summary");
        assert!(summary.history.iter().any(|h| h.reason == COURSE_BONUS_REASON
            && h.points_earned == 50
            && h.chapter_index.is_none()));

        // Re-triggering the final-chapter path must not pay again.
        let again = db.record_chapter_completion(&event(course_id, 2)).expect("repeat");
        assert!(!again.bonus_awarded);
        assert_eq!(points_of(&db, USER), (80, 3, 1));
        assert_eq!(history_count(&db, USER), 4);
    }

    #[test]
    fn unknown_course_id_still_awards_chapter_points() {
        let db = test_db();
        // No course row at all: bonus evaluation is skipped, call succeeds.
        let out = db.record_chapter_completion(&event(999, 0)).expect("record");
        assert_eq!(out, CompletionOutcome { points_earned: 10, bonus_awarded: false });
        assert_eq!(points_of(&db, USER), (10, 1, 0));
    }

    #[test]
    fn missing_fields_are_validation_errors() {
        let db = test_db();
        let mut ev = event(1, 0);
        ev.user_email = String::new();
        assert!(matches!(
            db.record_chapter_completion(&ev),
            Err(ApiError::Validation(_))
        ));

        let mut ev = event(1, 0);
        ev.chapter_name = String::new();
        assert!(matches!(
            db.record_chapter_completion(&ev),
            Err(ApiError::Validation(_))
        ));

        let ev = event(1, -1);
        assert!(matches!(
            db.record_chapter_completion(&ev),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn progress_listing_is_ordered_by_chapter_index() {
        let db = test_db();
        let course_id = db.create_course(&sample_course("c-1", 3)).expect("create");
        db.record_chapter_completion(&event(course_id, 2)).expect("ch2");
        db.record_chapter_completion(&event(course_id, 0)).expect("ch0");

        let rows = db.get_progress(USER, course_id).expect("progress");
        let indices: Vec<i64> = rows.iter().map(|r| r.chapter_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }
}
