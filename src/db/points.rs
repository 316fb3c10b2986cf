//! Leaderboard and per-user points summary. Read-only.

use rusqlite::{params, OptionalExtension};
use tracing::instrument;

use super::Db;
use crate::domain::{display_name_for, HistoryRow, LeaderboardEntry, PointsSummary};
use crate::error::ApiError;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 100;

impl Db {
    /// Ranked users by points. Users with zero points are excluded; ties on
    /// points are broken by chapters completed, and the rank follows that
    /// full ordering, so ranks are contiguous from 1 with no duplicates.
    #[instrument(level = "debug", skip(self))]
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT user_email, points, total_chapters_completed, total_courses_completed,
                    ROW_NUMBER() OVER (ORDER BY points DESC, total_chapters_completed DESC) AS row_rank
             FROM user_points
             WHERE points > 0
             ORDER BY points DESC, total_chapters_completed DESC
             LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit as i64], |r| {
                let user_email: String = r.get("user_email")?;
                Ok(LeaderboardEntry {
                    rank: r.get("row_rank")?,
                    display_name: display_name_for(&user_email),
                    user_email,
                    points: r.get("points")?,
                    total_courses_completed: r.get("total_courses_completed")?,
                    total_chapters_completed: r.get("total_chapters_completed")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Accumulator row (or zeros), the last 10 ledger entries newest-first,
    /// and stats derived from the progress table.
    #[instrument(level = "debug", skip(self))]
    pub fn points_summary(&self, user_email: &str) -> Result<PointsSummary, ApiError> {
        let conn = self.lock();

        let (points, total_chapters_completed, total_courses_completed) = conn
            .query_row(
                "SELECT points, total_chapters_completed, total_courses_completed
                 FROM user_points WHERE user_email = ?1",
                params![user_email],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?
            .unwrap_or((0, 0, 0));

        let mut stmt = conn.prepare(
            "SELECT id, user_email, points_earned, reason, course_id, chapter_index, earned_at
             FROM points_history
             WHERE user_email = ?1
             ORDER BY earned_at DESC, id DESC
             LIMIT 10",
        )?;
        let history = stmt
            .query_map(params![user_email], |r| {
                Ok(HistoryRow {
                    id: r.get("id")?,
                    user_email: r.get("user_email")?,
                    points_earned: r.get("points_earned")?,
                    reason: r.get("reason")?,
                    course_id: r.get("course_id")?,
                    chapter_index: r.get("chapter_index")?,
                    earned_at: r.get("earned_at")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let (courses_started, courses_completed) = conn.query_row(
            "SELECT COUNT(DISTINCT course_id),
                    COUNT(DISTINCT CASE WHEN is_completed = 1 THEN course_id END)
             FROM user_progress WHERE user_email = ?1",
            params![user_email],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        Ok(PointsSummary {
            points,
            total_chapters_completed,
            total_courses_completed,
            courses_started,
            courses_completed,
            history,
        })
    }
}
