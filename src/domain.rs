//! Domain models: the generated course document and the gamification rows.
//!
//! `CourseDoc` is the source of truth for nested structure (chapters and
//! subtopics); the scalar columns on the `courses` table are projections
//! recomputed from it on write. JSON field names are camelCase because the
//! blobs are shared with the frontend as-is.

use serde::{Deserialize, Serialize};

/// Points credited for completing a single chapter.
pub const CHAPTER_POINTS: i64 = 10;
/// One-time bonus credited when every chapter of a course is completed.
pub const COURSE_BONUS_POINTS: i64 = 50;
/// History reason recorded for the one-time course bonus. Also the key used
/// to detect that the bonus was already paid.
pub const COURSE_BONUS_REASON: &str = "Course completed bonus";

/// Full generated course document, persisted as a JSON blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CourseDoc {
    #[serde(default)]
    pub cid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub level: String,
    #[serde(default, rename = "includeVideo")]
    pub include_video: bool,
    #[serde(default, rename = "noOfChapters")]
    pub no_of_chapters: usize,
    #[serde(default, rename = "userEmail")]
    pub user_email: String,
    #[serde(default, rename = "bannerImagePrompt")]
    pub banner_image_prompt: String,
    #[serde(default, rename = "bannerImageUrl")]
    pub banner_image_url: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(rename = "chapterName")]
    pub chapter_name: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subtopic {
    pub title: String,
    #[serde(default)]
    pub theory: String,
    #[serde(default)]
    pub example: String,
    #[serde(default, rename = "handsOn")]
    pub hands_on: String,
    #[serde(default, rename = "videoUrl", skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// User-supplied parameters for AI course generation.
#[derive(Clone, Debug)]
pub struct CourseParams {
    pub name: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub include_video: bool,
    pub no_of_chapters: usize,
}

/// A chapter-completion event as received from the client.
#[derive(Clone, Debug)]
pub struct CompletionEvent {
    pub user_email: String,
    pub course_id: i64,
    pub chapter_index: i64,
    pub chapter_name: String,
}

/// What a single `record_chapter_completion` call did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// Points credited by this call for the chapter itself. 0 when the
    /// chapter was already completed (idempotent re-completion).
    pub points_earned: i64,
    /// Whether this call paid the one-time course-completion bonus.
    pub bonus_awarded: bool,
}

/// One `user_progress` row.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressRow {
    pub id: i64,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "courseId")]
    pub course_id: i64,
    #[serde(rename = "chapterIndex")]
    pub chapter_index: i64,
    #[serde(rename = "chapterName")]
    pub chapter_name: String,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
    #[serde(rename = "completedAt")]
    pub completed_at: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// One ranked leaderboard entry.
#[derive(Clone, Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub points: i64,
    #[serde(rename = "totalCoursesCompleted")]
    pub total_courses_completed: i64,
    #[serde(rename = "totalChaptersCompleted")]
    pub total_chapters_completed: i64,
}

/// One `points_history` ledger row.
#[derive(Clone, Debug, Serialize)]
pub struct HistoryRow {
    pub id: i64,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "pointsEarned")]
    pub points_earned: i64,
    pub reason: String,
    #[serde(rename = "courseId")]
    pub course_id: i64,
    #[serde(rename = "chapterIndex")]
    pub chapter_index: Option<i64>,
    #[serde(rename = "earnedAt")]
    pub earned_at: String,
}

/// Aggregate points view for one user: the accumulator row (or zeros),
/// recent history, and stats derived from `user_progress`.
#[derive(Clone, Debug, Serialize)]
pub struct PointsSummary {
    pub points: i64,
    #[serde(rename = "totalChaptersCompleted")]
    pub total_chapters_completed: i64,
    #[serde(rename = "totalCoursesCompleted")]
    pub total_courses_completed: i64,
    #[serde(rename = "coursesStarted")]
    pub courses_started: i64,
    #[serde(rename = "coursesCompleted")]
    pub courses_completed: i64,
    pub history: Vec<HistoryRow>,
}

/// Derive a display name from an email: the local part before `@`.
/// Used by the leaderboard when no explicit display name is on record.
pub fn display_name_for(email: &str) -> String {
    match email.split_once('@') {
        Some((local, _)) => local.to_string(),
        None => email.to_string(),
    }
}
