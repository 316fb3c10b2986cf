//! Public request/response structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! Field names stay camelCase on the wire. Inputs whose absence must map to
//! a 400 (not an axum 422 rejection) use Option fields and are validated in
//! the handlers.

use serde::{Deserialize, Serialize};

use crate::domain::{CourseDoc, LeaderboardEntry, ProgressRow};

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

//
// Courses
//

#[derive(Debug, Deserialize)]
pub struct CourseQuery {
    pub cid: Option<String>,
}

#[derive(Serialize)]
pub struct CourseOut {
    pub course: CourseDoc,
}

#[derive(Serialize)]
pub struct CoursesOut {
    pub courses: Vec<CourseDoc>,
}

#[derive(Deserialize)]
pub struct CreateCourseIn {
    pub course: CourseDoc,
}

#[derive(Serialize)]
pub struct CreateCourseOut {
    pub success: bool,
    #[serde(rename = "courseId")]
    pub course_id: i64,
}

#[derive(Deserialize)]
pub struct DeleteCourseIn {
    pub cid: String,
}

#[derive(Serialize)]
pub struct DeleteCourseOut {
    pub success: bool,
}

//
// Generation
//

#[derive(Debug, Deserialize)]
pub struct GenerateCourseIn {
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
    #[serde(rename = "noOfChapters")]
    pub no_of_chapters: usize,
}

#[derive(Serialize)]
pub struct GenerateCourseOut {
    pub course: CourseDoc,
}

//
// Progress & points
//

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    #[serde(rename = "userEmail")]
    pub user_email: Option<String>,
    #[serde(rename = "courseId")]
    pub course_id: Option<i64>,
}

#[derive(Serialize)]
pub struct ProgressOut {
    pub progress: Vec<ProgressRow>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteChapterIn {
    #[serde(rename = "userEmail")]
    pub user_email: Option<String>,
    #[serde(rename = "courseId")]
    pub course_id: Option<i64>,
    #[serde(rename = "chapterIndex")]
    pub chapter_index: Option<i64>,
    #[serde(rename = "chapterName")]
    pub chapter_name: Option<String>,
}

#[derive(Serialize)]
pub struct CompleteChapterOut {
    pub success: bool,
    pub message: String,
    #[serde(rename = "pointsEarned")]
    pub points_earned: i64,
}

#[derive(Debug, Deserialize)]
pub struct PointsQuery {
    #[serde(rename = "userEmail")]
    pub user_email: Option<String>,
}

#[derive(Serialize)]
pub struct LeaderboardOut {
    pub leaderboard: Vec<LeaderboardEntry>,
}
