//! HTTP endpoint handlers. These are thin wrappers: validate input, call
//! into the database or the Gemini client, map failures through `ApiError`.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, instrument, warn};

use crate::domain::{CompletionEvent, CourseParams, PointsSummary};
use crate::error::ApiError;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
    Json(HealthOut { ok: true })
}

/// One course by `cid` (404 when absent), or the whole catalog.
#[instrument(level = "info", skip(state), fields(cid = %q.cid.clone().unwrap_or_default()))]
pub async fn http_get_courses(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CourseQuery>,
) -> Result<Response, ApiError> {
    match q.cid {
        Some(cid) => {
            let course = state
                .db
                .get_course(&cid)?
                .ok_or(ApiError::NotFound("course"))?;
            Ok(Json(CourseOut { course }).into_response())
        }
        None => {
            let courses = state.db.list_courses()?;
            info!(target: "courses", count = courses.len(), "catalog listed");
            Ok(Json(CoursesOut { courses }).into_response())
        }
    }
}

#[instrument(level = "info", skip(state, body), fields(cid = %body.course.cid, name = %body.course.name))]
pub async fn http_post_course(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCourseIn>,
) -> Result<Json<CreateCourseOut>, ApiError> {
    let course_id = state.db.create_course(&body.course)?;
    Ok(Json(CreateCourseOut { success: true, course_id }))
}

#[instrument(level = "info", skip(state, body), fields(cid = %body.cid))]
pub async fn http_delete_course(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DeleteCourseIn>,
) -> Result<Json<DeleteCourseOut>, ApiError> {
    state.db.delete_course(&body.cid)?;
    Ok(Json(DeleteCourseOut { success: true }))
}

/// Invoke AI generation. The banner image is best-effort enrichment: any
/// failure there degrades to an empty banner URL instead of failing the
/// request.
#[instrument(level = "info", skip(state, body), fields(name = %body.name, chapters = body.no_of_chapters))]
pub async fn http_generate_course(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateCourseIn>,
) -> Result<Json<GenerateCourseOut>, ApiError> {
    let ai = state
        .ai
        .as_ref()
        .ok_or_else(|| ApiError::Upstream("generation backend is not configured".into()))?;

    let params = CourseParams {
        name: body.name,
        description: body.description,
        category: body.category,
        level: body.level,
        include_video: body.include_video,
        no_of_chapters: body.no_of_chapters,
    };

    let mut course = ai.generate_course(&state.prompts, &params).await?;

    match ai.generate_banner_image(&state.prompts, &course).await {
        Ok(url) => course.banner_image_url = url,
        Err(e) => {
            warn!(target: "generation", cid = %course.cid, error = %e, "banner image generation failed; continuing without one");
            course.banner_image_url = String::new();
        }
    }

    Ok(Json(GenerateCourseOut { course }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_leaderboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LeaderboardOut>, ApiError> {
    let leaderboard = state
        .db
        .leaderboard(crate::db::points::DEFAULT_LEADERBOARD_LIMIT)?;
    info!(target: "progress", entries = leaderboard.len(), "leaderboard served");
    Ok(Json(LeaderboardOut { leaderboard }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ProgressQuery>,
) -> Result<Json<ProgressOut>, ApiError> {
    let user_email = q
        .user_email
        .ok_or_else(|| ApiError::Validation("Missing userEmail or courseId".into()))?;
    let course_id = q
        .course_id
        .ok_or_else(|| ApiError::Validation("Missing userEmail or courseId".into()))?;

    let progress = state.db.get_progress(&user_email, course_id)?;
    Ok(Json(ProgressOut { progress }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_progress(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CompleteChapterIn>,
) -> Result<Json<CompleteChapterOut>, ApiError> {
    let (user_email, course_id, chapter_index, chapter_name) = match (
        body.user_email,
        body.course_id,
        body.chapter_index,
        body.chapter_name,
    ) {
        (Some(u), Some(c), Some(i), Some(n)) => (u, c, i, n),
        _ => return Err(ApiError::Validation("Missing required fields".into())),
    };

    let outcome = state.db.record_chapter_completion(&CompletionEvent {
        user_email,
        course_id,
        chapter_index,
        chapter_name,
    })?;

    Ok(Json(CompleteChapterOut {
        success: true,
        message: "Chapter marked as completed".into(),
        points_earned: outcome.points_earned,
    }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_points(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PointsQuery>,
) -> Result<Json<PointsSummary>, ApiError> {
    let user_email = q
        .user_email
        .ok_or_else(|| ApiError::Validation("Missing userEmail".into()))?;
    let summary = state.db.points_summary(&user_email)?;
    Ok(Json(summary))
}
