//! Course catalog: CRUD over denormalized course documents.
//!
//! The JSON blob is the source of truth for nested structure; the scalar
//! columns exist so listings and the bonus check can query without parsing
//! blobs. They are recomputed from the document on write, never trusted
//! from a separate caller-supplied copy.

use rusqlite::{params, OptionalExtension};
use tracing::{info, instrument};

use super::{now, Db};
use crate::domain::CourseDoc;
use crate::error::ApiError;

impl Db {
    /// Persist a course document. Returns the assigned numeric id.
    #[instrument(level = "info", skip(self, course), fields(cid = %course.cid, name = %course.name))]
    pub fn create_course(&self, course: &CourseDoc) -> Result<i64, ApiError> {
        for (field, value) in [
            ("name", &course.name),
            ("level", &course.level),
            ("userEmail", &course.user_email),
            ("cid", &course.cid),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::Validation(format!("missing required course field: {field}")));
            }
        }
        if course.chapters.is_empty() {
            return Err(ApiError::Validation("course must have at least one chapter".into()));
        }

        let mut doc = course.clone();
        doc.no_of_chapters = doc.chapters.len();
        let blob = serde_json::to_string(&doc)
            .map_err(|e| ApiError::Persistence(format!("unserializable course document: {e}")))?;

        let conn = self.lock();
        conn.execute(
            "INSERT INTO courses
             (cid, name, description, no_of_chapters, include_video, level,
              category, course_json, user_email, banner_image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                doc.cid,
                doc.name,
                doc.description,
                doc.no_of_chapters as i64,
                doc.include_video,
                doc.level,
                doc.category,
                blob,
                doc.user_email,
                doc.banner_image_url,
                now(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(target: "courses", id, cid = %doc.cid, chapters = doc.no_of_chapters, "course persisted");
        Ok(id)
    }

    /// Fetch one course by its string key, or None.
    #[instrument(level = "debug", skip(self))]
    pub fn get_course(&self, cid: &str) -> Result<Option<CourseDoc>, ApiError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT course_json, banner_image_url FROM courses WHERE cid = ?1",
                params![cid],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            Some((blob, banner)) => Ok(Some(decode_course(&blob, &banner)?)),
            None => Ok(None),
        }
    }

    /// All courses, most recently created first.
    #[instrument(level = "debug", skip(self))]
    pub fn list_courses(&self) -> Result<Vec<CourseDoc>, ApiError> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT course_json, banner_image_url FROM courses ORDER BY id DESC")?;
        let blobs = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        blobs
            .iter()
            .map(|(blob, banner)| decode_course(blob, banner))
            .collect()
    }

    /// Remove a course row. Progress and history rows referencing the
    /// course id are left in place (no cascade).
    #[instrument(level = "info", skip(self))]
    pub fn delete_course(&self, cid: &str) -> Result<(), ApiError> {
        let conn = self.lock();
        let n = conn.execute("DELETE FROM courses WHERE cid = ?1", params![cid])?;
        info!(target: "courses", %cid, deleted = n, "course delete");
        Ok(())
    }
}

/// Deserialize a stored blob, letting the scalar banner column override the
/// document (the column is written after generation-time enrichment).
fn decode_course(blob: &str, banner: &str) -> Result<CourseDoc, ApiError> {
    let mut doc: CourseDoc = serde_json::from_str(blob)
        .map_err(|e| ApiError::Persistence(format!("corrupt course document: {e}")))?;
    if !banner.is_empty() {
        doc.banner_image_url = banner.to_string();
    }
    Ok(doc)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{Chapter, Subtopic};

    pub(crate) fn sample_course(cid: &str, chapters: usize) -> CourseDoc {
        CourseDoc {
            cid: cid.to_string(),
            name: "Rust Basics".into(),
            description: "Learn the borrow checker".into(),
            category: "Programming".into(),
            level: "beginner".into(),
            include_video: false,
            no_of_chapters: chapters,
            user_email: "a@x.com".into(),
            banner_image_prompt: String::new(),
            banner_image_url: String::new(),
            chapters: (0..chapters)
                .map(|i| Chapter {
                    chapter_name: format!("Chapter {i}"),
                    duration: "1 hour".into(),
                    subtopics: vec![Subtopic {
                        title: "Topic".into(),
                        theory: "t".into(),
                        example: "e".into(),
                        hands_on: "h".into(),
                        video_url: None,
                    }],
                })
                .collect(),
        }
    }

    pub(crate) fn test_db() -> Db {
        let db = Db::open_in_memory().expect("open");
        db.migrate().expect("migrate");
        db
    }

    #[test]
    fn create_then_get_round_trips_chapter_count() {
        let db = test_db();
        let id = db.create_course(&sample_course("c-1", 3)).expect("create");
        assert!(id > 0);

        let fetched = db.get_course("c-1").expect("get").expect("present");
        assert_eq!(fetched.chapters.len(), 3);
        assert_eq!(fetched.no_of_chapters, 3);
    }

    #[test]
    fn scalar_chapter_count_is_recomputed_from_the_blob() {
        let db = test_db();
        let mut course = sample_course("c-1", 2);
        course.no_of_chapters = 99; // caller-supplied lie
        db.create_course(&course).expect("create");

        let fetched = db.get_course("c-1").expect("get").expect("present");
        assert_eq!(fetched.no_of_chapters, 2);
    }

    #[test]
    fn missing_fields_are_rejected_and_nothing_persists() {
        let db = test_db();
        let mut course = sample_course("c-1", 2);
        course.level = String::new();
        match db.create_course(&course) {
            Err(ApiError::Validation(msg)) => assert!(msg.contains("level")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(db.get_course("c-1").expect("get").is_none());

        let mut course = sample_course("c-2", 0);
        course.chapters.clear();
        assert!(matches!(db.create_course(&course), Err(ApiError::Validation(_))));
    }

    #[test]
    fn duplicate_cid_is_a_persistence_error() {
        let db = test_db();
        db.create_course(&sample_course("c-1", 1)).expect("create");
        assert!(matches!(
            db.create_course(&sample_course("c-1", 1)),
            Err(ApiError::Persistence(_))
        ));
    }

    #[test]
    fn list_is_newest_first() {
        let db = test_db();
        db.create_course(&sample_course("c-1", 1)).expect("create");
        db.create_course(&sample_course("c-2", 1)).expect("create");
        let all = db.list_courses().expect("list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].cid, "c-2");
        assert_eq!(all[1].cid, "c-1");
    }

    #[test]
    fn banner_column_overrides_blob_on_read() {
        let db = test_db();
        db.create_course(&sample_course("c-1", 1)).expect("create");
        {
            let conn = db.lock();
            conn.execute(
                "UPDATE courses SET banner_image_url = 'https://img/banner.png' WHERE cid = 'c-1'",
                [],
            )
            .expect("update");
        }
        let fetched = db.get_course("c-1").expect("get").expect("present");
        assert_eq!(fetched.banner_image_url, "https://img/banner.png");
    }

    #[test]
    fn delete_removes_the_row() {
        let db = test_db();
        db.create_course(&sample_course("c-1", 1)).expect("create");
        db.delete_course("c-1").expect("delete");
        assert!(db.get_course("c-1").expect("get").is_none());
        // Deleting a missing key is not an error.
        db.delete_course("c-1").expect("delete again");
    }
}
