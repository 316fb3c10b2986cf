//! Minimal Gemini client for our use-cases.
//!
//! We call `generateContent` for course documents and the Imagen `predict`
//! endpoint for banner images. Calls are instrumented and log model names,
//! latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use base64::Engine;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::Prompts;
use crate::domain::{CourseDoc, CourseParams};
use crate::error::ApiError;
use crate::util::{extract_json_object, fill_template, trunc_for_log, JsonExtraction};

#[derive(Clone)]
pub struct Gemini {
    pub client: reqwest::Client,
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
}

impl Gemini {
    /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok()?;
        let base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1".into());
        let text_model =
            std::env::var("GEMINI_TEXT_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".into());
        let image_model = std::env::var("GEMINI_IMAGE_MODEL")
            .unwrap_or_else(|_| "imagen-3.0-generate-002".into());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .ok()?;

        Some(Self { client, api_key, base_url, text_model, image_model })
    }

    /// Raw text generation. Returns the first candidate's text.
    #[instrument(level = "info", skip(self, prompt), fields(model = %self.text_model, prompt_len = prompt.len()))]
    async fn generate_text(&self, prompt: &str) -> Result<String, ApiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.text_model, self.api_key
        );
        let req = GenerateContentRequest {
            contents: vec![Content { parts: vec![Part { text: prompt.to_string() }] }],
        };

        let res = self
            .client
            .post(&url)
            .header(USER_AGENT, "eduverse-backend/0.1")
            .header(CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            let msg = extract_gemini_error(&body).unwrap_or(body);
            return Err(ApiError::Upstream(format!("Gemini HTTP {status}: {msg}")));
        }

        let body: GenerateContentResponse =
            res.json().await.map_err(|e| ApiError::Upstream(e.to_string()))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ApiError::Upstream("empty response from Gemini".into()));
        }
        info!(response_len = text.len(), "Gemini text response received");
        Ok(text)
    }

    /// Generate a full course document from user parameters.
    ///
    /// The model's free-form reply goes through best-effort JSON extraction
    /// and schema validation; a fresh unique `cid` is assigned on success.
    #[instrument(
        level = "info",
        skip(self, prompts, params),
        fields(name = %params.name, chapters = params.no_of_chapters, model = %self.text_model)
    )]
    pub async fn generate_course(
        &self,
        prompts: &Prompts,
        params: &CourseParams,
    ) -> Result<CourseDoc, ApiError> {
        let prompt = build_course_prompt(prompts, params);
        let start = std::time::Instant::now();
        let text = self.generate_text(&prompt).await;
        let elapsed = start.elapsed();

        let text = match text {
            Ok(t) => {
                info!(?elapsed, "Model response received successfully");
                t
            }
            Err(e) => {
                error!(?elapsed, error = %e, "Model call failed during course generation");
                return Err(e);
            }
        };

        let mut course = parse_generated_course(&text, params.no_of_chapters)?;
        course.cid = Uuid::new_v4().to_string();

        info!(
            cid = %course.cid,
            name_preview = %course.name.chars().take(40).collect::<String>(),
            chapters = course.chapters.len(),
            "Course successfully generated"
        );
        Ok(course)
    }

    /// Best-effort banner image. Returns a data URL, or an error string the
    /// caller is expected to log and swallow (an empty banner is fine).
    #[instrument(level = "info", skip(self, prompts, course), fields(model = %self.image_model, cid = %course.cid))]
    pub async fn generate_banner_image(
        &self,
        prompts: &Prompts,
        course: &CourseDoc,
    ) -> Result<String, String> {
        let prompt = if course.banner_image_prompt.trim().is_empty() {
            fill_template(
                &prompts.banner_image_template,
                &[("name", &course.name), ("category", &course.category)],
            )
        } else {
            course.banner_image_prompt.clone()
        };

        let url = format!(
            "{}/models/{}:predict?key={}",
            self.base_url, self.image_model, self.api_key
        );
        let req = PredictRequest {
            instances: vec![PredictInstance { prompt }],
            parameters: PredictParameters { sample_count: 1 },
        };

        let res = self
            .client
            .post(&url)
            .header(USER_AGENT, "eduverse-backend/0.1")
            .header(CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("Imagen HTTP {status}: {}", trunc_for_log(&body, 200)));
        }

        let body: PredictResponse = res.json().await.map_err(|e| e.to_string())?;
        let prediction = body
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| "no predictions in Imagen response".to_string())?;

        // Validate the payload decodes before shipping it to the frontend.
        base64::engine::general_purpose::STANDARD
            .decode(&prediction.bytes_base64_encoded)
            .map_err(|e| format!("undecodable image payload: {e}"))?;

        let mime = if prediction.mime_type.is_empty() { "image/png".to_string() } else { prediction.mime_type };
        info!(bytes = prediction.bytes_base64_encoded.len(), %mime, "Banner image generated");
        Ok(format!("data:{mime};base64,{}", prediction.bytes_base64_encoded))
    }
}

/// Fill the course-generation prompt template.
pub fn build_course_prompt(prompts: &Prompts, params: &CourseParams) -> String {
    fill_template(
        &prompts.course_user_template,
        &[
            ("name", &params.name),
            ("description", &params.description),
            ("category", &params.category),
            ("level", &params.level),
            ("include_video", if params.include_video { "true" } else { "false" }),
            ("no_of_chapters", &params.no_of_chapters.to_string()),
        ],
    )
}

/// Turn raw model text into a validated `CourseDoc`.
///
/// Accepts either `{"course": {...}}` (the schema we ask for) or a bare
/// course object. Chapter count must match what was requested.
pub fn parse_generated_course(text: &str, requested_chapters: usize) -> Result<CourseDoc, ApiError> {
    let value = match extract_json_object(text) {
        JsonExtraction::Parsed(v) => v,
        JsonExtraction::Failed(raw) => {
            let preview = trunc_for_log(&raw, 200);
            warn!(target: "generation", raw = %preview, "model output was not extractable JSON");
            return Err(ApiError::Generation("model response was not valid JSON".into()));
        }
    };

    let course_value: Value = match value.get("course") {
        Some(inner) => inner.clone(),
        None => value,
    };

    let course: CourseDoc = serde_json::from_value(course_value)
        .map_err(|e| ApiError::Generation(format!("course document did not match schema: {e}")))?;

    if course.chapters.is_empty() {
        return Err(ApiError::Generation("course document has no chapters".into()));
    }
    if course.chapters.len() != requested_chapters {
        return Err(ApiError::Generation(format!(
            "chapter count mismatch: requested {requested_chapters}, model returned {}",
            course.chapters.len()
        )));
    }
    Ok(course)
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}
#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}
#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    content: ContentResp,
}
#[derive(Deserialize)]
struct ContentResp {
    #[serde(default)]
    parts: Vec<PartResp>,
}
#[derive(Deserialize)]
struct PartResp {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}
#[derive(Serialize)]
struct PredictInstance {
    prompt: String,
}
#[derive(Serialize)]
struct PredictParameters {
    #[serde(rename = "sampleCount")]
    sample_count: u32,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}
#[derive(Deserialize)]
struct Prediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: String,
    #[serde(default, rename = "mimeType")]
    mime_type: String,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct EWrap {
        error: EObj,
    }
    #[derive(Deserialize)]
    struct EObj {
        message: String,
    }
    serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;

    fn params(chapters: usize) -> CourseParams {
        CourseParams {
            name: "Rust Basics".into(),
            description: "Ownership and traits".into(),
            category: "Programming".into(),
            level: "beginner".into(),
            include_video: true,
            no_of_chapters: chapters,
        }
    }

    fn model_reply(chapters: usize) -> String {
        let chapter_objs: Vec<String> = (0..chapters)
            .map(|i| {
                format!(
                    r#"{{"chapterName": "Chapter {i}", "duration": "1 hour", "subtopics": [
                        {{"title": "T", "theory": "th", "example": "ex", "handsOn": "ho"}}
                    ]}}"#
                )
            })
            .collect();
        format!(
            r#"Here you go!
{{"course": {{"cid": "tmp", "name": "Rust Basics", "level": "beginner",
  "noOfChapters": {chapters}, "chapters": [{}]}}}}
Hope that helps."#,
            chapter_objs.join(",")
        )
    }

    #[test]
    fn prompt_embeds_every_parameter() {
        let p = build_course_prompt(&Prompts::default(), &params(5));
        assert!(p.contains("Course Name: Rust Basics"));
        assert!(p.contains("Level: beginner"));
        assert!(p.contains("Include Video: true"));
        assert!(p.contains("Number of Chapters: 5"));
    }

    #[test]
    fn parses_prose_wrapped_course() {
        let course = parse_generated_course(&model_reply(3), 3).expect("parse");
        assert_eq!(course.chapters.len(), 3);
        assert_eq!(course.chapters[0].chapter_name, "Chapter 0");
    }

    #[test]
    fn accepts_bare_course_object_without_wrapper() {
        let text = r#"{"name": "X", "level": "l", "chapters": [{"chapterName": "A"}]}"#;
        let course = parse_generated_course(text, 1).expect("parse");
        assert_eq!(course.chapters.len(), 1);
    }

    #[test]
    fn chapter_count_mismatch_is_a_generation_error() {
        match parse_generated_course(&model_reply(4), 5) {
            Err(ApiError::Generation(msg)) => assert!(msg.contains("mismatch")),
            other => panic!("expected generation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_chapters_is_a_generation_error() {
        let text = r#"{"course": {"name": "X", "level": "l"}}"#;
        assert!(matches!(
            parse_generated_course(text, 2),
            Err(ApiError::Generation(_))
        ));
    }

    #[test]
    fn non_json_reply_is_a_generation_error() {
        assert!(matches!(
            parse_generated_course("I cannot do that.", 2),
            Err(ApiError::Generation(_))
        ));
    }

    #[test]
    fn long_multibyte_prose_reply_fails_cleanly() {
        // Typographic characters straddling the log-preview cut must still
        // surface as a generation error, not a panic.
        let text = format!("{}é — I'm sorry, I can't produce JSON here.", "a".repeat(199));
        assert!(matches!(
            parse_generated_course(&text, 2),
            Err(ApiError::Generation(_))
        ));
    }
}
