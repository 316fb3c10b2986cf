//! Loading prompt configuration from TOML.
//!
//! See `AppConfig` and `Prompts` for expected schema. Everything has a
//! compiled-in default, so the TOML file is optional tuning, not a
//! requirement.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub prompts: Prompts,
}

/// Prompts used by the Gemini client. Defaults reproduce the production
/// course-generation prompt; override them in TOML to tune tone/structure.
///
/// Placeholders filled at call time: {name}, {description}, {category},
/// {level}, {include_video}, {no_of_chapters}.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
    pub course_user_template: String,
    pub banner_image_template: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            course_user_template: r#"Generate a detailed, guided, gamified LMS-style learning course based on the following details. Each chapter should have a duration (e.g., '2 hours') and a list of subtopics. Each subtopic should include:
- A theory/reading section (short explanation)
- An example (code or real-world)
- A hands-on task or quiz
- Optionally, a video/tutorial link (if includeVideo is true)

Return only a valid JSON object with the schema below. Do not include any extra text.

Schema:
{
  "course": {
    "cid": "string",
    "name": "string",
    "description": "string",
    "category": "string",
    "level": "string",
    "includeVideo": "boolean",
    "noOfChapters": "number",
    "bannerImagePrompt": "string",
    "chapters": [
      {
        "chapterName": "string",
        "duration": "string",
        "subtopics": [
          {
            "title": "string",
            "theory": "string",
            "example": "string",
            "handsOn": "string",
            "videoUrl": "string (optional)"
          }
        ]
      }
    ]
  }
}

Details:
Course Name: {name}
Description: {description}
Category: {category}
Level: {level}
Include Video: {include_video}
Number of Chapters: {no_of_chapters}"#
                .into(),
            banner_image_template:
                "A clean, vibrant illustrated banner for an online course titled '{name}' in the {category} category. No text in the image."
                    .into(),
        }
    }
}

/// Attempt to load `AppConfig` from EDUVERSE_CONFIG_PATH. On any parsing/IO
/// error, returns None and the caller falls back to defaults.
pub fn load_config_from_env() -> Option<AppConfig> {
    let path = std::env::var("EDUVERSE_CONFIG_PATH").ok()?;
    match std::fs::read_to_string(&path) {
        Ok(s) => match toml::from_str::<AppConfig>(&s) {
            Ok(cfg) => {
                info!(target: "eduverse_backend", %path, "Loaded prompt config (TOML)");
                Some(cfg)
            }
            Err(e) => {
                error!(target: "eduverse_backend", %path, error = %e, "Failed to parse TOML config");
                None
            }
        },
        Err(e) => {
            error!(target: "eduverse_backend", %path, error = %e, "Failed to read TOML config file");
            None
        }
    }
}
