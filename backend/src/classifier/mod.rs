//! Image classification through a generative model.
//!
//! The model is an oracle: whatever JSON it returns is taken at face value,
//! except that a verification only counts when `verified` is true and the
//! confidence is strictly above [`CONFIDENCE_THRESHOLD`].

pub mod gemini;
pub mod prompt;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use regex::Regex;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{Result, RewardsError};
use crate::points::Difficulty;

pub use gemini::GeminiClient;

pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: String,
    /// base64 payload without any `data:` prefix
    pub data: String,
}

impl ImageInput {
    /// Accepts a `data:<mime>;base64,<payload>` URL or a bare base64 payload.
    /// An explicit `mime_type` wins over the one embedded in the URL.
    pub fn parse(image: &str, mime_type: Option<&str>) -> Result<Self> {
        let image = image.trim();
        let (embedded_mime, payload) = match image.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or_else(|| {
                    RewardsError::InvalidInput("data URL is missing its payload".to_string())
                })?;
                let mime = header.split(';').next().filter(|m| !m.is_empty());
                (mime.map(str::to_string), payload)
            }
            None => (None, image),
        };

        if payload.is_empty() {
            return Err(RewardsError::InvalidInput("image is empty".to_string()));
        }

        BASE64_STANDARD
            .decode(payload)
            .map_err(|e| RewardsError::InvalidInput(format!("image is not valid base64: {e}")))?;

        let mime_type = mime_type
            .map(str::to_string)
            .or(embedded_mime)
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        if !mime_type.starts_with("image/") {
            return Err(RewardsError::InvalidInput(format!(
                "unsupported mime type: {mime_type}"
            )));
        }

        Ok(Self {
            mime_type,
            data: payload.to_string(),
        })
    }
}

/// What the caller expects the photo to show. Any expectation switches the
/// classifier from identification to verification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Expectation {
    pub waste_type: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl Expectation {
    pub fn is_empty(&self) -> bool {
        self.waste_type.is_none() && self.difficulty.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// photos submitted as proof of a claimed collection task
    Lenient,
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identification {
    pub waste_type: String,
    #[serde(deserialize_with = "string_or_number")]
    pub quantity: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub verified: bool,
    pub confidence: f64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub quantity: String,
    #[serde(default)]
    pub matches_difficulty: bool,
    #[serde(default)]
    pub assessment: String,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.verified && self.confidence > CONFIDENCE_THRESHOLD
    }

    pub fn unreadable() -> Self {
        Self {
            verified: false,
            confidence: 0.0,
            quantity: String::new(),
            matches_difficulty: false,
            assessment: "Failed to verify waste. Please try again with a clearer image.".to_string(),
        }
    }
}

// models sometimes answer `"quantity": 2.5` instead of `"2.5 kg"`
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"```json\s*|\s*```").expect("fence pattern is valid"))
}

pub fn strip_code_fences(text: &str) -> String {
    fence_pattern().replace_all(text, "").trim().to_string()
}

pub fn parse_reply<T: DeserializeOwned>(text: &str) -> std::result::Result<T, serde_json::Error> {
    serde_json::from_str(&strip_code_fences(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "iVBORw0KGgo=";

    #[test]
    fn data_url_mime_is_used() {
        let image = ImageInput::parse(&format!("data:image/png;base64,{PIXEL}"), None).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, PIXEL);
    }

    #[test]
    fn explicit_mime_wins_and_bare_payload_accepted() {
        let image = ImageInput::parse(PIXEL, Some("image/webp")).unwrap();
        assert_eq!(image.mime_type, "image/webp");

        let image = ImageInput::parse(PIXEL, None).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[test]
    fn rejects_bad_images() {
        assert!(ImageInput::parse("", None).is_err());
        assert!(ImageInput::parse("data:image/png;base64,", None).is_err());
        assert!(ImageInput::parse("not base64 !!", None).is_err());
        assert!(ImageInput::parse(PIXEL, Some("text/plain")).is_err());
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let text = "```json\n{\"wasteType\": \"PET plastic\", \"quantity\": \"2 kg\", \"confidence\": 0.8}\n```";
        let parsed: Identification = parse_reply(text).unwrap();
        assert_eq!(parsed.waste_type, "PET plastic");
        assert_eq!(parsed.quantity, "2 kg");

        let bare = "```{\"verified\": true, \"confidence\": 0.9}```";
        let parsed: Verification = parse_reply(bare).unwrap();
        assert!(parsed.verified);
        assert!(parsed.assessment.is_empty());
    }

    #[test]
    fn numeric_quantity_becomes_text() {
        let parsed: Verification =
            parse_reply(r#"{"verified": true, "confidence": 0.7, "quantity": 2.5}"#).unwrap();
        assert_eq!(parsed.quantity, "2.5");
    }

    #[test]
    fn prose_reply_does_not_parse() {
        assert!(parse_reply::<Verification>("I cannot tell from this image.").is_err());
    }

    #[test]
    fn confidence_threshold_is_strict() {
        let mut verdict = Verification {
            verified: true,
            confidence: 0.6,
            quantity: "1 kg".to_string(),
            matches_difficulty: true,
            assessment: String::new(),
        };
        assert!(!verdict.passed());

        verdict.confidence = 0.61;
        assert!(verdict.passed());

        verdict.verified = false;
        assert!(!verdict.passed());
    }
}
