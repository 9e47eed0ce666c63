//! Shared Gemini payload types used by the HTTP client and generator.
//!
//! Every enumeration the server sends is declared with
//! [`resilient_enum!`](crate::resilient_enum) so values added by a newer
//! backend decode to `Unknown` instead of failing the whole response.

use crate::codec::validate;
use crate::resilient_enum;
use serde::{Deserialize, Serialize};

resilient_enum! {
    /// Why a candidate stopped generating.
    pub enum FinishReason {
        fallback = Unknown;
        Unknown = "UNKNOWN",
        Unspecified = "FINISH_REASON_UNSPECIFIED",
        Stop = "STOP",
        MaxTokens = "MAX_TOKENS",
        Safety = "SAFETY",
        Recitation = "RECITATION",
        Other = "OTHER",
    }
}

resilient_enum! {
    /// Why a prompt was rejected before generation.
    pub enum BlockReason {
        fallback = Unknown;
        Unknown = "UNKNOWN",
        Unspecified = "BLOCK_REASON_UNSPECIFIED",
        Safety = "SAFETY",
        Other = "OTHER",
    }
}

resilient_enum! {
    pub enum HarmCategory {
        fallback = Unknown;
        Unknown = "UNKNOWN",
        Harassment = "HARM_CATEGORY_HARASSMENT",
        HateSpeech = "HARM_CATEGORY_HATE_SPEECH",
        SexuallyExplicit = "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        DangerousContent = "HARM_CATEGORY_DANGEROUS_CONTENT",
    }
}

resilient_enum! {
    pub enum HarmProbability {
        fallback = Unknown;
        Unknown = "UNKNOWN",
        Unspecified = "HARM_PROBABILITY_UNSPECIFIED",
        Negligible = "NEGLIGIBLE",
        Low = "LOW",
        Medium = "MEDIUM",
        High = "HIGH",
    }
}

resilient_enum! {
    /// Blocking threshold sent with a [`SafetySetting`].
    pub enum HarmBlockThreshold {
        fallback = Unspecified;
        Unspecified = "HARM_BLOCK_THRESHOLD_UNSPECIFIED",
        LowAndAbove = "BLOCK_LOW_AND_ABOVE",
        MediumAndAbove = "BLOCK_MEDIUM_AND_ABOVE",
        OnlyHigh = "BLOCK_ONLY_HIGH",
        BlockNone = "BLOCK_NONE",
    }
}

/// Validate every wire enumeration declared in this module.
pub fn validate_wire_enums() -> crate::Result<()> {
    validate::<FinishReason>()?;
    validate::<BlockReason>()?;
    validate::<HarmCategory>()?;
    validate::<HarmProbability>()?;
    validate::<HarmBlockThreshold>()?;
    Ok(())
}

/// Gemini content container used in both requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }
}

/// Untagged union of text and inline media content parts.
///
/// Variant order matters for `#[serde(untagged)]` decoding. Part kinds this
/// client does not model (`fileData`, `functionCall`, ...) land in `Other`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Other(serde_json::Value),
}

/// Base64 inline payload used for image/vision requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Body of `generateContent` and `streamGenerateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
}

/// Top-level `generateContent` response envelope.
///
/// A blocked prompt comes back with no candidates and a `promptFeedback`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let texts: Vec<&str> = content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } | Part::Other(_) => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

/// Candidate completion item returned by Gemini.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<FinishReason>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
pub struct SafetyRating {
    pub category: HarmCategory,
    pub probability: HarmProbability,
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<BlockReason>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
    pub total_token_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wire_enums_are_valid() {
        validate_wire_enums().unwrap();
    }

    #[test]
    fn test_response_with_unknown_enum_values_still_parses() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "hi" }] },
                "finishReason": "SPII",
                "safetyRatings": [
                    { "category": "HARM_CATEGORY_CIVIC_INTEGRITY", "probability": "NEGLIGIBLE" },
                    { "category": "HARM_CATEGORY_HARASSMENT", "probability": "VERY_HIGH" }
                ]
            }]
        }))
        .unwrap();

        let candidate = &response.candidates[0];
        assert_eq!(candidate.finish_reason, Some(FinishReason::Unknown));
        assert_eq!(candidate.safety_ratings[0].category, HarmCategory::Unknown);
        assert_eq!(
            candidate.safety_ratings[0].probability,
            HarmProbability::Negligible
        );
        assert_eq!(candidate.safety_ratings[1].category, HarmCategory::Harassment);
        assert_eq!(
            candidate.safety_ratings[1].probability,
            HarmProbability::Unknown
        );
    }

    #[test]
    fn test_blocked_prompt_response() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {
                "blockReason": "SAFETY",
                "safetyRatings": []
            }
        }))
        .unwrap();

        assert!(response.candidates.is_empty());
        assert_eq!(response.text(), None);
        assert_eq!(
            response.prompt_feedback.unwrap().block_reason,
            Some(BlockReason::Safety)
        );
    }

    #[test]
    fn test_text_concatenates_parts_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": "Hello, " }, { "text": "world" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ],
            "usageMetadata": { "promptTokenCount": 3, "totalTokenCount": 7 }
        }))
        .unwrap();

        assert_eq!(response.text().as_deref(), Some("Hello, world"));
        assert_eq!(response.usage_metadata.unwrap().total_token_count, Some(7));
    }

    #[test]
    fn test_unmodelled_parts_are_kept_but_not_read_as_text() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "fileData": { "mimeType": "video/mp4", "fileUri": "gs://bucket/clip.mp4" } },
                    { "text": "A short clip" },
                    { "functionCall": { "name": "lookup", "args": {} } }
                ] }
            }]
        }))
        .unwrap();

        let parts = &response.candidates[0].content.as_ref().unwrap().parts;
        assert!(matches!(&parts[0], Part::Other(value) if value.get("fileData").is_some()));
        assert!(matches!(&parts[2], Part::Other(_)));
        assert_eq!(response.text().as_deref(), Some("A short clip"));
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::Text {
                    text: "describe".to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: "image/png".to_string(),
                        data: "AAAA".to_string(),
                    },
                },
            ])],
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(4096),
                ..Default::default()
            }),
            safety_settings: vec![SafetySetting {
                category: HarmCategory::DangerousContent,
                threshold: HarmBlockThreshold::OnlyHigh,
            }],
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "describe" },
                        { "inlineData": { "mimeType": "image/png", "data": "AAAA" } }
                    ]
                }],
                "generationConfig": { "maxOutputTokens": 4096 },
                "safetySettings": [{
                    "category": "HARM_CATEGORY_DANGEROUS_CONTENT",
                    "threshold": "BLOCK_ONLY_HIGH"
                }]
            })
        );
    }
}
