//! Generative metadata fallback client
//!
//! Last-resort release lookup through a chat-completion service, used
//! only when the catalog returns nothing. Best effort by contract: every
//! transport or parse failure degrades to an empty result, never an error.

use crate::models::{Release, ReleaseConfidence};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_FALLBACK_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Fixed instruction for the completion request. Derivative titles (live,
/// remaster, radio edit) must resolve against the original studio release.
const SYSTEM_PROMPT: &str = "You are a music release database. Given a song, reply with a JSON \
array of the known releases of the ORIGINAL studio version of that song. If the given title \
refers to a derivative version (live recording, remaster, radio edit), answer for the original \
studio release instead. Each array element must be an object with exactly these fields: \
\"year\" (number), \"country\" (two-letter country code string), \"mediaFormat\" (string, e.g. \
\"Vinyl\" or \"CD\"), \"artistCredit\" (string). Reply with the JSON array only, no prose.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Generative fallback API client
///
/// Only constructed when a usage credential is configured; callers that
/// have no client skip the fallback step entirely.
pub struct MetadataFallbackClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl MetadataFallbackClient {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_FALLBACK_URL.to_string()),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Ask the generative service for releases of a song
    ///
    /// Returns releases sorted ascending by year, each tagged
    /// `GeneratedFallback`. Failures of any kind yield an empty list.
    pub async fn lookup(&self, clean_title: &str, artist: Option<&str>) -> Vec<Release> {
        let song = match artist {
            Some(artist) => format!("{} - {}", artist, clean_title),
            None => clean_title.to_string(),
        };

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: song.clone(),
                },
            ],
            temperature: 0.1,
            max_tokens: 1000,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = match self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(song = %song, error = %e, "Fallback request failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                song = %song,
                status = response.status().as_u16(),
                "Fallback returned non-success status"
            );
            return Vec::new();
        }

        let chat: ChatResponse = match response.json().await {
            Ok(chat) => chat,
            Err(e) => {
                tracing::warn!(song = %song, error = %e, "Fallback response not decodable");
                return Vec::new();
            }
        };

        let content = match chat.choices.first() {
            Some(choice) => choice.message.content.as_str(),
            None => {
                tracing::warn!(song = %song, "Fallback response contained no choices");
                return Vec::new();
            }
        };

        let releases = parse_release_content(content);
        tracing::debug!(song = %song, releases = releases.len(), "Fallback lookup completed");
        releases
    }
}

/// Parse the model's reply into releases
///
/// The reply may be wrapped in code-fence markers; those are stripped
/// before JSON parsing. Objects missing or mistyping a field are dropped.
/// Output is sorted ascending by year.
pub fn parse_release_content(content: &str) -> Vec<Release> {
    let stripped = strip_code_fences(content);

    let values: Vec<serde_json::Value> = match serde_json::from_str(stripped) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(error = %e, "Fallback content is not a JSON array");
            return Vec::new();
        }
    };

    let mut releases: Vec<Release> = values.iter().filter_map(validate_entry).collect();
    releases.sort_by_key(|r| r.year);
    releases
}

/// Strip leading/trailing markdown code-fence markers from a reply
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Opening fence may carry a language tag ("```json")
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };

    rest.trim_end_matches('`').trim_end_matches("```").trim()
}

/// Validate one reply object into a Release
///
/// Requires a numeric year, a two-letter country string, and string
/// media-format/artist-credit fields; anything else is dropped.
fn validate_entry(value: &serde_json::Value) -> Option<Release> {
    let year = value.get("year")?.as_i64()?;
    let country = value.get("country")?.as_str()?;
    let media_format = value.get("mediaFormat")?.as_str()?;
    let artist_credit = value.get("artistCredit")?.as_str()?;

    if country.len() != 2 {
        return None;
    }

    Some(Release {
        year: i32::try_from(year).ok()?,
        country: country.to_string(),
        media_format: media_format.to_string(),
        artist_credit: artist_credit.to_string(),
        title: None,
        confidence: ReleaseConfidence::GeneratedFallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_ARRAY: &str = r#"[
        {"year": 1970, "country": "US", "mediaFormat": "CD", "artistCredit": "Artist"},
        {"year": 1965, "country": "GB", "mediaFormat": "Vinyl", "artistCredit": "Artist"}
    ]"#;

    #[test]
    fn parses_plain_json_array_sorted_by_year() {
        let releases = parse_release_content(VALID_ARRAY);
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].year, 1965);
        assert_eq!(releases[1].year, 1970);
        assert!(releases
            .iter()
            .all(|r| r.confidence == ReleaseConfidence::GeneratedFallback));
    }

    #[test]
    fn strips_code_fences_with_language_tag() {
        let fenced = format!("```json\n{}\n```", VALID_ARRAY);
        assert_eq!(parse_release_content(&fenced).len(), 2);
    }

    #[test]
    fn strips_bare_code_fences() {
        let fenced = format!("```\n{}\n```", VALID_ARRAY);
        assert_eq!(parse_release_content(&fenced).len(), 2);
    }

    #[test]
    fn drops_entries_with_missing_or_mistyped_fields() {
        let content = r#"[
            {"year": 1965, "country": "GB", "mediaFormat": "Vinyl", "artistCredit": "Artist"},
            {"year": "1970", "country": "US", "mediaFormat": "CD", "artistCredit": "Artist"},
            {"country": "US", "mediaFormat": "CD", "artistCredit": "Artist"},
            {"year": 1980, "country": "USA", "mediaFormat": "CD", "artistCredit": "Artist"},
            {"year": 1990, "country": "DE", "mediaFormat": 12, "artistCredit": "Artist"}
        ]"#;

        let releases = parse_release_content(content);
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].year, 1965);
    }

    #[test]
    fn non_array_content_yields_empty() {
        assert!(parse_release_content("Sorry, I don't know that song.").is_empty());
        assert!(parse_release_content("{\"year\": 1965}").is_empty());
    }

    #[test]
    fn fallback_releases_have_no_title() {
        let releases = parse_release_content(VALID_ARRAY);
        assert!(releases.iter().all(|r| r.title.is_none()));
    }
}
