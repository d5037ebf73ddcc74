use serde::{Deserialize, Serialize};

pub const NO_CONTENT: &str = "No content";

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

impl GenerateRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.into(),
                }],
            }],
        }
    }
}

/// The decoded `generateContent` body. `candidates` is absent on error-shaped
/// responses, which therefore decode to an empty batch.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One recommendation as returned by the service. Fields beyond the display
/// path are ignored rather than modeled.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Vec<CandidatePart>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl Candidate {
    /// Total extraction of the display text: the first content part's text,
    /// or the fixed fallback when the path is missing or empty.
    pub fn display_text(&self) -> &str {
        match self.content.first().and_then(|part| part.text.as_deref()) {
            Some(text) if !text.is_empty() => text,
            _ => NO_CONTENT,
        }
    }

    #[cfg(test)]
    pub fn from_text(text: &str) -> Self {
        Self {
            content: vec![CandidatePart {
                text: Some(text.to_string()),
            }],
        }
    }
}
