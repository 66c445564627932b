//! Streaming chat completion chunks (OpenAI-compatible shape).
//!
//! A chunk carries at most one piece of generated text in
//! `choices[0].delta.content`. Role-only and finish chunks carry none.

use serde::{Deserialize, Serialize};

use crate::inference::engine::Role;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkChoice {
    pub index: usize,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Chunk carrying a piece of generated text.
    pub fn content(request_id: &str, model: &str, text: impl Into<String>) -> Self {
        Self::with_choice(
            request_id,
            model,
            ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    role: None,
                    content: Some(text.into()),
                },
                finish_reason: None,
            },
        )
    }

    /// Final chunk: no content, only a finish reason.
    pub fn finish(request_id: &str, model: &str, reason: &str) -> Self {
        Self::with_choice(
            request_id,
            model,
            ChunkChoice {
                index: 0,
                delta: ChunkDelta::default(),
                finish_reason: Some(reason.to_string()),
            },
        )
    }

    fn with_choice(request_id: &str, model: &str, choice: ChunkChoice) -> Self {
        Self {
            id: format!("chatcmpl-{request_id}"),
            object: "chat.completion.chunk".to_string(),
            created: unix_now(),
            model: model.to_string(),
            choices: vec![choice],
        }
    }

    /// Mark this chunk as the first of its response.
    pub fn with_role(mut self, role: Role) -> Self {
        if let Some(choice) = self.choices.first_mut() {
            choice.delta.role = Some(role);
        }
        self
    }

    /// Whether this chunk ends the response.
    pub fn is_finish(&self) -> bool {
        self.choices.iter().any(|c| c.finish_reason.is_some())
    }

    /// Text carried by the first choice. Absent content reads as empty.
    pub fn text(&self) -> &str {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .unwrap_or("")
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
