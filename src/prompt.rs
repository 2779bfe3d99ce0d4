//! Inbound ask requests and upstream prompt construction.
//!
//! An [`AskRequest`] is validated into a [`Prompt`] before anything is sent
//! upstream; the two message shapes are a tagged variant so consumers handle
//! both exhaustively.

use serde::Deserialize;
use thiserror::Error;

use crate::config::PromptConfig;
use crate::upstream::protocol::ChatMessage;

/// Body of `POST /ask`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Question or Image URL is required.")]
    MissingInput,
}

/// A validated ask, in one of its two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Question only.
    Text { question: String },
    /// Image, with or without an accompanying question.
    Vision {
        question: Option<String>,
        image_url: String,
    },
}

impl Prompt {
    /// Validate an inbound request. Empty and whitespace-only fields count
    /// as absent.
    pub fn from_request(req: AskRequest) -> Result<Self, PromptError> {
        let question = req.question.filter(|q| !q.trim().is_empty());
        let image_url = req.image_url.filter(|u| !u.trim().is_empty());

        match (question, image_url) {
            (question, Some(image_url)) => Ok(Prompt::Vision {
                question,
                image_url,
            }),
            (Some(question), None) => Ok(Prompt::Text { question }),
            (None, None) => Err(PromptError::MissingInput),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Prompt::Text { .. } => "text",
            Prompt::Vision { .. } => "vision",
        }
    }

    /// Build the upstream message sequence.
    ///
    /// Text asks become a system instruction plus one user message. Vision
    /// asks become a single user message carrying a text part (the question,
    /// or the configured fallback) and an image-reference part.
    pub fn into_messages(self, prompts: &PromptConfig) -> Vec<ChatMessage> {
        match self {
            Prompt::Text { question } => vec![
                ChatMessage::system(prompts.system.clone()),
                ChatMessage::user(question),
            ],
            Prompt::Vision {
                question,
                image_url,
            } => {
                let text = question.unwrap_or_else(|| prompts.image_fallback_question.clone());
                vec![ChatMessage::user_with_image(text, image_url)]
            }
        }
    }
}
