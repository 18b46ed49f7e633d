//! AI-assisted repair diagnosis and support replies, with offline fallbacks.

use std::sync::Arc;

use async_trait::async_trait;
use db::models::{
    chat_session::{ChatMessage, MessageSender},
    repair::{DiagnosisSource, RepairIntake},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use super::{
    canned_responses,
    claude_api::{ClaudeApiError, Message, MessageRole},
};

const DIAGNOSIS_SYSTEM_PROMPT: &str = "You are an experienced electronics repair technician at \
    BLUCELL, a phone, tablet and laptop repair shop. Given a device and the customer's \
    description of the problem, explain the most likely causes and the repair that is usually \
    needed, in plain language, in at most 120 words. Do not quote prices. Do not use markdown.";

const SUPPORT_SYSTEM_PROMPT: &str = "You are the BLUCELL support assistant on the shop's \
    website. BLUCELL sells phones, laptops, tablets and accessories and repairs devices. \
    Customers book repairs from the Repair page and follow orders and repairs in their \
    dashboard. Repairs carry a 90-day warranty; products can be returned within 14 days. \
    Answer briefly and politely. If you cannot help, offer to hand the chat over to a person.";

const DIAGNOSIS_MAX_TOKENS: u32 = 400;
const SUPPORT_MAX_TOKENS: u32 = 300;
const SUPPORT_HISTORY_LIMIT: usize = 20;

/// Something that can turn a system prompt and a conversation into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        messages: &[Message],
        max_tokens: u32,
    ) -> Result<String, ClaudeApiError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub text: String,
    pub source: DiagnosisSource,
}

#[derive(Clone, Default)]
pub struct AiAssistant {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AiAssistant {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    /// An assistant that only ever answers with canned replies.
    pub fn offline() -> Self {
        Self { generator: None }
    }

    pub fn is_online(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn diagnose(&self, intake: &RepairIntake) -> Diagnosis {
        let fallback = || Diagnosis {
            text: canned_responses::fallback_diagnosis(&intake.issue_description).to_string(),
            source: DiagnosisSource::Fallback,
        };

        let Some(generator) = &self.generator else {
            return fallback();
        };

        let prompt = format!(
            "Device type: {}\nBrand: {}\nModel: {}\nProblem described by the customer: {}",
            intake.device_type.trim(),
            intake.brand.trim(),
            intake.model.trim(),
            intake.issue_description.trim()
        );

        match generator
            .generate(DIAGNOSIS_SYSTEM_PROMPT, &[Message::user(prompt)], DIAGNOSIS_MAX_TOKENS)
            .await
        {
            Ok(text) => {
                info!(device_type = %intake.device_type, "Generated AI diagnosis");
                Diagnosis {
                    text,
                    source: DiagnosisSource::Ai,
                }
            }
            Err(e) => {
                warn!(error = %e, "AI diagnosis failed, using canned diagnosis");
                fallback()
            }
        }
    }

    /// Reply to the latest customer message given the whole thread.
    pub async fn support_reply(&self, history: &[ChatMessage]) -> String {
        let latest = history
            .iter()
            .rev()
            .find(|m| m.sender == MessageSender::User)
            .map(|m| m.text.as_str())
            .unwrap_or_default();
        let fallback = || canned_responses::fallback_support_reply(latest).to_string();

        let Some(generator) = &self.generator else {
            return fallback();
        };

        let messages = to_api_messages(history);
        if messages.is_empty() {
            return fallback();
        }

        match generator
            .generate(SUPPORT_SYSTEM_PROMPT, &messages, SUPPORT_MAX_TOKENS)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "AI support reply failed, using canned reply");
                fallback()
            }
        }
    }
}

/// Convert a support thread to API messages: admins and the assistant both
/// speak as `assistant`, consecutive turns of one role are merged, and the
/// conversation starts with a user turn.
fn to_api_messages(history: &[ChatMessage]) -> Vec<Message> {
    let start = history.len().saturating_sub(SUPPORT_HISTORY_LIMIT);
    let mut messages: Vec<Message> = Vec::new();

    for chat in &history[start..] {
        let role = match chat.sender {
            MessageSender::User => MessageRole::User,
            MessageSender::Ai | MessageSender::Admin => MessageRole::Assistant,
        };
        if messages.is_empty() && role == MessageRole::Assistant {
            continue;
        }
        match messages.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(&chat.text);
            }
            _ => messages.push(Message {
                role,
                content: chat.text.clone(),
            }),
        }
    }

    messages
}
