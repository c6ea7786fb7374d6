//! Claude Code transcript (JSONL) records

use serde::Deserialize;
use serde_json::Value;

/// One line of a transcript file.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptRecord {
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub message: Option<TranscriptMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: MessageContent,
}

/// User prompts are plain strings; assistant output (and tool-result echoes)
/// are block arrays.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Other(Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Other(Value::Null)
    }
}

/// One content block. Blocks decode independently: a malformed block
/// becomes `Other` instead of failing its whole message.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "Value")]
pub enum ContentBlock {
    Text { text: String },
    Thinking { thinking: String },
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
}

impl From<Value> for ContentBlock {
    fn from(value: Value) -> Self {
        match serde_json::from_value::<TaggedBlock>(value) {
            Ok(TaggedBlock::Text { text }) => Self::Text { text },
            Ok(TaggedBlock::Thinking { thinking }) => Self::Thinking { thinking },
            Err(_) => Self::Other,
        }
    }
}

impl TranscriptRecord {
    fn message_with_role(&self, role: &str) -> Option<&TranscriptMessage> {
        if self.record_type != role {
            return None;
        }
        self.message.as_ref().filter(|m| m.role == role)
    }

    /// The prompt text if this is a user record with string content.
    /// Array content (tool results) is not a prompt.
    pub fn user_prompt(&self) -> Option<&str> {
        match &self.message_with_role("user")?.content {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The last non-blank text block of an assistant record.
    pub fn assistant_text(&self) -> Option<&str> {
        let MessageContent::Blocks(blocks) = &self.message_with_role("assistant")?.content else {
            return None;
        };
        blocks.iter().rev().find_map(|block| match block {
            ContentBlock::Text { text } if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        })
    }
}
