//! cc-slack Protocol
//!
//! Shared wire types for the cc-slack server.
//! Claude Code hook payloads and transcripts come in as JSON;
//! Slack Web API responses and Socket Mode envelopes are JSON as well.

pub mod hook;
pub mod slack;
pub mod transcript;

pub use hook::{HookEvent, HookEventKind, ToolName};
pub use slack::{SlackEvent, SocketEnvelope};
pub use transcript::{ContentBlock, MessageContent, TranscriptRecord};
