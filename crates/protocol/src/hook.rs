//! Claude Code hook → server payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A hook event as POSTed by the Claude Code hook script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookEvent {
    #[serde(default)]
    pub hook_event_name: HookEventKind,
    #[serde(default)]
    pub transcript_path: String,
    #[serde(default)]
    pub session_id: String,
    /// Only meaningful for `PermissionRequest`.
    #[serde(default)]
    pub tool_name: ToolName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,
    /// tmux pane the agent runs in (e.g. `$TMUX_PANE`). Empty when the hook
    /// script does not forward it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub terminal_target: String,
}

impl HookEvent {
    pub fn is_permission_request(&self) -> bool {
        self.hook_event_name == HookEventKind::PermissionRequest
    }
}

/// Hook event kind. Unknown names are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HookEventKind {
    Stop,
    PermissionRequest,
    TaskCompleted,
    Notification,
    SubagentStop,
    UserPromptSubmit,
    PreToolUse,
    PostToolUse,
    PreCompact,
    SessionStart,
    SessionEnd,
    Other(String),
}

impl HookEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "Stop",
            Self::PermissionRequest => "PermissionRequest",
            Self::TaskCompleted => "TaskCompleted",
            Self::Notification => "Notification",
            Self::SubagentStop => "SubagentStop",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::PreCompact => "PreCompact",
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
            Self::Other(name) => name,
        }
    }
}

impl Default for HookEventKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for HookEventKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Stop" => Self::Stop,
            "PermissionRequest" => Self::PermissionRequest,
            "TaskCompleted" => Self::TaskCompleted,
            "Notification" => Self::Notification,
            "SubagentStop" => Self::SubagentStop,
            "UserPromptSubmit" => Self::UserPromptSubmit,
            "PreToolUse" => Self::PreToolUse,
            "PostToolUse" => Self::PostToolUse,
            "PreCompact" => Self::PreCompact,
            "SessionStart" => Self::SessionStart,
            "SessionEnd" => Self::SessionEnd,
            _ => Self::Other(name),
        }
    }
}

impl From<HookEventKind> for String {
    fn from(kind: HookEventKind) -> Self {
        match kind {
            HookEventKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for HookEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool named in a permission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolName {
    Bash,
    Read,
    Write,
    Edit,
    AskUserQuestion,
    Other(String),
}

impl ToolName {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bash => "Bash",
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Edit => "Edit",
            Self::AskUserQuestion => "AskUserQuestion",
            Self::Other(name) => name,
        }
    }
}

impl Default for ToolName {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for ToolName {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Bash" => Self::Bash,
            "Read" => Self::Read,
            "Write" => Self::Write,
            "Edit" => Self::Edit,
            "AskUserQuestion" => Self::AskUserQuestion,
            _ => Self::Other(name),
        }
    }
}

impl From<ToolName> for String {
    fn from(tool: ToolName) -> Self {
        match tool {
            ToolName::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
