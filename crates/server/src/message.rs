//! Slack message formatting for hook events.

use std::fmt::Write as _;

use cc_slack_protocol::{HookEvent, HookEventKind, ToolName};
use serde_json::Value;

const DETAIL_MAX_CHARS: usize = 200;
const PROMPT_MAX_CHARS: usize = 100;

/// Options the Claude Code UI appends to every AskUserQuestion prompt.
const FIXED_QUESTION_OPTIONS: [&str; 2] = ["Type something.", "Chat about this"];

const BASH_CHOICES: &str = "1. Yes\n2. Yes, and don't ask again for this session\n3. No";
const EDIT_CHOICES: &str = "1. Yes\n2. Yes, allow all edits during this session\n3. No";

/// Render the Slack text for a hook event.
///
/// Replies omit the prompt line (the thread root already shows it).
pub fn build_message(event: &HookEvent, prompt: &str, response: &str, is_reply: bool) -> String {
    let mut out = String::new();

    match &event.hook_event_name {
        HookEventKind::PermissionRequest => {
            let _ = write!(out, "[PermissionRequest] {}", event.tool_name);
            let detail = format_tool_input(&event.tool_name, event.tool_input.as_ref());
            if !detail.is_empty() {
                let _ = write!(out, "\n> {}", truncate(&detail, DETAIL_MAX_CHARS));
            }
            if let Some(choices) = permission_choices(&event.tool_name) {
                let _ = write!(out, "\n> {}", choices.replace('\n', "\n> "));
            }
        }
        other => {
            let _ = write!(out, "[{other}]");
        }
    }

    if !is_reply {
        let _ = write!(out, "\nPrompt: {:?}", truncate(prompt, PROMPT_MAX_CHARS));
    }

    // The question block already carries everything the response would say.
    let asks_question =
        event.is_permission_request() && event.tool_name == ToolName::AskUserQuestion;
    if !response.is_empty() && !asks_question {
        let _ = write!(out, "\nResponse: {}", response.replace('\n', "\n> "));
    }

    out
}

/// The most relevant field of a tool's input, or empty for unknown tools.
pub fn format_tool_input(tool: &ToolName, input: Option<&Value>) -> String {
    let Some(input) = input.filter(|value| value.is_object()) else {
        return String::new();
    };

    let field = |name: &str| {
        input
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    match tool {
        ToolName::Bash => field("command"),
        ToolName::Read | ToolName::Write | ToolName::Edit => field("file_path"),
        ToolName::AskUserQuestion => format_questions(input),
        ToolName::Other(_) => String::new(),
    }
}

/// Render each AskUserQuestion question as its text followed by a numbered
/// option list, blocks joined by newlines.
fn format_questions(input: &Value) -> String {
    let Some(questions) = input.get("questions").and_then(Value::as_array) else {
        return String::new();
    };

    let blocks: Vec<String> = questions
        .iter()
        .filter_map(|question| {
            let text = question.get("question").and_then(Value::as_str)?;
            if text.is_empty() {
                return None;
            }

            let labels: Vec<&str> = question
                .get("options")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|option| option.get("label").and_then(Value::as_str))
                .chain(FIXED_QUESTION_OPTIONS)
                .collect();

            Some(format!("{text}\n{}", numbered(&labels)))
        })
        .collect();

    blocks.join("\n")
}

fn numbered(labels: &[&str]) -> String {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{}. {label}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Choices shown by the Claude Code permission dialog. AskUserQuestion
/// carries its own options in the tool input.
pub fn permission_choices(tool: &ToolName) -> Option<&'static str> {
    match tool {
        ToolName::AskUserQuestion => None,
        ToolName::Bash => Some(BASH_CHOICES),
        ToolName::Read | ToolName::Write | ToolName::Edit | ToolName::Other(_) => {
            Some(EDIT_CHOICES)
        }
    }
}

/// Flatten newlines to spaces and cap at `n` chars, appending `...` only when
/// something was cut.
pub fn truncate(s: &str, n: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= n {
        return flat;
    }
    let mut out: String = flat.chars().take(n).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: &str) -> HookEvent {
        HookEvent {
            hook_event_name: HookEventKind::from(kind.to_string()),
            ..Default::default()
        }
    }

    fn permission(tool: &str, input: Value) -> HookEvent {
        HookEvent {
            hook_event_name: HookEventKind::PermissionRequest,
            tool_name: ToolName::from(tool.to_string()),
            tool_input: Some(input),
            ..Default::default()
        }
    }

    #[test]
    fn stop_event_with_prompt_and_response() {
        let msg = build_message(&event("Stop"), "hello", "hi there", false);
        assert!(msg.contains("[Stop]"), "got:\n{msg}");
        assert!(msg.contains("Prompt: \"hello\""), "got:\n{msg}");
        assert!(msg.contains("Response: hi there"), "got:\n{msg}");
    }

    #[test]
    fn reply_omits_prompt() {
        let msg = build_message(&event("Stop"), "my prompt", "my response", true);
        assert!(!msg.contains("Prompt:"), "got:\n{msg}");
        assert!(msg.contains("Response: my response"), "got:\n{msg}");
    }

    #[test]
    fn empty_response_is_omitted() {
        let msg = build_message(&event("TaskCompleted"), "p", "", false);
        assert_eq!(msg, "[TaskCompleted]\nPrompt: \"p\"");
    }

    #[test]
    fn unknown_event_kind_uses_its_name() {
        let msg = build_message(&event("SomethingNew"), "p", "", true);
        assert_eq!(msg, "[SomethingNew]");
    }

    #[test]
    fn multiline_response_is_quoted() {
        let msg = build_message(&event("Stop"), "p", "line1\nline2", true);
        assert_eq!(msg, "[Stop]\nResponse: line1\n> line2");
    }

    #[test]
    fn prompt_is_truncated_and_escaped() {
        let long = format!("say \"hi\"\n{}", "x".repeat(200));
        let msg = build_message(&event("Stop"), &long, "", false);
        let expected = format!("say \\\"hi\\\" {}...", "x".repeat(91));
        assert!(msg.contains(&expected), "got:\n{msg}");
    }

    #[test]
    fn permission_request_for_bash() {
        let msg = build_message(
            &permission("Bash", json!({"command": "rm -rf build"})),
            "clean up",
            "",
            false,
        );
        assert_eq!(
            msg,
            "[PermissionRequest] Bash\n> rm -rf build\n> 1. Yes\n> 2. Yes, and don't ask again for this session\n> 3. No\nPrompt: \"clean up\""
        );
    }

    #[test]
    fn permission_request_for_edit_uses_edit_choices() {
        let msg = build_message(
            &permission("Edit", json!({"file_path": "/src/main.rs"})),
            "",
            "",
            true,
        );
        assert_eq!(
            msg,
            "[PermissionRequest] Edit\n> /src/main.rs\n> 1. Yes\n> 2. Yes, allow all edits during this session\n> 3. No"
        );
    }

    #[test]
    fn permission_request_for_unknown_tool_has_no_detail() {
        let msg = build_message(
            &permission("WebFetch", json!({"url": "https://example.com"})),
            "",
            "",
            true,
        );
        assert!(msg.starts_with("[PermissionRequest] WebFetch\n> 1. Yes"), "got:\n{msg}");
        assert!(!msg.contains("example.com"));
    }

    #[test]
    fn long_detail_is_truncated_to_200_chars() {
        let command = "a".repeat(300);
        let msg = build_message(&permission("Bash", json!({ "command": command })), "", "", true);
        let detail_line = msg.lines().nth(1).unwrap();
        assert_eq!(detail_line, format!("> {}...", "a".repeat(200)));
    }

    #[test]
    fn ask_user_question_detail_lists_options() {
        let input = json!({
            "questions": [{
                "question": "Which approach?",
                "options": [{"label": "A"}, {"label": "B"}]
            }]
        });
        assert_eq!(
            format_tool_input(&ToolName::AskUserQuestion, Some(&input)),
            "Which approach?\n1. A\n2. B\n3. Type something.\n4. Chat about this"
        );
    }

    #[test]
    fn multiple_questions_are_separate_blocks() {
        let input = json!({
            "questions": [
                {"question": "First?", "options": [{"label": "Yes"}]},
                {"question": "", "options": [{"label": "skipped"}]},
                {"question": "Second?"}
            ]
        });
        assert_eq!(
            format_tool_input(&ToolName::AskUserQuestion, Some(&input)),
            "First?\n1. Yes\n2. Type something.\n3. Chat about this\nSecond?\n1. Type something.\n2. Chat about this"
        );
    }

    #[test]
    fn ask_user_question_never_has_choices_and_response() {
        let input = json!({
            "questions": [{"question": "Pick one", "options": [{"label": "A"}]}]
        });
        let msg = build_message(
            &permission("AskUserQuestion", input),
            "prompt",
            "I need to ask something",
            false,
        );
        assert!(!msg.contains("Response:"), "got:\n{msg}");
        assert!(!msg.contains("Yes, and don't ask"), "got:\n{msg}");
        assert!(!msg.contains("allow all edits"), "got:\n{msg}");
        assert!(msg.contains("Pick one 1. A 2. Type something. 3. Chat about this"));
    }

    #[test]
    fn response_kept_for_other_events_mentioning_ask_tool() {
        let mut ev = event("Stop");
        ev.tool_name = ToolName::AskUserQuestion;
        let msg = build_message(&ev, "p", "answer", true);
        assert!(msg.contains("Response: answer"));
    }

    #[test]
    fn tool_input_must_be_an_object() {
        assert_eq!(format_tool_input(&ToolName::Bash, Some(&json!("ls"))), "");
        assert_eq!(format_tool_input(&ToolName::Bash, None), "");
        assert_eq!(format_tool_input(&ToolName::Read, Some(&json!({}))), "");
    }

    #[test]
    fn permission_choices_per_tool() {
        assert_eq!(permission_choices(&ToolName::AskUserQuestion), None);
        assert_eq!(permission_choices(&ToolName::Bash), Some(BASH_CHOICES));
        assert_eq!(permission_choices(&ToolName::Write), Some(EDIT_CHOICES));
        assert_eq!(
            permission_choices(&ToolName::Other("Glob".into())),
            Some(EDIT_CHOICES)
        );
    }

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("exact", 5), "exact");
        assert_eq!(truncate("", 3), "");
    }

    #[test]
    fn truncate_counts_code_points_and_flattens_newlines() {
        assert_eq!(truncate("hello world", 5), "hello...");
        assert_eq!(truncate("a\nb", 10), "a b");
        assert_eq!(truncate("日本語のテキスト", 3), "日本語...");
    }

    #[test]
    fn truncate_output_is_bounded_and_single_line() {
        let samples = [
            String::new(),
            "a".to_string(),
            "line\nbreak\n".to_string(),
            "ü".repeat(150),
        ];
        for s in &samples {
            for n in [0, 1, 5, 100] {
                let out = truncate(s, n);
                assert!(!out.contains('\n'));
                assert!(out.chars().count() <= n + 3);
                if s.chars().count() <= n && !s.contains('\n') {
                    assert_eq!(&out, s);
                }
            }
        }
    }
}
