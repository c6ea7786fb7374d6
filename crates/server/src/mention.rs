//! Mention handling: who to @-mention on outgoing posts, and stripping the
//! bot mention from incoming replies.

use std::sync::LazyLock;

use regex::Regex;

static LEADING_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@[A-Z0-9]+>\s*").expect("valid mention regex"));

/// Slack user IDs start with `U`; posting to one opens a DM with that user.
pub fn is_direct_message_channel(channel_id: &str) -> bool {
    channel_id.starts_with('U')
}

/// The user to mention: the explicit one if configured, else the DM
/// recipient when the channel is a user ID, else nobody.
pub fn resolve_mention_target<'a>(explicit_user_id: &'a str, channel_id: &'a str) -> Option<&'a str> {
    if !explicit_user_id.is_empty() {
        return Some(explicit_user_id);
    }
    if is_direct_message_channel(channel_id) {
        return Some(channel_id);
    }
    None
}

/// Prefix `text` with a Slack mention of `user_id`.
pub fn with_mention(user_id: &str, text: &str) -> String {
    format!("<@{user_id}> {text}")
}

/// Remove one leading `<@ID>` token (and the whitespace after it).
pub fn strip_mention(text: &str) -> &str {
    match LEADING_MENTION.find(text) {
        Some(found) => &text[found.end()..],
        None => text,
    }
}
