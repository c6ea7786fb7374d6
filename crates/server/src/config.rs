//! Command-line and environment configuration.
//!
//! Flags come from clap; Slack secrets come from `CC_NOTIFY_SLACK_*` env vars
//! with the shorter `SLACK_*` names as fallbacks.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::mention::is_direct_message_channel;
use crate::slack::DEFAULT_API_BASE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CC_NOTIFY_SLACK_TOKEN and CC_NOTIFY_SLACK_CHANNEL must be set")]
    MissingSlackCredentials,

    #[error("CC_NOTIFY_SLACK_USER_ID is required when the bot is enabled with a channel (non-DM)")]
    MissingAllowedUser,

    #[error("invalid ccusage cron schedule {expr:?}: {source}")]
    InvalidCron {
        expr: String,
        #[source]
        source: cron::error::Error,
    },

    #[error("unsupported day-of-week field in ccusage cron schedule {expr:?}")]
    UnsupportedWeekday { expr: String },
}

#[derive(Debug, Parser)]
#[command(
    name = "cc-slack",
    version,
    about = "Post Claude Code hook events to Slack threads and relay thread replies back to tmux"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub slack: SlackArgs,

    /// Data directory (logs live under `<dir>/logs`)
    #[arg(long, global = true, env = "CC_SLACK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    pub log_stderr: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the hook server (default)
    Serve,
    /// Read one hook event JSON from stdin and post it without thread tracking
    Notify,
}

#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    /// Server listen port
    #[arg(long, default_value_t = 19999, env = "CC_SLACK_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Cron schedule for the ccusage weekly report, standard 5-field
    /// (e.g. "0 9 * * 1" for Mondays at 09:00, local time)
    #[arg(long)]
    pub ccusage_cron: Option<String>,

    /// Delay before reading the transcript, to let Claude finish writing it
    #[arg(long, default_value_t = 500)]
    pub hook_grace_ms: u64,

    /// How often stale sessions are swept
    #[arg(long, default_value_t = 3600)]
    pub sweep_interval_secs: u64,

    /// Sessions older than this are forgotten
    #[arg(long, default_value_t = 30)]
    pub max_session_age_days: u64,

    /// Delay between Socket Mode reconnect attempts
    #[arg(long, default_value_t = 5)]
    pub reconnect_delay_secs: u64,
}

#[derive(Debug, Clone, Args)]
pub struct SlackArgs {
    /// Slack bot token (fallback: SLACK_TOKEN)
    #[arg(long, global = true, env = "CC_NOTIFY_SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Channel ID to post to; a user ID (U...) posts as a DM (fallback: SLACK_CHANNEL)
    #[arg(long, global = true, env = "CC_NOTIFY_SLACK_CHANNEL")]
    pub slack_channel: Option<String>,

    /// User to @-mention on every post
    #[arg(long, global = true, env = "CC_NOTIFY_SLACK_USER_ID")]
    pub slack_user_id: Option<String>,

    /// App-level token; enables the Socket Mode reply relay
    #[arg(long, global = true, env = "CC_NOTIFY_SLACK_APP_TOKEN", hide_env_values = true)]
    pub slack_app_token: Option<String>,

    /// Slack Web API base URL
    #[arg(long, global = true, default_value = DEFAULT_API_BASE, env = "CC_SLACK_API_BASE")]
    pub slack_api_base: String,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: String,
    pub channel: String,
    /// Empty when no explicit mention is configured.
    pub mention_user_id: String,
    pub app_token: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub hook_grace: Duration,
    pub sweep_interval: Duration,
    pub max_session_age: Duration,
    pub reconnect_delay: Duration,
    pub ccusage_schedule: Option<cron::Schedule>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SlackArgs {
    /// Resolve secrets, consulting `fallback_env` for the `SLACK_*` names.
    pub fn resolve<F>(&self, fallback_env: F) -> Result<SlackConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = non_empty(self.slack_token.as_deref())
            .or_else(|| non_empty(fallback_env("SLACK_TOKEN").as_deref()));
        let channel = non_empty(self.slack_channel.as_deref())
            .or_else(|| non_empty(fallback_env("SLACK_CHANNEL").as_deref()));

        let (Some(bot_token), Some(channel)) = (bot_token, channel) else {
            return Err(ConfigError::MissingSlackCredentials);
        };

        Ok(SlackConfig {
            bot_token,
            channel,
            mention_user_id: non_empty(self.slack_user_id.as_deref()).unwrap_or_default(),
            app_token: non_empty(self.slack_app_token.as_deref()),
            api_base: self.slack_api_base.clone(),
        })
    }
}

impl SlackConfig {
    /// The only user whose thread replies are relayed. `None` when the relay
    /// is disabled (no app token).
    pub fn allowed_user(&self) -> Result<Option<String>, ConfigError> {
        if self.app_token.is_none() {
            return Ok(None);
        }
        let allowed = if is_direct_message_channel(&self.channel) {
            self.channel.clone()
        } else {
            self.mention_user_id.clone()
        };
        if allowed.is_empty() {
            return Err(ConfigError::MissingAllowedUser);
        }
        Ok(Some(allowed))
    }
}

impl ServerArgs {
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let ccusage_schedule = self
            .ccusage_cron
            .as_deref()
            .map(str::trim)
            .filter(|expr| !expr.is_empty())
            .map(parse_cron)
            .transpose()?;

        Ok(ServerConfig {
            addr: SocketAddr::new(self.bind, self.port),
            hook_grace: Duration::from_millis(self.hook_grace_ms),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
            max_session_age: Duration::from_secs(
                self.max_session_age_days.saturating_mul(24 * 60 * 60),
            ),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            ccusage_schedule,
        })
    }
}

/// Parse a cron expression. Classic 5-field expressions (weekdays `0`-`6`,
/// `0` = Sunday, `7` also Sunday) get a leading seconds field of `0` and
/// their weekday numbers shifted to the `cron` crate's `1`-`7`, `1` = Sunday.
/// Other forms are handed to the crate unchanged.
pub fn parse_cron(expr: &str) -> Result<cron::Schedule, ConfigError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let normalized = match fields.as_slice() {
        [minute, hour, day, month, weekday] => {
            let weekday =
                shift_weekdays(weekday).ok_or_else(|| ConfigError::UnsupportedWeekday {
                    expr: expr.to_string(),
                })?;
            format!("0 {minute} {hour} {day} {month} {weekday}")
        }
        _ => expr.to_string(),
    };
    cron::Schedule::from_str(&normalized).map_err(|source| ConfigError::InvalidCron {
        expr: expr.to_string(),
        source,
    })
}

/// Rewrite a 5-field day-of-week field from 0-based to 1-based numbering.
/// Names (`MON`), `*` and `?` pass through. `None` means the field can't be
/// shifted: a number above `7`, or a range ending in `7`.
fn shift_weekdays(field: &str) -> Option<String> {
    let items = field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (item, None),
            };
            let range = match range.split_once('-') {
                Some((start, end)) => {
                    let start = shift_weekday(start, false)?;
                    let end = shift_weekday(end, true)?;
                    format!("{start}-{end}")
                }
                None => shift_weekday(range, false)?,
            };
            Some(match step {
                Some(step) => format!("{range}/{step}"),
                None => range,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(items.join(","))
}

fn shift_weekday(token: &str, range_end: bool) -> Option<String> {
    match token.parse::<u8>() {
        Ok(day @ 0..=6) => Some((day + 1).to_string()),
        // `7` is Sunday too, but a range can't wrap back to `1`.
        Ok(7) if !range_end => Some("1".to_string()),
        Ok(_) => None,
        Err(_) => Some(token.to_string()),
    }
}
