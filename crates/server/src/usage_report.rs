//! Weekly `ccusage` report posted to Slack on a cron schedule.

use std::fmt::Write as _;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::gateway::{ChatGateway, GatewayError};

const MODELS_WIDTH: usize = 20;

#[derive(Debug, Error)]
pub enum UsageReportError {
    #[error("ccusage command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ccusage command exited with {status}: {stderr}")]
    Exit {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("parse ccusage json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("post usage report: {0}")]
    Post(#[from] GatewayError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeeklyReport {
    #[serde(default)]
    weekly: Vec<WeekUsage>,
    #[serde(default)]
    totals: UsageTotals,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeekUsage {
    week: String,
    #[serde(flatten)]
    usage: UsageTotals,
    #[serde(default)]
    models_used: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UsageTotals {
    input_tokens: i64,
    output_tokens: i64,
    cache_creation_tokens: i64,
    cache_read_tokens: i64,
    total_tokens: i64,
    total_cost: f64,
}

/// Render `ccusage weekly --json` output as a Slack code-block table.
pub fn format_usage_table(json: &[u8]) -> Result<String, UsageReportError> {
    let report: WeeklyReport = serde_json::from_slice(json)?;

    let mut out = String::from("*Weekly Usage Report*\n```\n");
    write_row(&mut out, "Week", "Models", &header_cells());
    write_rule(&mut out);
    for week in &report.weekly {
        let models = cap_width(&short_models(&week.models_used), MODELS_WIDTH);
        write_row(&mut out, &week.week, &models, &usage_cells(&week.usage));
    }
    write_rule(&mut out);
    write_row(&mut out, "Total", "", &usage_cells(&report.totals));
    out.push_str("```");

    Ok(out)
}

fn header_cells() -> [String; 6] {
    ["Input", "Output", "CacheWr", "CacheRd", "Total", "Cost"].map(str::to_string)
}

fn usage_cells(usage: &UsageTotals) -> [String; 6] {
    [
        format_tokens(usage.input_tokens),
        format_tokens(usage.output_tokens),
        format_tokens(usage.cache_creation_tokens),
        format_tokens(usage.cache_read_tokens),
        format_tokens(usage.total_tokens),
        format_cost(usage.total_cost),
    ]
}

fn write_row(out: &mut String, week: &str, models: &str, cells: &[String; 6]) {
    let [input, output, cache_wr, cache_rd, total, cost] = cells;
    let _ = writeln!(
        out,
        "| {week:<10} | {models:<20} | {input:>8} | {output:>8} | {cache_wr:>8} | {cache_rd:>8} | {total:>8} | {cost:>9} |"
    );
}

fn write_rule(out: &mut String) {
    let rule: Vec<String> = [12, 22, 10, 10, 10, 10, 10, 11]
        .iter()
        .map(|width| "-".repeat(*width))
        .collect();
    let _ = writeln!(out, "|{}|", rule.join("|"));
}

/// `1500` → `1.5K`, `1500000` → `1.5M`, below 1000 unchanged.
pub fn format_tokens(n: i64) -> String {
    let value = n as f64;
    match n {
        n if n >= 1_000_000_000 => format!("{:.1}B", value / 1_000_000_000.0),
        n if n >= 1_000_000 => format!("{:.1}M", value / 1_000_000.0),
        n if n >= 1_000 => format!("{:.1}K", value / 1_000.0),
        n => n.to_string(),
    }
}

fn format_cost(cost: f64) -> String {
    format!("${cost:.2}")
}

/// `claude-opus-4-5-20251101` → `opus-4-5`.
pub fn short_models(models: &[String]) -> String {
    models
        .iter()
        .map(|model| {
            let name = model.strip_prefix("claude-").unwrap_or(model);
            let parts: Vec<&str> = name.split('-').collect();
            if parts.len() > 3 {
                parts[..3].join("-")
            } else {
                name.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn cap_width(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut capped: String = s.chars().take(width - 1).collect();
    capped.push('~');
    capped
}

pub struct UsageReporter {
    program: String,
    gateway: Arc<dyn ChatGateway>,
    channel: String,
}

impl UsageReporter {
    pub fn new(gateway: Arc<dyn ChatGateway>, channel: String) -> Self {
        Self {
            program: "ccusage".to_string(),
            gateway,
            channel,
        }
    }

    async fn fetch(&self) -> Result<Vec<u8>, UsageReportError> {
        let output = Command::new(&self.program)
            .args(["weekly", "--json"])
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(UsageReportError::Exit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Format `json` and post it as a new top-level message.
    async fn post_report(&self, json: &[u8]) -> Result<(), UsageReportError> {
        let text = format_usage_table(json)?;
        self.gateway.post_message(&self.channel, &text, "").await?;
        Ok(())
    }

    pub async fn report_once(&self) -> Result<(), UsageReportError> {
        let json = self.fetch().await?;
        self.post_report(&json).await
    }

    /// Run `report_once` at every firing of `schedule` (local time) until
    /// `shutdown` flips to `true`.
    pub fn spawn(
        self,
        schedule: cron::Schedule,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                component = "usage_report",
                event = "usage_report.scheduled",
                schedule = %schedule,
                "ccusage cron started"
            );

            while let Some(next) = schedule.upcoming(chrono::Local).next() {
                let wait = (next - chrono::Local::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                info!(
                    component = "usage_report",
                    event = "usage_report.running",
                    "Running ccusage weekly report"
                );
                if let Err(err) = self.report_once().await {
                    warn!(
                        component = "usage_report",
                        event = "usage_report.failed",
                        error = %err,
                        "ccusage weekly report failed"
                    );
                }
            }
        })
    }
}
