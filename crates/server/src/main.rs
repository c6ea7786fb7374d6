//! cc-slack
//!
//! Posts Claude Code hook events to Slack, one thread per session, and
//! types thread replies back into the session's tmux pane.

mod cmd_notify;
mod config;
mod gateway;
mod hook_handler;
mod logging;
mod mention;
mod message;
mod paths;
mod registry;
mod relay;
mod slack;
mod terminal;
mod transcript;
mod usage_report;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{Cli, Command, ServerConfig, SlackConfig};
use crate::hook_handler::{router, HookState};
use crate::registry::{spawn_sweeper, SessionRegistry};
use crate::relay::{InboundRelay, ReplyRouter};
use crate::slack::SlackClient;
use crate::terminal::TmuxRelay;
use crate::usage_report::UsageReporter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve);

    paths::init_data_dir(cli.data_dir.as_deref());
    let log_to_stderr = cli.log_stderr || command == Command::Notify;
    let logging = logging::init_logging(log_to_stderr)?;

    let slack = cli
        .slack
        .resolve(|name| std::env::var(name).ok())
        .context("slack configuration")?;
    let client = SlackClient::new(&slack.api_base, &slack.bot_token)?;

    match command {
        Command::Notify => {
            cmd_notify::run(tokio::io::stdin(), &client, &slack.channel).await
        }
        Command::Serve => {
            let server = cli.server.resolve()?;
            serve(server, slack, client, &logging.run_id).await
        }
    }
}

async fn serve(
    server: ServerConfig,
    slack: SlackConfig,
    client: SlackClient,
    run_id: &str,
) -> anyhow::Result<()> {
    let allowed_user = slack.allowed_user()?;
    let registry = Arc::new(SessionRegistry::new());
    let gateway = Arc::new(client.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut background = vec![spawn_sweeper(
        registry.clone(),
        server.sweep_interval,
        server.max_session_age,
        shutdown_rx.clone(),
    )];

    if let Some(app_token) = slack.app_token.clone() {
        let router = ReplyRouter::new(
            registry.clone(),
            Arc::new(TmuxRelay::new()),
            allowed_user.clone(),
        );
        let relay = InboundRelay::new(router, client, app_token, server.reconnect_delay);
        background.push(relay.spawn(shutdown_rx.clone()));
        info!(
            component = "server",
            event = "server.relay_enabled",
            allowed_user = allowed_user.as_deref().unwrap_or_default(),
            "Slack reply relay enabled"
        );
    }

    if let Some(schedule) = server.ccusage_schedule.clone() {
        let reporter = UsageReporter::new(gateway.clone(), slack.channel.clone());
        background.push(reporter.spawn(schedule, shutdown_rx.clone()));
    }

    let state = Arc::new(HookState {
        registry,
        gateway,
        channel: slack.channel.clone(),
        mention_user_id: slack.mention_user_id.clone(),
        grace: server.hook_grace,
    });
    let app = router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(server.addr)
        .await
        .with_context(|| format!("bind {}", server.addr))?;
    info!(
        component = "server",
        event = "server.listening",
        version = VERSION,
        run_id = %run_id,
        addr = %server.addr,
        channel = %slack.channel,
        "cc-slack listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(
                    component = "server",
                    event = "server.signal_failed",
                    error = %err,
                    "Failed to listen for ctrl-c"
                );
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!(
        component = "server",
        event = "server.shutting_down",
        "Shutdown requested"
    );
    let _ = shutdown_tx.send(true);
    for handle in background {
        if let Err(err) = handle.await {
            warn!(
                component = "server",
                event = "server.task_join_failed",
                error = %err,
                "Background task ended abnormally"
            );
        }
    }

    Ok(())
}
