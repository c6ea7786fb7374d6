//! Terminal relay: types Slack replies into the agent's tmux pane.

use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("tmux send-keys {step}: {source}")]
    Spawn {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("tmux send-keys {step}: exited with {status}")]
    Exit {
        step: &'static str,
        status: std::process::ExitStatus,
    },
}

#[async_trait]
pub trait TerminalRelay: Send + Sync {
    /// Type `text` into `target`, then submit it.
    async fn send_keys(&self, target: &str, text: &str) -> Result<(), TerminalError>;
}

/// Shells out to `tmux send-keys`. The text and the Enter keystroke are two
/// separate invocations; the first can succeed while the second fails.
#[derive(Debug, Clone)]
pub struct TmuxRelay {
    program: String,
}

impl TmuxRelay {
    pub fn new() -> Self {
        Self {
            program: "tmux".to_string(),
        }
    }

    async fn send(&self, step: &'static str, target: &str, keys: &str) -> Result<(), TerminalError> {
        let status = Command::new(&self.program)
            .args(["send-keys", "-t", target, keys])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| TerminalError::Spawn { step, source })?;

        if !status.success() {
            return Err(TerminalError::Exit { step, status });
        }
        Ok(())
    }
}

impl Default for TmuxRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TerminalRelay for TmuxRelay {
    async fn send_keys(&self, target: &str, text: &str) -> Result<(), TerminalError> {
        self.send("message", target, text).await?;
        self.send("Enter", target, "Enter").await
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::Mutex;

    use super::*;

    /// Records `(target, text)` pairs instead of touching tmux.
    #[derive(Default)]
    pub struct FakeTerminal {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl FakeTerminal {
        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TerminalRelay for FakeTerminal {
        async fn send_keys(&self, target: &str, text: &str) -> Result<(), TerminalError> {
            self.sent
                .lock()
                .unwrap()
                .push((target.to_string(), text.to_string()));
            Ok(())
        }
    }
}
