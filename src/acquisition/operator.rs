use async_trait::async_trait;
use std::fmt::Debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, stdin, stdout};
use tracing::warn;

/// Injected seam for operator prompts, so acquisition strategies stay
/// decoupled from any particular UI. `prompt_text` returns `None` when the
/// operator cancels (empty input).
#[async_trait]
pub trait OperatorInput: Debug + Send + Sync {
    async fn prompt_text(&self, label: &str) -> Option<String>;
    async fn prompt_confirm(&self, message: &str) -> bool;
}

/// Console implementation reading from stdin. An empty line cancels a text
/// prompt; a confirmation accepts `y`/`yes` (case-insensitive) only.
#[derive(Debug)]
pub struct ConsoleInput;

impl ConsoleInput {
    async fn read_line(&self, prompt: &str) -> Option<String> {
        let mut out = stdout();
        if let Err(e) = out.write_all(prompt.as_bytes()).await.and(out.flush().await) {
            warn!("Could not write prompt: {}", e);
            return None;
        }

        let mut line = String::new();
        match BufReader::new(stdin()).read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let line = line.trim().to_string();
                if line.is_empty() { None } else { Some(line) }
            }
        }
    }
}

#[async_trait]
impl OperatorInput for ConsoleInput {
    async fn prompt_text(&self, label: &str) -> Option<String> {
        self.read_line(&format!("{}: ", label)).await
    }

    async fn prompt_confirm(&self, message: &str) -> bool {
        match self.read_line(&format!("{} [y/N]: ", message)).await {
            Some(answer) => matches!(answer.to_lowercase().as_str(), "y" | "yes"),
            None => false,
        }
    }
}

#[cfg(test)]
pub use scripted::ScriptedInput;
