use crate::domain::Reading;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::fmt::Debug;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing::warn;

/// A live, cancellable stream of positioning readings. Dropping the stream
/// cancels the underlying subscription; dropping it twice is trivially
/// idempotent.
pub type ReadingStream = BoxStream<'static, Result<Reading, PositioningError>>;

#[async_trait]
pub trait PositioningSource: Debug + Send + Sync {
    async fn watch(&self) -> Result<ReadingStream, PositioningError>;
}

#[derive(Error, Debug)]
pub enum PositioningError {
    #[error("could not read positioning feed: {0}")]
    Feed(#[from] std::io::Error),
    #[error("positioning provider timed out")]
    Timeout,
}

/// Positioning source backed by an NDJSON feed, one `Reading` per line, as
/// exported by a receiver daemon to a file or FIFO. Lines that fail to parse
/// are skipped with a warning so a glitchy receiver cannot abort an
/// acquisition; a feed that stays silent longer than `fix_timeout` yields a
/// timeout error.
#[derive(Debug)]
pub struct FeedPositioningSource {
    path: PathBuf,
    fix_timeout: Duration,
}

impl FeedPositioningSource {
    pub fn new(path: impl Into<PathBuf>, fix_timeout: Duration) -> Self {
        FeedPositioningSource {
            path: path.into(),
            fix_timeout,
        }
    }
}

#[async_trait]
impl PositioningSource for FeedPositioningSource {
    async fn watch(&self) -> Result<ReadingStream, PositioningError> {
        let file = File::open(&self.path).await?;
        let lines = LinesStream::new(BufReader::new(file).lines());

        let readings = tokio_stream::StreamExt::timeout(lines, self.fix_timeout).filter_map(|item| async move {
            match item {
                Ok(Ok(line)) if line.trim().is_empty() => None,
                Ok(Ok(line)) => match serde_json::from_str::<Reading>(&line) {
                    Ok(reading) => Some(Ok(reading)),
                    Err(e) => {
                        warn!("Skipping malformed feed line: {}", e);
                        None
                    }
                },
                Ok(Err(e)) => Some(Err(PositioningError::Feed(e))),
                Err(_elapsed) => Some(Err(PositioningError::Timeout)),
            }
        });

        Ok(readings.boxed())
    }
}

#[cfg(test)]
pub use scripted::ScriptedPositioningSource;
