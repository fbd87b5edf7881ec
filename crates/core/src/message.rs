//! Control-message protocol between the page and the worker.
//!
//! The page posts a `WorkerMessage`; messages that expect an answer carry a
//! oneshot reply channel that the worker answers exactly once.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::Error;

/// Commands understood by the worker inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate the waiting instance without waiting for old clients.
    SkipWaiting,
    /// Report total cached bytes across partitions, in KB.
    GetCacheSize,
    /// Delete every partition.
    ClearCache,
    /// Report the running version string.
    GetVersion,
}

impl WorkerMessage {
    /// Whether the sender should attach a reply channel.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, WorkerMessage::SkipWaiting)
    }
}

/// Replies, serialized untagged: `{size}`, `{cleared}`, `{version}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum WorkerReply {
    Size { size: u64 },
    Cleared { cleared: bool },
    Version { version: String },
}

/// A message in flight with its optional reply port.
#[derive(Debug)]
pub struct Envelope {
    pub message: WorkerMessage,
    pub reply: Option<oneshot::Sender<WorkerReply>>,
}

/// Page-side handle to the worker inbox.
#[derive(Debug, Clone)]
pub struct WorkerChannel {
    tx: mpsc::Sender<Envelope>,
}

/// Create a worker inbox with the given buffer size.
pub fn channel(buffer: usize) -> (WorkerChannel, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(buffer);
    (WorkerChannel { tx }, rx)
}

impl WorkerChannel {
    /// Fire-and-forget post.
    pub async fn post(&self, message: WorkerMessage) -> Result<(), Error> {
        self.tx
            .send(Envelope { message, reply: None })
            .await
            .map_err(|_| Error::InvalidState("worker inbox closed".into()))
    }

    /// Post with a reply port and wait for the answer.
    ///
    /// Only messages that expect a reply may be requested.
    pub async fn request(&self, message: WorkerMessage) -> Result<WorkerReply, Error> {
        if !message.expects_reply() {
            return Err(Error::InvalidInput(format!("{message:?} has no reply")));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope { message, reply: Some(reply_tx) })
            .await
            .map_err(|_| Error::InvalidState("worker inbox closed".into()))?;
        reply_rx
            .await
            .map_err(|_| Error::InvalidState(format!("worker dropped reply to {message:?}")))
    }
}
