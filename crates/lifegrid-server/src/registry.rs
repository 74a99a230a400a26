//! Command registry and dispatcher.
//!
//! Each command name maps to one [`CommandHandler`]. For every incoming
//! frame the dispatcher decodes the payload into the handler's typed
//! [`CommandHandler::Data`], runs the handler as its own task with a
//! bounded output channel, and relays whatever the handler sends to the
//! socket in order until every sender has been dropped.
//!
//! A handler's channel may outlive the handler itself: `observe` hands a
//! clone of its sender to a region event relay, so region events keep
//! flowing through that dispatch until the region is dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{OwnedSemaphorePermit, mpsc};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::CommandError;
use crate::protocol::{IncomingMessage, OutgoingMessage};

/// Capacity of each command's output channel.
pub const OUTPUT_CHANNEL_CAPACITY: usize = 100;

/// Send side of a command's output channel.
pub type Output = mpsc::Sender<OutgoingMessage>;

/// A command implementation.
pub trait CommandHandler: Send + Sync + 'static {
    /// Payload type decoded from the message's `data` object.
    type Data: DeserializeOwned + Send + 'static;

    /// Run the command, sending replies through `out`.
    ///
    /// The command is finished, from the dispatcher's point of view, when
    /// the last clone of `out` is dropped.
    fn handle(
        &self,
        data: Self::Data,
        conn: Arc<Connection>,
        out: Output,
    ) -> impl Future<Output = ()> + Send;
}

/// A handler with its payload type erased.
type ErasedHandler =
    Box<dyn Fn(Value, Arc<Connection>, Output) -> Result<BoxFuture<'static, ()>, CommandError> + Send + Sync>;

/// Maps command names to handlers and runs them.
pub struct CommandRegistry {
    handlers: HashMap<String, ErasedHandler>,
    timeout: Option<Duration>,
}

impl CommandRegistry {
    /// An empty registry with no handler deadline.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            timeout: None,
        }
    }

    /// Cancel handlers that run longer than `timeout`. `None` disables it.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register `handler` under `name`, replacing any earlier registration.
    pub fn register<H: CommandHandler>(&mut self, name: &str, handler: H) {
        let handler = Arc::new(handler);
        let erased: ErasedHandler = Box::new(
            move |data: Value, conn: Arc<Connection>, out: Output| -> Result<BoxFuture<'static, ()>, CommandError> {
                let data: H::Data = serde_json::from_value(data).map_err(|e| {
                    debug!(error = %e, "command data did not decode");
                    CommandError::UnknownCommand
                })?;
                let handler = Arc::clone(&handler);
                Ok(Box::pin(async move { handler.handle(data, conn, out).await }))
            },
        );
        self.handlers.insert(name.to_owned(), erased);
    }

    /// Whether `name` has a handler.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Decode one frame and dispatch it on its own task.
    ///
    /// Waits for a free command slot first, so a client flooding commands
    /// is slowed down at the reader. Undecodable frames are answered with
    /// `unknown command` straight away.
    pub async fn dispatch_frame(self: &Arc<Self>, conn: &Arc<Connection>, frame: &str) {
        let message = match IncomingMessage::parse(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(connection = %conn.id(), error = %e, "invalid message received");
                reply_error(conn, CommandError::UnknownCommand).await;
                return;
            }
        };

        let Ok(permit) = conn.acquire_slot().await else {
            return;
        };

        let registry = Arc::clone(self);
        let conn = Arc::clone(conn);
        tokio::spawn(async move {
            let command = message.command.clone();
            registry
                .handle(&command, message.into_data(), &conn, Some(permit))
                .await;
        });
    }

    /// Like [`dispatch_frame`](Self::dispatch_frame) for a binary frame,
    /// which must hold UTF-8 JSON.
    pub async fn dispatch_bytes(self: &Arc<Self>, conn: &Arc<Connection>, frame: &[u8]) {
        match std::str::from_utf8(frame) {
            Ok(text) => self.dispatch_frame(conn, text).await,
            Err(e) => {
                warn!(connection = %conn.id(), error = %e, "binary frame is not UTF-8");
                reply_error(conn, CommandError::UnknownCommand).await;
            }
        }
    }

    /// Run one command to completion.
    ///
    /// Replies go to `conn` in the order the handler produced them. Stops
    /// early if a write fails. `permit` is held until the handler itself
    /// returns, not until its channel drains.
    pub async fn handle(
        &self,
        name: &str,
        data: Value,
        conn: &Arc<Connection>,
        permit: Option<OwnedSemaphorePermit>,
    ) {
        let Some(handler) = self.handlers.get(name) else {
            warn!(connection = %conn.id(), command = name, "unknown command received");
            reply_error(conn, CommandError::UnknownCommand).await;
            return;
        };

        let (tx, mut rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let task = match handler(data, Arc::clone(conn), tx) {
            Ok(task) => task,
            Err(e) => {
                warn!(connection = %conn.id(), command = name, "invalid command data");
                reply_error(conn, e).await;
                return;
            }
        };

        debug!(connection = %conn.id(), command = name, "executing command");
        let timeout = self.timeout;
        let command = name.to_owned();
        let connection = conn.id();
        tokio::spawn(async move {
            let _permit = permit;
            match timeout {
                Some(limit) => {
                    if tokio::time::timeout(limit, task).await.is_err() {
                        warn!(%connection, command = %command, timeout_ms = limit.as_millis(), "command timed out");
                    }
                }
                None => task.await,
            }
        });

        while let Some(message) = rx.recv().await {
            if let Err(e) = conn.send(&message).await {
                debug!(connection = %conn.id(), command = name, error = %e, "failed to send message to client");
                return;
            }
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands())
            .field("timeout", &self.timeout)
            .finish()
    }
}

async fn reply_error(conn: &Connection, err: CommandError) {
    if let Err(e) = conn.send(&err.into()).await {
        debug!(connection = %conn.id(), error = %e, "failed to send error to client");
    }
}
