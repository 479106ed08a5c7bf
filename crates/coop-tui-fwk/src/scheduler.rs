//! Runs commands on tokio tasks.
//!
//! The scheduler turns each asynchronous unit of a [`Command`] into a
//! spawned task that reports back through the [`MessageBus`](crate::bus::MessageBus).
//! Streams are consumed until they end, so a progress sequence keeps
//! flowing without the program having to ask for the next item.
//! Synchronous messages are returned to the caller instead of going
//! through the bus, so they are handled before the next input.

use std::collections::VecDeque;

use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::bus::BusSender;
use crate::command::Command;

/// Executes commands and routes their messages to the event loop.
pub struct Scheduler<M> {
    sender: BusSender<M>,
    workers: Vec<JoinHandle<()>>,
}

impl<M: Send + 'static> Scheduler<M> {
    /// Create a scheduler delivering into `sender`.
    pub fn new(sender: BusSender<M>) -> Self {
        Self {
            sender,
            workers: Vec::new(),
        }
    }

    /// Run `command`.
    ///
    /// Synchronous messages are appended to `immediate` in order. Must be
    /// called from within a tokio runtime.
    pub fn schedule(&mut self, command: Command<M>, immediate: &mut VecDeque<M>) {
        match command {
            Command::None => {}
            Command::Message(message) => immediate.push_back(message),
            Command::Perform { tag, future } => {
                if let Some(tag) = &tag {
                    tracing::debug!(%tag, "scheduling operation");
                }
                let sender = self.sender.clone();
                self.spawn(async move {
                    let message = future.await;
                    if sender.send(message).await.is_err() {
                        tracing::debug!("event loop gone, dropping result");
                    }
                });
            }
            Command::Stream { tag, mut stream } => {
                if let Some(tag) = &tag {
                    tracing::debug!(%tag, "scheduling stream");
                }
                let sender = self.sender.clone();
                self.spawn(async move {
                    while let Some(message) = stream.next().await {
                        if sender.send(message).await.is_err() {
                            tracing::debug!("event loop gone, abandoning stream");
                            break;
                        }
                    }
                });
            }
            Command::Batch(commands) => {
                for command in commands {
                    self.schedule(command, immediate);
                }
            }
        }
    }

    fn spawn<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.workers.retain(|handle| !handle.is_finished());
        self.workers.push(tokio::spawn(future));
    }

    /// Number of workers that have not finished yet.
    pub fn in_flight(&mut self) -> usize {
        self.workers.retain(|handle| !handle.is_finished());
        self.workers.len()
    }
}
