//! Deferred units of work.
//!
//! A [`Command`] describes work a handler wants done without doing it.
//! The [`Scheduler`](crate::scheduler::Scheduler) runs it on a tokio task
//! and feeds the resulting message back into the event loop. Commands are
//! fire-and-forget: once scheduled they run to completion.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};

/// Identity of a tracked backend operation.
///
/// The message completing the operation carries an equal tag, which lets
/// the dispatcher settle the pending entry and lets receivers drop results
/// that are no longer relevant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: &'static str,
    pub target: String,
}

impl Tag {
    pub fn new(kind: &'static str, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.target)
    }
}

/// A deferred unit of work producing messages of type `M`.
pub enum Command<M> {
    /// Nothing to do.
    None,
    /// Deliver a message to the program right away, before the next input.
    Message(M),
    /// Run a future that yields exactly one message.
    Perform {
        tag: Option<Tag>,
        future: BoxFuture<'static, M>,
    },
    /// Forward every item of a stream, in order, until it ends.
    Stream {
        tag: Option<Tag>,
        stream: BoxStream<'static, M>,
    },
    /// Several commands at once.
    Batch(Vec<Command<M>>),
}

impl<M: Send + 'static> Command<M> {
    /// The empty command.
    #[inline]
    pub fn none() -> Self {
        Command::None
    }

    /// A synchronous message to the program itself.
    pub fn message(message: M) -> Self {
        Command::Message(message)
    }

    /// Untracked asynchronous work.
    pub fn perform<F>(future: F) -> Self
    where
        F: Future<Output = M> + Send + 'static,
    {
        Command::Perform {
            tag: None,
            future: future.boxed(),
        }
    }

    /// Tracked asynchronous work.
    pub fn tracked<F>(tag: Tag, future: F) -> Self
    where
        F: Future<Output = M> + Send + 'static,
    {
        Command::Perform {
            tag: Some(tag),
            future: future.boxed(),
        }
    }

    /// Tracked stream of messages.
    pub fn stream<S>(tag: Tag, stream: S) -> Self
    where
        S: Stream<Item = M> + Send + 'static,
    {
        Command::Stream {
            tag: Some(tag),
            stream: stream.boxed(),
        }
    }

    /// Deliver `message` after `delay`.
    pub fn after(delay: Duration, message: M) -> Self {
        Command::perform(async move {
            tokio::time::sleep(delay).await;
            message
        })
    }

    /// Combine commands, dropping empty ones.
    pub fn batch(commands: impl IntoIterator<Item = Command<M>>) -> Self {
        let mut commands: Vec<_> = commands.into_iter().filter(|c| !c.is_none()).collect();
        match commands.len() {
            0 => Command::None,
            1 => commands.pop().unwrap_or(Command::None),
            _ => Command::Batch(commands),
        }
    }

    /// Combine with another command.
    pub fn and(self, other: Command<M>) -> Self {
        Command::batch([self, other])
    }

    /// Check if this is the empty command.
    #[inline]
    pub fn is_none(&self) -> bool {
        match self {
            Command::None => true,
            Command::Batch(commands) => commands.iter().all(Command::is_none),
            _ => false,
        }
    }

    /// Tags of every tracked unit in this command.
    pub fn tags(&self) -> Vec<&Tag> {
        let mut tags = Vec::new();
        self.collect_tags(&mut tags);
        tags
    }

    fn collect_tags<'a>(&'a self, out: &mut Vec<&'a Tag>) {
        match self {
            Command::Perform { tag: Some(tag), .. } | Command::Stream { tag: Some(tag), .. } => {
                out.push(tag)
            }
            Command::Batch(commands) => {
                for command in commands {
                    command.collect_tags(out);
                }
            }
            _ => {}
        }
    }

    /// Drop tracked units whose tag `keep` rejects.
    ///
    /// Returns the rejected tags. Untracked units and messages are kept.
    pub fn retain(self, keep: &mut impl FnMut(&Tag) -> bool) -> (Self, Vec<Tag>) {
        let mut rejected = Vec::new();
        let command = self.retain_into(keep, &mut rejected);
        (command, rejected)
    }

    fn retain_into(self, keep: &mut impl FnMut(&Tag) -> bool, rejected: &mut Vec<Tag>) -> Self {
        match self {
            Command::Perform { tag: Some(tag), .. } | Command::Stream { tag: Some(tag), .. }
                if !keep(&tag) =>
            {
                rejected.push(tag);
                Command::None
            }
            Command::Batch(commands) => Command::batch(
                commands
                    .into_iter()
                    .map(|c| c.retain_into(keep, rejected))
                    .collect::<Vec<_>>(),
            ),
            other => other,
        }
    }

    /// Synchronous messages contained in this command, in order.
    pub fn messages(&self) -> Vec<&M> {
        match self {
            Command::Message(message) => vec![message],
            Command::Batch(commands) => commands.iter().flat_map(Command::messages).collect(),
            _ => Vec::new(),
        }
    }
}

impl<M> Default for Command<M> {
    fn default() -> Self {
        Command::None
    }
}

impl<M: fmt::Debug> fmt::Debug for Command<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::None => write!(f, "None"),
            Command::Message(message) => f.debug_tuple("Message").field(message).finish(),
            Command::Perform { tag, .. } => f.debug_struct("Perform").field("tag", tag).finish(),
            Command::Stream { tag, .. } => f.debug_struct("Stream").field("tag", tag).finish(),
            Command::Batch(commands) => f.debug_list().entries(commands).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_flattens_empty() {
        let cmd: Command<u32> = Command::batch([Command::none(), Command::none()]);
        assert!(cmd.is_none());

        let cmd = Command::batch([Command::none(), Command::message(1)]);
        assert!(matches!(cmd, Command::Message(1)));
    }

    #[test]
    fn test_tags_are_collected_recursively() {
        let cmd = Command::batch([
            Command::tracked(Tag::new("stop", "alpha"), async { 1u32 }),
            Command::batch([
                Command::perform(async { 2 }),
                Command::stream(Tag::new("download", "debian"), futures::stream::iter([3])),
            ]),
        ]);
        let tags: Vec<String> = cmd.tags().iter().map(|t| t.to_string()).collect();
        assert_eq!(tags, ["stop alpha", "download debian"]);
    }

    #[test]
    fn test_retain_drops_rejected() {
        let cmd = Command::batch([
            Command::tracked(Tag::new("stop", "alpha"), async { 1u32 }),
            Command::tracked(Tag::new("stop", "beta"), async { 2 }),
            Command::message(3),
        ]);
        let (cmd, rejected) = cmd.retain(&mut |tag| tag.target != "alpha");
        assert_eq!(rejected, vec![Tag::new("stop", "alpha")]);
        assert_eq!(cmd.tags(), vec![&Tag::new("stop", "beta")]);
        assert_eq!(cmd.messages(), vec![&3]);
    }
}
