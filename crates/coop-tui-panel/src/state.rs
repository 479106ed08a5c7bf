//! Application state, owned by the dispatcher.

use std::collections::VecDeque;
use std::time::Instant;

use chrono::{DateTime, Local};
use coop_tui_fwk::{FocusTarget, Geometry, Tag, TabSet};

use crate::message::Msg;
use crate::provider::Services;
use crate::settings::Settings;
use crate::theme::Theme;

/// One operator-facing log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub text: String,
}

impl LogEntry {
    pub fn render(&self) -> String {
        format!("{} {}", self.timestamp.format("%H:%M:%S"), self.text)
    }
}

/// Bounded log ring; the oldest line goes first when full.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(target: "coop::oplog", "{text}");
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp: Local::now(),
            text,
        });
    }

    /// Change the bound, dropping the oldest lines if it shrank.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Up to `height` lines ending `back` lines before the newest.
    pub fn window(&self, height: usize, back: usize) -> impl Iterator<Item = &LogEntry> {
        let end = self.entries.len().saturating_sub(back);
        let start = end.saturating_sub(height);
        self.entries.range(start..end)
    }
}

/// Read-only context handed to every viewlet call.
pub struct Shared {
    pub theme: Theme,
    pub settings: Settings,
    pub log: LogBuffer,
    pub services: Services,
}

impl Shared {
    pub fn new(settings: Settings, services: Services) -> Self {
        Self {
            theme: Theme::named(&settings.ui.theme),
            log: LogBuffer::new(settings.ui.log_capacity),
            settings,
            services,
        }
    }

    /// Swap in saved settings, re-resolving what derives from them.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.theme = Theme::named(&settings.ui.theme);
        self.log.set_capacity(settings.ui.log_capacity);
        self.settings = settings;
    }
}

/// The operation behind the loading indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub tag: Tag,
    pub started_at: Instant,
}

impl PendingOperation {
    pub fn kind(&self) -> &'static str {
        self.tag.kind
    }
}

/// A tracked command whose completing message has not arrived yet.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub tag: Tag,
    pub issued_at: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadState {
    pub image: String,
    /// In `0.0..=1.0`.
    pub progress: f32,
}

pub struct AppState {
    pub tabs: TabSet<Msg, Shared>,
    pub shared: Shared,
    pub pending: Option<PendingOperation>,
    pub in_flight: Vec<PendingCommand>,
    pub geometry: Geometry,
    pub download: Option<DownloadState>,
    pub spinner: usize,
    /// A tick chain is armed.
    pub ticking: bool,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(tabs: TabSet<Msg, Shared>, shared: Shared) -> Self {
        Self {
            tabs,
            shared,
            pending: None,
            in_flight: Vec::new(),
            geometry: Geometry::compute(0, 0),
            download: None,
            spinner: 0,
            ticking: false,
            should_quit: false,
        }
    }

    pub fn focus_target(&self) -> FocusTarget {
        match self.tabs.active() {
            Some(tab) => FocusTarget::derive(tab.navigable(), tab.mode()),
            None => FocusTarget::GlobalChrome,
        }
    }

    pub fn modal_open(&self) -> bool {
        self.tabs.active().is_some_and(|tab| tab.has_modal())
    }

    pub fn is_downloading(&self) -> bool {
        self.download.is_some()
    }

    pub fn is_in_flight(&self, tag: &Tag) -> bool {
        self.in_flight.iter().any(|p| &p.tag == tag)
    }

    /// Whether the loading indicator needs animating.
    pub fn busy(&self) -> bool {
        self.pending.is_some() || self.download.is_some()
    }

    /// Record a newly scheduled tracked command.
    pub fn track(&mut self, tag: Tag) {
        let now = Instant::now();
        self.in_flight.push(PendingCommand {
            tag: tag.clone(),
            issued_at: now,
        });
        self.pending = Some(PendingOperation {
            tag,
            started_at: now,
        });
    }

    /// Consume the in-flight entry for `tag`. Returns whether one existed.
    ///
    /// If it was the operation on the indicator, the indicator moves to the
    /// newest operation still running, or clears.
    pub fn settle(&mut self, tag: &Tag) -> bool {
        let Some(index) = self.in_flight.iter().position(|p| &p.tag == tag) else {
            return false;
        };
        self.in_flight.remove(index);
        if self.pending.as_ref().is_some_and(|p| &p.tag == tag) {
            self.pending = self.in_flight.last().map(|p| PendingOperation {
                tag: p.tag.clone(),
                started_at: p.issued_at,
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_ring_drops_oldest() {
        let mut log = LogBuffer::new(3);
        for i in 0..5 {
            log.push(format!("line {i}"));
        }
        let texts: Vec<_> = log.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["line 2", "line 3", "line 4"]);

        log.set_capacity(1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().map(|e| e.text.as_str()), Some("line 4"));
    }

    #[test]
    fn test_log_window_is_tail_clipped() {
        let mut log = LogBuffer::new(10);
        for i in 0..6 {
            log.push(format!("{i}"));
        }
        let tail: Vec<_> = log.window(3, 0).map(|e| e.text.as_str()).collect();
        assert_eq!(tail, ["3", "4", "5"]);
        let back: Vec<_> = log.window(3, 2).map(|e| e.text.as_str()).collect();
        assert_eq!(back, ["1", "2", "3"]);
        assert_eq!(log.window(3, 100).count(), 0);
    }

    #[test]
    fn test_rendered_entry_has_timestamp() {
        let mut log = LogBuffer::new(1);
        log.push("hello");
        let line = log.last().map(LogEntry::render).unwrap_or_default();
        assert!(line.ends_with(" hello"));
        assert_eq!(line.len(), "00:00:00 hello".len());
    }
}
