// Transient user-facing notices raised by controller operations.
// Callers drain them after each operation; nothing pushed is ever dropped
// except an exact repeat inside the dedup window.

use std::time::{Duration, Instant};

/// Same message and level pushed again within this window is ignored
const DEDUP_WINDOW: Duration = Duration::from_secs(2);

/// Higher = shown first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Error,
        }
    }
}

#[derive(Debug, Default)]
pub struct NoticeQueue {
    pending: Vec<Notice>,
    /// Recently pushed notices and when they were pushed
    recent: Vec<(Notice, Instant)>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notice: Notice) {
        let now = Instant::now();
        self.recent
            .retain(|(_, pushed)| now.duration_since(*pushed) < DEDUP_WINDOW);
        if self.recent.iter().any(|(seen, _)| *seen == notice) {
            return;
        }
        self.recent.push((notice.clone(), now));
        self.pending.push(notice);
    }

    /// Take every pending notice: errors first, push order within a level.
    pub fn drain(&mut self) -> Vec<Notice> {
        let mut all = std::mem::take(&mut self.pending);
        all.sort_by(|a, b| b.level.cmp(&a.level));
        all
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
