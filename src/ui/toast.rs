//! Transient notifications.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

/// Newest toast last. Expired toasts are pruned on access.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    duration: Duration,
    toasts: VecDeque<Toast>,
    capacity: usize,
}

impl ToastQueue {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration: Duration::from_millis(duration_ms),
            toasts: VecDeque::new(),
            capacity: 5,
        }
    }

    pub fn push_at(&mut self, message: impl Into<String>, level: ToastLevel, now: Instant) {
        if self.toasts.len() >= self.capacity {
            self.toasts.pop_front();
        }
        self.toasts.push_back(Toast {
            message: message.into(),
            level,
            expires_at: now + self.duration,
        });
    }

    pub fn prune_at(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires_at > now);
    }

    pub fn active_at(&mut self, now: Instant) -> impl Iterator<Item = &Toast> {
        self.prune_at(now);
        self.toasts.iter()
    }

    /// Most recent live toast
    pub fn latest_at(&mut self, now: Instant) -> Option<&Toast> {
        self.prune_at(now);
        self.toasts.back()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn clear(&mut self) {
        self.toasts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_expire() {
        let start = Instant::now();
        let mut queue = ToastQueue::new(3000);
        queue.push_at("saved", ToastLevel::Success, start);
        queue.push_at("oops", ToastLevel::Error, start + Duration::from_millis(1000));

        assert_eq!(queue.active_at(start + Duration::from_millis(2000)).count(), 2);
        assert_eq!(
            queue.latest_at(start + Duration::from_millis(3500)).map(|t| t.message.as_str()),
            Some("oops")
        );
        assert_eq!(queue.len(), 1);
        assert!(queue.latest_at(start + Duration::from_millis(4000)).is_none());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let now = Instant::now();
        let mut queue = ToastQueue::new(3000);
        for i in 0..7 {
            queue.push_at(format!("t{}", i), ToastLevel::Info, now);
        }
        let messages: Vec<_> = queue.active_at(now).map(|t| t.message.clone()).collect();
        assert_eq!(messages.first().map(String::as_str), Some("t2"));
        assert_eq!(messages.len(), 5);
    }
}
