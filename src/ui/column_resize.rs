//! Drag-to-resize for header columns.
//!
//! A drag is a `ResizeSession`. While one exists it holds the pointer
//! capture (`PointerCapture`), so mouse moves and releases are routed to it.
//! The capture is released when the session is committed, cancelled or
//! simply dropped.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Which column, if any, currently captures pointer drag events
#[derive(Debug, Clone, Default)]
pub struct PointerCapture {
    owner: Rc<RefCell<Option<String>>>,
}

impl PointerCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> Option<String> {
        self.owner.borrow().clone()
    }

    pub fn is_captured(&self) -> bool {
        self.owner.borrow().is_some()
    }

    fn attach(&self, key: &str) -> CaptureGuard {
        *self.owner.borrow_mut() = Some(key.to_string());
        CaptureGuard {
            owner: Rc::clone(&self.owner),
            key: key.to_string(),
        }
    }
}

/// Releases the capture on drop
#[derive(Debug)]
struct CaptureGuard {
    owner: Rc<RefCell<Option<String>>>,
    key: String,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        let mut owner = self.owner.borrow_mut();
        // a newer session may already own the capture
        if owner.as_deref() == Some(self.key.as_str()) {
            *owner = None;
        }
    }
}

/// Final result of a drag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeCommit {
    pub key: String,
    /// Width delta relative to the column's base width
    pub delta: i32,
    pub width: u16,
}

#[derive(Debug)]
pub struct ResizeSession {
    key: String,
    start_x: u16,
    base_width: u16,
    min_width: u16,
    max_width: u16,
    preview: u16,
    _capture: CaptureGuard,
}

impl ResizeSession {
    /// Start dragging `key`'s resize handle at `pointer_x`. `base_width` is
    /// the column width without any manual delta; `start_width` is what it
    /// currently renders at.
    pub fn begin(
        capture: &PointerCapture,
        key: &str,
        pointer_x: u16,
        base_width: u16,
        start_width: u16,
        min_width: u16,
        max_width: u16,
    ) -> Self {
        debug!(target: "header", "resize '{}' started at x={}", key, pointer_x);
        Self {
            key: key.to_string(),
            start_x: pointer_x,
            base_width,
            min_width,
            max_width: max_width.max(min_width),
            preview: start_width,
            _capture: capture.attach(key),
        }
        .with_start_width(start_width)
    }

    fn with_start_width(mut self, start_width: u16) -> Self {
        // the drag is measured from the width the user sees
        let offset = i32::from(start_width) - i32::from(self.base_width);
        self.start_x = u16::try_from(i32::from(self.start_x) - offset).unwrap_or(0);
        self.preview = self.clamped(offset);
        self
    }

    fn clamped(&self, delta: i32) -> u16 {
        let width = (i32::from(self.base_width) + delta)
            .clamp(i32::from(self.min_width), i32::from(self.max_width));
        u16::try_from(width).unwrap_or(self.min_width)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn preview_width(&self) -> u16 {
        self.preview
    }

    /// Pointer moved; returns the live preview width
    pub fn update(&mut self, pointer_x: u16) -> u16 {
        let delta = i32::from(pointer_x) - i32::from(self.start_x);
        self.preview = self.clamped(delta);
        self.preview
    }

    /// Pointer released
    pub fn commit(self) -> ResizeCommit {
        let delta = i32::from(self.preview) - i32::from(self.base_width);
        debug!(target: "header", "resize '{}' committed, delta {}", self.key, delta);
        ResizeCommit {
            key: self.key.clone(),
            delta,
            width: self.preview,
        }
    }

    pub fn cancel(self) {
        debug!(target: "header", "resize '{}' cancelled", self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_preview_and_commit() {
        let capture = PointerCapture::new();
        let mut session = ResizeSession::begin(&capture, "a", 20, 10, 10, 3, 30);
        assert_eq!(capture.owner().as_deref(), Some("a"));

        assert_eq!(session.update(25), 15);
        assert_eq!(session.update(100), 30);
        assert_eq!(session.update(0), 3);
        session.update(24);

        let commit = session.commit();
        assert_eq!(commit.delta, 4);
        assert_eq!(commit.width, 14);
        assert!(!capture.is_captured());
    }

    #[test]
    fn test_drag_from_already_resized_width() {
        let capture = PointerCapture::new();
        // base 10, currently shown at 16 (delta +6), handle grabbed at x=30
        let mut session = ResizeSession::begin(&capture, "a", 30, 10, 16, 3, 40);
        assert_eq!(session.preview_width(), 16);
        assert_eq!(session.update(32), 18);
        assert_eq!(session.commit().delta, 8);
    }

    #[test]
    fn test_capture_released_on_every_exit() {
        let capture = PointerCapture::new();

        let session = ResizeSession::begin(&capture, "a", 0, 10, 10, 3, 30);
        session.cancel();
        assert!(!capture.is_captured());

        {
            let _session = ResizeSession::begin(&capture, "b", 0, 10, 10, 3, 30);
            assert!(capture.is_captured());
        }
        assert!(!capture.is_captured());
    }

    #[test]
    fn test_replacing_session_keeps_new_capture() {
        let capture = PointerCapture::new();
        let first = ResizeSession::begin(&capture, "a", 0, 10, 10, 3, 30);
        // active column changes mid-drag
        let second = ResizeSession::begin(&capture, "b", 0, 10, 10, 3, 30);
        drop(first);
        assert_eq!(capture.owner().as_deref(), Some("b"));
        drop(second);
        assert!(!capture.is_captured());
    }
}
