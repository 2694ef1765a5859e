/// ViewportManager - the visible window into the grid
///
/// Tracks the scroll position and viewport size, and derives which rows and
/// columns to render (visible range plus overscan). Also owns the scroll
/// throttle and the "scrolling horizontally" hold flag.
///
/// Architecture:
/// rows (immutable)
///     → DataView (filtered/sorted)
///         → ViewportManager (visible window)
///             → render plan → widget
use std::ops::Range;
use std::time::Instant;
use tracing::debug;

use crate::ui::viewport::layout::ColumnLayout;
use crate::utils::debouncer::{HoldFlag, Throttle};

/// Row height model. Only uniform heights today; the per-row methods keep
/// callers independent of that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowHeight {
    Uniform(u16),
}

impl RowHeight {
    pub fn height_of(&self, _row: usize) -> u16 {
        match self {
            RowHeight::Uniform(h) => (*h).max(1),
        }
    }

    /// Vertical offset of the top of `row`
    pub fn offset_of(&self, row: usize) -> usize {
        match self {
            RowHeight::Uniform(h) => row * usize::from((*h).max(1)),
        }
    }

    /// Row containing vertical `offset`
    pub fn row_at(&self, offset: usize) -> usize {
        match self {
            RowHeight::Uniform(h) => offset / usize::from((*h).max(1)),
        }
    }

    /// Rows that fit in `height`
    pub fn rows_in(&self, height: u16) -> usize {
        match self {
            RowHeight::Uniform(h) => usize::from(height / (*h).max(1)),
        }
    }
}

/// What the grid body shows. Loading wins over empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridState {
    Rendering,
    Loading,
    Empty,
}

impl GridState {
    pub fn resolve(loading: bool, row_count: usize) -> Self {
        if loading {
            GridState::Loading
        } else if row_count == 0 {
            GridState::Empty
        } else {
            GridState::Rendering
        }
    }

    /// Placeholder shown instead of cells
    pub fn message(&self) -> Option<&'static str> {
        match self {
            GridState::Rendering => None,
            GridState::Loading => Some("Loading..."),
            GridState::Empty => Some("No rows"),
        }
    }
}

/// Result of a row navigation operation (Page Up/Down, etc.)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowNavigationResult {
    /// The new highlighted row position
    pub row_position: usize,
    /// The new first visible row
    pub row_scroll_offset: usize,
    /// Whether the operation scrolled the viewport
    pub viewport_changed: bool,
}

/// Rendered window reported to throttled listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRange {
    pub rows: Range<usize>,
    pub scroll_left: u16,
}

pub struct ViewportManager {
    row_height: RowHeight,
    overscan_rows: usize,
    overscan_columns: usize,

    /// Body size (header excluded)
    width: u16,
    height: u16,

    /// First visible row
    scroll_top: usize,
    /// Horizontal offset into the scrolling layer
    scroll_left: u16,

    /// Highlighted row position in the visible row list
    crosshair_row: Option<usize>,

    scroll_throttle: Throttle,
    scrolling_horizontally: HoldFlag,
    last_reported: Option<RenderedRange>,
}

impl ViewportManager {
    pub fn new(
        row_height: RowHeight,
        overscan_rows: usize,
        overscan_columns: usize,
        scroll_throttle_ms: u64,
        scrolling_hold_ms: u64,
    ) -> Self {
        Self {
            row_height,
            overscan_rows,
            overscan_columns,
            width: 0,
            height: 0,
            scroll_top: 0,
            scroll_left: 0,
            crosshair_row: None,
            scroll_throttle: Throttle::new(scroll_throttle_ms),
            scrolling_horizontally: HoldFlag::new(scrolling_hold_ms),
            last_reported: None,
        }
    }

    pub fn row_height(&self) -> RowHeight {
        self.row_height
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    pub fn scroll_left(&self) -> u16 {
        self.scroll_left
    }

    pub fn crosshair_row(&self) -> Option<usize> {
        self.crosshair_row
    }

    /// Update the body size, keeping the scroll position in range
    pub fn set_size(&mut self, width: u16, height: u16, row_count: usize) {
        if self.width != width || self.height != height {
            debug!(target: "viewport", "viewport resized to {}x{}", width, height);
        }
        self.width = width;
        self.height = height;
        self.clamp_scroll(row_count);
    }

    pub fn page_size(&self) -> usize {
        self.row_height.rows_in(self.height).max(1)
    }

    fn max_scroll_top(&self, row_count: usize) -> usize {
        row_count.saturating_sub(self.row_height.rows_in(self.height))
    }

    fn clamp_scroll(&mut self, row_count: usize) {
        self.scroll_top = self.scroll_top.min(self.max_scroll_top(row_count));
        if let Some(row) = self.crosshair_row {
            if row_count == 0 {
                self.crosshair_row = None;
            } else if row >= row_count {
                self.crosshair_row = Some(row_count - 1);
            }
        }
    }

    /// Rows inside the viewport, without overscan
    pub fn visible_rows(&self, row_count: usize) -> Range<usize> {
        let start = self.scroll_top.min(row_count);
        let end = (start + self.row_height.rows_in(self.height)).min(row_count);
        start..end
    }

    /// Rows to render: the visible rows plus overscan on both sides
    pub fn rendered_rows(&self, row_count: usize) -> Range<usize> {
        let visible = self.visible_rows(row_count);
        let start = visible.start.saturating_sub(self.overscan_rows);
        let end = (visible.end + self.overscan_rows).min(row_count);
        start..end
    }

    /// Indices into `layout.columns` of the unpinned columns to render
    pub fn rendered_columns(&self, layout: &ColumnLayout) -> Range<usize> {
        layout.visible_unpinned(self.scroll_left, self.width, self.overscan_columns)
    }

    /// Screen row of `row` relative to the body top (may be outside the body
    /// for overscan rows)
    pub fn row_y(&self, row: usize) -> isize {
        let top = self.row_height.offset_of(self.scroll_top) as isize;
        self.row_height.offset_of(row) as isize - top
    }

    pub fn scroll_to_row(&mut self, row: usize, row_count: usize) {
        self.scroll_top = row.min(self.max_scroll_top(row_count));
    }

    pub fn scroll_rows_by(&mut self, delta: isize, row_count: usize) {
        let target = self.scroll_top.saturating_add_signed(delta);
        self.scroll_to_row(target, row_count);
    }

    /// Scroll the unpinned layer; raises the "scrolling horizontally" flag
    pub fn scroll_horizontally_at(&mut self, delta: i32, layout: &ColumnLayout, now: Instant) {
        let max = i32::from(layout.max_scroll(self.width));
        let next = (i32::from(self.scroll_left) + delta).clamp(0, max);
        let next = u16::try_from(next).unwrap_or(0);
        if next != self.scroll_left {
            self.scroll_left = next;
            self.scrolling_horizontally.raise_at(now);
        }
    }

    /// Bring the column at `offset..offset+width` of the scrolling layer into view
    pub fn ensure_column_visible_at(&mut self, offset: u16, width: u16, layout: &ColumnLayout, now: Instant) {
        let available = self.width.saturating_sub(layout.pinned_width);
        let target = if offset < self.scroll_left {
            offset
        } else if offset.saturating_add(width) > self.scroll_left.saturating_add(available) {
            offset.saturating_add(width).saturating_sub(available)
        } else {
            return;
        };
        let delta = i32::from(target) - i32::from(self.scroll_left);
        self.scroll_horizontally_at(delta, layout, now);
    }

    pub fn is_scrolling_horizontally_at(&self, now: Instant) -> bool {
        self.scrolling_horizontally.is_raised_at(now)
    }

    pub fn set_crosshair_row(&mut self, row: Option<usize>, row_count: usize) -> RowNavigationResult {
        let row = row.filter(|_| row_count > 0).map(|r| r.min(row_count - 1));
        self.crosshair_row = row;
        let before = self.scroll_top;
        if let Some(row) = row {
            self.ensure_row_visible(row, row_count);
        }
        RowNavigationResult {
            row_position: row.unwrap_or(0),
            row_scroll_offset: self.scroll_top,
            viewport_changed: before != self.scroll_top,
        }
    }

    /// Move the highlighted row, scrolling when it leaves the viewport
    pub fn navigate_rows(&mut self, delta: isize, row_count: usize) -> RowNavigationResult {
        let next = match self.crosshair_row {
            Some(row) => row.saturating_add_signed(delta),
            None => self.scroll_top,
        };
        self.set_crosshair_row(Some(next), row_count)
    }

    pub fn page_down(&mut self, row_count: usize) -> RowNavigationResult {
        self.navigate_rows(self.page_size() as isize, row_count)
    }

    pub fn page_up(&mut self, row_count: usize) -> RowNavigationResult {
        self.navigate_rows(-(self.page_size() as isize), row_count)
    }

    fn ensure_row_visible(&mut self, row: usize, row_count: usize) {
        let visible = self.row_height.rows_in(self.height).max(1);
        if row < self.scroll_top {
            self.scroll_top = row;
        } else if row >= self.scroll_top + visible {
            self.scroll_top = row + 1 - visible;
        }
        self.scroll_top = self.scroll_top.min(self.max_scroll_top(row_count));
    }

    /// Report the rendered window to throttled listeners. Returns the range
    /// when it should be delivered now.
    pub fn report_rendered_at(&mut self, row_count: usize, now: Instant) -> Option<RenderedRange> {
        let range = RenderedRange {
            rows: self.rendered_rows(row_count),
            scroll_left: self.scroll_left,
        };
        if self.last_reported.as_ref() == Some(&range) {
            return None;
        }
        if self.scroll_throttle.try_fire_at(now) {
            self.last_reported = Some(range.clone());
            Some(range)
        } else {
            None
        }
    }

    /// Deliver the trailing report once the throttle interval has passed
    pub fn flush_rendered_at(&mut self, row_count: usize, now: Instant) -> Option<RenderedRange> {
        if !self.scroll_throttle.flush_at(now) {
            return None;
        }
        let range = RenderedRange {
            rows: self.rendered_rows(row_count),
            scroll_left: self.scroll_left,
        };
        self.last_reported = Some(range.clone());
        Some(range)
    }

    /// Drop pending timers (rows or columns replaced)
    pub fn cancel_timers(&mut self) {
        self.scroll_throttle.cancel();
        self.scrolling_horizontally.clear();
    }
}
