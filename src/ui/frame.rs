//! Render plan for one grid frame.
//!
//! `DataGrid::frame_at` resolves everything that depends on state (layout,
//! visible window, memoized cells) into a `GridFrame`; the widget only paints
//! it.

use crate::data::datatable::RowId;
use crate::ui::cell_renderer::RenderedCell;
use crate::ui::header::HeaderCell;
use crate::ui::viewport_manager::GridState;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameCell {
    pub key: String,
    /// Screen x relative to the grid area; negative when clipped on the left
    pub x: i32,
    pub width: u16,
    pub pinned: bool,
    pub cell: RenderedCell,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    /// Position in the visible row list
    pub position: usize,
    pub id: RowId,
    /// Screen y relative to the body top; overscan rows fall outside
    pub y: i32,
    pub selected: bool,
    pub highlighted: bool,
    pub cells: Vec<FrameCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridFrame {
    pub state: GridState,
    pub width: u16,
    pub height: u16,
    pub header_height: u16,
    pub row_height: u16,
    /// Width of the row number gutter, 0 when hidden
    pub gutter_width: u16,
    /// Right edge of the pinned layer (gutter included)
    pub pinned_edge: u16,
    pub header: Vec<HeaderCell>,
    pub rows: Vec<FrameRow>,
    pub row_count: usize,
    pub scrolling: bool,
}

impl GridFrame {
    pub fn empty(state: GridState, width: u16, height: u16) -> Self {
        Self {
            state,
            width,
            height,
            header_height: 1,
            row_height: 1,
            gutter_width: 0,
            pinned_edge: 0,
            header: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            scrolling: false,
        }
    }

    /// Placeholder text shown instead of rows
    pub fn message(&self) -> Option<&'static str> {
        self.state.message()
    }

    /// Header cell under screen column `x`
    pub fn header_at(&self, x: u16) -> Option<&HeaderCell> {
        let x = i32::from(x);
        self.header
            .iter()
            .find(|c| x >= c.x && x < c.x + i32::from(c.width))
    }

    /// Visible row position under screen row `y` (relative to the grid top)
    pub fn row_at(&self, y: u16) -> Option<usize> {
        let y = i32::from(y) - i32::from(self.header_height);
        if y < 0 {
            return None;
        }
        let row_height = i32::from(self.row_height.max(1));
        self.rows
            .iter()
            .find(|r| y >= r.y && y < r.y + row_height)
            .map(|r| r.position)
    }

    /// Column position (index into `header`) under screen column `x`
    pub fn column_at(&self, x: u16) -> Option<usize> {
        let x = i32::from(x);
        self.header
            .iter()
            .position(|c| x >= c.x && x < c.x + i32::from(c.width))
    }
}
