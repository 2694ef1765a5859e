//! Per-kind cell rendering and the per-cell memo cache.
//!
//! A renderer is picked once per column from its `ColumnKind` and reused for
//! every cell of that column, both for painting and for width measurement.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use std::collections::HashMap;
use std::sync::Arc;

use crate::data::column::{ColumnKind, FormatFn};
use crate::data::datatable::{DataValue, RowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellAlign {
    #[default]
    Left,
    Right,
    Center,
}

/// How a cell relates to the compare-pinned column in its row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMark {
    /// The cell is in the compare column itself
    Base,
    Differs,
    Same,
}

/// Per-cell state that changes how a cell looks
#[derive(Debug, Clone, Copy, Default)]
pub struct CellContext<'a> {
    pub selected: bool,
    pub highlighted: bool,
    pub compare: Option<CompareMark>,
    pub text_query: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCell {
    pub text: String,
    pub align: CellAlign,
    pub style: Style,
}

impl RenderedCell {
    pub fn width(&self) -> u16 {
        display_width(&self.text)
    }
}

/// Terminal width of `text`
pub fn display_width(text: &str) -> u16 {
    u16::try_from(Span::raw(text).width()).unwrap_or(u16::MAX)
}

pub trait CellRenderer: Send + Sync {
    /// Text for a value, before any styling
    fn format(&self, value: &DataValue) -> String;

    fn align(&self) -> CellAlign {
        CellAlign::Left
    }

    fn render(&self, value: &DataValue, ctx: &CellContext<'_>) -> RenderedCell {
        let text = self.format(value);
        let style = cell_style(&text, ctx);
        RenderedCell {
            text,
            align: self.align(),
            style,
        }
    }

    /// Natural width of the rendered value
    fn measure(&self, value: &DataValue) -> u16 {
        display_width(&self.format(value))
    }
}

pub struct TextRenderer;

impl CellRenderer for TextRenderer {
    fn format(&self, value: &DataValue) -> String {
        value.to_string()
    }
}

pub struct NumberRenderer {
    pub precision: Option<usize>,
}

impl CellRenderer for NumberRenderer {
    fn format(&self, value: &DataValue) -> String {
        match (value, self.precision) {
            (DataValue::Float(f), Some(p)) => format!("{:.*}", p, f),
            (DataValue::Integer(i), Some(p)) if p > 0 => format!("{:.*}", p, *i as f64),
            _ => value.to_string(),
        }
    }

    fn align(&self) -> CellAlign {
        CellAlign::Right
    }
}

pub struct BooleanRenderer {
    pub true_text: String,
    pub false_text: String,
}

impl Default for BooleanRenderer {
    fn default() -> Self {
        Self {
            true_text: "✓".to_string(),
            false_text: "✗".to_string(),
        }
    }
}

impl CellRenderer for BooleanRenderer {
    fn format(&self, value: &DataValue) -> String {
        match value {
            DataValue::Boolean(true) => self.true_text.clone(),
            DataValue::Boolean(false) => self.false_text.clone(),
            other => other.to_string(),
        }
    }

    fn align(&self) -> CellAlign {
        CellAlign::Center
    }
}

pub struct DateTimeRenderer {
    pub format: Option<String>,
}

impl DateTimeRenderer {
    fn reformat(raw: &str, format: &str) -> Option<String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.format(format).to_string());
        }
        for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
                return Some(dt.format(format).to_string());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(|d| d.format(format).to_string())
    }
}

impl CellRenderer for DateTimeRenderer {
    fn format(&self, value: &DataValue) -> String {
        match (value, &self.format) {
            (DataValue::DateTime(raw), Some(format)) => {
                Self::reformat(raw, format).unwrap_or_else(|| raw.clone())
            }
            _ => value.to_string(),
        }
    }
}

pub struct CustomRenderer {
    format: FormatFn,
}

impl CellRenderer for CustomRenderer {
    fn format(&self, value: &DataValue) -> String {
        (self.format)(value)
    }
}

/// The renderer for a column kind
pub fn renderer_for(kind: &ColumnKind) -> Arc<dyn CellRenderer> {
    match kind {
        ColumnKind::Text => Arc::new(TextRenderer),
        ColumnKind::Number { precision } => Arc::new(NumberRenderer {
            precision: *precision,
        }),
        ColumnKind::Boolean => Arc::new(BooleanRenderer::default()),
        ColumnKind::DateTime { format } => Arc::new(DateTimeRenderer {
            format: format.clone(),
        }),
        ColumnKind::Custom(format) => Arc::new(CustomRenderer {
            format: Arc::clone(format),
        }),
    }
}

fn cell_style(text: &str, ctx: &CellContext<'_>) -> Style {
    let mut style = Style::default();

    match ctx.compare {
        Some(CompareMark::Base) => style = style.add_modifier(Modifier::UNDERLINED),
        Some(CompareMark::Differs) => style = style.fg(Color::Yellow),
        Some(CompareMark::Same) => style = style.fg(Color::Green),
        None => {}
    }

    if let Some(query) = ctx.text_query {
        if !query.is_empty() && text.to_lowercase().contains(&query.to_lowercase()) {
            style = style.add_modifier(Modifier::BOLD);
        }
    }

    if ctx.highlighted {
        style = style.bg(Color::DarkGray);
    }
    if ctx.selected {
        style = style.add_modifier(Modifier::REVERSED);
    }

    style
}

/// Everything a rendered cell depends on
#[derive(Debug, Clone, PartialEq)]
pub struct CellMemoKey {
    pub column_key: String,
    pub column_pos: usize,
    pub row_id: RowId,
    pub row_pos: usize,
    pub width: u16,
    pub selected: bool,
    /// Hovered (row, column) position anywhere in the grid
    pub hover: Option<(usize, usize)>,
    pub compare: Option<CompareMark>,
    pub text_query: String,
}

impl CellMemoKey {
    fn hovers_row(&self) -> bool {
        self.hover.is_some_and(|(row, _)| row == self.row_pos)
    }

    fn hovers_column(&self) -> bool {
        self.hover.is_some_and(|(_, col)| col == self.column_pos)
    }

    /// True when a cell rendered for `self` can be reused for `next`.
    /// Hover moving between rows and columns unrelated to this cell does not
    /// count as a change.
    pub fn same_render(&self, next: &CellMemoKey) -> bool {
        self.column_key == next.column_key
            && self.column_pos == next.column_pos
            && self.row_id == next.row_id
            && self.row_pos == next.row_pos
            && self.width == next.width
            && self.selected == next.selected
            && self.compare == next.compare
            && self.text_query == next.text_query
            && self.hovers_row() == next.hovers_row()
            && self.hovers_column() == next.hovers_column()
    }
}

/// Memoized cells of the last frame, keyed by row id and column key
#[derive(Default)]
pub struct CellCache {
    cells: HashMap<(RowId, String), (CellMemoKey, RenderedCell)>,
    hits: u64,
    misses: u64,
}

impl CellCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached cell for `key`, or a fresh one from `render`
    pub fn get_or_render<F>(&mut self, key: CellMemoKey, render: F) -> RenderedCell
    where
        F: FnOnce() -> RenderedCell,
    {
        let slot = (key.row_id.clone(), key.column_key.clone());
        if let Some((previous, cell)) = self.cells.get(&slot) {
            if previous.same_render(&key) {
                self.hits += 1;
                return cell.clone();
            }
        }
        self.misses += 1;
        let cell = render();
        self.cells.insert(slot, (key, cell.clone()));
        cell
    }

    /// Drop cells that were not part of the latest frame
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&RowId, &str) -> bool,
    {
        self.cells.retain(|(row, col), _| keep(row, col));
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
