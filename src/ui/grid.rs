//! DataGrid - the grid controller
//!
//! Owns the rows and column definitions of one grid and reads its view
//! configuration from the shared store. Every interaction is written to the
//! store first; the grid then re-derives what it shows from the store.
//!
//! Flow:
//! store (current view, text query)
//!     → DataView (sorted, filtered rows)
//!         → width measurement + layout
//!             → ViewportManager (visible window)
//!                 → GridFrame (memoized cells) → widget

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::config::{BehaviorConfig, Config, DisplayConfig};
use crate::data::column::{column_index, Column};
use crate::data::data_view::{DataView, RowQuery, SortDirection};
use crate::data::datatable::{DataValue, Row, RowId};
use crate::data::datavalue_compare::datavalues_equal;
use crate::data::text_query::TextQueryMatcher;
use crate::state::column_manager::visible_column_keys;
use crate::state::registry::SharedStore;
use crate::state::store::{CompareState, ViewStore};
use crate::state::view::{partition_pinned, View};
use crate::ui::cell_renderer::{
    renderer_for, CellCache, CellContext, CellMemoKey, CellRenderer, CompareMark, TextRenderer,
};
use crate::ui::column_resize::{PointerCapture, ResizeCommit, ResizeSession};
use crate::ui::frame::{FrameCell, FrameRow, GridFrame};
use crate::ui::header::{
    next_sort_direction, CheckboxState, FirstColumnMenu, FirstColumnMenuItem, HeaderAction,
    HeaderCell, HeaderState,
};
use crate::ui::toast::ToastQueue;
use crate::ui::transfer::TransferItem;
use crate::ui::viewport::column_width_calculator::{
    measure_column, sample_rows, ColumnWidthCalculator, WidthLimits,
};
use crate::ui::viewport::layout::{
    base_width, manual_width, resolve_layout, ColumnLayout, ColumnLayoutInput, ResolvedColumn,
};
use crate::ui::viewport_manager::{GridState, RowHeight, RowNavigationResult, ViewportManager};

pub type IncludedRowsCallback<T> = Box<dyn FnMut(&[&Row<T>])>;
/// Display position and row of the new highlight, `None` when cleared
pub type RowHighlightCallback<T> = Box<dyn FnMut(Option<usize>, Option<&Row<T>>)>;
pub type SelectOneCallback = Box<dyn FnMut(&RowId)>;
pub type SelectManyCallback = Box<dyn FnMut(&[RowId])>;
pub type SelectNoneCallback = Box<dyn FnMut()>;
pub type SortCallback = Box<dyn FnMut(Option<&str>, Option<SortDirection>)>;

/// Notifications for the embedding application
pub struct GridCallbacks<T> {
    /// The visible row set changed (filter, sort, query or new rows)
    pub on_included_rows_change: Option<IncludedRowsCallback<T>>,
    pub on_row_highlight_change: Option<RowHighlightCallback<T>>,
    pub on_select_one: Option<SelectOneCallback>,
    pub on_select_many: Option<SelectManyCallback>,
    pub on_select_none: Option<SelectNoneCallback>,
    pub on_sort: Option<SortCallback>,
}

impl<T> Default for GridCallbacks<T> {
    fn default() -> Self {
        Self {
            on_included_rows_change: None,
            on_row_highlight_change: None,
            on_select_one: None,
            on_select_many: None,
            on_select_none: None,
            on_sort: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridOptions {
    /// Rows can be selected; adds the select-all checkbox to the first column
    pub selectable: bool,
    pub first_column_menu: FirstColumnMenu,
}

pub struct DataGrid<T> {
    store: SharedStore,
    rows: Arc<Vec<Row<T>>>,
    columns: Vec<Column<T>>,
    renderers: HashMap<String, Arc<dyn CellRenderer>>,
    display: DisplayConfig,
    behavior: BehaviorConfig,
    options: GridOptions,
    callbacks: GridCallbacks<T>,

    data_view: DataView<T>,
    /// Indices into `columns` of the displayed columns, pinned first
    display_columns: Vec<usize>,
    /// Effective pinned keys: the view's pins plus columns pinned by definition
    pinned: Vec<String>,
    /// Store time the grid last synced with
    seen_store_time: Option<u64>,
    included_ids: Vec<RowId>,
    highlighted: Option<RowId>,
    loading: bool,

    widths: ColumnWidthCalculator,
    viewport: ViewportManager,
    layout: ColumnLayout,
    cells: CellCache,
    /// Pointer hover as (row position, column key)
    hover: Option<(usize, String)>,
    header: HeaderState,
    capture: PointerCapture,
    resize: Option<ResizeSession>,
    pub toasts: ToastQueue,
}

impl<T> DataGrid<T> {
    pub fn new(
        store: SharedStore,
        rows: Vec<Row<T>>,
        columns: Vec<Column<T>>,
        config: &Config,
        options: GridOptions,
    ) -> Result<Self> {
        let renderers = columns
            .iter()
            .map(|c| (c.key.clone(), renderer_for(&c.kind)))
            .collect();
        store
            .borrow_mut()
            .set_default_column_keys(columns.iter().map(|c| c.key.clone()).collect());

        let behavior = config.behavior.clone();
        let display = config.display.clone();
        let rows = Arc::new(rows);

        let mut grid = Self {
            store,
            data_view: DataView::new(Arc::clone(&rows)),
            rows,
            columns,
            renderers,
            options,
            callbacks: GridCallbacks::default(),
            display_columns: Vec::new(),
            pinned: Vec::new(),
            seen_store_time: None,
            included_ids: Vec::new(),
            highlighted: None,
            loading: false,
            widths: ColumnWidthCalculator::new(
                behavior.width_hysteresis,
                behavior.width_debounce_ms,
                behavior.resize_reset_debounce_ms,
            ),
            viewport: ViewportManager::new(
                RowHeight::Uniform(display.row_height),
                display.overscan_rows,
                display.overscan_columns,
                behavior.scroll_throttle_ms,
                behavior.scrolling_hold_ms,
            ),
            layout: ColumnLayout::default(),
            cells: CellCache::new(),
            hover: None,
            header: HeaderState::default(),
            capture: PointerCapture::new(),
            resize: None,
            toasts: ToastQueue::new(behavior.toast_duration_ms),
            display,
            behavior,
        };
        grid.refresh()?;
        Ok(grid)
    }

    pub fn set_callbacks(&mut self, callbacks: GridCallbacks<T>) {
        self.callbacks = callbacks;
    }

    pub fn callbacks_mut(&mut self) -> &mut GridCallbacks<T> {
        &mut self.callbacks
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&Column<T>> {
        column_index(&self.columns, key).map(|idx| &self.columns[idx])
    }

    pub fn options(&self) -> GridOptions {
        self.options
    }

    pub fn data_view(&self) -> &DataView<T> {
        &self.data_view
    }

    /// The visible rows in display order
    pub fn get_rows(&self) -> Vec<&Row<T>> {
        self.data_view.rows()
    }

    pub fn row_count(&self) -> usize {
        self.data_view.row_count()
    }

    /// Keys of the displayed columns, pinned first
    pub fn display_column_keys(&self) -> Vec<String> {
        self.display_columns
            .iter()
            .map(|&idx| self.columns[idx].key.clone())
            .collect()
    }

    pub fn is_pinned(&self, key: &str) -> bool {
        self.pinned.iter().any(|k| k == key)
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn viewport(&self) -> &ViewportManager {
        &self.viewport
    }

    pub fn header_state(&self) -> &HeaderState {
        &self.header
    }

    pub fn header_state_mut(&mut self) -> &mut HeaderState {
        &mut self.header
    }

    pub fn pointer_capture(&self) -> &PointerCapture {
        &self.capture
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Items for the column picker, in definition order
    pub fn transfer_items(&self) -> Vec<TransferItem> {
        self.columns
            .iter()
            .map(|c| TransferItem {
                key: c.key.clone(),
                title: c.title.clone(),
            })
            .collect()
    }

    fn column_keys(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.key.clone()).collect()
    }

    fn renderer(&self, key: &str) -> Arc<dyn CellRenderer> {
        self.renderers
            .get(key)
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::new(TextRenderer))
    }

    fn effective_pins(&self, view: &View) -> Vec<String> {
        let mut pinned = view.pinned_ids.clone();
        for column in self.columns.iter().filter(|c| c.is_pinned()) {
            if !pinned.contains(&column.key) {
                pinned.push(column.key.clone());
            }
        }
        pinned
    }

    /// Re-read the store and rebuild the visible rows
    pub fn refresh(&mut self) -> Result<()> {
        let (view, text_query, updated_time) = {
            let store = self.store.borrow();
            (
                store.current_view().clone(),
                store.text_query().to_string(),
                store.updated_time(),
            )
        };
        // a failing query is not retried until the store changes again
        self.seen_store_time = Some(updated_time);

        let pinned = self.effective_pins(&view);
        let keys = partition_pinned(&visible_column_keys(&view, &self.column_keys()), &pinned);
        let display: Vec<usize> = keys
            .iter()
            .filter_map(|k| column_index(&self.columns, k))
            .collect();
        let display_columns: Vec<Column<T>> =
            display.iter().map(|&idx| self.columns[idx].clone()).collect();

        let sort = view.sort();
        let sort_index =
            sort.and_then(|(key, _)| display_columns.iter().position(|c| c.key == key));
        let sort_direction = sort.map(|(_, d)| d).unwrap_or(SortDirection::Asc);

        let matcher = if text_query.trim().is_empty() {
            None
        } else {
            Some(TextQueryMatcher::new(
                &text_query,
                self.behavior.text_query_mode,
                self.behavior.case_insensitive,
            )?)
        };

        let query = RowQuery {
            sort_index,
            sort_direction,
            filters: &view.filters,
            queries: &view.queries,
            text_query: matcher.as_ref(),
            case_insensitive: self.behavior.case_insensitive,
        };
        let data_view = DataView::apply(Arc::clone(&self.rows), &display_columns, &self.columns, &query)?;

        if display != self.display_columns {
            self.widths.invalidate();
        }
        self.display_columns = display;
        self.pinned = pinned;
        self.data_view = data_view;

        let row_count = self.data_view.row_count();
        self.viewport
            .set_size(self.viewport.width(), self.viewport.height(), row_count);
        debug!(target: "grid", "refreshed view '{}' v{}: {} of {} rows",
            view.id, view.version, row_count, self.rows.len());

        self.notify_included_rows();
        self.notify_highlight();
        Ok(())
    }

    /// Refresh when the store changed since the last sync
    pub fn sync(&mut self) -> Result<bool> {
        let updated_time = self.store.borrow().updated_time();
        if self.seen_store_time == Some(updated_time) {
            return Ok(false);
        }
        self.refresh()?;
        Ok(true)
    }

    /// Replace the row set. Widths are measured again for the new data.
    pub fn set_rows(&mut self, rows: Vec<Row<T>>) -> Result<()> {
        info!(target: "grid", "replacing {} rows with {}", self.rows.len(), rows.len());
        self.rows = Arc::new(rows);
        self.widths.invalidate();
        self.cells.clear();
        self.viewport.cancel_timers();
        self.loading = false;
        self.refresh()
    }

    fn notify_included_rows(&mut self) {
        let ids = self.data_view.row_ids();
        if ids == self.included_ids {
            return;
        }
        self.included_ids = ids;
        if let Some(callback) = self.callbacks.on_included_rows_change.as_mut() {
            let rows = self.data_view.rows();
            callback(&rows);
        }
    }

    fn notify_highlight(&mut self) {
        let position = self.viewport.crosshair_row();
        let row = position.and_then(|pos| self.data_view.get_row(pos));
        let id = row.map(|r| r.id.clone());
        if id == self.highlighted {
            return;
        }
        self.highlighted = id;
        if let Some(callback) = self.callbacks.on_row_highlight_change.as_mut() {
            callback(row.and(position), row);
        }
    }

    fn current_sort(&self, key: &str) -> Option<SortDirection> {
        let store = self.store.borrow();
        store
            .current_view()
            .sort()
            .filter(|(k, _)| *k == key)
            .map(|(_, d)| d)
    }

    /// Sort by `key`, or clear the sort with `None`
    pub fn sort_by(&mut self, key: Option<&str>, direction: Option<SortDirection>) -> Result<()> {
        let direction = key.and(direction);
        let key = key.filter(|_| direction.is_some());
        if let Some(k) = key {
            if !self.column(k).is_some_and(|c| c.sortable) {
                return Ok(());
            }
        }
        self.store
            .borrow_mut()
            .on_current_view_sort(key.map(str::to_string), direction);
        if let Some(callback) = self.callbacks.on_sort.as_mut() {
            callback(key, direction);
        }
        self.sync().map(|_| ())
    }

    /// Header click: ascending, descending, unsorted
    pub fn toggle_sort(&mut self, key: &str) -> Result<()> {
        let next = next_sort_direction(self.current_sort(key));
        self.sort_by(Some(key), next)
    }

    pub fn pin_column(&mut self, key: &str, pinned: bool) -> Result<()> {
        self.store.borrow_mut().on_current_view_columns_pin(key, pinned);
        self.sync().map(|_| ())
    }

    pub fn compare_pin(&mut self, key: &str) -> Result<()> {
        self.store.borrow_mut().on_compare_pin(key);
        self.sync().map(|_| ())
    }

    pub fn set_text_query(&mut self, query: &str) -> Result<()> {
        self.store.borrow_mut().set_text_query(query);
        self.viewport.scroll_to_row(0, self.data_view.row_count());
        self.sync().map(|_| ())
    }

    /// Forget manual widths and measure every column again
    pub fn reset_column_widths(&mut self) -> Result<()> {
        self.store.borrow_mut().reset_column_widths();
        self.widths.reset();
        self.cells.clear();
        self.sync().map(|_| ())
    }

    /// Run a header interaction. First-column menu entries the grid cannot
    /// handle itself (inline query, column management) are handed back.
    pub fn apply_header_action(&mut self, action: HeaderAction) -> Result<Option<FirstColumnMenuItem>> {
        self.header.close_menus();
        match action {
            HeaderAction::Sort { key, direction } => self.sort_by(Some(&key), direction)?,
            HeaderAction::Pin { key, pinned } => self.pin_column(&key, pinned)?,
            HeaderAction::ComparePin { key } => self.compare_pin(&key)?,
            HeaderAction::ToggleSelectAll => self.toggle_select_all(),
            HeaderAction::FirstColumn(FirstColumnMenuItem::ResetColumnWidths) => {
                self.reset_column_widths()?
            }
            HeaderAction::FirstColumn(item) => return Ok(Some(item)),
        }
        Ok(None)
    }

    fn checkbox_state_in(&self, store: &ViewStore) -> CheckboxState {
        let selected = self
            .included_ids
            .iter()
            .filter(|id| store.is_row_selected(id))
            .count();
        CheckboxState::from_counts(selected, self.included_ids.len())
    }

    /// Select-all checkbox state over the visible rows
    pub fn checkbox_state(&self) -> CheckboxState {
        self.checkbox_state_in(&self.store.borrow())
    }

    /// Toggle the selection of the row at `position`
    pub fn toggle_row_selection(&mut self, position: usize) -> bool {
        if !self.options.selectable {
            return false;
        }
        let Some(id) = self.data_view.get_row(position).map(|r| r.id.clone()) else {
            return false;
        };
        self.store.borrow_mut().on_select_one(id.clone());
        if let Some(callback) = self.callbacks.on_select_one.as_mut() {
            callback(&id);
        }
        true
    }

    /// All visible rows selected: clear. Otherwise select every visible row.
    pub fn toggle_select_all(&mut self) {
        if !self.options.selectable {
            return;
        }
        if self.checkbox_state() == CheckboxState::Checked {
            self.store.borrow_mut().on_select_none();
            if let Some(callback) = self.callbacks.on_select_none.as_mut() {
                callback();
            }
        } else {
            let ids = self.data_view.row_ids();
            self.store.borrow_mut().on_select_many(ids.clone());
            if let Some(callback) = self.callbacks.on_select_many.as_mut() {
                callback(&ids);
            }
        }
    }

    pub fn highlight_row(&mut self, position: Option<usize>) -> RowNavigationResult {
        let result = self
            .viewport
            .set_crosshair_row(position, self.data_view.row_count());
        self.notify_highlight();
        result
    }

    pub fn move_highlight(&mut self, delta: isize) -> RowNavigationResult {
        self.hover = None;
        let result = self.viewport.navigate_rows(delta, self.data_view.row_count());
        self.notify_highlight();
        result
    }

    pub fn page_down(&mut self) -> RowNavigationResult {
        let result = self.viewport.page_down(self.data_view.row_count());
        self.notify_highlight();
        result
    }

    pub fn page_up(&mut self) -> RowNavigationResult {
        let result = self.viewport.page_up(self.data_view.row_count());
        self.notify_highlight();
        result
    }

    pub fn highlighted_position(&self) -> Option<usize> {
        self.viewport.crosshair_row()
    }

    pub fn scroll_rows(&mut self, delta: isize) {
        self.viewport
            .scroll_rows_by(delta, self.data_view.row_count());
    }

    pub fn scroll_horizontally_at(&mut self, delta: i32, now: Instant) {
        self.viewport.scroll_horizontally_at(delta, &self.layout, now);
    }

    /// Scroll so the unpinned column `key` is fully visible
    pub fn scroll_to_column_at(&mut self, key: &str, now: Instant) {
        let Some(column) = self.layout.get(key).filter(|c| !c.pinned).cloned() else {
            return;
        };
        self.viewport
            .ensure_column_visible_at(column.offset, column.width, &self.layout, now);
    }

    /// Pointer over a body cell; `None` when it leaves the grid
    pub fn set_hover(&mut self, hover: Option<(usize, &str)>) {
        self.hover = hover.map(|(row, key)| (row, key.to_string()));
    }

    pub fn begin_resize(&mut self, key: &str, pointer_x: u16) -> bool {
        let Some(column) = self.column(key) else {
            return false;
        };
        let (min, max) = (column.min_width, column.max_width);
        let base = base_width(self.widths.natural_width(key), min);
        let current = self.layout.get(key).map(|c| c.width).unwrap_or(base);
        self.resize = Some(ResizeSession::begin(
            &self.capture,
            key,
            pointer_x,
            base,
            current,
            min,
            max,
        ));
        true
    }

    /// Pointer moved while dragging; returns the preview width
    pub fn drag_resize(&mut self, pointer_x: u16) -> Option<u16> {
        self.resize.as_mut().map(|session| session.update(pointer_x))
    }

    /// Pointer released: persist the delta and schedule a fresh measurement
    pub fn end_resize_at(&mut self, now: Instant) -> Option<ResizeCommit> {
        let commit = self.resize.take()?.commit();
        self.store
            .borrow_mut()
            .set_column_width_delta(&commit.key, commit.delta);
        self.widths.request_remeasure_at(now);
        Some(commit)
    }

    pub fn cancel_resize(&mut self) {
        if let Some(session) = self.resize.take() {
            session.cancel();
        }
    }

    pub fn is_resizing(&self) -> bool {
        self.resize.is_some()
    }

    /// Advance timers. Returns true when a redraw is due.
    pub fn tick_at(&mut self, now: Instant) -> Result<bool> {
        let mut redraw = false;
        if let Some(change) = self.widths.take_ready_at(now) {
            debug!(target: "grid", "{} column widths settled", change.len());
            redraw = true;
        }
        if self.widths.remeasure_due_at(now) {
            redraw = true;
        }
        if let Some(range) = self
            .viewport
            .flush_rendered_at(self.data_view.row_count(), now)
        {
            debug!(target: "viewport", "rendered rows {:?}", range.rows);
        }
        self.toasts.prune_at(now);
        if self.sync()? {
            redraw = true;
        }
        Ok(redraw)
    }

    fn width_limits(&self) -> Vec<WidthLimits> {
        let store = self.store.borrow();
        self.display_columns
            .iter()
            .map(|&idx| {
                let column = &self.columns[idx];
                let delta = store.column_width_delta(&column.key);
                let manual = (delta != 0).then(|| {
                    manual_width(
                        self.widths.natural_width(&column.key),
                        column.min_width,
                        column.max_width,
                        delta,
                    )
                });
                WidthLimits {
                    key: column.key.clone(),
                    min_width: column.min_width,
                    max_width: column.max_width,
                    manual_width: manual,
                }
            })
            .collect()
    }

    /// Measure the displayed columns over a spread sample of visible rows
    fn measure_at(&mut self, now: Instant) {
        let complete = self
            .display_columns
            .iter()
            .all(|&idx| self.widths.has_measurement(&self.columns[idx].key));
        if complete {
            return;
        }

        let sample = sample_rows(self.data_view.row_count(), self.behavior.sample_size);
        let rows: Vec<&Row<T>> = sample
            .iter()
            .filter_map(|&pos| self.data_view.get_row(pos))
            .collect();
        for &idx in &self.display_columns {
            let column = &self.columns[idx];
            let renderer = self.renderer(&column.key);
            let width = measure_column(column, renderer.as_ref(), &rows);
            self.widths.record_measurement(&column.key, width);
        }

        let limits = self.width_limits();
        let accepted = self.widths.reconcile_at(&limits, now);
        if !accepted.is_empty() {
            debug!(target: "grid", "measured {} columns over {} sampled rows",
                accepted.len(), sample.len());
        }
    }

    fn layout_inputs(&self) -> Vec<ColumnLayoutInput> {
        let store = self.store.borrow();
        let preview = self
            .resize
            .as_ref()
            .map(|s| (s.key().to_string(), s.preview_width()));

        self.display_columns
            .iter()
            .map(|&idx| {
                let column = &self.columns[idx];
                let natural = self.widths.natural_width(&column.key);
                let delta = match &preview {
                    Some((key, width)) if *key == column.key => {
                        i32::from(*width) - i32::from(base_width(natural, column.min_width))
                    }
                    _ => store.column_width_delta(&column.key),
                };
                ColumnLayoutInput {
                    key: column.key.clone(),
                    min_width: column.min_width,
                    max_width: column.max_width,
                    fill_width: column.fill_width,
                    pinned: self.is_pinned(&column.key),
                    natural_width: natural,
                    delta,
                }
            })
            .collect()
    }

    /// Pinned columns plus the unpinned ones in the scrolled window, with
    /// their position in the full layout
    fn rendered_columns(&self) -> Vec<(usize, ResolvedColumn)> {
        let unpinned = self.viewport.rendered_columns(&self.layout);
        self.layout
            .columns
            .iter()
            .enumerate()
            .filter(|(idx, c)| c.pinned || unpinned.contains(idx))
            .map(|(idx, c)| (idx, c.clone()))
            .collect()
    }

    fn column_x(&self, column: &ResolvedColumn, gutter: u16) -> i32 {
        if column.pinned {
            i32::from(gutter) + i32::from(column.offset)
        } else {
            i32::from(gutter) + i32::from(self.layout.pinned_width) + i32::from(column.offset)
                - i32::from(self.viewport.scroll_left())
        }
    }

    fn header_cells(&self, columns: &[(usize, ResolvedColumn)], gutter: u16) -> Vec<HeaderCell> {
        let store = self.store.borrow();
        let sort = store.current_view().sort();
        let compare_key = store.compare().pinned_key.as_deref();
        let first_key = self.layout.columns.first().map(|c| c.key.as_str());
        let checkbox = self
            .options
            .selectable
            .then(|| self.checkbox_state_in(&store));

        columns
            .iter()
            .filter_map(|(_, resolved)| {
                let column = self.column(&resolved.key)?;
                Some(HeaderCell {
                    key: column.key.clone(),
                    title: column.title.clone(),
                    x: self.column_x(resolved, gutter),
                    width: resolved.width,
                    pinned: resolved.pinned,
                    sortable: column.sortable,
                    sort: sort.filter(|(k, _)| *k == column.key).map(|(_, d)| d),
                    compare_pinned: compare_key == Some(column.key.as_str()),
                    checkbox: checkbox.filter(|_| first_key == Some(column.key.as_str())),
                    hovered: self.header.hovered() == Some(column.key.as_str()),
                })
            })
            .collect()
    }

    fn frame_rows(
        &mut self,
        columns: &[(usize, ResolvedColumn)],
        gutter: u16,
        scrolling: bool,
    ) -> Vec<FrameRow> {
        let store_rc = Rc::clone(&self.store);
        let store = store_rc.borrow();
        let compare = store.compare().clone();
        let text_query = store.text_query().to_string();
        let query = (!text_query.is_empty()).then_some(text_query.as_str());
        let case_insensitive = self.behavior.case_insensitive;

        // hover effects are suppressed while scrolling sideways
        let hover = if scrolling {
            None
        } else {
            match &self.hover {
                Some((row, key)) => {
                    let col = self.layout.columns.iter().position(|c| &c.key == key);
                    Some((*row, col.unwrap_or(usize::MAX)))
                }
                None => self.viewport.crosshair_row().map(|row| (row, usize::MAX)),
            }
        };

        let compare_column = compare
            .pinned_key
            .as_deref()
            .filter(|_| compare.is_active())
            .and_then(|key| column_index(&self.columns, key));

        let row_count = self.data_view.row_count();
        let range = self.viewport.rendered_rows(row_count);
        let mut frame_rows = Vec::with_capacity(range.len());
        let mut kept: HashSet<(RowId, String)> = HashSet::new();

        for position in range {
            let Some(row) = self.data_view.get_row(position) else {
                continue;
            };
            let selected = store.is_row_selected(&row.id);
            let highlighted = hover.is_some_and(|(r, _)| r == position);
            let base_value = compare_column.map(|idx| self.columns[idx].value(&row.data));

            let mut cells = Vec::with_capacity(columns.len());
            for (column_pos, resolved) in columns {
                let Some(idx) = column_index(&self.columns, &resolved.key) else {
                    continue;
                };
                let column = &self.columns[idx];
                let value = column.value(&row.data);
                let mark = compare_mark(
                    &compare,
                    &column.key,
                    &value,
                    base_value.as_ref(),
                    case_insensitive,
                );
                let memo = CellMemoKey {
                    column_key: column.key.clone(),
                    column_pos: *column_pos,
                    row_id: row.id.clone(),
                    row_pos: position,
                    width: resolved.width,
                    selected,
                    hover,
                    compare: mark,
                    text_query: text_query.clone(),
                };
                let renderer = self.renderer(&column.key);
                let ctx = CellContext {
                    selected,
                    highlighted,
                    compare: mark,
                    text_query: query,
                };
                let cell = self
                    .cells
                    .get_or_render(memo, || renderer.render(&value, &ctx));
                kept.insert((row.id.clone(), column.key.clone()));

                let x = if resolved.pinned {
                    i32::from(gutter) + i32::from(resolved.offset)
                } else {
                    i32::from(gutter) + i32::from(self.layout.pinned_width)
                        + i32::from(resolved.offset)
                        - i32::from(self.viewport.scroll_left())
                };
                cells.push(FrameCell {
                    key: column.key.clone(),
                    x,
                    width: resolved.width,
                    pinned: resolved.pinned,
                    cell,
                });
            }

            let y = self.viewport.row_y(position);
            frame_rows.push(FrameRow {
                position,
                id: row.id.clone(),
                y: i32::try_from(y).unwrap_or(i32::MAX),
                selected,
                highlighted,
                cells,
            });
        }

        self.cells
            .retain(|row, key| kept.contains(&(row.clone(), key.to_string())));
        frame_rows
    }

    /// Build the render plan for a `width` x `height` area
    pub fn frame_at(&mut self, width: u16, height: u16, now: Instant) -> GridFrame {
        let row_count = self.data_view.row_count();
        let header_height = self.display.header_height.max(1);
        let row_height = self.display.row_height.max(1);
        let gutter_width = if self.display.show_row_numbers {
            digits(row_count) + 1
        } else {
            0
        };
        let body_width = width.saturating_sub(gutter_width);
        self.viewport
            .set_size(body_width, height.saturating_sub(header_height), row_count);

        let state = GridState::resolve(self.loading, row_count);
        if state == GridState::Rendering {
            self.measure_at(now);
        }
        self.layout = resolve_layout(&self.layout_inputs(), body_width);

        let scrolling = self.viewport.is_scrolling_horizontally_at(now);
        let columns = self.rendered_columns();
        let header = self.header_cells(&columns, gutter_width);
        let rows = if state == GridState::Rendering {
            self.frame_rows(&columns, gutter_width, scrolling)
        } else {
            Vec::new()
        };

        if let Some(range) = self.viewport.report_rendered_at(row_count, now) {
            debug!(target: "viewport", "rendered rows {:?}", range.rows);
        }

        GridFrame {
            state,
            width,
            height,
            header_height,
            row_height,
            gutter_width,
            pinned_edge: gutter_width.saturating_add(self.layout.pinned_width),
            header,
            rows,
            row_count,
            scrolling,
        }
    }
}

/// How a cell relates to the compare column of its row
fn compare_mark(
    compare: &CompareState,
    key: &str,
    value: &DataValue,
    base: Option<&DataValue>,
    case_insensitive: bool,
) -> Option<CompareMark> {
    let pinned = compare.pinned_key.as_deref()?;
    if pinned == key {
        return Some(CompareMark::Base);
    }
    let equal = datavalues_equal(value, base?, case_insensitive);
    if equal && compare.show_same {
        Some(CompareMark::Same)
    } else if !equal && compare.show_diff {
        Some(CompareMark::Differs)
    } else {
        None
    }
}

fn digits(n: usize) -> u16 {
    n.max(1).to_string().len() as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::ColumnKind;
    use crate::data::filter::{FilterOp, FilterSpec};
    use crate::state::store::ViewStore;
    use serde_json::json;
    use std::cell::RefCell;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct Trade {
        id: i64,
        symbol: &'static str,
        side: &'static str,
        qty: i64,
        bid: f64,
        ask: f64,
    }

    fn trades() -> Vec<Row<Trade>> {
        let data = [
            (1, "MSFT", "buy", 100, 10.0, 10.5),
            (2, "AAPL", "sell", 50, 20.0, 20.0),
            (3, "GOOG", "buy", 75, 30.0, 31.0),
            (4, "AMZN", "sell", 50, 40.0, 40.0),
        ];
        data.iter()
            .map(|&(id, symbol, side, qty, bid, ask)| {
                Row::new(
                    id,
                    Trade {
                        id,
                        symbol,
                        side,
                        qty,
                        bid,
                        ask,
                    },
                )
            })
            .collect()
    }

    fn columns() -> Vec<Column<Trade>> {
        vec![
            Column::new("id", "Id", |t: &Trade| DataValue::Integer(t.id)),
            Column::new("symbol", "Symbol", |t: &Trade| {
                DataValue::String(t.symbol.to_string())
            }),
            Column::new("side", "Side", |t: &Trade| DataValue::String(t.side.to_string())),
            Column::new("qty", "Qty", |t: &Trade| DataValue::Integer(t.qty))
                .with_kind(ColumnKind::Number { precision: None }),
            Column::new("bid", "Bid", |t: &Trade| DataValue::Float(t.bid))
                .with_kind(ColumnKind::Number { precision: Some(2) }),
            Column::new("ask", "Ask", |t: &Trade| DataValue::Float(t.ask))
                .with_kind(ColumnKind::Number { precision: Some(2) }),
        ]
    }

    fn grid() -> DataGrid<Trade> {
        let store = Rc::new(RefCell::new(ViewStore::new("trades")));
        let options = GridOptions {
            selectable: true,
            ..Default::default()
        };
        DataGrid::new(store, trades(), columns(), &Config::default(), options).unwrap()
    }

    fn symbols(grid: &DataGrid<Trade>) -> Vec<&'static str> {
        grid.get_rows().iter().map(|r| r.data.symbol).collect()
    }

    #[test]
    fn test_header_sort_cycles_and_notifies() {
        let mut grid = grid();
        let sorts = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&sorts);
        grid.callbacks_mut().on_sort = Some(Box::new(move |key, dir| {
            seen.borrow_mut().push((key.map(str::to_string), dir));
        }));

        grid.toggle_sort("symbol").unwrap();
        assert_eq!(symbols(&grid), vec!["AAPL", "AMZN", "GOOG", "MSFT"]);
        grid.toggle_sort("symbol").unwrap();
        assert_eq!(symbols(&grid), vec!["MSFT", "GOOG", "AMZN", "AAPL"]);
        grid.toggle_sort("symbol").unwrap();
        assert_eq!(symbols(&grid), vec!["MSFT", "AAPL", "GOOG", "AMZN"]);

        let sorts = sorts.borrow();
        assert_eq!(sorts.len(), 3);
        assert_eq!(sorts[0], (Some("symbol".to_string()), Some(SortDirection::Asc)));
        assert_eq!(sorts[2], (None, None));
        assert!(grid.store().borrow().current_view().updated);
    }

    #[test]
    fn test_included_rows_follow_filters_and_query() {
        let mut grid = grid();
        let counts = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&counts);
        grid.callbacks_mut().on_included_rows_change = Some(Box::new(move |rows| {
            seen.borrow_mut().push(rows.len());
        }));

        grid.store()
            .borrow_mut()
            .on_current_view_filters_change(vec![FilterSpec::new(
                "side",
                FilterOp::Eq,
                Some(json!("buy")),
            )]);
        assert!(grid.sync().unwrap());
        assert_eq!(symbols(&grid), vec!["MSFT", "GOOG"]);

        grid.set_text_query("goo").unwrap();
        assert_eq!(symbols(&grid), vec!["GOOG"]);
        // the filter targets a column that is not displayed any more
        grid.store()
            .borrow_mut()
            .on_current_view_columns_change(vec!["symbol".to_string()], vec!["symbol".to_string()]);
        grid.sync().unwrap();
        assert_eq!(symbols(&grid), vec!["GOOG"]);

        assert_eq!(*counts.borrow(), vec![2, 1]);
    }

    #[test]
    fn test_select_all_is_tri_state() {
        let mut grid = grid();
        assert_eq!(grid.checkbox_state(), CheckboxState::Unchecked);
        assert!(grid.toggle_row_selection(0));
        assert_eq!(grid.checkbox_state(), CheckboxState::Indeterminate);
        grid.toggle_select_all();
        assert_eq!(grid.checkbox_state(), CheckboxState::Checked);
        assert_eq!(grid.store().borrow().selected_rows().len(), 4);
        grid.toggle_select_all();
        assert_eq!(grid.checkbox_state(), CheckboxState::Unchecked);
    }

    #[test]
    fn test_frame_lays_out_pinned_columns_first() {
        let now = Instant::now();
        let mut grid = grid();
        grid.pin_column("qty", true).unwrap();
        let frame = grid.frame_at(80, 10, now);

        assert_eq!(frame.state, GridState::Rendering);
        assert_eq!(frame.header[0].key, "qty");
        assert!(frame.header[0].pinned);
        assert_eq!(frame.header[0].x, 0);
        assert_eq!(frame.header[0].checkbox, Some(CheckboxState::Unchecked));
        assert_eq!(frame.header[1].x, i32::from(frame.pinned_edge));
        assert_eq!(frame.rows.len(), 4);
        assert_eq!(frame.rows[0].cells[0].cell.text, "100");
    }

    #[test]
    fn test_placeholder_states() {
        let now = Instant::now();
        let mut grid = grid();
        grid.set_loading(true);
        let frame = grid.frame_at(80, 10, now);
        assert_eq!(frame.message(), Some("Loading..."));
        assert!(frame.rows.is_empty());

        grid.set_rows(Vec::new()).unwrap();
        let frame = grid.frame_at(80, 10, now);
        assert_eq!(frame.message(), Some("No rows"));
    }

    #[test]
    fn test_compare_marks_cells_against_pinned_column() {
        let now = Instant::now();
        let mut grid = grid();
        grid.compare_pin("bid").unwrap();
        let frame = grid.frame_at(120, 10, now);

        let style_of = |row: usize, key: &str| {
            frame.rows[row]
                .cells
                .iter()
                .find(|c| c.key == key)
                .map(|c| c.cell.style)
                .unwrap()
        };
        // MSFT: ask differs from bid; AAPL: equal and show_same is off
        assert_ne!(style_of(0, "ask"), style_of(1, "ask"));
        assert!(frame.header.iter().any(|h| h.key == "bid" && h.compare_pinned));
    }

    #[test]
    fn test_resize_commits_delta_and_releases_capture() {
        let now = Instant::now();
        let mut grid = grid();
        let frame = grid.frame_at(120, 10, now);
        let symbol = frame.header.iter().find(|h| h.key == "symbol").unwrap().clone();
        let handle = u16::try_from(symbol.x + i32::from(symbol.width)).unwrap();

        assert!(grid.begin_resize("symbol", handle));
        assert!(grid.pointer_capture().is_captured());
        let preview = grid.drag_resize(handle + 4).unwrap();
        assert_eq!(preview, symbol.width + 4);

        let commit = grid.end_resize_at(now).unwrap();
        assert_eq!(commit.delta, 4);
        assert!(!grid.pointer_capture().is_captured());
        assert_eq!(grid.store().borrow().column_width_delta("symbol"), 4);

        let later = now + Duration::from_millis(50);
        assert!(grid.tick_at(later).unwrap());
        let frame = grid.frame_at(120, 10, later);
        let width = frame.header.iter().find(|h| h.key == "symbol").unwrap().width;
        assert_eq!(width, symbol.width + 4);
    }

    #[test]
    fn test_memoized_cells_are_reused() {
        let now = Instant::now();
        let mut grid = grid();
        grid.frame_at(120, 10, now);
        let misses = grid.cells.misses();
        grid.frame_at(120, 10, now);
        assert_eq!(grid.cells.misses(), misses);
        assert!(grid.cells.hits() > 0);
    }

    #[test]
    fn test_hover_move_rerenders_highlighted_row() {
        use ratatui::style::Color;

        let now = Instant::now();
        let mut grid = grid();
        // hover sits in the symbol column of another row
        grid.set_hover(Some((0, "symbol")));
        let frame = grid.frame_at(120, 10, now);
        let cell = |frame: &GridFrame, row: usize, key: &str| {
            frame.rows[row]
                .cells
                .iter()
                .find(|c| c.key == key)
                .map(|c| c.cell.style.bg)
        };
        assert!(!frame.rows[2].highlighted);
        assert_eq!(cell(&frame, 2, "symbol"), Some(None));

        // one move leaves the symbol column and enters row 2
        grid.set_hover(Some((2, "side")));
        let frame = grid.frame_at(120, 10, now);
        assert!(frame.rows[2].highlighted);
        assert_eq!(cell(&frame, 2, "symbol"), Some(Some(Color::DarkGray)));
        assert_eq!(cell(&frame, 0, "symbol"), Some(None));
    }
}
