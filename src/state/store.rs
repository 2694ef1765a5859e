//! The view configuration store.
//!
//! One store per grid key. It owns the saved views, the current (working)
//! view, row selection and a few pieces of transient UI state. Every mutation
//! is synchronous and notifies subscribers afterwards.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::data::data_view::SortDirection;
use crate::data::datatable::RowId;
use crate::data::filter::{FilterSpec, QueryClause};
use crate::state::events::{Listener, StoreEvent, Subscribers, SubscriptionId};
use crate::state::view::{generate_view_id, partition_pinned, View, ViewPatch, ALL_VIEW_ID};

/// Column-comparison sub-state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareState {
    /// Column the other columns are compared against
    pub pinned_key: Option<String>,
    /// Mark cells that differ from the compare column
    pub show_diff: bool,
    /// Mark cells equal to the compare column
    pub show_same: bool,
}

impl CompareState {
    pub fn is_active(&self) -> bool {
        self.pinned_key.is_some() && (self.show_diff || self.show_same)
    }
}

/// View editor visibility and its staged target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewModal {
    pub show: bool,
    /// `None` while open means "create a new view"
    pub editing: Option<View>,
}

/// External configuration applied once by `init_store`
#[derive(Debug, Clone, Default)]
pub struct InitConfig {
    pub views: Vec<View>,
    /// Select this view instead of the default one
    pub current_view_id: Option<String>,
    pub selected_rows: Vec<RowId>,
    pub column_width_deltas: HashMap<String, i32>,
    /// Column keys in definition order
    pub column_keys: Vec<String>,
}

pub struct ViewStore {
    key: String,
    views: Vec<View>,
    current_view: View,
    row_selected_ids: Vec<RowId>,
    compare: CompareState,
    is_init: bool,
    view_modal: ViewModal,
    column_width_deltas: HashMap<String, i32>,
    default_column_keys: Vec<String>,
    text_query: String,
    /// Advances on every mutation of any kind
    updated_time: u64,
    subscribers: Subscribers,
}

impl ViewStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            views: Vec::new(),
            current_view: View::default(),
            row_selected_ids: Vec::new(),
            compare: CompareState::default(),
            is_init: false,
            view_modal: ViewModal::default(),
            column_width_deltas: HashMap::new(),
            default_column_keys: Vec::new(),
            text_query: String::new(),
            updated_time: 0,
            subscribers: Subscribers::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn view(&self, id: &str) -> Option<&View> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn current_view(&self) -> &View {
        &self.current_view
    }

    pub fn selected_rows(&self) -> &[RowId] {
        &self.row_selected_ids
    }

    pub fn is_row_selected(&self, id: &RowId) -> bool {
        self.row_selected_ids.contains(id)
    }

    pub fn compare(&self) -> &CompareState {
        &self.compare
    }

    pub fn is_init(&self) -> bool {
        self.is_init
    }

    pub fn view_modal(&self) -> &ViewModal {
        &self.view_modal
    }

    pub fn column_width_delta(&self, key: &str) -> i32 {
        self.column_width_deltas.get(key).copied().unwrap_or(0)
    }

    pub fn column_width_deltas(&self) -> &HashMap<String, i32> {
        &self.column_width_deltas
    }

    pub fn default_column_keys(&self) -> &[String] {
        &self.default_column_keys
    }

    pub fn text_query(&self) -> &str {
        &self.text_query
    }

    pub fn updated_time(&self) -> u64 {
        self.updated_time
    }

    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn notify(&mut self, event: StoreEvent) {
        self.updated_time += 1;
        self.subscribers.emit(&event);
    }

    fn notify_current(&mut self) {
        let event = StoreEvent::CurrentViewChanged {
            id: self.current_view.id.clone(),
            version: self.current_view.version,
        };
        self.notify(event);
    }

    /// Hydrate from external configuration. Only the first call has any
    /// effect; returns whether this call initialized the store.
    pub fn init_store(&mut self, config: InitConfig) -> bool {
        if self.is_init {
            debug!(target: "view_store", "[{}] init_store ignored, already initialized", self.key);
            return false;
        }

        self.default_column_keys = config.column_keys;
        self.column_width_deltas = config.column_width_deltas;
        self.row_selected_ids = config.selected_rows;
        self.set_views(config.views);

        if let Some(id) = config.current_view_id {
            self.select_view(&id);
        }

        self.is_init = true;
        info!(target: "view_store", "[{}] initialized with {} views, current '{}'",
            self.key, self.views.len(), self.current_view.id);
        self.notify(StoreEvent::Initialized);
        true
    }

    /// Column keys in definition order, used when a view has no `ids` yet
    pub fn set_default_column_keys(&mut self, keys: Vec<String>) {
        self.default_column_keys = keys;
    }

    /// Replace the saved views and select the default one (or a blank view)
    pub fn set_views(&mut self, views: Vec<View>) {
        self.views = views;
        self.current_view = self
            .views
            .iter()
            .find(|v| v.def)
            .cloned()
            .unwrap_or_default();
        debug!(target: "view_store", "[{}] set_views: {} views, current '{}'",
            self.key, self.views.len(), self.current_view.id);
        let count = self.views.len();
        self.notify(StoreEvent::ViewsReplaced { count });
        self.notify_current();
    }

    /// Switch the current view. `"all"` selects the show-everything view.
    pub fn select_view(&mut self, id: &str) -> bool {
        let next = if id == ALL_VIEW_ID {
            Some(View::all())
        } else {
            self.view(id).cloned()
        };

        match next {
            Some(view) => {
                self.current_view = view;
                self.notify_current();
                true
            }
            None => {
                debug!(target: "view_store", "[{}] select_view: unknown view '{}'", self.key, id);
                false
            }
        }
    }

    /// Insert or replace a view by id.
    ///
    /// An unknown (or empty) id creates a new view: it gets a fresh id,
    /// becomes the only default, is shown in the switcher and becomes
    /// current. Returns the view id.
    pub fn on_view_update(&mut self, mut view: View) -> String {
        if let Some(pos) = self.views.iter().position(|v| !view.id.is_empty() && v.id == view.id) {
            let id = view.id.clone();
            let is_current = self.current_view.id == id;
            self.views[pos] = view.clone();
            if is_current {
                self.current_view = view;
            }
            debug!(target: "view_store", "[{}] replaced view '{}'", self.key, id);
            self.notify(StoreEvent::ViewUpserted {
                id: id.clone(),
                created: false,
            });
            if is_current {
                self.notify_current();
            }
            return id;
        }

        for existing in self.views.iter_mut() {
            existing.def = false;
        }
        view.id = generate_view_id();
        view.def = true;
        view.is_show = true;
        let id = view.id.clone();
        self.views.push(view.clone());
        self.current_view = view;

        info!(target: "view_store", "[{}] created view '{}' ({})", self.key, self.current_view.name, id);
        self.notify(StoreEvent::ViewUpserted {
            id: id.clone(),
            created: true,
        });
        self.notify_current();
        id
    }

    /// Remove a saved view. Removing the current view falls back to the
    /// default view or a blank one.
    pub fn delete_view(&mut self, id: &str) -> bool {
        let before = self.views.len();
        self.views.retain(|v| v.id != id);
        if self.views.len() == before {
            return false;
        }
        if self.current_view.id == id {
            self.current_view = self
                .views
                .iter()
                .find(|v| v.def)
                .cloned()
                .unwrap_or_default();
            self.notify_current();
        }
        let count = self.views.len();
        self.notify(StoreEvent::ViewsReplaced { count });
        true
    }

    /// True when another saved view (not `excluding_id`) already uses `name`
    pub fn check_duplicate_view_name(&self, name: &str, excluding_id: Option<&str>) -> bool {
        self.views
            .iter()
            .any(|v| v.name == name && Some(v.id.as_str()) != excluding_id)
    }

    /// Merge `patch` into the current view, mark it updated and bump its
    /// version. Every current-view mutator goes through here.
    pub fn update_current_view(&mut self, patch: ViewPatch) -> u64 {
        patch.apply_to(&mut self.current_view);
        self.current_view.updated = true;
        self.current_view.version += 1;
        debug!(target: "view_store", "[{}] current view '{}' -> version {}",
            self.key, self.current_view.id, self.current_view.version);
        self.notify_current();
        self.current_view.version
    }

    pub fn on_current_view_sort(
        &mut self,
        sort_by: Option<String>,
        sort_direction: Option<SortDirection>,
    ) -> u64 {
        self.update_current_view(ViewPatch {
            sort_by: Some(sort_by),
            sort_direction: Some(sort_direction),
            ..Default::default()
        })
    }

    pub fn on_current_view_filters_change(&mut self, filters: Vec<FilterSpec>) -> u64 {
        self.update_current_view(ViewPatch {
            filters: Some(filters),
            ..Default::default()
        })
    }

    pub fn on_current_view_queries_change(&mut self, queries: Vec<QueryClause>) -> u64 {
        self.update_current_view(ViewPatch {
            queries: Some(queries),
            ..Default::default()
        })
    }

    /// Set column selection and order. Pinned columns stay in front and pins
    /// on columns missing from `ids` are dropped.
    pub fn on_current_view_columns_change(
        &mut self,
        selected_ids: Vec<String>,
        ids: Vec<String>,
    ) -> u64 {
        let pinned_ids: Vec<String> = self
            .current_view
            .pinned_ids
            .iter()
            .filter(|k| ids.contains(k))
            .cloned()
            .collect();
        let ids = partition_pinned(&ids, &pinned_ids);
        self.update_current_view(ViewPatch {
            selected_ids: Some(selected_ids),
            ids: Some(ids),
            pinned_ids: Some(pinned_ids),
            ..Default::default()
        })
    }

    /// Pin or unpin a column, then re-derive `ids` with pinned keys first
    pub fn on_current_view_columns_pin(&mut self, column_id: &str, pinned: bool) -> u64 {
        let mut pinned_ids = self.current_view.pinned_ids.clone();
        if pinned {
            if !pinned_ids.iter().any(|k| k == column_id) {
                pinned_ids.push(column_id.to_string());
            }
        } else {
            pinned_ids.retain(|k| k != column_id);
        }

        let mut ids = self.base_column_ids();
        if pinned && !ids.iter().any(|k| k == column_id) {
            ids.push(column_id.to_string());
        }
        let ids = partition_pinned(&ids, &pinned_ids);

        self.update_current_view(ViewPatch {
            ids: Some(ids),
            pinned_ids: Some(pinned_ids),
            ..Default::default()
        })
    }

    /// The current view's order, or the definition order when it has none
    pub fn base_column_ids(&self) -> Vec<String> {
        if self.current_view.ids.is_empty() {
            self.default_column_keys.clone()
        } else {
            self.current_view.ids.clone()
        }
    }

    fn selection_changed(&mut self) {
        let selected = self.row_selected_ids.clone();
        self.notify(StoreEvent::SelectionChanged { selected });
    }

    /// Add many rows to the selection
    pub fn on_select_many(&mut self, ids: Vec<RowId>) {
        for id in ids {
            if !self.row_selected_ids.contains(&id) {
                self.row_selected_ids.push(id);
            }
        }
        self.selection_changed();
    }

    pub fn on_select_none(&mut self) {
        self.row_selected_ids.clear();
        self.selection_changed();
    }

    /// Toggle one row
    pub fn on_select_one(&mut self, id: RowId) {
        if let Some(pos) = self.row_selected_ids.iter().position(|r| r == &id) {
            self.row_selected_ids.remove(pos);
        } else {
            self.row_selected_ids.push(id);
        }
        self.selection_changed();
    }

    /// Remove one row from the selection
    pub fn on_no_select(&mut self, id: &RowId) {
        self.row_selected_ids.retain(|r| r != id);
        self.selection_changed();
    }

    /// Open or close the view editor. Opening with `None` creates a new view.
    pub fn on_show_view_model(&mut self, show: bool, editing: Option<View>) {
        self.view_modal = if show {
            ViewModal { show, editing }
        } else {
            ViewModal::default()
        };
        self.notify(StoreEvent::ViewModalToggled { show });
    }

    /// Toggle the compare column; comparing turns on diff marking
    pub fn on_compare_pin(&mut self, key: &str) {
        if self.compare.pinned_key.as_deref() == Some(key) {
            self.compare = CompareState::default();
        } else {
            self.compare.pinned_key = Some(key.to_string());
            if !self.compare.show_diff && !self.compare.show_same {
                self.compare.show_diff = true;
            }
        }
        self.notify(StoreEvent::CompareChanged);
    }

    pub fn set_compare_display(&mut self, show_diff: bool, show_same: bool) {
        self.compare.show_diff = show_diff;
        self.compare.show_same = show_same;
        self.notify(StoreEvent::CompareChanged);
    }

    pub fn set_column_width_delta(&mut self, key: &str, delta: i32) {
        if delta == 0 {
            self.column_width_deltas.remove(key);
        } else {
            self.column_width_deltas.insert(key.to_string(), delta);
        }
        self.notify(StoreEvent::ColumnWidthsChanged);
    }

    pub fn reset_column_widths(&mut self) {
        self.column_width_deltas.clear();
        self.notify(StoreEvent::ColumnWidthsChanged);
    }

    pub fn set_text_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if query == self.text_query {
            return;
        }
        self.text_query = query.clone();
        self.notify(StoreEvent::TextQueryChanged { query });
    }

    /// Record a completed save of the current view at `version`.
    ///
    /// Clears the unsaved flag only when no edit happened since; the saved
    /// copy in the view list is refreshed either way.
    pub fn mark_saved(&mut self, saved: &View) -> bool {
        if let Some(pos) = self.views.iter().position(|v| v.id == saved.id) {
            let mut stored = saved.clone();
            stored.updated = false;
            self.views[pos] = stored;
        }

        let unchanged =
            self.current_view.id == saved.id && self.current_view.version == saved.version;
        if unchanged {
            self.current_view.updated = false;
        }
        self.notify(StoreEvent::Saved {
            id: saved.id.clone(),
            version: saved.version,
        });
        unchanged
    }
}
