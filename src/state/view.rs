//! The persisted view configuration.
//!
//! Field names serialize in camelCase (`isShow`, `selectedIds`, `pinnedIds`,
//! `sortBy`, `sortDirection`); that key set is what embedding applications
//! store.

use serde::{Deserialize, Serialize};

use crate::data::data_view::SortDirection;
use crate::data::filter::{FilterSpec, QueryClause};

/// Id of the pseudo view that means "no view selected"
pub const ALL_VIEW_ID: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct View {
    pub id: String,
    pub name: String,
    /// Default view, selected when views are loaded
    pub def: bool,
    /// Listed in the view switcher
    pub is_show: bool,
    /// Columns switched on
    pub selected_ids: Vec<String>,
    /// Full display order of column keys
    pub ids: Vec<String>,
    /// Left-pinned column keys, always a prefix-ordered subset of `ids`
    pub pinned_ids: Vec<String>,
    pub filters: Vec<FilterSpec>,
    pub queries: Vec<QueryClause>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<SortDirection>,
    /// Bumped on every mutation of the current view
    pub version: u64,
    /// Has unsaved changes
    pub updated: bool,
}

impl View {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The "show everything" pseudo view
    pub fn all() -> Self {
        Self {
            id: ALL_VIEW_ID.to_string(),
            name: "All".to_string(),
            is_show: true,
            ..Default::default()
        }
    }

    pub fn is_all(&self) -> bool {
        self.id == ALL_VIEW_ID
    }

    /// No view loaded at all (the empty current view)
    pub fn is_blank(&self) -> bool {
        self.id.is_empty()
    }

    pub fn is_pinned(&self, key: &str) -> bool {
        self.pinned_ids.iter().any(|k| k == key)
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected_ids.iter().any(|k| k == key)
    }

    /// Sort key and direction, if both are set
    pub fn sort(&self) -> Option<(&str, SortDirection)> {
        match (&self.sort_by, self.sort_direction) {
            (Some(key), Some(direction)) => Some((key.as_str(), direction)),
            _ => None,
        }
    }
}

/// Fields to merge into the current view. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ViewPatch {
    pub selected_ids: Option<Vec<String>>,
    pub ids: Option<Vec<String>>,
    pub pinned_ids: Option<Vec<String>>,
    pub filters: Option<Vec<FilterSpec>>,
    pub queries: Option<Vec<QueryClause>>,
    pub sort_by: Option<Option<String>>,
    pub sort_direction: Option<Option<SortDirection>>,
}

impl ViewPatch {
    pub fn apply_to(self, view: &mut View) {
        if let Some(selected_ids) = self.selected_ids {
            view.selected_ids = selected_ids;
        }
        if let Some(ids) = self.ids {
            view.ids = ids;
        }
        if let Some(pinned_ids) = self.pinned_ids {
            view.pinned_ids = pinned_ids;
        }
        if let Some(filters) = self.filters {
            view.filters = filters;
        }
        if let Some(queries) = self.queries {
            view.queries = queries;
        }
        if let Some(sort_by) = self.sort_by {
            view.sort_by = sort_by;
        }
        if let Some(sort_direction) = self.sort_direction {
            view.sort_direction = sort_direction;
        }
    }
}

/// Pinned keys first, then the rest, each group keeping its relative order
pub fn partition_pinned(ids: &[String], pinned_ids: &[String]) -> Vec<String> {
    let is_pinned = |id: &String| pinned_ids.contains(id);
    let pinned = ids.iter().filter(|id| is_pinned(id));
    let unpinned = ids.iter().filter(|id| !is_pinned(id));
    pinned.chain(unpinned).cloned().collect()
}

/// A fresh view id: `view-` followed by 8 lowercase hex digits
pub fn generate_view_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("view-{}", &uuid[..8])
}
