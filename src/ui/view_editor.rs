//! Create or edit a named view.
//!
//! The editor works on a staged copy taken from the store's view modal and
//! only writes back through `on_view_update` after validation passes.

use std::time::Instant;
use tracing::{debug, info};

use crate::data::data_view::SortDirection;
use crate::data::filter::{FilterSpec, QueryClause};
use crate::state::column_manager::{ordered_column_keys, visible_column_keys};
use crate::state::store::ViewStore;
use crate::state::view::{partition_pinned, View};
use crate::ui::toast::{ToastLevel, ToastQueue};
use crate::ui::transfer::{Transfer, TransferItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { id: String, created: bool },
    Rejected(String),
}

/// Editable fields of a view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewDraft {
    pub name: String,
    pub filters: Vec<FilterSpec>,
    pub queries: Vec<QueryClause>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<SortDirection>,
}

impl ViewDraft {
    pub fn from_view(view: &View) -> Self {
        Self {
            name: view.name.clone(),
            filters: view.filters.clone(),
            queries: view.queries.clone(),
            sort_by: view.sort_by.clone(),
            sort_direction: view.sort_direction,
        }
    }
}

pub struct ViewEditor {
    /// Id of the saved view being edited; `None` creates a new one
    editing_id: Option<String>,
    base: View,
    known_keys: Vec<String>,
    pub draft: ViewDraft,
    pub transfer: Transfer,
}

impl ViewEditor {
    /// Stage the view from the store's modal. A new view starts from the
    /// current view's configuration with an empty name.
    pub fn open(store: &ViewStore, items: Vec<TransferItem>) -> Self {
        let known_keys: Vec<String> = items.iter().map(|i| i.key.clone()).collect();
        let (editing_id, base) = match &store.view_modal().editing {
            Some(view) => (Some(view.id.clone()), view.clone()),
            None => {
                let current = store.current_view();
                let base = View {
                    selected_ids: current.selected_ids.clone(),
                    ids: current.ids.clone(),
                    pinned_ids: current.pinned_ids.clone(),
                    filters: current.filters.clone(),
                    queries: current.queries.clone(),
                    sort_by: current.sort_by.clone(),
                    sort_direction: current.sort_direction,
                    ..Default::default()
                };
                (None, base)
            }
        };

        let selected = visible_column_keys(&base, &known_keys);
        let transfer = Transfer::new(items, selected, base.pinned_ids.clone());

        debug!(target: "view_editor", "editor opened for {:?}", editing_id);
        Self {
            editing_id,
            draft: ViewDraft::from_view(&base),
            base,
            known_keys,
            transfer,
        }
    }

    pub fn is_new(&self) -> bool {
        self.editing_id.is_none()
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing_id.as_deref()
    }

    /// Name checks: required, and unique among the other saved views
    pub fn validate(&self, store: &ViewStore) -> Result<(), String> {
        let name = self.draft.name.trim();
        if name.is_empty() {
            return Err("View name is required".to_string());
        }
        if store.check_duplicate_view_name(name, self.editing_id.as_deref()) {
            return Err(format!("A view named '{}' already exists", name));
        }
        if self.transfer.selected_keys().is_empty() {
            return Err("Select at least one column".to_string());
        }
        Ok(())
    }

    /// The view that a successful save writes to the store
    pub fn build_view(&self) -> View {
        let mut view = self.base.clone();
        view.name = self.draft.name.trim().to_string();
        view.filters = self.draft.filters.clone();
        view.queries = self.draft.queries.clone();
        view.sort_by = self.draft.sort_by.clone();
        view.sort_direction = self.draft.sort_by.as_ref().and(self.draft.sort_direction);

        let pinned: Vec<String> = self.transfer.pinned_keys().to_vec();
        let selected = self.transfer.ordered_ids();
        let mut ids = selected.clone();
        for key in ordered_column_keys(&self.base, &self.known_keys) {
            if !ids.contains(&key) {
                ids.push(key);
            }
        }
        view.ids = partition_pinned(&ids, &pinned);
        view.selected_ids = selected;
        view.pinned_ids = pinned;

        if self.editing_id.is_some() {
            view.version += 1;
            view.updated = true;
        }
        view
    }

    /// Validate and commit. Failures become toasts and leave the store
    /// untouched.
    pub fn save_at(&self, store: &mut ViewStore, toasts: &mut ToastQueue, now: Instant) -> SaveOutcome {
        if let Err(reason) = self.validate(store) {
            debug!(target: "view_editor", "save rejected: {}", reason);
            toasts.push_at(reason.clone(), ToastLevel::Warning, now);
            return SaveOutcome::Rejected(reason);
        }

        let view = self.build_view();
        let name = view.name.clone();
        let id = store.on_view_update(view);
        store.on_show_view_model(false, None);
        info!(target: "view_editor", "view '{}' saved as {}", name, id);
        toasts.push_at(format!("View '{}' saved", name), ToastLevel::Success, now);
        SaveOutcome::Saved {
            id,
            created: self.is_new(),
        }
    }

    pub fn cancel(self, store: &mut ViewStore) {
        store.on_show_view_model(false, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<TransferItem> {
        ["a", "b", "c"]
            .iter()
            .map(|k| TransferItem {
                key: k.to_string(),
                title: k.to_uppercase(),
            })
            .collect()
    }

    fn store() -> ViewStore {
        let mut store = ViewStore::new("grid");
        store.set_default_column_keys(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        store
    }

    #[test]
    fn test_empty_name_rejected() {
        let now = Instant::now();
        let mut store = store();
        let mut toasts = ToastQueue::new(3000);
        store.on_show_view_model(true, None);
        let editor = ViewEditor::open(&store, items());

        let outcome = editor.save_at(&mut store, &mut toasts, now);
        assert_eq!(outcome, SaveOutcome::Rejected("View name is required".to_string()));
        assert_eq!(toasts.len(), 1);
        assert!(store.views().is_empty());
        assert!(store.view_modal().show);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let now = Instant::now();
        let mut store = store();
        let mut toasts = ToastQueue::new(3000);
        store.on_view_update(View::named("Open"));

        store.on_show_view_model(true, None);
        let mut editor = ViewEditor::open(&store, items());
        editor.draft.name = " Open ".to_string();
        assert!(matches!(
            editor.save_at(&mut store, &mut toasts, now),
            SaveOutcome::Rejected(_)
        ));
        assert_eq!(store.views().len(), 1);
    }

    #[test]
    fn test_create_view_from_current() {
        let now = Instant::now();
        let mut store = store();
        let mut toasts = ToastQueue::new(3000);
        store.on_current_view_sort(Some("b".to_string()), Some(SortDirection::Desc));

        store.on_show_view_model(true, None);
        let mut editor = ViewEditor::open(&store, items());
        editor.draft.name = "By B".to_string();
        editor.transfer.deselect("c");
        editor.transfer.toggle_pin("b");

        let SaveOutcome::Saved { id, created } = editor.save_at(&mut store, &mut toasts, now) else {
            panic!("expected save");
        };
        assert!(created);
        let view = store.view(&id).unwrap();
        assert_eq!(view.sort_by.as_deref(), Some("b"));
        assert_eq!(view.selected_ids, vec!["b", "a"]);
        assert_eq!(view.ids, vec!["b", "a", "c"]);
        assert_eq!(view.pinned_ids, vec!["b"]);
        assert!(!store.view_modal().show);
    }

    #[test]
    fn test_edit_keeps_name_check_against_others() {
        let now = Instant::now();
        let mut store = store();
        let mut toasts = ToastQueue::new(3000);
        let id = store.on_view_update(View::named("Mine"));

        let existing = store.view(&id).cloned();
        store.on_show_view_model(true, existing);
        let mut editor = ViewEditor::open(&store, items());
        assert!(!editor.is_new());
        // keeping its own name is fine
        editor.draft.name = "Mine".to_string();
        let outcome = editor.save_at(&mut store, &mut toasts, now);
        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                id: id.clone(),
                created: false
            }
        );
        assert_eq!(store.views().len(), 1);
        assert!(store.current_view().updated);
    }
}
