//! Column management on top of the current view: resolve the display order,
//! hide/show columns and move them around.
//!
//! Every change writes through `on_current_view_columns_change`, so it bumps
//! the view version like any other edit.

use tracing::debug;

use crate::state::store::ViewStore;
use crate::state::view::{partition_pinned, View};

/// Full column order for `view`: its `ids`, followed by any known column the
/// view has never seen, restricted to known columns, pinned keys first.
pub fn ordered_column_keys(view: &View, known_keys: &[String]) -> Vec<String> {
    let mut order: Vec<String> = view
        .ids
        .iter()
        .filter(|k| known_keys.contains(k))
        .cloned()
        .collect();
    for key in known_keys {
        if !order.contains(key) {
            order.push(key.clone());
        }
    }
    partition_pinned(&order, &view.pinned_ids)
}

/// Displayed columns: the ordered keys that are switched on. An empty
/// selection means every column is on.
pub fn visible_column_keys(view: &View, known_keys: &[String]) -> Vec<String> {
    let order = ordered_column_keys(view, known_keys);
    if view.selected_ids.is_empty() {
        return order;
    }
    order
        .into_iter()
        .filter(|k| view.is_selected(k))
        .collect()
}

fn current_order(store: &ViewStore) -> Vec<String> {
    ordered_column_keys(store.current_view(), store.default_column_keys())
}

fn current_selection(store: &ViewStore) -> Vec<String> {
    let view = store.current_view();
    if view.selected_ids.is_empty() {
        current_order(store)
    } else {
        view.selected_ids.clone()
    }
}

/// Switch a column off. The last visible column cannot be hidden.
pub fn hide_column(store: &mut ViewStore, key: &str) -> bool {
    let mut selected = current_selection(store);
    if !selected.iter().any(|k| k == key) || selected.len() <= 1 {
        return false;
    }
    selected.retain(|k| k != key);
    let ids = current_order(store);
    debug!(target: "view_store", "hide column '{}'", key);
    store.on_current_view_columns_change(selected, ids);
    true
}

pub fn show_column(store: &mut ViewStore, key: &str) -> bool {
    let mut selected = current_selection(store);
    if selected.iter().any(|k| k == key) {
        return false;
    }
    let ids = current_order(store);
    if !ids.iter().any(|k| k == key) {
        return false;
    }
    selected.push(key.to_string());
    store.on_current_view_columns_change(selected, ids);
    true
}

/// Show every known column again
pub fn unhide_all_columns(store: &mut ViewStore) {
    let ids = current_order(store);
    store.on_current_view_columns_change(ids.clone(), ids);
}

/// Step `key` within its group (pinned or unpinned), wrapping around at
/// the group edges
fn move_column(store: &mut ViewStore, key: &str, left: bool) -> bool {
    let mut ids = current_order(store);
    let Some(pos) = ids.iter().position(|k| k == key) else {
        return false;
    };

    let pinned_count = ids
        .iter()
        .filter(|k| store.current_view().is_pinned(k))
        .count();
    let (start, end) = if pos < pinned_count {
        (0, pinned_count)
    } else {
        (pinned_count, ids.len())
    };
    let group = &mut ids[start..end];
    let local = pos - start;

    if group.len() < 2 {
        return false;
    }

    if left {
        if local == 0 {
            group.rotate_left(1);
        } else {
            group.swap(local - 1, local);
        }
    } else if local == group.len() - 1 {
        group.rotate_right(1);
    } else {
        group.swap(local, local + 1);
    }

    let selected = current_selection(store);
    debug!(target: "view_store", "move column '{}' {}", key, if left { "left" } else { "right" });
    store.on_current_view_columns_change(selected, ids);
    true
}

pub fn move_column_left(store: &mut ViewStore, key: &str) -> bool {
    move_column(store, key, true)
}

pub fn move_column_right(store: &mut ViewStore, key: &str) -> bool {
    move_column(store, key, false)
}

/// Back to definition order, keeping selection and pins
pub fn reset_column_order(store: &mut ViewStore) {
    let ids = store.default_column_keys().to_vec();
    let selected = store.current_view().selected_ids.clone();
    store.on_current_view_columns_change(selected, ids);
}
