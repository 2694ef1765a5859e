//! Dual-list column picker.
//!
//! Left list: columns not selected. Right list: selected columns in display
//! order. Both are narrowed by the search query, and the bulk moves only
//! touch what currently matches.

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub key: String,
    pub title: String,
}

/// Result of a drag-reorder inside the selected list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReorder {
    /// New full order of the selected list
    pub order: Vec<String>,
    /// The item that was dragged
    pub moved: String,
}

#[derive(Debug, Clone, Default)]
pub struct Transfer {
    /// Every column, in definition order
    items: Vec<TransferItem>,
    /// Selected keys, in display order
    selected: Vec<String>,
    pinned: Vec<String>,
    query: String,
}

impl Transfer {
    pub fn new(items: Vec<TransferItem>, selected: Vec<String>, pinned: Vec<String>) -> Self {
        let selected = selected
            .into_iter()
            .filter(|k| items.iter().any(|i| &i.key == k))
            .collect();
        Self {
            items,
            selected,
            pinned,
            query: String::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    fn item(&self, key: &str) -> Option<&TransferItem> {
        self.items.iter().find(|i| i.key == key)
    }

    fn matches(&self, item: &TransferItem) -> bool {
        if self.query.is_empty() {
            return true;
        }
        let query = self.query.to_lowercase();
        item.key.to_lowercase().contains(&query) || item.title.to_lowercase().contains(&query)
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.iter().any(|k| k == key)
    }

    pub fn is_pinned(&self, key: &str) -> bool {
        self.pinned.iter().any(|k| k == key)
    }

    /// Unselected columns matching the query
    pub fn available(&self) -> Vec<&TransferItem> {
        self.items
            .iter()
            .filter(|i| !self.is_selected(&i.key) && self.matches(i))
            .collect()
    }

    /// Selected columns matching the query, in display order
    pub fn chosen(&self) -> Vec<&TransferItem> {
        self.selected
            .iter()
            .filter_map(|k| self.item(k))
            .filter(|i| self.matches(i))
            .collect()
    }

    pub fn selected_keys(&self) -> &[String] {
        &self.selected
    }

    pub fn pinned_keys(&self) -> &[String] {
        &self.pinned
    }

    pub fn select(&mut self, key: &str) -> bool {
        if self.is_selected(key) || self.item(key).is_none() {
            return false;
        }
        self.selected.push(key.to_string());
        true
    }

    pub fn deselect(&mut self, key: &str) -> bool {
        let before = self.selected.len();
        self.selected.retain(|k| k != key);
        self.pinned.retain(|k| k != key);
        self.selected.len() != before
    }

    /// Move every available column matching the query to the selected list
    pub fn move_all_matching_right(&mut self) -> usize {
        let keys: Vec<String> = self.available().iter().map(|i| i.key.clone()).collect();
        for key in &keys {
            self.selected.push(key.clone());
        }
        keys.len()
    }

    /// Move every selected column matching the query back
    pub fn move_all_matching_left(&mut self) -> usize {
        let keys: Vec<String> = self.chosen().iter().map(|i| i.key.clone()).collect();
        for key in &keys {
            self.deselect(key);
        }
        keys.len()
    }

    pub fn toggle_pin(&mut self, key: &str) -> bool {
        if !self.is_selected(key) {
            return false;
        }
        if self.is_pinned(key) {
            self.pinned.retain(|k| k != key);
        } else {
            self.pinned.push(key.to_string());
        }
        true
    }

    /// Drag the selected item at `from` to `to` (positions in the full
    /// selected list)
    pub fn reorder(&mut self, from: usize, to: usize) -> Option<TransferReorder> {
        if from >= self.selected.len() || to >= self.selected.len() {
            return None;
        }
        let moved = self.selected.remove(from);
        self.selected.insert(to, moved.clone());
        debug!(target: "view_editor", "transfer reorder '{}' {} -> {}", moved, from, to);
        Some(TransferReorder {
            order: self.selected.clone(),
            moved,
        })
    }

    /// Selected keys ordered for the view: pinned first
    pub fn ordered_ids(&self) -> Vec<String> {
        let pinned = self.selected.iter().filter(|k| self.is_pinned(k));
        let rest = self.selected.iter().filter(|k| !self.is_pinned(k));
        pinned.chain(rest).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer() -> Transfer {
        let items = ["id", "name", "email", "created_at"]
            .iter()
            .map(|k| TransferItem {
                key: k.to_string(),
                title: k.replace('_', " "),
            })
            .collect();
        Transfer::new(items, vec!["name".to_string(), "id".to_string()], vec![])
    }

    fn keys(items: Vec<&TransferItem>) -> Vec<&str> {
        items.into_iter().map(|i| i.key.as_str()).collect()
    }

    #[test]
    fn test_lists_and_query() {
        let mut transfer = transfer();
        assert_eq!(keys(transfer.available()), vec!["email", "created_at"]);
        assert_eq!(keys(transfer.chosen()), vec!["name", "id"]);

        transfer.set_query("E");
        assert_eq!(keys(transfer.available()), vec!["email", "created_at"]);
        assert_eq!(keys(transfer.chosen()), vec!["name"]);
    }

    #[test]
    fn test_bulk_moves_respect_query() {
        let mut transfer = transfer();
        transfer.set_query("mail");
        assert_eq!(transfer.move_all_matching_right(), 1);
        assert_eq!(transfer.selected_keys(), &["name", "id", "email"]);

        transfer.set_query("");
        assert_eq!(transfer.move_all_matching_left(), 3);
        assert!(transfer.selected_keys().is_empty());
    }

    #[test]
    fn test_reorder_reports_order_and_item() {
        let mut transfer = transfer();
        transfer.select("email");
        let result = transfer.reorder(2, 0).unwrap();
        assert_eq!(result.moved, "email");
        assert_eq!(result.order, vec!["email", "name", "id"]);
        assert!(transfer.reorder(5, 0).is_none());
    }

    #[test]
    fn test_pins_go_first() {
        let mut transfer = transfer();
        assert!(transfer.toggle_pin("id"));
        assert!(!transfer.toggle_pin("email"));
        assert_eq!(transfer.ordered_ids(), vec!["id", "name"]);
        transfer.deselect("id");
        assert!(transfer.pinned_keys().is_empty());
    }
}
