//! Header cells and the interactions they offer: sort, pin, compare, the
//! per-column menu, the select-all checkbox and the first-column menu.

use tracing::debug;

use crate::config::config::IconConfig;
use crate::data::data_view::SortDirection;
use crate::ui::cell_renderer::display_width;

/// Tri-state select-all checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckboxState {
    Checked,
    Unchecked,
    Indeterminate,
}

impl CheckboxState {
    pub fn from_counts(selected: usize, total: usize) -> Self {
        if total == 0 || selected == 0 {
            CheckboxState::Unchecked
        } else if selected >= total {
            CheckboxState::Checked
        } else {
            CheckboxState::Indeterminate
        }
    }

    pub fn icon<'a>(&self, icons: &'a IconConfig) -> &'a str {
        match self {
            CheckboxState::Checked => &icons.checked,
            CheckboxState::Unchecked => &icons.unchecked,
            CheckboxState::Indeterminate => &icons.indeterminate,
        }
    }
}

/// Entries of the per-column options menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMenuItem {
    Pin,
    Unpin,
    SortAsc,
    SortDesc,
    ClearSort,
}

impl HeaderMenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            HeaderMenuItem::Pin => "Pin column",
            HeaderMenuItem::Unpin => "Unpin column",
            HeaderMenuItem::SortAsc => "Sort ascending",
            HeaderMenuItem::SortDesc => "Sort descending",
            HeaderMenuItem::ClearSort => "Clear sort",
        }
    }
}

/// Entries of the first column's composite menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstColumnMenuItem {
    InlineQuery,
    ManageColumns,
    ResetColumnWidths,
}

impl FirstColumnMenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            FirstColumnMenuItem::InlineQuery => "Search rows",
            FirstColumnMenuItem::ManageColumns => "Manage columns",
            FirstColumnMenuItem::ResetColumnWidths => "Reset column widths",
        }
    }
}

/// Which first-column entry points a grid offers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstColumnMenu {
    pub inline_query: bool,
    pub manage_columns: bool,
}

impl FirstColumnMenu {
    pub fn is_enabled(&self) -> bool {
        self.inline_query || self.manage_columns
    }

    pub fn items(&self) -> Vec<FirstColumnMenuItem> {
        let mut items = Vec::new();
        if self.inline_query {
            items.push(FirstColumnMenuItem::InlineQuery);
        }
        if self.manage_columns {
            items.push(FirstColumnMenuItem::ManageColumns);
            items.push(FirstColumnMenuItem::ResetColumnWidths);
        }
        items
    }
}

/// What a header interaction asks the grid to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderAction {
    Sort {
        key: String,
        direction: Option<SortDirection>,
    },
    Pin {
        key: String,
        pinned: bool,
    },
    ComparePin {
        key: String,
    },
    ToggleSelectAll,
    FirstColumn(FirstColumnMenuItem),
}

/// One rendered header cell
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub key: String,
    pub title: String,
    /// Screen x of the cell, negative when scrolled partly off the left
    pub x: i32,
    pub width: u16,
    pub pinned: bool,
    pub sortable: bool,
    pub sort: Option<SortDirection>,
    pub compare_pinned: bool,
    /// Only on the first column of selectable grids
    pub checkbox: Option<CheckboxState>,
    pub hovered: bool,
}

impl HeaderCell {
    /// Header text: checkbox, title, then sort/pin/compare markers, and the
    /// menu marker while hovered
    pub fn label(&self, icons: &IconConfig) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(checkbox) = &self.checkbox {
            parts.push(checkbox.icon(icons));
        }
        parts.push(&self.title);
        match self.sort {
            Some(SortDirection::Asc) => parts.push(&icons.sort_asc),
            Some(SortDirection::Desc) => parts.push(&icons.sort_desc),
            None => {}
        }
        if self.pinned {
            parts.push(&icons.pin);
        }
        if self.compare_pinned {
            parts.push(&icons.compare);
        }
        let label = parts.join(" ");
        if self.hovered && display_width(&label) < self.width {
            format!("{} {}", label, icons.menu)
        } else {
            label
        }
    }

    pub fn menu_items(&self) -> Vec<HeaderMenuItem> {
        let mut items = vec![if self.pinned {
            HeaderMenuItem::Unpin
        } else {
            HeaderMenuItem::Pin
        }];
        if self.sortable {
            items.push(HeaderMenuItem::SortAsc);
            items.push(HeaderMenuItem::SortDesc);
            if self.sort.is_some() {
                items.push(HeaderMenuItem::ClearSort);
            }
        }
        items
    }

    pub fn action_for(&self, item: HeaderMenuItem) -> HeaderAction {
        let key = self.key.clone();
        match item {
            HeaderMenuItem::Pin => HeaderAction::Pin { key, pinned: true },
            HeaderMenuItem::Unpin => HeaderAction::Pin { key, pinned: false },
            HeaderMenuItem::SortAsc => HeaderAction::Sort {
                key,
                direction: Some(SortDirection::Asc),
            },
            HeaderMenuItem::SortDesc => HeaderAction::Sort {
                key,
                direction: Some(SortDirection::Desc),
            },
            HeaderMenuItem::ClearSort => HeaderAction::Sort {
                key,
                direction: None,
            },
        }
    }

    /// Clicking the title cycles ascending, descending, unsorted
    pub fn click_action(&self) -> Option<HeaderAction> {
        if !self.sortable {
            return None;
        }
        Some(HeaderAction::Sort {
            key: self.key.clone(),
            direction: next_sort_direction(self.sort),
        })
    }
}

pub fn next_sort_direction(current: Option<SortDirection>) -> Option<SortDirection> {
    match current {
        None => Some(SortDirection::Asc),
        Some(SortDirection::Asc) => Some(SortDirection::Desc),
        Some(SortDirection::Desc) => None,
    }
}

/// Where a pointer landed on the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderHit {
    Title(usize),
    /// The separator right of a cell
    ResizeHandle(usize),
}

pub fn hit_test(cells: &[HeaderCell], x: u16) -> Option<HeaderHit> {
    let x = i32::from(x);
    for (idx, cell) in cells.iter().enumerate() {
        let end = cell.x + i32::from(cell.width);
        if x >= cell.x && x < end {
            return Some(HeaderHit::Title(idx));
        }
        if x == end {
            return Some(HeaderHit::ResizeHandle(idx));
        }
    }
    None
}

/// Hover and open-menu state of the header row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderState {
    hovered: Option<String>,
    menu_open: Option<String>,
    first_column_menu_open: bool,
    /// Highlighted entry of whichever menu is open
    menu_cursor: usize,
}

impl HeaderState {
    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn set_hovered(&mut self, key: Option<&str>) {
        self.hovered = key.map(str::to_string);
    }

    pub fn menu_open(&self) -> Option<&str> {
        self.menu_open.as_deref()
    }

    pub fn open_menu(&mut self, key: &str) {
        debug!(target: "header", "open menu for '{}'", key);
        self.menu_open = Some(key.to_string());
        self.first_column_menu_open = false;
        self.menu_cursor = 0;
    }

    pub fn open_first_column_menu(&mut self) {
        self.menu_open = None;
        self.first_column_menu_open = true;
        self.menu_cursor = 0;
    }

    pub fn is_first_column_menu_open(&self) -> bool {
        self.first_column_menu_open
    }

    pub fn close_menus(&mut self) {
        self.menu_open = None;
        self.first_column_menu_open = false;
        self.menu_cursor = 0;
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_open.is_some() || self.first_column_menu_open
    }

    pub fn menu_cursor(&self) -> usize {
        self.menu_cursor
    }

    pub fn move_menu_cursor(&mut self, delta: isize, item_count: usize) {
        if item_count == 0 {
            self.menu_cursor = 0;
            return;
        }
        let next = (self.menu_cursor as isize + delta).rem_euclid(item_count as isize);
        self.menu_cursor = next as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(key: &str, x: i32, width: u16) -> HeaderCell {
        HeaderCell {
            key: key.to_string(),
            title: key.to_uppercase(),
            x,
            width,
            pinned: false,
            sortable: true,
            sort: None,
            compare_pinned: false,
            checkbox: None,
            hovered: false,
        }
    }

    #[test]
    fn test_checkbox_tri_state() {
        assert_eq!(CheckboxState::from_counts(0, 5), CheckboxState::Unchecked);
        assert_eq!(CheckboxState::from_counts(2, 5), CheckboxState::Indeterminate);
        assert_eq!(CheckboxState::from_counts(5, 5), CheckboxState::Checked);
        assert_eq!(CheckboxState::from_counts(0, 0), CheckboxState::Unchecked);
    }

    #[test]
    fn test_sort_cycle() {
        let mut header = cell("a", 0, 10);
        let first = header.click_action().unwrap();
        assert_eq!(
            first,
            HeaderAction::Sort {
                key: "a".to_string(),
                direction: Some(SortDirection::Asc)
            }
        );
        header.sort = Some(SortDirection::Desc);
        assert_eq!(
            header.click_action(),
            Some(HeaderAction::Sort {
                key: "a".to_string(),
                direction: None
            })
        );
        header.sortable = false;
        assert!(header.click_action().is_none());
    }

    #[test]
    fn test_menu_items_follow_state() {
        let mut header = cell("a", 0, 10);
        assert_eq!(
            header.menu_items(),
            vec![HeaderMenuItem::Pin, HeaderMenuItem::SortAsc, HeaderMenuItem::SortDesc]
        );
        header.pinned = true;
        header.sort = Some(SortDirection::Asc);
        let items = header.menu_items();
        assert_eq!(items[0], HeaderMenuItem::Unpin);
        assert!(items.contains(&HeaderMenuItem::ClearSort));
        assert_eq!(
            header.action_for(HeaderMenuItem::Unpin),
            HeaderAction::Pin {
                key: "a".to_string(),
                pinned: false
            }
        );
    }

    #[test]
    fn test_label_markers() {
        let icons = IconConfig::simple();
        let mut header = cell("id", 0, 20);
        header.sort = Some(SortDirection::Asc);
        header.pinned = true;
        header.checkbox = Some(CheckboxState::Indeterminate);
        assert_eq!(header.label(&icons), "[-] ID ^ [P]");
        header.hovered = true;
        assert_eq!(header.label(&icons), "[-] ID ^ [P] :");
    }

    #[test]
    fn test_hit_test() {
        let cells = vec![cell("a", 0, 5), cell("b", 6, 5)];
        assert_eq!(hit_test(&cells, 2), Some(HeaderHit::Title(0)));
        assert_eq!(hit_test(&cells, 5), Some(HeaderHit::ResizeHandle(0)));
        assert_eq!(hit_test(&cells, 8), Some(HeaderHit::Title(1)));
        assert_eq!(hit_test(&cells, 11), Some(HeaderHit::ResizeHandle(1)));
        assert_eq!(hit_test(&cells, 30), None);
    }

    #[test]
    fn test_first_column_menu() {
        let menu = FirstColumnMenu {
            inline_query: true,
            manage_columns: false,
        };
        assert_eq!(menu.items(), vec![FirstColumnMenuItem::InlineQuery]);
        assert!(!FirstColumnMenu::default().is_enabled());
    }

    #[test]
    fn test_menu_cursor_wraps() {
        let mut state = HeaderState::default();
        state.open_menu("a");
        state.move_menu_cursor(-1, 3);
        assert_eq!(state.menu_cursor(), 2);
        state.move_menu_cursor(1, 3);
        assert_eq!(state.menu_cursor(), 0);
        state.close_menus();
        assert!(!state.is_menu_open());
    }
}
