//! Interactive terminal front end for one grid.
//!
//! Keys (grid):
//!   ↑/↓ j/k      move the highlighted row      PgUp/PgDn  page
//!   ←/→ h/l      move the column cursor        g/G        first/last row
//!   s            cycle sort on the column      p          pin/unpin column
//!   c            compare against the column    x / X      hide column / show all
//!   < / >        move column left/right        r          reset column widths
//!   space        toggle row selection          a          select all / none
//!   /            text query                    m / M      column menu / grid menu
//!   Tab          next saved view               v          save the current view
//!   n / e        new view / edit view          D          delete the current view
//!   q            quit

use anyhow::{anyhow, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::config::config::{Config, IconConfig};
use crate::data::data_view::SortDirection;
use crate::data::loaders::Record;
use crate::state::column_manager::{
    hide_column, move_column_left, move_column_right, unhide_all_columns,
};
use crate::state::persistence::{save_current_view, SaveCoordinator, ViewRepository};
use crate::state::view::ALL_VIEW_ID;
use crate::ui::frame::GridFrame;
use crate::ui::grid::DataGrid;
use crate::ui::grid_widget::GridWidget;
use crate::ui::header::{hit_test, FirstColumnMenuItem, HeaderAction, HeaderHit};
use crate::ui::toast::{ToastLevel, ToastQueue};
use crate::ui::view_editor::{SaveOutcome, ViewEditor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Grid,
    Query,
    ViewEditor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditorFocus {
    Name,
    Search,
    Available,
    Chosen,
}

impl EditorFocus {
    fn next(self) -> Self {
        match self {
            EditorFocus::Name => EditorFocus::Search,
            EditorFocus::Search => EditorFocus::Available,
            EditorFocus::Available => EditorFocus::Chosen,
            EditorFocus::Chosen => EditorFocus::Name,
        }
    }
}

struct EditorState {
    editor: ViewEditor,
    name: Input,
    search: Input,
    focus: EditorFocus,
    cursor: usize,
}

pub struct GridApp {
    grid: DataGrid<Record>,
    repository: Box<dyn ViewRepository>,
    saves: SaveCoordinator,
    icons: IconConfig,
    title: String,
    mode: AppMode,
    query: Input,
    query_before: String,
    editor: Option<EditorState>,
    column_cursor: usize,
    frame: Option<GridFrame>,
    should_quit: bool,
}

impl GridApp {
    pub fn new(
        grid: DataGrid<Record>,
        repository: Box<dyn ViewRepository>,
        config: &Config,
        title: impl Into<String>,
    ) -> Self {
        let icons = if config.display.use_glyphs {
            config.display.icons.clone()
        } else {
            IconConfig::simple()
        };
        let query = grid.store().borrow().text_query().to_string();
        Self {
            grid,
            repository,
            saves: SaveCoordinator::new(),
            icons,
            title: title.into(),
            mode: AppMode::Grid,
            query: Input::new(query),
            query_before: String::new(),
            editor: None,
            column_cursor: 0,
            frame: None,
            should_quit: false,
        }
    }

    pub fn grid(&self) -> &DataGrid<Record> {
        &self.grid
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run(mut self) -> Result<()> {
        enable_raw_mode().map_err(|e| anyhow!("Failed to enable raw mode: {}", e))?;

        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(anyhow!("Failed to setup terminal: {}", e));
        }

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = match Terminal::new(backend) {
            Ok(t) => t,
            Err(e) => {
                let _ = disable_raw_mode();
                return Err(anyhow!("Failed to create terminal: {}", e));
            }
        };

        let res = self.run_app(&mut terminal);

        // Always restore terminal, even on error
        let _ = disable_raw_mode();
        let _ = execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = terminal.show_cursor();

        res.map_err(|e| anyhow!("TUI error: {}", e))
    }

    fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        terminal.draw(|f| self.draw(f))?;
        info!(target: "app", "grid '{}' ready", self.title);

        loop {
            let mut redraw = false;
            if event::poll(Duration::from_millis(50))? {
                let event = event::read()?;
                if let Event::Key(key) = &event {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                }
                self.handle_event(&event, Instant::now());
                redraw = true;
            }
            if self.should_quit {
                break;
            }
            match self.grid.tick_at(Instant::now()) {
                Ok(changed) => redraw |= changed,
                Err(e) => self.toast_error(&e, Instant::now()),
            }
            if redraw {
                terminal.draw(|f| self.draw(f))?;
            }
        }
        Ok(())
    }

    fn toasts(&mut self) -> &mut ToastQueue {
        &mut self.grid.toasts
    }

    fn toast_error(&mut self, error: &anyhow::Error, now: Instant) {
        warn!(target: "app", "{:#}", error);
        self.toasts()
            .push_at(format!("{:#}", error), ToastLevel::Error, now);
    }

    fn report(&mut self, result: Result<()>, now: Instant) {
        if let Err(e) = result {
            self.toast_error(&e, now);
        }
    }

    pub fn handle_event(&mut self, event: &Event, now: Instant) {
        match event {
            Event::Key(key) => {
                let result = match self.mode {
                    AppMode::Grid => self.handle_grid_key(*key, now),
                    AppMode::Query => self.handle_query_key(event, *key),
                    AppMode::ViewEditor => self.handle_editor_key(event, *key, now),
                };
                self.report(result, now);
            }
            Event::Mouse(mouse) if self.mode == AppMode::Grid => {
                let result = self.handle_mouse(*mouse, now);
                self.report(result, now);
            }
            _ => {}
        }
    }

    fn cursor_key(&self) -> Option<String> {
        self.grid
            .display_column_keys()
            .get(self.column_cursor)
            .cloned()
    }

    fn move_column_cursor(&mut self, delta: isize, now: Instant) {
        let count = self.grid.display_column_keys().len();
        if count == 0 {
            return;
        }
        self.column_cursor = self
            .column_cursor
            .saturating_add_signed(delta)
            .min(count - 1);
        if let Some(key) = self.cursor_key() {
            self.grid.header_state_mut().set_hovered(Some(&key));
            self.grid.scroll_to_column_at(&key, now);
        }
    }

    fn handle_grid_key(&mut self, key: KeyEvent, now: Instant) -> Result<()> {
        if self.grid.header_state().is_menu_open() {
            return self.handle_menu_key(key, now);
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                self.grid.cancel_resize();
                self.grid.highlight_row(None);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.grid.move_highlight(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.grid.move_highlight(-1);
            }
            KeyCode::PageDown => {
                self.grid.page_down();
            }
            KeyCode::PageUp => {
                self.grid.page_up();
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.grid.highlight_row(Some(0));
            }
            KeyCode::Char('G') | KeyCode::End => {
                let last = self.grid.row_count().saturating_sub(1);
                self.grid.highlight_row(Some(last));
            }
            KeyCode::Left | KeyCode::Char('h') => self.move_column_cursor(-1, now),
            KeyCode::Right | KeyCode::Char('l') => self.move_column_cursor(1, now),
            KeyCode::Char('s') => {
                if let Some(column) = self.cursor_key() {
                    self.grid.toggle_sort(&column)?;
                }
            }
            KeyCode::Char('p') => {
                if let Some(column) = self.cursor_key() {
                    let pinned = self.grid.is_pinned(&column);
                    self.grid.pin_column(&column, !pinned)?;
                    self.follow_cursor_column(&column);
                }
            }
            KeyCode::Char('c') => {
                if let Some(column) = self.cursor_key() {
                    self.grid.compare_pin(&column)?;
                }
            }
            KeyCode::Char('x') => {
                if let Some(column) = self.cursor_key() {
                    if !hide_column(&mut self.grid.store().borrow_mut(), &column) {
                        self.toasts()
                            .push_at("The last column cannot be hidden", ToastLevel::Warning, now);
                    }
                    self.grid.sync()?;
                    self.move_column_cursor(0, now);
                }
            }
            KeyCode::Char('X') => {
                unhide_all_columns(&mut self.grid.store().borrow_mut());
                self.grid.sync()?;
            }
            KeyCode::Char('<') => {
                if let Some(column) = self.cursor_key() {
                    move_column_left(&mut self.grid.store().borrow_mut(), &column);
                    self.grid.sync()?;
                    self.follow_cursor_column(&column);
                }
            }
            KeyCode::Char('>') => {
                if let Some(column) = self.cursor_key() {
                    move_column_right(&mut self.grid.store().borrow_mut(), &column);
                    self.grid.sync()?;
                    self.follow_cursor_column(&column);
                }
            }
            KeyCode::Char('r') => {
                self.grid.reset_column_widths()?;
                self.toasts()
                    .push_at("Column widths reset", ToastLevel::Info, now);
            }
            KeyCode::Char(' ') => {
                if let Some(position) = self.grid.highlighted_position() {
                    self.grid.toggle_row_selection(position);
                }
            }
            KeyCode::Char('a') => self.grid.toggle_select_all(),
            KeyCode::Char('/') => self.start_query(),
            KeyCode::Char('m') => {
                if let Some(column) = self.cursor_key() {
                    self.grid.header_state_mut().open_menu(&column);
                }
            }
            KeyCode::Char('M') => {
                if self.grid.options().first_column_menu.is_enabled() {
                    self.grid.header_state_mut().open_first_column_menu();
                }
            }
            KeyCode::Tab => self.next_view(now)?,
            KeyCode::Char('v') => self.save_view(now)?,
            KeyCode::Char('n') => self.open_editor(false),
            KeyCode::Char('e') => self.open_editor(true),
            KeyCode::Char('D') => self.delete_current_view(now)?,
            _ => {}
        }
        Ok(())
    }

    /// Keep the column cursor on `key` after the column moved
    fn follow_cursor_column(&mut self, key: &str) {
        if let Some(pos) = self.grid.display_column_keys().iter().position(|k| k == key) {
            self.column_cursor = pos;
        }
    }

    fn menu_actions(&self) -> Vec<(String, MenuChoice)> {
        let header = self.grid.header_state();
        if header.is_first_column_menu_open() {
            return self
                .grid
                .options()
                .first_column_menu
                .items()
                .into_iter()
                .map(|item| (item.label().to_string(), MenuChoice::FirstColumn(item)))
                .collect();
        }
        let Some(key) = header.menu_open() else {
            return Vec::new();
        };
        let Some(cell) = self
            .frame
            .as_ref()
            .and_then(|f| f.header.iter().find(|c| c.key == key))
        else {
            return Vec::new();
        };
        let mut actions: Vec<(String, MenuChoice)> = cell
            .menu_items()
            .into_iter()
            .map(|item| (item.label().to_string(), MenuChoice::Header(cell.action_for(item))))
            .collect();
        actions.push((
            "Compare against column".to_string(),
            MenuChoice::Header(HeaderAction::ComparePin {
                key: cell.key.clone(),
            }),
        ));
        actions
    }

    fn handle_menu_key(&mut self, key: KeyEvent, now: Instant) -> Result<()> {
        let actions = self.menu_actions();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.grid.header_state_mut().close_menus(),
            KeyCode::Down | KeyCode::Char('j') => {
                self.grid
                    .header_state_mut()
                    .move_menu_cursor(1, actions.len());
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.grid
                    .header_state_mut()
                    .move_menu_cursor(-1, actions.len());
            }
            KeyCode::Enter => {
                let cursor = self.grid.header_state().menu_cursor();
                self.grid.header_state_mut().close_menus();
                if let Some((_, choice)) = actions.into_iter().nth(cursor) {
                    let action = match choice {
                        MenuChoice::Header(action) => action,
                        MenuChoice::FirstColumn(item) => HeaderAction::FirstColumn(item),
                    };
                    self.apply_header_action(action, now)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn apply_header_action(&mut self, action: HeaderAction, now: Instant) -> Result<()> {
        match self.grid.apply_header_action(action)? {
            Some(FirstColumnMenuItem::InlineQuery) => self.start_query(),
            Some(FirstColumnMenuItem::ManageColumns) => self.open_editor(true),
            Some(FirstColumnMenuItem::ResetColumnWidths) => {
                self.toasts()
                    .push_at("Column widths reset", ToastLevel::Info, now);
            }
            None => {}
        }
        Ok(())
    }

    fn start_query(&mut self) {
        self.query_before = self.grid.store().borrow().text_query().to_string();
        self.query = Input::new(self.query_before.clone());
        self.mode = AppMode::Query;
    }

    fn handle_query_key(&mut self, event: &Event, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter => {
                self.mode = AppMode::Grid;
                let query = self.query.value().to_string();
                self.grid.set_text_query(&query)?;
                debug!(target: "app", "text query '{}' -> {} rows", query, self.grid.row_count());
            }
            KeyCode::Esc => {
                self.mode = AppMode::Grid;
                let previous = self.query_before.clone();
                self.grid.set_text_query(&previous)?;
            }
            _ => {
                if self.query.handle_event(event).is_some() {
                    let query = self.query.value().to_string();
                    // invalid patterns are reported on Enter
                    if self.grid.set_text_query(&query).is_err() {
                        debug!(target: "app", "incomplete text query '{}'", query);
                    }
                }
            }
        }
        Ok(())
    }

    fn next_view(&mut self, now: Instant) -> Result<()> {
        let next = {
            let store = self.grid.store().borrow();
            let mut ids: Vec<String> = store
                .views()
                .iter()
                .filter(|v| v.is_show)
                .map(|v| v.id.clone())
                .collect();
            ids.push(ALL_VIEW_ID.to_string());
            let current = store.current_view().id.clone();
            let pos = ids.iter().position(|id| *id == current);
            match pos {
                Some(pos) => ids[(pos + 1) % ids.len()].clone(),
                None => ids[0].clone(),
            }
        };
        self.grid.store().borrow_mut().select_view(&next);
        self.grid.sync()?;
        self.column_cursor = 0;
        let name = self.grid.store().borrow().current_view().name.clone();
        self.toasts()
            .push_at(format!("View: {}", display_name(&name)), ToastLevel::Info, now);
        Ok(())
    }

    /// Persist the current view. Unnamed views go through the editor first.
    fn save_view(&mut self, now: Instant) -> Result<()> {
        let (id, name) = {
            let store = self.grid.store().borrow();
            let view = store.current_view();
            (view.id.clone(), view.name.clone())
        };
        if id.is_empty() || id == ALL_VIEW_ID {
            self.open_editor(false);
            return Ok(());
        }

        let result = {
            let mut store = self.grid.store().borrow_mut();
            save_current_view(&mut store, self.repository.as_mut(), &mut self.saves)
        };
        match result? {
            Some(true) => self
                .toasts()
                .push_at(format!("View '{}' saved", name), ToastLevel::Success, now),
            Some(false) => self.toasts().push_at(
                format!("View '{}' saved; newer changes are not saved yet", name),
                ToastLevel::Warning,
                now,
            ),
            None => self
                .toasts()
                .push_at("A save is already in progress", ToastLevel::Warning, now),
        }
        Ok(())
    }

    /// Write a saved view to the repository and record it in the store
    fn persist_view(&mut self, id: &str) -> Result<()> {
        let is_current = self.grid.store().borrow().current_view().id == id;
        if is_current {
            let mut store = self.grid.store().borrow_mut();
            save_current_view(&mut store, self.repository.as_mut(), &mut self.saves)?;
            return Ok(());
        }
        let (key, view) = {
            let store = self.grid.store().borrow();
            (store.key().to_string(), store.view(id).cloned())
        };
        if let Some(view) = view {
            self.repository.save_view(&key, &view)?;
            self.grid.store().borrow_mut().mark_saved(&view);
        }
        Ok(())
    }

    fn delete_current_view(&mut self, now: Instant) -> Result<()> {
        let (key, id, name) = {
            let store = self.grid.store().borrow();
            let view = store.current_view();
            (store.key().to_string(), view.id.clone(), view.name.clone())
        };
        if !self.grid.store().borrow_mut().delete_view(&id) {
            self.toasts()
                .push_at("Only saved views can be deleted", ToastLevel::Warning, now);
            return Ok(());
        }
        self.repository.delete_view(&key, &id)?;
        self.grid.sync()?;
        self.toasts()
            .push_at(format!("View '{}' deleted", name), ToastLevel::Info, now);
        Ok(())
    }

    fn open_editor(&mut self, edit_current: bool) {
        let items = self.grid.transfer_items();
        let editor = {
            let mut store = self.grid.store().borrow_mut();
            let current = store.current_view().clone();
            let editing = (edit_current && store.view(&current.id).is_some()).then_some(current);
            store.on_show_view_model(true, editing);
            ViewEditor::open(&store, items)
        };
        let name = Input::new(editor.draft.name.clone());
        self.editor = Some(EditorState {
            editor,
            name,
            search: Input::default(),
            focus: EditorFocus::Name,
            cursor: 0,
        });
        self.mode = AppMode::ViewEditor;
    }

    fn handle_editor_key(&mut self, event: &Event, key: KeyEvent, now: Instant) -> Result<()> {
        let Some(state) = self.editor.as_mut() else {
            self.mode = AppMode::Grid;
            return Ok(());
        };

        let save = (key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL))
            || (key.code == KeyCode::Enter && state.focus == EditorFocus::Name);

        if key.code == KeyCode::Esc {
            if let Some(state) = self.editor.take() {
                state.editor.cancel(&mut self.grid.store().borrow_mut());
            }
            self.mode = AppMode::Grid;
            return Ok(());
        }

        if save {
            state.editor.draft.name = state.name.value().to_string();
            let shared = self.grid.store().clone();
            let outcome = state
                .editor
                .save_at(&mut shared.borrow_mut(), &mut self.grid.toasts, now);
            if let SaveOutcome::Saved { id, .. } = outcome {
                self.editor = None;
                self.mode = AppMode::Grid;
                self.column_cursor = 0;
                self.grid.sync()?;
                self.persist_view(&id)?;
            }
            return Ok(());
        }

        if key.code == KeyCode::Tab {
            state.focus = state.focus.next();
            state.cursor = 0;
            return Ok(());
        }

        match state.focus {
            EditorFocus::Name => {
                state.name.handle_event(event);
            }
            EditorFocus::Search => {
                if state.search.handle_event(event).is_some() {
                    state.editor.transfer.set_query(state.search.value());
                    state.cursor = 0;
                }
            }
            EditorFocus::Available => {
                let keys: Vec<String> = state
                    .editor
                    .transfer
                    .available()
                    .iter()
                    .map(|i| i.key.clone())
                    .collect();
                match key.code {
                    KeyCode::Down | KeyCode::Char('j') => {
                        state.cursor = (state.cursor + 1).min(keys.len().saturating_sub(1));
                    }
                    KeyCode::Up | KeyCode::Char('k') => state.cursor = state.cursor.saturating_sub(1),
                    KeyCode::Enter | KeyCode::Right => {
                        if let Some(k) = keys.get(state.cursor) {
                            state.editor.transfer.select(k);
                        }
                        state.cursor = state.cursor.min(keys.len().saturating_sub(2));
                    }
                    KeyCode::Char('A') => {
                        state.editor.transfer.move_all_matching_right();
                        state.cursor = 0;
                    }
                    _ => {}
                }
            }
            EditorFocus::Chosen => {
                let keys: Vec<String> = state
                    .editor
                    .transfer
                    .chosen()
                    .iter()
                    .map(|i| i.key.clone())
                    .collect();
                match key.code {
                    KeyCode::Down | KeyCode::Char('j') => {
                        state.cursor = (state.cursor + 1).min(keys.len().saturating_sub(1));
                    }
                    KeyCode::Up | KeyCode::Char('k') => state.cursor = state.cursor.saturating_sub(1),
                    KeyCode::Enter | KeyCode::Left => {
                        if let Some(k) = keys.get(state.cursor) {
                            state.editor.transfer.deselect(k);
                        }
                        state.cursor = state.cursor.min(keys.len().saturating_sub(2));
                    }
                    KeyCode::Char('A') => {
                        state.editor.transfer.move_all_matching_left();
                        state.cursor = 0;
                    }
                    KeyCode::Char('p') => {
                        if let Some(k) = keys.get(state.cursor) {
                            state.editor.transfer.toggle_pin(k);
                        }
                    }
                    KeyCode::Char('K') | KeyCode::Char('J') => {
                        let Some(k) = keys.get(state.cursor) else {
                            return Ok(());
                        };
                        let selected = state.editor.transfer.selected_keys();
                        let Some(from) = selected.iter().position(|s| s == k) else {
                            return Ok(());
                        };
                        let to = if key.code == KeyCode::Char('K') {
                            from.saturating_sub(1)
                        } else {
                            (from + 1).min(selected.len() - 1)
                        };
                        if let Some(moved) = state.editor.transfer.reorder(from, to) {
                            debug!(target: "view_editor", "moved '{}'", moved.moved);
                            let keys_after: Vec<String> = state
                                .editor
                                .transfer
                                .chosen()
                                .iter()
                                .map(|i| i.key.clone())
                                .collect();
                            if let Some(pos) = keys_after.iter().position(|s| *s == moved.moved) {
                                state.cursor = pos;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) -> Result<()> {
        let Some(frame) = self.frame.as_ref() else {
            return Ok(());
        };
        let header_height = frame.header_height;
        let in_header = mouse.row < header_height;

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if in_header => {
                match hit_test(&frame.header, mouse.column) {
                    Some(HeaderHit::ResizeHandle(idx)) => {
                        let key = frame.header[idx].key.clone();
                        self.grid.begin_resize(&key, mouse.column);
                    }
                    Some(HeaderHit::Title(idx)) => {
                        let cell = frame.header[idx].clone();
                        let on_checkbox = cell.checkbox.is_some()
                            && i32::from(mouse.column) < cell.x + 2;
                        let action = if on_checkbox {
                            Some(HeaderAction::ToggleSelectAll)
                        } else {
                            cell.click_action()
                        };
                        if let Some(action) = action {
                            self.apply_header_action(action, now)?;
                        }
                    }
                    None => {}
                }
            }
            MouseEventKind::Down(MouseButton::Right) if in_header => {
                if let Some(cell) = frame.header_at(mouse.column) {
                    let key = cell.key.clone();
                    self.grid.header_state_mut().open_menu(&key);
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(position) = frame.row_at(mouse.row) {
                    self.grid.highlight_row(Some(position));
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.grid.drag_resize(mouse.column);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(commit) = self.grid.end_resize_at(now) {
                    debug!(target: "app", "column '{}' resized to {}", commit.key, commit.width);
                }
            }
            MouseEventKind::Moved => {
                let row = frame.row_at(mouse.row);
                let column = frame.header_at(mouse.column).map(|c| c.key.clone());
                let hovered_header = if in_header { column.clone() } else { None };
                self.grid
                    .header_state_mut()
                    .set_hovered(hovered_header.as_deref());
                match (row, column) {
                    (Some(row), Some(column)) => self.grid.set_hover(Some((row, &column))),
                    _ => self.grid.set_hover(None),
                }
            }
            MouseEventKind::ScrollDown if mouse.modifiers.contains(KeyModifiers::SHIFT) => {
                self.grid.scroll_horizontally_at(4, now);
            }
            MouseEventKind::ScrollUp if mouse.modifiers.contains(KeyModifiers::SHIFT) => {
                self.grid.scroll_horizontally_at(-4, now);
            }
            MouseEventKind::ScrollRight => self.grid.scroll_horizontally_at(4, now),
            MouseEventKind::ScrollLeft => self.grid.scroll_horizontally_at(-4, now),
            MouseEventKind::ScrollDown => self.grid.scroll_rows(3),
            MouseEventKind::ScrollUp => self.grid.scroll_rows(-3),
            _ => {}
        }
        Ok(())
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let now = Instant::now();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(f.area());

        let frame = self.grid.frame_at(chunks[0].width, chunks[0].height, now);
        f.render_widget(GridWidget::new(&frame, &self.icons), chunks[0]);
        self.frame = Some(frame);

        self.draw_status(f, chunks[1], now);
        if self.grid.header_state().is_menu_open() {
            self.draw_menu(f, chunks[0]);
        }
        if self.mode == AppMode::ViewEditor {
            let area = f.area();
            self.draw_editor(f, area);
        }
    }

    fn status_text(&self) -> String {
        let store = self.grid.store().borrow();
        let view = store.current_view();
        let changed = if self.saves.shows_changed(view) { "*" } else { "" };
        let mut parts = vec![
            self.title.clone(),
            format!("view: {}{}", display_name(&view.name), changed),
            format!(
                "{}/{} rows",
                self.grid.row_count(),
                self.grid.data_view().source().len()
            ),
        ];
        if let Some((key, direction)) = view.sort() {
            let arrow = match direction {
                SortDirection::Asc => &self.icons.sort_asc,
                SortDirection::Desc => &self.icons.sort_desc,
            };
            parts.push(format!("sort: {} {}", key, arrow));
        }
        if !store.text_query().is_empty() {
            parts.push(format!("query: {}", store.text_query()));
        }
        if !store.selected_rows().is_empty() {
            parts.push(format!("{} selected", store.selected_rows().len()));
        }
        if let Some(key) = &store.compare().pinned_key {
            parts.push(format!("compare: {}", key));
        }
        parts.join(" | ")
    }

    fn draw_status(&mut self, f: &mut Frame, area: Rect, now: Instant) {
        if self.mode == AppMode::Query {
            let width = area.width.saturating_sub(1) as usize;
            let scroll = self.query.visual_scroll(width);
            let line = Line::from(vec![
                Span::styled("/", Style::default().fg(Color::Yellow)),
                Span::raw(self.query.value().chars().skip(scroll).collect::<String>()),
            ]);
            f.render_widget(Paragraph::new(line), area);
            let cursor = self.query.visual_cursor().saturating_sub(scroll);
            f.set_cursor_position((area.x + 1 + cursor as u16, area.y));
            return;
        }

        let status = self.status_text();
        let toast = self
            .grid
            .toasts
            .latest_at(now)
            .map(|t| (t.message.clone(), t.level));
        let mut spans = vec![Span::styled(status, Style::default().fg(Color::Gray))];
        if let Some((message, level)) = toast {
            let color = match level {
                ToastLevel::Info => Color::Cyan,
                ToastLevel::Success => Color::Green,
                ToastLevel::Warning => Color::Yellow,
                ToastLevel::Error => Color::Red,
            };
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                message,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_menu(&self, f: &mut Frame, area: Rect) {
        let actions = self.menu_actions();
        if actions.is_empty() {
            return;
        }
        let x = self
            .grid
            .header_state()
            .menu_open()
            .and_then(|key| {
                self.frame
                    .as_ref()
                    .and_then(|fr| fr.header.iter().find(|c| c.key == key))
            })
            .map(|c| c.x.max(0) as u16)
            .unwrap_or(0);
        let width = actions
            .iter()
            .map(|(label, _)| label.len() as u16)
            .max()
            .unwrap_or(0)
            + 4;
        let height = actions.len() as u16 + 2;
        let rect = Rect::new(
            area.x + x.min(area.width.saturating_sub(width)),
            area.y + 1,
            width.min(area.width),
            height.min(area.height.saturating_sub(1)),
        );

        let items: Vec<ListItem> = actions
            .iter()
            .map(|(label, _)| ListItem::new(label.clone()))
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default();
        state.select(Some(self.grid.header_state().menu_cursor()));
        f.render_widget(Clear, rect);
        f.render_stateful_widget(list, rect, &mut state);
    }

    fn draw_editor(&self, f: &mut Frame, area: Rect) {
        let Some(state) = self.editor.as_ref() else {
            return;
        };
        let popup = centered_rect(80, 70, area);
        let title = if state.editor.is_new() {
            " New view "
        } else {
            " Edit view "
        };
        f.render_widget(Clear, popup);
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(inner);

        let focused = |focus: EditorFocus| {
            if state.focus == focus {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            }
        };
        f.render_widget(
            Paragraph::new(format!("Name:   {}", state.name.value())).style(focused(EditorFocus::Name)),
            rows[0],
        );
        f.render_widget(
            Paragraph::new(format!("Search: {}", state.search.value()))
                .style(focused(EditorFocus::Search)),
            rows[1],
        );

        let lists = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);

        let transfer = &state.editor.transfer;
        let available: Vec<ListItem> = transfer
            .available()
            .iter()
            .map(|i| ListItem::new(i.title.clone()))
            .collect();
        let chosen: Vec<ListItem> = transfer
            .chosen()
            .iter()
            .map(|i| {
                let marker = if transfer.is_pinned(&i.key) {
                    format!(" {}", self.icons.pin)
                } else {
                    String::new()
                };
                ListItem::new(format!("{}{}", i.title, marker))
            })
            .collect();

        let highlight = Style::default().add_modifier(Modifier::REVERSED);
        let mut available_state = ListState::default();
        let mut chosen_state = ListState::default();
        match state.focus {
            EditorFocus::Available => available_state.select(Some(state.cursor)),
            EditorFocus::Chosen => chosen_state.select(Some(state.cursor)),
            _ => {}
        }
        let available_title = format!(" Available ({}) ", available.len());
        let chosen_title = format!(" Selected ({}) ", chosen.len());
        f.render_stateful_widget(
            List::new(available)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(available_title)
                        .border_style(focused(EditorFocus::Available)),
                )
                .highlight_style(highlight),
            lists[0],
            &mut available_state,
        );
        f.render_stateful_widget(
            List::new(chosen)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(chosen_title)
                        .border_style(focused(EditorFocus::Chosen)),
                )
                .highlight_style(highlight),
            lists[1],
            &mut chosen_state,
        );

        f.render_widget(
            Paragraph::new("Tab focus | Enter move | A move all | p pin | K/J reorder | Ctrl-S save | Esc cancel")
                .style(Style::default().fg(Color::DarkGray)),
            rows[3],
        );
    }
}

enum MenuChoice {
    Header(HeaderAction),
    FirstColumn(FirstColumnMenuItem),
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "(unsaved)"
    } else {
        name
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::Column;
    use crate::data::datatable::{DataValue, Row};
    use crate::state::persistence::JsonViewRepository;
    use crate::state::store::ViewStore;
    use crate::ui::grid::GridOptions;
    use crossterm::event::KeyEventState;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn app(dir: &std::path::Path) -> GridApp {
        let rows: Vec<Row<Record>> = [("bob", 3), ("alice", 1), ("carol", 2)]
            .iter()
            .enumerate()
            .map(|(i, (name, n))| {
                Row::new(
                    i,
                    vec![DataValue::String(name.to_string()), DataValue::Integer(*n)],
                )
            })
            .collect();
        let columns = vec![
            Column::new("name", "Name", |r: &Record| r[0].clone()),
            Column::new("n", "N", |r: &Record| r[1].clone()),
        ];
        let config = Config::default();
        let store = Rc::new(RefCell::new(ViewStore::new("people")));
        let grid = DataGrid::new(store, rows, columns, &config, GridOptions::default()).unwrap();
        let repo = JsonViewRepository::new(dir.join("views.json"));
        GridApp::new(grid, Box::new(repo), &config, "people")
    }

    fn names(app: &GridApp) -> Vec<String> {
        app.grid()
            .get_rows()
            .iter()
            .map(|r| r.data[0].to_string())
            .collect()
    }

    #[test]
    fn test_sort_key_uses_column_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let now = Instant::now();
        app.handle_event(&key(KeyCode::Right), now);
        app.handle_event(&key(KeyCode::Char('s')), now);
        assert_eq!(names(&app), vec!["alice", "carol", "bob"]);
    }

    #[test]
    fn test_query_mode_filters_on_enter() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let now = Instant::now();
        app.handle_event(&key(KeyCode::Char('/')), now);
        assert_eq!(app.mode(), AppMode::Query);
        for c in "car".chars() {
            app.handle_event(&key(KeyCode::Char(c)), now);
        }
        app.handle_event(&key(KeyCode::Enter), now);
        assert_eq!(app.mode(), AppMode::Grid);
        assert_eq!(names(&app), vec!["carol"]);

        app.handle_event(&key(KeyCode::Char('/')), now);
        app.handle_event(&key(KeyCode::Char('x')), now);
        app.handle_event(&key(KeyCode::Esc), now);
        assert_eq!(names(&app), vec!["carol"]);
    }

    #[test]
    fn test_new_view_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let now = Instant::now();

        // unnamed current view: saving opens the editor
        app.handle_event(&key(KeyCode::Char('v')), now);
        assert_eq!(app.mode(), AppMode::ViewEditor);
        for c in "Mine".chars() {
            app.handle_event(&key(KeyCode::Char(c)), now);
        }
        app.handle_event(&ctrl('s'), now);
        assert_eq!(app.mode(), AppMode::Grid);

        let repo = JsonViewRepository::new(dir.path().join("views.json"));
        let saved = repo.load_views("people").unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "Mine");
        assert!(!app.grid().store().borrow().current_view().updated);
    }

    #[test]
    fn test_quit() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.handle_event(&key(KeyCode::Char('q')), Instant::now());
        assert!(app.should_quit());
    }
}
