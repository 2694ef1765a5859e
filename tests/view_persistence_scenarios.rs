// Saved views across sessions: CSV in, grid configured, views written to
// JSON and read back into a fresh store

use datagrid::config::config::Config;
use datagrid::data::data_view::SortDirection;
use datagrid::data::loaders::{load_file, Record};
use datagrid::state::column_manager::hide_column;
use datagrid::state::persistence::{
    save_current_view, JsonViewRepository, SaveCoordinator, ViewRepository,
};
use datagrid::state::{InitConfig, StoreRegistry, View};
use datagrid::ui::grid::{DataGrid, GridOptions};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

const TRADES: &str = "id,symbol,qty\n1,MSFT,100\n2,AAPL,50\n3,GOOG,75\n4,AMZN,50\n";

fn write_trades(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("trades.csv");
    std::fs::write(&path, TRADES).unwrap();
    path
}

fn open_grid(csv: &Path, repo: &JsonViewRepository, deltas: HashMap<String, i32>) -> DataGrid<Record> {
    let table = load_file(csv).unwrap();
    let views = repo.load_views(&table.name).unwrap();
    let mut registry = StoreRegistry::new();
    registry.init_store(
        &table.name,
        InitConfig {
            views,
            column_width_deltas: deltas,
            column_keys: table.columns.iter().map(|c| c.key.clone()).collect(),
            ..Default::default()
        },
    );
    let store = registry.store(&table.name);
    DataGrid::new(
        store,
        table.rows,
        table.columns,
        &Config::default(),
        GridOptions::default(),
    )
    .unwrap()
}

fn symbols(grid: &DataGrid<Record>) -> Vec<String> {
    grid.get_rows().iter().map(|r| r.data[1].to_string()).collect()
}

#[test]
fn test_saved_view_restores_grid_in_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_trades(dir.path());
    let mut repo = JsonViewRepository::new(dir.path().join("views.json"));

    {
        let mut grid = open_grid(&csv, &repo, HashMap::new());
        grid.store().borrow_mut().on_view_update(View::named("Desk"));
        grid.sync().unwrap();
        grid.pin_column("qty", true).unwrap();
        grid.sort_by(Some("symbol"), Some(SortDirection::Desc)).unwrap();
        assert!(hide_column(&mut grid.store().borrow_mut(), "id"));
        grid.sync().unwrap();
        assert!(grid.store().borrow().current_view().updated);

        let mut coordinator = SaveCoordinator::new();
        let clean =
            save_current_view(&mut grid.store().borrow_mut(), &mut repo, &mut coordinator).unwrap();
        assert_eq!(clean, Some(true));
        assert!(!grid.store().borrow().current_view().updated);
    }

    let grid = open_grid(&csv, &repo, HashMap::new());
    let store = grid.store().borrow();
    assert_eq!(store.current_view().name, "Desk");
    assert!(!store.current_view().updated);
    drop(store);
    assert_eq!(grid.display_column_keys(), vec!["qty", "symbol"]);
    assert!(grid.is_pinned("qty"));
    assert_eq!(symbols(&grid), vec!["MSFT", "GOOG", "AMZN", "AAPL"]);
}

#[test]
fn test_edit_during_save_keeps_changed_marker() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_trades(dir.path());
    let mut repo = JsonViewRepository::new(dir.path().join("views.json"));
    let mut grid = open_grid(&csv, &repo, HashMap::new());
    grid.store().borrow_mut().on_view_update(View::named("Desk"));
    grid.sync().unwrap();

    let mut coordinator = SaveCoordinator::new();
    let snapshot = grid.store().borrow().current_view().clone();
    let ticket = coordinator.begin(&snapshot).unwrap();
    assert!(coordinator.begin(&snapshot).is_none());

    // edit lands while the write is in flight
    grid.toggle_sort("qty").unwrap();
    let result = repo.save_view("trades", &snapshot);
    let clean = coordinator
        .finish(ticket, &snapshot, result, &mut grid.store().borrow_mut())
        .unwrap();

    assert!(!clean);
    let store = grid.store().borrow();
    assert!(store.current_view().updated);
    assert!(coordinator.shows_changed(store.current_view()));
    assert_eq!(store.view(&snapshot.id).unwrap().sort_by, None);
}

#[test]
fn test_all_view_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_trades(dir.path());
    let mut repo = JsonViewRepository::new(dir.path().join("views.json"));
    let mut grid = open_grid(&csv, &repo, HashMap::new());

    let id = grid.store().borrow_mut().on_view_update(View::named("Narrow"));
    assert!(hide_column(&mut grid.store().borrow_mut(), "qty"));
    grid.sync().unwrap();
    let mut coordinator = SaveCoordinator::new();
    save_current_view(&mut grid.store().borrow_mut(), &mut repo, &mut coordinator).unwrap();
    assert_eq!(grid.display_column_keys(), vec!["id", "symbol"]);

    assert!(grid.store().borrow_mut().select_view("all"));
    grid.sync().unwrap();
    assert_eq!(grid.display_column_keys(), vec!["id", "symbol", "qty"]);

    assert!(grid.store().borrow_mut().delete_view(&id));
    assert!(repo.delete_view("trades", &id).unwrap());
    assert!(repo.load_views("trades").unwrap().is_empty());
    assert!(grid.store().borrow().views().is_empty());
}

#[test]
fn test_width_deltas_from_init_config() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_trades(dir.path());
    let repo = JsonViewRepository::new(dir.path().join("views.json"));
    let now = Instant::now();

    let mut plain = open_grid(&csv, &repo, HashMap::new());
    let mut wider = open_grid(&csv, &repo, HashMap::from([("symbol".to_string(), 5)]));

    let width_of = |grid: &mut DataGrid<Record>| {
        grid.frame_at(120, 10, now)
            .header
            .iter()
            .find(|h| h.key == "symbol")
            .map(|h| h.width)
            .unwrap()
    };
    assert_eq!(width_of(&mut wider), width_of(&mut plain) + 5);

    wider.reset_column_widths().unwrap();
    assert!(wider.store().borrow().column_width_deltas().is_empty());
    assert_eq!(width_of(&mut wider), width_of(&mut plain));
}
