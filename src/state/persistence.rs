//! Durable storage for views and coordination of in-flight saves.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::state::store::ViewStore;
use crate::state::view::View;

/// Where saved views live. Views are grouped by grid key.
pub trait ViewRepository {
    fn load_views(&self, grid_key: &str) -> Result<Vec<View>>;

    /// Insert or replace `view` (matched by id)
    fn save_view(&mut self, grid_key: &str, view: &View) -> Result<()>;

    fn delete_view(&mut self, grid_key: &str, view_id: &str) -> Result<bool>;
}

/// Views as pretty JSON, one array per grid key:
///
/// ```json
/// { "orders": [ { "id": "view-1a2b3c4d", "name": "Open", ... } ] }
/// ```
pub struct JsonViewRepository {
    path: PathBuf,
}

type ViewFile = BTreeMap<String, Vec<View>>;

impl JsonViewRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<ViewFile> {
        if !self.path.exists() {
            return Ok(ViewFile::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read views from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(ViewFile::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("Malformed view file {}", self.path.display()))
    }

    fn write_all(&self, all: &ViewFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(all)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write views to {}", self.path.display()))
    }
}

impl ViewRepository for JsonViewRepository {
    fn load_views(&self, grid_key: &str) -> Result<Vec<View>> {
        let mut all = self.read_all()?;
        let views = all.remove(grid_key).unwrap_or_default();
        debug!(target: "view_store", "loaded {} views for '{}' from {}",
            views.len(), grid_key, self.path.display());
        Ok(views)
    }

    fn save_view(&mut self, grid_key: &str, view: &View) -> Result<()> {
        let mut all = self.read_all()?;
        let views = all.entry(grid_key.to_string()).or_default();

        let mut stored = view.clone();
        stored.updated = false;

        // A new default demotes the others, mirroring the store
        if stored.def {
            for other in views.iter_mut().filter(|v| v.id != stored.id) {
                other.def = false;
            }
        }

        match views.iter_mut().find(|v| v.id == stored.id) {
            Some(existing) => *existing = stored,
            None => views.push(stored),
        }

        self.write_all(&all)?;
        info!(target: "view_store", "saved view '{}' ({}) for '{}'", view.name, view.id, grid_key);
        Ok(())
    }

    fn delete_view(&mut self, grid_key: &str, view_id: &str) -> Result<bool> {
        let mut all = self.read_all()?;
        let Some(views) = all.get_mut(grid_key) else {
            return Ok(false);
        };
        let before = views.len();
        views.retain(|v| v.id != view_id);
        let removed = views.len() != before;
        if removed {
            self.write_all(&all)?;
        }
        Ok(removed)
    }
}

/// A save that has been started but not finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub view_id: String,
    pub version: u64,
}

/// Guards against overlapping saves.
///
/// Only one save may be in flight; `begin` refuses a second one. When a save
/// finishes the store's unsaved flag is cleared only if the current view is
/// still at the saved version.
#[derive(Debug, Default)]
pub struct SaveCoordinator {
    in_flight: Option<SaveTicket>,
}

impl SaveCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn begin(&mut self, view: &View) -> Option<SaveTicket> {
        if let Some(pending) = &self.in_flight {
            debug!(target: "view_store", "save of '{}' ignored, '{}' v{} still pending",
                view.id, pending.view_id, pending.version);
            return None;
        }
        let ticket = SaveTicket {
            view_id: view.id.clone(),
            version: view.version,
        };
        self.in_flight = Some(ticket.clone());
        Some(ticket)
    }

    /// Settle `ticket`. On success the saved snapshot is recorded in the
    /// store; on failure the view stays marked as changed.
    pub fn finish(
        &mut self,
        ticket: SaveTicket,
        snapshot: &View,
        result: Result<()>,
        store: &mut ViewStore,
    ) -> Result<bool> {
        if self.in_flight.as_ref() == Some(&ticket) {
            self.in_flight = None;
        }
        match result {
            Ok(()) => Ok(store.mark_saved(snapshot)),
            Err(e) => {
                warn!(target: "view_store", "saving view '{}' failed: {}", ticket.view_id, e);
                Err(e)
            }
        }
    }

    /// Whether to show the "unsaved changes" marker for `view`
    pub fn shows_changed(&self, view: &View) -> bool {
        view.updated || self.is_saving()
    }
}

/// Persist the store's current view through `repository`.
///
/// Returns `Ok(None)` when another save is still pending, otherwise whether
/// the view ended up clean.
pub fn save_current_view(
    store: &mut ViewStore,
    repository: &mut dyn ViewRepository,
    coordinator: &mut SaveCoordinator,
) -> Result<Option<bool>> {
    let snapshot = store.current_view().clone();
    let Some(ticket) = coordinator.begin(&snapshot) else {
        return Ok(None);
    };
    let grid_key = store.key().to_string();
    let result = repository.save_view(&grid_key, &snapshot);
    coordinator
        .finish(ticket, &snapshot, result, store)
        .map(Some)
}
