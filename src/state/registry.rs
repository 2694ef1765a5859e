//! Explicit owner of the view stores, one per grid key.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

use crate::state::store::{InitConfig, ViewStore};

pub type SharedStore = Rc<RefCell<ViewStore>>;

/// Maps a grid key to its store. The application constructs one registry and
/// hands stores to grids; nothing is memoized globally.
#[derive(Default)]
pub struct StoreRegistry {
    stores: HashMap<String, SharedStore>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store for `key`, created on first access
    pub fn store(&mut self, key: &str) -> SharedStore {
        let store = self.stores.entry(key.to_string()).or_insert_with(|| {
            debug!(target: "view_store", "creating store for grid '{}'", key);
            Rc::new(RefCell::new(ViewStore::new(key)))
        });
        Rc::clone(store)
    }

    pub fn get(&self, key: &str) -> Option<SharedStore> {
        self.stores.get(key).map(Rc::clone)
    }

    /// Hydrate the store for `key`. Later calls for the same key are ignored.
    pub fn init_store(&mut self, key: &str, config: InitConfig) -> bool {
        self.store(key).borrow_mut().init_store(config)
    }

    /// Drop the registry's handle. Grids still holding the store keep it alive.
    pub fn remove(&mut self, key: &str) -> bool {
        self.stores.remove(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.stores.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::view::View;

    #[test]
    fn test_one_store_per_key() {
        let mut registry = StoreRegistry::new();
        let a = registry.store("orders");
        let b = registry.store("orders");
        let c = registry.store("customers");
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_init_once_per_key() {
        let mut registry = StoreRegistry::new();
        let mut view = View::named("A");
        view.id = "v1".to_string();
        view.def = true;
        let config = InitConfig {
            views: vec![view],
            ..Default::default()
        };
        assert!(registry.init_store("orders", config.clone()));
        assert!(!registry.init_store("orders", config.clone()));
        assert!(registry.init_store("customers", config));

        let store = registry.get("orders").unwrap();
        assert_eq!(store.borrow().current_view().id, "v1");
    }
}
