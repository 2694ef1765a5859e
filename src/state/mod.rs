//! View configuration state: the persisted `View`, the per-grid store that
//! owns it, and the pieces around the store.

pub mod column_manager;
pub mod events;
pub mod persistence;
pub mod registry;
pub mod store;
pub mod view;

pub use events::{StoreEvent, SubscriptionId};
pub use registry::{SharedStore, StoreRegistry};
pub use store::{CompareState, InitConfig, ViewModal, ViewStore};
pub use view::{View, ViewPatch, ALL_VIEW_ID};
