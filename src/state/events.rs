//! Store events and subscriptions

use crate::data::datatable::RowId;

/// Events emitted by the view store after a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Saved views replaced wholesale
    ViewsReplaced { count: usize },

    /// A view was inserted or replaced
    ViewUpserted { id: String, created: bool },

    /// The current view changed (switched or mutated)
    CurrentViewChanged { id: String, version: u64 },

    /// Row selection changed
    SelectionChanged { selected: Vec<RowId> },

    /// View editor opened or closed
    ViewModalToggled { show: bool },

    /// Compare sub-state changed
    CompareChanged,

    /// Manual column widths changed
    ColumnWidthsChanged,

    /// Inline text query changed
    TextQueryChanged { query: String },

    /// Store hydrated from external configuration
    Initialized,

    /// Current view persisted at the given version
    Saved { id: String, version: u64 },
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

pub type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Ordered set of listeners
#[derive(Default)]
pub struct Subscribers {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Subscribers {
    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, listener));
        id
    }

    /// Returns false when the id was unknown
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
