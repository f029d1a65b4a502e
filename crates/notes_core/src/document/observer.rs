//! Change notification for document hosts.

use std::sync::Arc;

/// Observable document property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentProperty {
    /// The formatted body.
    Text,
    /// The derived attachment list.
    AttachedFiles,
}

/// Listener for pre/post change events.
///
/// Every mutation emits exactly one `will_change` before and one
/// `did_change` after the change for each affected property.
pub trait DocumentObserver {
    fn will_change(&self, property: DocumentProperty);
    fn did_change(&self, property: DocumentProperty);
}

/// Handle returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Observers in registration order.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(ObserverId, Arc<dyn DocumentObserver>)>,
}

impl ObserverRegistry {
    pub(crate) fn add(&mut self, observer: Arc<dyn DocumentObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub(crate) fn will_change(&self, property: DocumentProperty) {
        for (_, observer) in &self.observers {
            observer.will_change(property);
        }
    }

    pub(crate) fn did_change(&self, property: DocumentProperty) {
        for (_, observer) in &self.observers {
            observer.did_change(property);
        }
    }
}
