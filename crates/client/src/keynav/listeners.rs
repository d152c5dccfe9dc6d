//! Owned key-release subscriptions.
//!
//! A page holds one `KeyUpListeners` registry. Subscribing returns a
//! [`Subscription`]; dropping it removes the listener, so a page's listeners
//! go away with the page.

use super::{HtmlPage, KeyEvent, Navigate};
use quire_core::Error;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Something that reacts to key-release events on a page.
pub trait KeyUpListener: Send + Sync {
    fn on_key_up(&self, event: &mut KeyEvent, page: &HtmlPage, location: &mut dyn Navigate) -> Result<(), Error>;
}

type Slots = Mutex<BTreeMap<u64, Arc<dyn KeyUpListener>>>;

/// Registry of key-release listeners for one page.
#[derive(Default)]
pub struct KeyUpListeners {
    slots: Arc<Slots>,
    next_id: AtomicU64,
}

impl KeyUpListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn KeyUpListener>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).insert(id, listener);
        Subscription { id, slots: Arc::downgrade(&self.slots) }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every live listener in subscription order.
    ///
    /// All listeners run even if one fails; the first error is returned.
    pub fn dispatch(&self, event: &mut KeyEvent, page: &HtmlPage, location: &mut dyn Navigate) -> Result<(), Error> {
        let listeners: Vec<_> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut first_error = None;
        for listener in listeners {
            if let Err(e) = listener.on_key_up(event, page, location) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Keeps a listener registered until dropped.
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    id: u64,
    slots: Weak<Slots>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(slots) = self.slots.upgrade() {
            slots.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.id);
        }
    }
}
