//! Change Listeners - Push-model validity notifications
//!
//! A step calls `notify` whenever an edit changes its `can_advance` answer,
//! so the hosting container can re-evaluate its buttons without polling.
//! The registry is shared behind a cloneable handle, and notification runs
//! over a snapshot so callbacks may subscribe or unsubscribe mid-dispatch.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Event delivered to change listeners
///
/// Carries the source step's answers at notification time. The source is
/// usually mutably borrowed while it notifies, so callbacks should read
/// these fields instead of borrowing the step again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Label of the step whose validity changed
    pub source: String,
    pub can_advance: bool,
    pub can_finish: bool,
}

impl ChangeEvent {
    pub fn new(source: impl Into<String>, can_advance: bool, can_finish: bool) -> Self {
        Self {
            source: source.into(),
            can_advance,
            can_finish,
        }
    }
}

/// Token returned by `ChangeListeners::add`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type ChangeCallback = Rc<dyn Fn(&ChangeEvent)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(ListenerId, ChangeCallback)>,
}

/// Shared listener registry owned by a single step
#[derive(Clone, Default)]
pub struct ChangeListeners {
    inner: Rc<RefCell<Registry>>,
}

impl ChangeListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback
    pub fn add(&self, callback: impl Fn(&ChangeEvent) + 'static) -> ListenerId {
        self.insert(Rc::new(callback))
    }

    /// Register an already shared callback
    pub fn insert(&self, callback: ChangeCallback) -> ListenerId {
        let mut registry = self.inner.borrow_mut();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.entries.push((id, callback));
        id
    }

    /// Unregister a callback. Returns false if the id was unknown.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut registry = self.inner.borrow_mut();
        let before = registry.entries.len();
        registry.entries.retain(|(entry_id, _)| *entry_id != id);
        registry.entries.len() != before
    }

    /// Deliver `event` to every listener registered when the call started.
    /// Callbacks must not borrow the source step; it may be held mutably.
    pub fn notify(&self, event: &ChangeEvent) {
        let snapshot: Vec<ChangeCallback> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        tracing::trace!(source = %event.source, listeners = snapshot.len(), "change notification");

        for callback in snapshot {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ChangeListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeListeners")
            .field("listeners", &self.len())
            .finish()
    }
}
