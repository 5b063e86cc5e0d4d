//! Wizard Step - One page of a multi-page configuration flow
//!
//! Steps form a forward-only chain. Each step reports whether navigation may
//! proceed, moves values between its view and the shared settings object,
//! and pushes change notifications when its validity flips.
//!
//! Concrete steps embed a `StepCore` and expose it through `core()` /
//! `core_mut()`; every other method has a default that may be overridden.

use crate::listeners::{ChangeCallback, ChangeEvent, ChangeListeners, ListenerId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a step in a chain
pub type StepRef<S> = Rc<RefCell<dyn WizardStep<S>>>;

/// Wrap a concrete step into a chain handle
pub fn step_ref<S, T>(step: T) -> StepRef<S>
where
    T: WizardStep<S> + 'static,
{
    Rc::new(RefCell::new(step))
}

/// The default finish rule: `step` is advanceable or skipped, and its
/// successor (if any) can finish. Overrides can fall back to this.
pub fn suffix_finishable<S, T>(step: &T) -> bool
where
    T: WizardStep<S> + ?Sized,
{
    if !(step.can_advance() || step.is_skipped()) {
        return false;
    }

    match step.next_panel() {
        Some(next) => next.borrow().can_finish(),
        None => true,
    }
}

/// Severity of a message a step wants shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

/// Pending user-facing message, e.g. the reason for a vetoed Next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl fmt::Display for StepMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// State every step carries: the successor link, flags and listeners
pub struct StepCore<S> {
    next: Option<StepRef<S>>,
    read_only: bool,
    skipped: bool,
    show_description_panel: bool,
    listeners: ChangeListeners,
    message: Option<StepMessage>,
}

impl<S> StepCore<S> {
    pub fn new(next: Option<StepRef<S>>) -> Self {
        Self {
            next,
            read_only: false,
            skipped: false,
            show_description_panel: true,
            listeners: ChangeListeners::new(),
            message: None,
        }
    }

    /// Terminal step (no successor)
    pub fn terminal() -> Self {
        Self::new(None)
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_description_panel(mut self, show: bool) -> Self {
        self.show_description_panel = show;
        self
    }
}

impl<S> Default for StepCore<S> {
    fn default() -> Self {
        Self::terminal()
    }
}

impl<S> fmt::Debug for StepCore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepCore")
            .field("has_next", &self.next.is_some())
            .field("read_only", &self.read_only)
            .field("skipped", &self.skipped)
            .field("show_description_panel", &self.show_description_panel)
            .field("listeners", &self.listeners)
            .finish()
    }
}

/// One page of a wizard, generic over the settings type `S` it edits
pub trait WizardStep<S> {
    fn core(&self) -> &StepCore<S>;

    fn core_mut(&mut self) -> &mut StepCore<S>;

    /// Short label shown in the wizard's step list
    fn step_label(&self) -> String;

    fn description(&self) -> String {
        String::new()
    }

    fn has_next_panel(&self) -> bool {
        self.core().next.is_some()
    }

    fn next_panel(&self) -> Option<StepRef<S>> {
        self.core().next.clone()
    }

    /// Rebind the successor. Does not check for cycles; see `chain::relink`.
    fn set_next_panel(&mut self, next: Option<StepRef<S>>) {
        self.core_mut().next = next;
    }

    /// Whether the Next button may be enabled. Must be cheap: it runs on
    /// every change notification.
    fn can_advance(&self) -> bool {
        true
    }

    /// Finishability is a suffix property: this step must be advanceable or
    /// skipped, and so must every step after it.
    ///
    /// Overrides (e.g. an informational step that always allows Finish) take
    /// over responsibility for the rest of the chain.
    fn can_finish(&self) -> bool {
        suffix_finishable::<S, Self>(self)
    }

    /// Whether traversal may bypass this step given the current settings
    fn can_skip(&self, _settings: &S) -> bool {
        false
    }

    /// Whether this step offers a Test action
    fn can_test(&self) -> bool {
        false
    }

    /// Heavyweight validation when the user asks to leave the step.
    /// Returning false vetoes the transition.
    fn on_next_button(&mut self) -> bool {
        true
    }

    /// Run the step's test against the current settings. Returns pass/fail;
    /// details go through `report`.
    fn on_test_button(&mut self, _settings: &S) -> bool {
        true
    }

    /// Push settings into the view when the step becomes active
    fn read_settings(&mut self, _settings: &S) {}

    /// Like `read_settings`; `accept_new_provider` marks a brand-new entity
    /// whose identifier-dependent lookups should be skipped.
    fn read_settings_with(&mut self, settings: &S, _accept_new_provider: bool) {
        self.read_settings(settings);
    }

    /// Pull view values into the settings when the step becomes inactive
    fn store_settings(&self, _settings: &mut S) {}

    fn notify_active(&mut self) {}

    fn notify_inactive(&mut self) {}

    fn is_read_only(&self) -> bool {
        self.core().read_only
    }

    fn is_skipped(&self) -> bool {
        self.core().skipped
    }

    fn set_skipped(&mut self, skipped: bool) {
        self.core_mut().skipped = skipped;
    }

    fn is_show_description_panel(&self) -> bool {
        self.core().show_description_panel
    }

    fn add_change_listener(&self, callback: ChangeCallback) -> ListenerId {
        self.core().listeners.insert(callback)
    }

    fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.core().listeners.remove(id)
    }

    /// Handle to this step's listener registry
    fn change_listeners(&self) -> ChangeListeners {
        self.core().listeners.clone()
    }

    /// Tell listeners that `can_advance` / `can_finish` may have changed.
    /// The event carries both answers, since callers usually hold this step
    /// mutably borrowed while notifying.
    fn notify_listeners(&self) {
        let event = ChangeEvent::new(self.step_label(), self.can_advance(), self.can_finish());
        self.core().listeners.notify(&event);
    }

    /// Record a message for the host to show
    fn report(&mut self, kind: MessageKind, text: impl Into<String>)
    where
        Self: Sized,
    {
        self.core_mut().message = Some(StepMessage {
            kind,
            text: text.into(),
        });
    }

    /// Record an error message and return false, for use in `on_next_button`
    fn veto(&mut self, text: impl Into<String>) -> bool
    where
        Self: Sized,
    {
        self.report(MessageKind::Error, text);
        false
    }

    fn take_message(&mut self) -> Option<StepMessage> {
        self.core_mut().message.take()
    }
}
