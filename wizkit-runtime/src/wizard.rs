//! Wizard - Container that walks a step chain
//!
//! Owns the chain head, the settings object and a history stack for Back.
//! Button enablement is recomputed only after a step pushes a change
//! notification or a transition happens.

use crate::state::{ButtonState, WizardState};
use std::cell::Cell;
use std::rc::Rc;
use thiserror::Error;
use wizkit_common::chain;
use wizkit_common::step::{StepMessage, StepRef};
use wizkit_common::{ChangeEvent, ListenerId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("wizard has not been started")]
    NotStarted,

    #[error("wizard is already running")]
    AlreadyStarted,

    #[error("wizard is closed ({0:?})")]
    Closed(WizardState),

    #[error("'{step}' is the last step")]
    NoNextStep { step: String },

    #[error("'{step}' is incomplete")]
    CannotAdvance { step: String },

    #[error("already at the first step")]
    AtFirstStep,

    #[error("cannot finish from '{step}': '{blocking}' is incomplete")]
    NotFinishable { step: String, blocking: String },

    #[error("'{step}' has no test")]
    TestUnavailable { step: String },
}

/// Result of a Next/Back request that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The active step changed
    Moved {
        from: String,
        to: String,
        /// Steps bypassed on the way because they could be skipped
        skipped: Vec<String>,
    },

    /// `on_next_button` refused; the step stays active
    Vetoed(Option<StepMessage>),
}

/// Notifications delivered to wizard listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    SelectionChanged { from: Option<String>, to: String },
    Finished,
    Cancelled,
}

/// Outcome of the Test action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub passed: bool,
    pub message: Option<StepMessage>,
}

/// One row of the step list shown beside the active step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSummary {
    pub label: String,
    pub active: bool,
    pub skipped: bool,
    pub visited: bool,
}

type EventListener = Box<dyn FnMut(&WizardEvent)>;

pub struct Wizard<S> {
    title: String,
    head: StepRef<S>,
    current: Option<StepRef<S>>,
    history: Vec<StepRef<S>>,
    visited: Vec<StepRef<S>>,
    settings: S,
    state: WizardState,
    accept_new_provider: bool,
    dirty: Rc<Cell<bool>>,
    buttons: ButtonState,
    subscriptions: Vec<(StepRef<S>, ListenerId)>,
    listeners: Vec<EventListener>,
}

impl<S> Wizard<S> {
    pub fn new(title: impl Into<String>, head: StepRef<S>, settings: S) -> Self {
        Self {
            title: title.into(),
            head,
            current: None,
            history: Vec::new(),
            visited: Vec::new(),
            settings,
            state: WizardState::NoPanelActive,
            accept_new_provider: false,
            dirty: Rc::new(Cell::new(true)),
            buttons: ButtonState::default(),
            subscriptions: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Mark the settings as a brand-new entity; steps skip identifier lookups
    pub fn accept_new_provider(mut self, accept: bool) -> Self {
        self.accept_new_provider = accept;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Take the settings out of a closed wizard
    pub fn into_settings(mut self) -> S
    where
        S: Default,
    {
        std::mem::take(&mut self.settings)
    }

    pub fn current_step(&self) -> Option<StepRef<S>> {
        self.current.clone()
    }

    /// Zero-based index of the active step and the chain length
    pub fn position(&self) -> Option<(usize, usize)> {
        let current = self.current.as_ref()?;
        let index = chain::position(&self.head, current)?;
        Some((index, chain::len(&self.head)))
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&WizardEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Prime every step's view from the settings and activate the head
    pub fn start(&mut self) -> Result<(), WizardError> {
        match self.state {
            WizardState::NoPanelActive => {}
            WizardState::PanelActive => return Err(WizardError::AlreadyStarted),
            closed => return Err(WizardError::Closed(closed)),
        }

        // finishability is judged on views, so unvisited steps need one
        for step in chain::iter(&self.head) {
            step.borrow_mut()
                .read_settings_with(&self.settings, self.accept_new_provider);
            self.ensure_subscribed(&step);
        }

        tracing::info!(title = %self.title, steps = chain::len(&self.head), "starting wizard");
        self.state = WizardState::PanelActive;
        let head = self.head.clone();
        self.activate(head, None);
        Ok(())
    }

    /// Leave the active step for its successor, skipping steps whose
    /// preconditions are already satisfied
    pub fn next(&mut self) -> Result<Transition, WizardError> {
        let current = self.active_step()?;
        let from = current.borrow().step_label();

        let successor = current.borrow().next_panel();
        let Some(mut target) = successor else {
            return Err(WizardError::NoNextStep { step: from });
        };
        if !current.borrow().can_advance() {
            return Err(WizardError::CannotAdvance { step: from });
        }

        let allowed = current.borrow_mut().on_next_button();
        if !allowed {
            let message = current.borrow_mut().take_message();
            tracing::info!(step = %from, reason = ?message.as_ref().map(|m| m.text.as_str()), "next vetoed");
            self.dirty.set(true);
            return Ok(Transition::Vetoed(message));
        }

        {
            let mut step = current.borrow_mut();
            step.store_settings(&mut self.settings);
            step.notify_inactive();
        }

        let mut skipped = Vec::new();
        loop {
            let skip = {
                let candidate = target.borrow();
                candidate.has_next_panel() && candidate.can_skip(&self.settings)
            };
            if !skip {
                break;
            }

            let successor = {
                let mut candidate = target.borrow_mut();
                candidate.set_skipped(true);
                skipped.push(candidate.step_label());
                candidate.next_panel()
            };
            match successor {
                Some(step) => target = step,
                None => break,
            }
        }
        target.borrow_mut().set_skipped(false);

        if !skipped.is_empty() {
            tracing::debug!(?skipped, "skipping satisfied steps");
        }

        self.history.push(current);
        let to = self.activate(target, Some(from.clone()));
        Ok(Transition::Moved { from, to, skipped })
    }

    /// Return to the previously active step
    pub fn back(&mut self) -> Result<Transition, WizardError> {
        let current = self.active_step()?;
        let Some(previous) = self.history.pop() else {
            return Err(WizardError::AtFirstStep);
        };

        let from = {
            let mut step = current.borrow_mut();
            step.store_settings(&mut self.settings);
            step.notify_inactive();
            step.step_label()
        };

        // the landing step may change what made later steps skippable
        let after = previous.borrow().next_panel();
        if let Some(after) = after {
            for step in chain::iter(&after) {
                step.borrow_mut().set_skipped(false);
            }
        }

        let to = self.activate(previous, Some(from.clone()));
        Ok(Transition::Moved {
            from,
            to,
            skipped: Vec::new(),
        })
    }

    /// Finish from the active step, storing every step into the settings
    pub fn finish(&mut self) -> Result<(), WizardError> {
        let current = self.active_step()?;
        if !current.borrow().can_finish() {
            let step = current.borrow().step_label();
            let blocking = chain::first_blocking(&current)
                .map(|blocking| blocking.borrow().step_label())
                .unwrap_or_else(|| step.clone());
            return Err(WizardError::NotFinishable { step, blocking });
        }

        {
            let mut step = current.borrow_mut();
            step.store_settings(&mut self.settings);
            step.notify_inactive();
        }

        for step in chain::iter(&self.head) {
            if !self.was_visited(&step) {
                step.borrow_mut()
                    .read_settings_with(&self.settings, self.accept_new_provider);
            }
            step.borrow().store_settings(&mut self.settings);
        }

        tracing::info!(title = %self.title, "wizard finished");
        self.close(WizardState::Finished);
        self.emit(&WizardEvent::Finished);
        Ok(())
    }

    /// Abandon the wizard without transferring settings
    pub fn cancel(&mut self) -> Result<(), WizardError> {
        if self.state.is_closed() {
            return Err(WizardError::Closed(self.state));
        }

        if let Some(current) = self.current.as_ref() {
            current.borrow_mut().notify_inactive();
        }

        tracing::info!(title = %self.title, "wizard cancelled");
        self.close(WizardState::Cancelled);
        self.emit(&WizardEvent::Cancelled);
        Ok(())
    }

    /// Store the active step's view and run its test
    pub fn test(&mut self) -> Result<TestOutcome, WizardError> {
        let current = self.active_step()?;
        if !current.borrow().can_test() {
            return Err(WizardError::TestUnavailable {
                step: current.borrow().step_label(),
            });
        }

        current.borrow().store_settings(&mut self.settings);
        let passed = current.borrow_mut().on_test_button(&self.settings);
        let message = current.borrow_mut().take_message();
        tracing::debug!(passed, "step test ran");
        Ok(TestOutcome { passed, message })
    }

    /// Pending message from the active step, if any
    pub fn take_step_message(&mut self) -> Option<StepMessage> {
        self.current
            .as_ref()
            .and_then(|step| step.borrow_mut().take_message())
    }

    /// Current button enablement, recomputed after change notifications
    pub fn buttons(&mut self) -> ButtonState {
        if self.dirty.replace(false) {
            self.buttons = self.compute_buttons();
        }
        self.buttons
    }

    /// Step list with the active and skipped markers
    pub fn overview(&self) -> Vec<StepSummary> {
        chain::iter(&self.head)
            .map(|step| {
                let active = self
                    .current
                    .as_ref()
                    .is_some_and(|current| chain::same_step(current, &step));
                let visited = self.was_visited(&step);
                let step = step.borrow();
                StepSummary {
                    label: step.step_label(),
                    active,
                    skipped: step.is_skipped(),
                    visited,
                }
            })
            .collect()
    }

    fn active_step(&self) -> Result<StepRef<S>, WizardError> {
        match self.state {
            WizardState::NoPanelActive => Err(WizardError::NotStarted),
            WizardState::PanelActive => self.current.clone().ok_or(WizardError::NotStarted),
            closed => Err(WizardError::Closed(closed)),
        }
    }

    /// Make `step` the active step and return its label
    fn activate(&mut self, step: StepRef<S>, from: Option<String>) -> String {
        {
            let mut active = step.borrow_mut();
            active.read_settings_with(&self.settings, self.accept_new_provider);
            active.notify_active();
        }
        self.ensure_subscribed(&step);
        if !self.was_visited(&step) {
            self.visited.push(step.clone());
        }

        let to = step.borrow().step_label();
        tracing::debug!(from = ?from, to = %to, "step selected");
        self.current = Some(step);
        self.dirty.set(true);
        self.emit(&WizardEvent::SelectionChanged {
            from,
            to: to.clone(),
        });
        to
    }

    fn compute_buttons(&self) -> ButtonState {
        match (self.state, self.current.as_ref()) {
            (WizardState::PanelActive, Some(current)) => {
                let step = current.borrow();
                ButtonState {
                    back: !self.history.is_empty(),
                    next: step.has_next_panel() && step.can_advance(),
                    finish: step.can_finish(),
                    test: step.can_test(),
                    cancel: true,
                }
            }
            (WizardState::NoPanelActive, _) => ButtonState {
                cancel: true,
                ..ButtonState::default()
            },
            _ => ButtonState::default(),
        }
    }

    fn was_visited(&self, step: &StepRef<S>) -> bool {
        self.visited
            .iter()
            .any(|visited| chain::same_step(visited, step))
    }

    fn ensure_subscribed(&mut self, step: &StepRef<S>) {
        if self
            .subscriptions
            .iter()
            .any(|(subscribed, _)| chain::same_step(subscribed, step))
        {
            return;
        }

        let dirty = self.dirty.clone();
        let id = step
            .borrow()
            .add_change_listener(Rc::new(move |_: &ChangeEvent| dirty.set(true)));
        self.subscriptions.push((step.clone(), id));
    }

    fn close(&mut self, state: WizardState) {
        self.state = state;
        self.current = None;
        self.dirty.set(true);
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        for (step, id) in self.subscriptions.drain(..) {
            if let Ok(step) = step.try_borrow() {
                step.remove_change_listener(id);
            }
        }
    }

    fn emit(&mut self, event: &WizardEvent) {
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

impl<S> Drop for Wizard<S> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use wizkit_common::config::WizardDefinition;
    use wizkit_common::form::{build_form_chain, FormChain, FormSettings, FormStep};
    use wizkit_common::session::{AdminSession, InMemorySession};
    use wizkit_common::step::{step_ref, MessageKind, StepCore, WizardStep};

    const CONNECTION_WIZARD: &str = r#"
[wizard]
title = "JMS Connection"

[[steps]]
id = "connection"
label = "Connection"
[[steps.fields]]
key = "name"
prompt = "Connection name"
required = true
unique_in = "jms-connection"

[[steps]]
id = "destination"
label = "Destination"
skip_when_filled = true
[[steps.fields]]
key = "queue"
prompt = "Queue"
required = true

[[steps]]
id = "options"
label = "Options"
[[steps.fields]]
key = "host"
prompt = "Host"
required = true
default = "localhost"
"#;

    fn form(session: Option<Rc<dyn AdminSession>>) -> FormChain {
        let definition = WizardDefinition::from_str(CONNECTION_WIZARD).unwrap();
        build_form_chain(&definition, session).unwrap()
    }

    fn step(form: &FormChain, index: usize) -> Rc<RefCell<FormStep>> {
        form.steps[index].clone()
    }

    fn started(form: &FormChain, settings: FormSettings) -> Wizard<FormSettings> {
        let mut wizard = Wizard::new("JMS Connection", form.head.clone(), settings);
        wizard.start().unwrap();
        wizard
    }

    fn active_label<S>(wizard: &Wizard<S>) -> String {
        wizard.current_step().unwrap().borrow().step_label()
    }

    #[test]
    fn test_start_activates_head() {
        let form = form(None);
        let mut wizard = started(&form, FormSettings::new());

        assert_eq!(wizard.title(), "JMS Connection");
        assert_eq!(wizard.state(), WizardState::PanelActive);
        assert_eq!(active_label(&wizard), "Connection");
        assert_eq!(wizard.position(), Some((0, 3)));
        assert_eq!(
            wizard.buttons(),
            ButtonState {
                back: false,
                next: false,
                finish: false,
                test: false,
                cancel: true,
            }
        );
        assert_eq!(wizard.start(), Err(WizardError::AlreadyStarted));
    }

    #[test]
    fn test_requires_start() {
        let form = form(None);
        let mut wizard = Wizard::new("x", form.head.clone(), FormSettings::new());
        assert_eq!(wizard.next(), Err(WizardError::NotStarted));
        assert_eq!(wizard.buttons().enabled(), vec![crate::state::Action::Cancel]);
    }

    #[test]
    fn test_edit_pushes_button_update() {
        let form = form(None);
        let mut wizard = started(&form, FormSettings::new());
        assert!(!wizard.buttons().next);

        step(&form, 0).borrow_mut().set_value("name", "orders").unwrap();
        assert!(wizard.buttons().next);
    }

    #[test]
    fn test_next_stores_and_reads_settings() {
        let form = form(None);
        let mut wizard = started(&form, FormSettings::new());

        step(&form, 0).borrow_mut().set_value("name", "orders").unwrap();
        let transition = wizard.next().unwrap();
        assert_eq!(
            transition,
            Transition::Moved {
                from: "Connection".into(),
                to: "Destination".into(),
                skipped: vec![],
            }
        );
        assert_eq!(wizard.settings().get("name"), Some("orders"));
        assert!(wizard.buttons().back);

        // Destination is incomplete
        assert_eq!(
            wizard.next(),
            Err(WizardError::CannotAdvance {
                step: "Destination".into()
            })
        );
    }

    #[test]
    fn test_back_keeps_edits() {
        let form = form(None);
        let mut wizard = started(&form, FormSettings::new());
        assert_eq!(wizard.back(), Err(WizardError::AtFirstStep));

        step(&form, 0).borrow_mut().set_value("name", "orders").unwrap();
        wizard.next().unwrap();
        step(&form, 1).borrow_mut().set_value("queue", "q.orders").unwrap();

        wizard.back().unwrap();
        assert_eq!(active_label(&wizard), "Connection");
        assert_eq!(wizard.settings().get("queue"), Some("q.orders"));

        wizard.next().unwrap();
        assert_eq!(step(&form, 1).borrow().value("queue"), Some("q.orders"));
    }

    #[test]
    fn test_next_skips_satisfied_step_and_back_bypasses_it() {
        let form = form(None);
        let settings = FormSettings::new().with("queue", "q.orders");
        let mut wizard = started(&form, settings);

        step(&form, 0).borrow_mut().set_value("name", "orders").unwrap();
        let transition = wizard.next().unwrap();
        assert_eq!(
            transition,
            Transition::Moved {
                from: "Connection".into(),
                to: "Options".into(),
                skipped: vec!["Destination".into()],
            }
        );
        assert!(step(&form, 1).borrow().is_skipped());

        let overview = wizard.overview();
        assert!(overview[1].skipped && !overview[1].visited);
        assert!(overview[2].active);

        wizard.back().unwrap();
        assert_eq!(active_label(&wizard), "Connection");
        assert!(!step(&form, 1).borrow().is_skipped());

        // still satisfied, so the next pass skips it again
        let transition = wizard.next().unwrap();
        assert!(matches!(transition, Transition::Moved { skipped, .. } if skipped == ["Destination"]));
    }

    #[test]
    fn test_veto_keeps_step_and_settings() {
        let session = InMemorySession::new().with_entity("jms-connection", "orders");
        let form = form(Some(Rc::new(session)));
        let mut wizard = Wizard::new("JMS", form.head.clone(), FormSettings::new())
            .accept_new_provider(true);
        wizard.start().unwrap();

        step(&form, 0).borrow_mut().set_value("name", "orders").unwrap();
        match wizard.next().unwrap() {
            Transition::Vetoed(Some(message)) => {
                assert_eq!(message.kind, MessageKind::Error);
                assert!(message.text.contains("already exists"));
            }
            other => panic!("Expected veto, got {other:?}"),
        }
        assert_eq!(active_label(&wizard), "Connection");
        assert!(wizard.settings().is_empty());

        step(&form, 0).borrow_mut().set_value("name", "billing").unwrap();
        assert!(matches!(wizard.next().unwrap(), Transition::Moved { .. }));
    }

    #[test]
    fn test_finish_propagates_every_step() {
        let form = form(None);
        let mut wizard = started(&form, FormSettings::new().with("queue", "q.orders"));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        wizard.add_listener(move |event| sink.borrow_mut().push(event.clone()));

        step(&form, 0).borrow_mut().set_value("name", "orders").unwrap();
        assert!(wizard.buttons().finish);
        wizard.finish().unwrap();

        assert_eq!(wizard.state(), WizardState::Finished);
        assert_eq!(wizard.settings().get("name"), Some("orders"));
        assert_eq!(wizard.settings().get("queue"), Some("q.orders"));
        // never visited, stored from its default
        assert_eq!(wizard.settings().get("host"), Some("localhost"));
        assert_eq!(events.borrow().as_slice(), [WizardEvent::Finished]);
        assert_eq!(wizard.buttons(), ButtonState::default());
        assert_eq!(wizard.next(), Err(WizardError::Closed(WizardState::Finished)));

        let settings = wizard.into_settings();
        assert_eq!(settings.len(), 3);
    }

    #[test]
    fn test_finish_blocked_names_incomplete_step() {
        let form = form(None);
        let mut wizard = started(&form, FormSettings::new());
        step(&form, 0).borrow_mut().set_value("name", "orders").unwrap();

        assert_eq!(
            wizard.finish(),
            Err(WizardError::NotFinishable {
                step: "Connection".into(),
                blocking: "Destination".into(),
            })
        );
        assert_eq!(wizard.state(), WizardState::PanelActive);
    }

    #[test]
    fn test_cancel_transfers_nothing() {
        let form = form(None);
        let mut wizard = started(&form, FormSettings::new());
        step(&form, 0).borrow_mut().set_value("name", "orders").unwrap();

        wizard.cancel().unwrap();
        assert_eq!(wizard.state(), WizardState::Cancelled);
        assert!(wizard.settings().is_empty());
        assert_eq!(wizard.cancel(), Err(WizardError::Closed(WizardState::Cancelled)));
    }

    #[test]
    fn test_closing_unsubscribes_from_steps() {
        let form = form(None);
        let mut wizard = started(&form, FormSettings::new());
        assert_eq!(step(&form, 0).borrow().change_listeners().len(), 1);

        wizard.cancel().unwrap();
        assert!(step(&form, 0).borrow().change_listeners().is_empty());
        assert!(step(&form, 2).borrow().change_listeners().is_empty());
    }

    #[test]
    fn test_dropping_wizard_unsubscribes() {
        let form = form(None);
        {
            let _wizard = started(&form, FormSettings::new());
            assert_eq!(step(&form, 1).borrow().change_listeners().len(), 1);
        }
        assert!(step(&form, 1).borrow().change_listeners().is_empty());
    }

    #[test]
    fn test_last_step_has_no_next() {
        let form = form(None);
        let settings = FormSettings::new().with("name", "orders").with("queue", "q");
        let mut wizard = started(&form, settings);
        wizard.next().unwrap();

        assert_eq!(active_label(&wizard), "Options");
        assert!(!wizard.buttons().next);
        assert_eq!(
            wizard.next(),
            Err(WizardError::NoNextStep {
                step: "Options".into()
            })
        );
    }

    struct Pinger {
        core: StepCore<FormSettings>,
    }

    impl WizardStep<FormSettings> for Pinger {
        fn core(&self) -> &StepCore<FormSettings> {
            &self.core
        }

        fn core_mut(&mut self) -> &mut StepCore<FormSettings> {
            &mut self.core
        }

        fn step_label(&self) -> String {
            "Ping".into()
        }

        fn can_test(&self) -> bool {
            true
        }

        fn store_settings(&self, settings: &mut FormSettings) {
            settings.set("probed", "yes");
        }

        fn on_test_button(&mut self, settings: &FormSettings) -> bool {
            if settings.is_filled("host") {
                self.report(MessageKind::Info, "host reachable");
                true
            } else {
                self.veto("no host configured")
            }
        }
    }

    #[test]
    fn test_test_action() {
        let probe = step_ref(Pinger {
            core: StepCore::terminal(),
        });
        let mut wizard = Wizard::new("probe", probe, FormSettings::new());
        wizard.start().unwrap();
        assert!(wizard.buttons().test);

        let outcome = wizard.test().unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.message.unwrap().text, "no host configured");
        assert_eq!(wizard.settings().get("probed"), Some("yes"));

        let form = form(None);
        let mut plain = started(&form, FormSettings::new());
        assert_eq!(
            plain.test(),
            Err(WizardError::TestUnavailable {
                step: "Connection".into()
            })
        );
    }

    #[test]
    fn test_selection_events() {
        let form = form(None);
        let mut wizard = Wizard::new("JMS", form.head.clone(), FormSettings::new());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        wizard.add_listener(move |event| sink.borrow_mut().push(event.clone()));

        wizard.start().unwrap();
        step(&form, 0).borrow_mut().set_value("name", "orders").unwrap();
        wizard.next().unwrap();

        assert_eq!(
            events.borrow().as_slice(),
            [
                WizardEvent::SelectionChanged {
                    from: None,
                    to: "Connection".into()
                },
                WizardEvent::SelectionChanged {
                    from: Some("Connection".into()),
                    to: "Destination".into()
                },
            ]
        );
    }

    /// Decides in its view whether the next step is needed
    struct Express {
        core: StepCore<FormSettings>,
        express: Rc<Cell<bool>>,
    }

    impl WizardStep<FormSettings> for Express {
        fn core(&self) -> &StepCore<FormSettings> {
            &self.core
        }

        fn core_mut(&mut self) -> &mut StepCore<FormSettings> {
            &mut self.core
        }

        fn step_label(&self) -> String {
            "Mode".into()
        }

        fn store_settings(&self, settings: &mut FormSettings) {
            let mode = if self.express.get() { "express" } else { "custom" };
            settings.set("mode", mode);
        }
    }

    /// Never complete on its own; only bypassable in express mode
    struct Details {
        core: StepCore<FormSettings>,
    }

    impl WizardStep<FormSettings> for Details {
        fn core(&self) -> &StepCore<FormSettings> {
            &self.core
        }

        fn core_mut(&mut self) -> &mut StepCore<FormSettings> {
            &mut self.core
        }

        fn step_label(&self) -> String {
            "Details".into()
        }

        fn can_advance(&self) -> bool {
            false
        }

        fn can_skip(&self, settings: &FormSettings) -> bool {
            settings.get("mode") == Some("express")
        }
    }

    struct Summary {
        core: StepCore<FormSettings>,
    }

    impl WizardStep<FormSettings> for Summary {
        fn core(&self) -> &StepCore<FormSettings> {
            &self.core
        }

        fn core_mut(&mut self) -> &mut StepCore<FormSettings> {
            &mut self.core
        }

        fn step_label(&self) -> String {
            "Summary".into()
        }
    }

    #[test]
    fn test_back_clears_skip_when_opting_out() {
        let summary = step_ref(Summary {
            core: StepCore::terminal(),
        });
        let details = step_ref(Details {
            core: StepCore::new(Some(summary)),
        });
        let express = Rc::new(Cell::new(true));
        let head = step_ref(Express {
            core: StepCore::new(Some(details.clone())),
            express: express.clone(),
        });

        let mut wizard = Wizard::new("Setup", head, FormSettings::new());
        wizard.start().unwrap();
        wizard.next().unwrap();
        assert_eq!(active_label(&wizard), "Summary");
        assert!(details.borrow().is_skipped());
        assert!(wizard.buttons().finish);

        wizard.back().unwrap();
        express.set(false);

        assert!(!details.borrow().is_skipped());
        assert!(!wizard.buttons().finish);
        assert_eq!(
            wizard.finish(),
            Err(WizardError::NotFinishable {
                step: "Mode".into(),
                blocking: "Details".into(),
            })
        );
        assert_eq!(wizard.state(), WizardState::PanelActive);
    }
}
