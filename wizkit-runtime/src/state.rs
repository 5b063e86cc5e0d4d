//! Wizard State Machine
//!
//! Overall navigation state and the button enablement derived from the
//! active step.

use std::fmt;

/// Overall state of a wizard session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardState {
    /// Created but not started; no step has been read yet
    #[default]
    NoPanelActive,

    /// A step is active and receiving input
    PanelActive,

    /// Finish succeeded; settings hold the final values
    Finished,

    /// Cancelled by the user; settings were not transferred
    Cancelled,
}

impl WizardState {
    /// Whether the session has ended (finished or cancelled)
    pub fn is_closed(&self) -> bool {
        matches!(self, WizardState::Finished | WizardState::Cancelled)
    }
}

/// A navigation control offered by the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Back,
    Next,
    Finish,
    Test,
    Cancel,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Back => "Back",
            Action::Next => "Next",
            Action::Finish => "Finish",
            Action::Test => "Test",
            Action::Cancel => "Cancel",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which navigation controls are enabled right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub back: bool,
    pub next: bool,
    pub finish: bool,
    pub test: bool,
    pub cancel: bool,
}

impl ButtonState {
    /// Enabled actions in display order
    pub fn enabled(&self) -> Vec<Action> {
        [
            (self.back, Action::Back),
            (self.next, Action::Next),
            (self.finish, Action::Finish),
            (self.test, Action::Test),
            (self.cancel, Action::Cancel),
        ]
        .into_iter()
        .filter_map(|(on, action)| on.then_some(action))
        .collect()
    }

    pub fn is_enabled(&self, action: Action) -> bool {
        match action {
            Action::Back => self.back,
            Action::Next => self.next,
            Action::Finish => self.finish,
            Action::Test => self.test,
            Action::Cancel => self.cancel,
        }
    }
}
