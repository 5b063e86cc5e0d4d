//! wizkit Runtime Library
//!
//! This library provides the components that host a step chain:
//! - The `Wizard` container driving Back/Next/Finish/Cancel/Test
//! - Navigation state and button enablement
//! - Background operations with a delayed, cancelable wait indicator

// Re-export from wizkit-common for convenience
pub use wizkit_common::{chain, config, form, session, step};

pub mod operation;
pub mod state;
pub mod wizard;

pub use operation::{
    cancel_channel, run_with_delayed_cancel, CancelFlag, CancelHandle, DelayedCancel, OperationError,
    WaitIndicator,
};
pub use state::{Action, ButtonState, WizardState};
pub use wizard::{StepSummary, TestOutcome, Transition, Wizard, WizardError, WizardEvent};
