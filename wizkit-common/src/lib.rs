//! wizkit Common Library
//!
//! The wizard step engine shared by the runtime container and the CLI host.
//! This crate has NO async or terminal dependencies.

pub mod chain;
pub mod config;
pub mod error;
pub mod form;
pub mod listeners;
pub mod session;
pub mod step;

pub use error::{ChainError, FieldError};
pub use listeners::{ChangeEvent, ChangeListeners, ListenerId};
pub use step::{step_ref, suffix_finishable, MessageKind, StepCore, StepMessage, StepRef, WizardStep};
