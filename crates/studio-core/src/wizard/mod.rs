//! Binding wizard engine.
//!
//! Interprets the backend-supplied page schema of a connector: validates
//! form values, runs each page's server action in order and produces the
//! updated connector (or an authorization redirect) at the end.

pub mod engine;
pub mod form;

pub use engine::{
    AdvanceOutcome, BindOutcome, BindingWizard, PrimaryAction, WizardPhase, WizardSession, unbind,
};
pub use form::{render_copy_link, validate_values};
