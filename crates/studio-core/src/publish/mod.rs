//! Publish submission and status tracking.
//!
//! Client-side validation, request assembly, submission with a
//! double-submit guard, and the record poller with its display-side
//! classification helpers.

pub mod aggregate;
pub mod controller;
pub mod poller;
pub mod validate;

pub use aggregate::{PublishProgress, StepState, aggregate, progress};
pub use controller::{ControllerPhase, PublishController, build_request};
pub use poller::{PollHandle, PollOutcome, PollStop, PublishPoller, fetch_historical, stop_reason};
pub use validate::validate;
