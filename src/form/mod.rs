//! Multi-step form state management.
//!
//! A [`MultiStepForm`] is built from an ordered list of [`FormStep`]s and the
//! initial [`FormData`]. It tracks the working data against the original
//! snapshot, derives a [`StepState`] per step from the caller's validators,
//! moves between steps, and hands the data to a [`SaveHandler`] once every
//! step is valid.

mod debounce;
mod navigation;
mod save;
mod session;
mod tracker;
mod types;
mod validator;

pub use debounce::Debouncer;
pub use navigation::{NavigationBlock, NavigationPolicy};
pub use save::{save_fn, DiscardSave, FnSaveHandler, SaveHandler};
pub use session::{FormOptions, FormSession, MultiStepForm, SubmitOutcome, DEFAULT_DEBOUNCE};
pub use tracker::{ApplyOutcome, Revision, StepTracker};
pub use types::{FieldIssue, FormData, FormStep, StepState, StepValidationResult, STEP_FIELD};
pub use validator::{validator_fn, FnValidator, StepValidator};
