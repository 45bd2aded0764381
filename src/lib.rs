//! crm-forms - Multi-step form state management for the brokerage CRM
//!
//! The library drives the create/edit wizards for CRM resources: step
//! validation, navigation, resumable snapshots and submission. The
//! `crm-forms` binary exposes the built-in wizards on the command line.

pub mod config;
pub mod crm;
pub mod error;
pub mod form;
pub mod logging;
pub mod persistence;

pub use error::{FormError, StoreError};
pub use form::{
    FormData, FormOptions, FormStep, MultiStepForm, StepState, StepValidationResult,
    SubmitOutcome,
};
