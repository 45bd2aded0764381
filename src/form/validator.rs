//! Step validator trait definition.

use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;

use super::types::{FormData, StepValidationResult};

/// Validates one step against the current form data.
///
/// Validators may do asynchronous work (a duplicate-name lookup, for
/// example). Returning `Err` or panicking marks the step invalid; neither
/// escapes the form session.
#[async_trait]
pub trait StepValidator: Send + Sync {
    async fn validate(&self, data: &FormData) -> Result<StepValidationResult>;
}

/// Adapter that turns an async closure into a [`StepValidator`]
pub struct FnValidator<F>(F);

/// Wrap `f` as a step validator.
///
/// The closure receives an owned copy of the form data so the returned
/// future can be `'static`.
pub fn validator_fn<F, Fut>(f: F) -> FnValidator<F>
where
    F: Fn(FormData) -> Fut + Send + Sync,
    Fut: Future<Output = Result<StepValidationResult>> + Send,
{
    FnValidator(f)
}

#[async_trait]
impl<F, Fut> StepValidator for FnValidator<F>
where
    F: Fn(FormData) -> Fut + Send + Sync,
    Fut: Future<Output = Result<StepValidationResult>> + Send,
{
    async fn validate(&self, data: &FormData) -> Result<StepValidationResult> {
        (self.0)(data.clone()).await
    }
}
