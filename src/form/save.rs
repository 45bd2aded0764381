//! Save handler invoked on successful submission.

use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;

use super::types::FormData;

/// Receives the final form data once every step validates.
///
/// Errors are handed back to the caller of `submit_form` untouched.
#[async_trait]
pub trait SaveHandler: Send + Sync {
    async fn save(&self, data: &FormData) -> Result<()>;
}

/// Adapter that turns an async closure into a [`SaveHandler`]
pub struct FnSaveHandler<F>(F);

pub fn save_fn<F, Fut>(f: F) -> FnSaveHandler<F>
where
    F: Fn(FormData) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    FnSaveHandler(f)
}

#[async_trait]
impl<F, Fut> SaveHandler for FnSaveHandler<F>
where
    F: Fn(FormData) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn save(&self, data: &FormData) -> Result<()> {
        (self.0)(data.clone()).await
    }
}

/// Save handler that discards the data. Useful for read-only sessions.
pub struct DiscardSave;

#[async_trait]
impl SaveHandler for DiscardSave {
    async fn save(&self, _data: &FormData) -> Result<()> {
        Ok(())
    }
}
