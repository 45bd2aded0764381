//! Step navigation rules

use serde::{Deserialize, Serialize};

/// How freely the active step may move forward.
///
/// Backward moves are always allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationPolicy {
    /// Any in-range jump is allowed
    #[default]
    Free,
    /// Moving forward to step `n` needs every required step before `n` completed
    Guarded,
}

/// Why a navigation request did not move the active step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationBlock {
    OutOfRange,
    /// The first required step that still needs completing
    IncompleteStep(usize),
}

impl NavigationPolicy {
    /// Check a move from `current` to `target` over `len` steps.
    ///
    /// `required_incomplete(i)` tells whether step `i` is required and not
    /// yet completed.
    pub fn check(
        self,
        current: usize,
        target: usize,
        len: usize,
        required_incomplete: impl Fn(usize) -> bool,
    ) -> Result<usize, NavigationBlock> {
        if target >= len {
            return Err(NavigationBlock::OutOfRange);
        }

        if self == NavigationPolicy::Guarded && target > current {
            if let Some(blocking) = (0..target).find(|&i| required_incomplete(i)) {
                return Err(NavigationBlock::IncompleteStep(blocking));
            }
        }
        Ok(target)
    }
}
