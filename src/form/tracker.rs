//! Per-step state tracking and field error bookkeeping

use std::collections::{BTreeMap, BTreeSet};

use super::types::{StepState, StepValidationResult};

/// Revision of the form data a validation pass read
pub type Revision = u64;

/// Holds one [`StepState`] per step plus the flattened field → message map.
#[derive(Debug, Clone)]
pub struct StepTracker {
    states: Vec<StepState>,
    /// Newest data revision applied per step; older results are dropped
    applied: Vec<Option<Revision>>,
    /// field → step → message, from each step's last applied pass
    claims: BTreeMap<String, BTreeMap<usize, String>>,
    errors: BTreeMap<String, String>,
}

/// Whether a validation result made it into the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A result for a newer revision had already been applied
    Stale,
    OutOfRange,
}

impl StepTracker {
    pub fn new(step_count: usize) -> Self {
        Self {
            states: vec![StepState::default(); step_count],
            applied: vec![None; step_count],
            claims: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn state(&self, index: usize) -> Option<&StepState> {
        self.states.get(index)
    }

    pub fn states(&self) -> &[StepState] {
        &self.states
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Record a validation pass for `index`.
    ///
    /// `result` must already be normalized so `is_valid == errors.is_empty()`.
    pub fn apply(
        &mut self,
        index: usize,
        revision: Revision,
        result: &StepValidationResult,
        has_changes: bool,
    ) -> ApplyOutcome {
        if index >= self.states.len() {
            return ApplyOutcome::OutOfRange;
        }
        if self.applied[index].is_some_and(|seen| seen > revision) {
            return ApplyOutcome::Stale;
        }

        let is_valid = result.errors.is_empty();
        self.states[index] = StepState {
            completed: is_valid && has_changes,
            has_errors: !is_valid,
            is_valid,
            error_count: result.errors.len(),
            warning_count: result.warnings.len(),
            has_changes,
        };
        self.applied[index] = Some(revision);

        // Drop this step's old messages; fields other steps still report
        // fall back to one of theirs
        let mut released = Vec::new();
        self.claims.retain(|field, owners| {
            if owners.remove(&index).is_some() {
                released.push(field.clone());
            }
            !owners.is_empty()
        });
        for field in released {
            match self.claims.get(&field).and_then(|owners| owners.values().next()) {
                Some(message) => self.errors.insert(field, message.clone()),
                None => self.errors.remove(&field),
            };
        }

        let mut seen = BTreeSet::new();
        for issue in &result.errors {
            if seen.insert(issue.field.as_str()) {
                self.claims
                    .entry(issue.field.clone())
                    .or_default()
                    .insert(index, issue.message.clone());
                self.errors
                    .insert(issue.field.clone(), issue.message.clone());
            }
        }

        ApplyOutcome::Applied
    }

    /// Replace every state, e.g. from a restored snapshot.
    ///
    /// Field messages are cleared since snapshots don't carry them. Passes
    /// that read data older than `floor` are rejected afterwards.
    pub fn load(&mut self, states: Vec<StepState>, floor: Revision) {
        let count = states.len();
        self.states = states;
        self.applied = vec![Some(floor); count];
        self.claims.clear();
        self.errors.clear();
    }

    /// Back to the initial shape; passes older than `floor` are rejected
    pub fn reset(&mut self, floor: Revision) {
        let count = self.states.len();
        self.load(vec![StepState::default(); count], floor);
    }

    /// Every step valid and every required step completed
    pub fn can_submit(&self, required: impl Fn(usize) -> bool) -> bool {
        self.states
            .iter()
            .enumerate()
            .all(|(i, s)| s.is_valid && (!required(i) || s.completed))
    }

    pub fn completed_count(&self) -> usize {
        self.states.iter().filter(|s| s.completed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::types::FieldIssue;

    fn invalid(field: &str, message: &str) -> StepValidationResult {
        StepValidationResult::from_issues(vec![FieldIssue::new(field, message)], vec![])
    }

    #[test]
    fn test_apply_valid_with_changes_completes() {
        let mut tracker = StepTracker::new(3);
        let outcome = tracker.apply(0, 1, &StepValidationResult::valid(), true);

        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(
            tracker.state(0),
            Some(&StepState {
                completed: true,
                has_errors: false,
                is_valid: true,
                error_count: 0,
                warning_count: 0,
                has_changes: true,
            })
        );
    }

    #[test]
    fn test_valid_without_changes_is_not_completed() {
        let mut tracker = StepTracker::new(1);
        tracker.apply(0, 0, &StepValidationResult::valid(), false);
        let state = tracker.state(0).unwrap();
        assert!(state.is_valid);
        assert!(!state.completed);
    }

    #[test]
    fn test_errors_are_replaced_per_step() {
        let mut tracker = StepTracker::new(2);
        tracker.apply(0, 1, &invalid("email", "Invalid email"), true);
        tracker.apply(1, 1, &invalid("phone", "Invalid phone"), true);
        assert_eq!(tracker.errors().len(), 2);

        // Step 0 is fixed: its message goes away, step 1's stays
        tracker.apply(0, 2, &StepValidationResult::valid(), true);
        assert_eq!(tracker.errors().len(), 1);
        assert_eq!(tracker.errors().get("phone").unwrap(), "Invalid phone");
    }

    #[test]
    fn test_shared_field_keeps_other_steps_message() {
        let mut tracker = StepTracker::new(2);
        tracker.apply(0, 1, &invalid("email", "Email is required"), true);
        tracker.apply(1, 1, &invalid("email", "Invalid email"), true);
        assert_eq!(tracker.errors().get("email").unwrap(), "Invalid email");

        // Step 1 still reports the field after step 0 is fixed
        tracker.apply(0, 2, &StepValidationResult::valid(), true);
        assert!(!tracker.state(1).unwrap().is_valid);
        assert_eq!(tracker.errors().get("email").unwrap(), "Invalid email");

        // Fixing step 1 while step 0 reports it again shows step 0's message
        tracker.apply(0, 3, &invalid("email", "Email is required"), true);
        tracker.apply(1, 3, &StepValidationResult::valid(), true);
        assert_eq!(tracker.errors().get("email").unwrap(), "Email is required");

        tracker.apply(0, 4, &StepValidationResult::valid(), true);
        assert!(tracker.errors().is_empty());
    }

    #[test]
    fn test_first_message_per_field_wins() {
        let mut tracker = StepTracker::new(1);
        let result = StepValidationResult::from_issues(
            vec![
                FieldIssue::new("name", "Name is required"),
                FieldIssue::new("name", "Name is too long"),
            ],
            vec![],
        );
        tracker.apply(0, 1, &result, true);
        assert_eq!(tracker.errors().get("name").unwrap(), "Name is required");
        assert_eq!(tracker.state(0).unwrap().error_count, 2);
    }

    #[test]
    fn test_stale_result_is_dropped() {
        let mut tracker = StepTracker::new(1);
        tracker.apply(0, 5, &StepValidationResult::valid(), true);
        let outcome = tracker.apply(0, 3, &invalid("name", "Name is required"), true);

        assert_eq!(outcome, ApplyOutcome::Stale);
        assert!(tracker.state(0).unwrap().is_valid);
        assert!(tracker.errors().is_empty());
    }

    #[test]
    fn test_same_revision_overwrites() {
        let mut tracker = StepTracker::new(1);
        tracker.apply(0, 4, &StepValidationResult::valid(), true);
        let outcome = tracker.apply(0, 4, &invalid("name", "Name is required"), true);
        assert_eq!(outcome, ApplyOutcome::Applied);
        assert!(!tracker.state(0).unwrap().is_valid);
    }

    #[test]
    fn test_reset_rejects_passes_started_before_it() {
        let mut tracker = StepTracker::new(1);
        tracker.reset(7);
        let late = tracker.apply(0, 6, &invalid("name", "Name is required"), true);
        assert_eq!(late, ApplyOutcome::Stale);
        assert_eq!(tracker.state(0), Some(&StepState::default()));

        let fresh = tracker.apply(0, 7, &StepValidationResult::valid(), false);
        assert_eq!(fresh, ApplyOutcome::Applied);
    }

    #[test]
    fn test_out_of_range_apply() {
        let mut tracker = StepTracker::new(1);
        assert_eq!(
            tracker.apply(3, 0, &StepValidationResult::valid(), true),
            ApplyOutcome::OutOfRange
        );
    }

    #[test]
    fn test_can_submit_requires_completed_required_steps() {
        let mut tracker = StepTracker::new(3);
        let required = |i: usize| i < 2;
        assert!(!tracker.can_submit(required));

        tracker.apply(0, 1, &StepValidationResult::valid(), true);
        tracker.apply(1, 1, &StepValidationResult::valid(), true);
        assert!(tracker.can_submit(required));

        // Optional step going invalid blocks submission too
        tracker.apply(2, 1, &invalid("notes", "Too long"), true);
        assert!(!tracker.can_submit(required));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut tracker = StepTracker::new(2);
        tracker.apply(0, 1, &invalid("name", "Name is required"), true);
        tracker.reset(2);
        let once = tracker.clone();
        tracker.reset(2);

        assert_eq!(tracker.states(), once.states());
        assert!(tracker.errors().is_empty());
        assert_eq!(tracker.states(), &[StepState::default(); 2]);
    }
}
