//! Multi-step form session: data store, validation, navigation, submission.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::debounce::Debouncer;
use super::navigation::NavigationPolicy;
use super::save::SaveHandler;
use super::tracker::{ApplyOutcome, Revision, StepTracker};
use super::types::{FormData, FormStep, StepState, StepValidationResult};
use crate::config::FormsConfig;
use crate::error::FormError;
use crate::persistence::{KeyValueStore, PersistenceAdapter, Snapshot, DEFAULT_KEY_PREFIX};

/// Default quiet period before the active step is revalidated after an edit
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Session options besides the steps, initial data and save handler
#[derive(Clone)]
pub struct FormOptions {
    /// Identifies the snapshot; persistence is off without it
    pub persist_key: Option<String>,
    pub enable_persistence: bool,
    pub key_prefix: String,
    pub store: Option<Arc<dyn KeyValueStore>>,
    pub debounce: Duration,
    pub navigation: NavigationPolicy,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            persist_key: None,
            enable_persistence: false,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            store: None,
            debounce: DEFAULT_DEBOUNCE,
            navigation: NavigationPolicy::Free,
        }
    }
}

impl FormOptions {
    /// Options from the `[forms]` config section (persistence still needs a store and key)
    pub fn from_config(config: &FormsConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            navigation: config.navigation,
            ..Self::default()
        }
    }

    /// Persist snapshots of this session to `store` under `key`
    pub fn persist(mut self, store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        self.store = Some(store);
        self.persist_key = Some(key.into());
        self.enable_persistence = true;
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn navigation(mut self, policy: NavigationPolicy) -> Self {
        self.navigation = policy;
        self
    }
}

/// Read-only view of a session for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSession {
    pub active_step: usize,
    pub form_data: FormData,
    pub original_data: FormData,
    pub validation_errors: BTreeMap<String, String>,
    pub step_states: Vec<StepState>,
}

/// What `submit_form` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// `can_submit` was false; nothing ran
    Blocked,
    /// Full validation found an invalid step; save was not called
    Invalid,
    Saved,
}

struct SessionState {
    active_step: usize,
    form_data: FormData,
    tracker: StepTracker,
    /// Bumped on every change to `form_data`
    revision: Revision,
    /// Saved by `submit_form` and not edited since; autosave stays off
    submitted: bool,
}

/// Shared between the session handle and its debounced validation task
struct FormCore {
    id: Uuid,
    steps: Vec<FormStep>,
    original: FormData,
    state: Mutex<SessionState>,
    persistence: Option<PersistenceAdapter>,
    navigation: NavigationPolicy,
}

/// State manager for a multi-step form.
///
/// Field updates and navigation are synchronous. Validation runs the
/// caller's async validators; after every update the active step is
/// revalidated once edits go quiet for the configured debounce period.
pub struct MultiStepForm {
    core: Arc<FormCore>,
    on_save: Arc<dyn SaveHandler>,
    debouncer: Debouncer,
}

impl MultiStepForm {
    pub fn new(
        steps: Vec<FormStep>,
        initial_data: FormData,
        on_save: impl SaveHandler + 'static,
        options: FormOptions,
    ) -> Result<Self, FormError> {
        if steps.is_empty() {
            return Err(FormError::NoSteps);
        }
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.as_str()) {
                return Err(FormError::DuplicateStepId(step.id.clone()));
            }
        }

        let persistence = options.store.and_then(|store| {
            PersistenceAdapter::new(
                store,
                options.enable_persistence,
                &options.key_prefix,
                options.persist_key.as_deref(),
            )
        });

        let id = Uuid::new_v4();
        tracing::debug!(
            form = %id,
            steps = steps.len(),
            persistence = persistence.as_ref().map(PersistenceAdapter::key),
            "Form session created"
        );

        let state = SessionState {
            active_step: 0,
            form_data: initial_data.clone(),
            tracker: StepTracker::new(steps.len()),
            revision: 0,
            submitted: false,
        };

        Ok(Self {
            core: Arc::new(FormCore {
                id,
                steps,
                original: initial_data,
                state: Mutex::new(state),
                persistence,
                navigation: options.navigation,
            }),
            on_save: Arc::new(on_save),
            debouncer: Debouncer::new(options.debounce),
        })
    }

    // ─── Accessors ──────────────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.core.id
    }

    pub fn steps(&self) -> &[FormStep] {
        &self.core.steps
    }

    pub fn active_step(&self) -> usize {
        self.core.lock().active_step
    }

    pub fn form_data(&self) -> FormData {
        self.core.lock().form_data.clone()
    }

    pub fn original_data(&self) -> &FormData {
        &self.core.original
    }

    pub fn validation_errors(&self) -> BTreeMap<String, String> {
        self.core.lock().tracker.errors().clone()
    }

    pub fn step_state(&self, index: usize) -> Option<StepState> {
        self.core.lock().tracker.state(index).copied()
    }

    pub fn step_states(&self) -> Vec<StepState> {
        self.core.lock().tracker.states().to_vec()
    }

    /// Consistent copy of the whole session
    pub fn session(&self) -> FormSession {
        let state = self.core.lock();
        FormSession {
            active_step: state.active_step,
            form_data: state.form_data.clone(),
            original_data: self.core.original.clone(),
            validation_errors: state.tracker.errors().clone(),
            step_states: state.tracker.states().to_vec(),
        }
    }

    /// Snapshot key, when persistence is enabled
    pub fn persist_key(&self) -> Option<&str> {
        self.core.persistence.as_ref().map(PersistenceAdapter::key)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.core.has_unsaved_changes()
    }

    /// Every step valid and every required step completed
    pub fn can_submit(&self) -> bool {
        self.core.can_submit()
    }

    /// Percentage of steps marked completed
    pub fn step_progress(&self) -> f64 {
        let completed = self.core.lock().tracker.completed_count();
        completed as f64 / self.core.steps.len() as f64 * 100.0
    }

    /// Position of the active step as a percentage of all steps
    pub fn overall_progress(&self) -> f64 {
        let active = self.active_step();
        (active + 1) as f64 / self.core.steps.len() as f64 * 100.0
    }

    // ─── Form State Store ───────────────────────────────────────────────────────

    /// Shallow-merge `partial` into the form data and schedule revalidation
    /// of the active step.
    pub fn update_form_data(&self, partial: FormData) {
        if partial.is_empty() {
            return;
        }

        let active = {
            let mut state = self.core.lock();
            state.form_data.merge(partial);
            state.revision += 1;
            state.submitted = false;
            state.active_step
        };

        let core = Arc::clone(&self.core);
        self.debouncer.schedule(async move {
            core.validate_step(active).await;
        });

        self.core.autosave();
    }

    /// Convenience for updating a single field
    pub fn set_field(&self, field: impl Into<String>, value: Value) {
        let mut partial = FormData::new();
        partial.set(field, value);
        self.update_form_data(partial);
    }

    /// Whether a debounced validation pass is still waiting or running
    pub fn validation_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Wait for the pending debounced validation pass, if any
    pub async fn settle(&self) {
        self.debouncer.settle().await;
    }

    // ─── Validation ─────────────────────────────────────────────────────────────

    /// Validate step `index` against the current data and record the result.
    ///
    /// Returns the step's validity; `false` for an out-of-range index.
    pub async fn validate_step(&self, index: usize) -> bool {
        self.core.validate_step(index).await
    }

    /// Validate every step concurrently; true only if all pass
    pub async fn validate_all_steps(&self) -> bool {
        self.core.validate_all_steps().await
    }

    // ─── Navigation ─────────────────────────────────────────────────────────────

    /// Jump to `step`. No-op (returns false) when out of range or refused by
    /// the navigation policy.
    pub fn go_to_step(&self, step: usize) -> bool {
        self.core.navigate(|_| Some(step))
    }

    /// Advance one step; no-op on the last step
    pub fn next_step(&self) -> bool {
        self.core.navigate(|active| active.checked_add(1))
    }

    /// Go back one step; no-op on the first step
    pub fn previous_step(&self) -> bool {
        self.core.navigate(|active| active.checked_sub(1))
    }

    // ─── Submission & reset ─────────────────────────────────────────────────────

    /// Validate everything and hand the data to the save handler.
    ///
    /// Save handler errors come back as [`FormError::Save`] with the session
    /// left as it was, so the caller can retry.
    pub async fn submit_form(&self) -> Result<SubmitOutcome, FormError> {
        if !self.can_submit() {
            tracing::debug!(form = %self.core.id, "Submit ignored, form not ready");
            return Ok(SubmitOutcome::Blocked);
        }

        self.debouncer.cancel();
        if !self.validate_all_steps().await {
            tracing::info!(form = %self.core.id, "Submit aborted, validation failed");
            return Ok(SubmitOutcome::Invalid);
        }

        let data = self.form_data();
        self.on_save.save(&data).await.map_err(|e| {
            tracing::warn!(form = %self.core.id, error = %e, "Save handler failed");
            FormError::Save(e)
        })?;

        self.core.lock().submitted = true;
        if let Some(persistence) = &self.core.persistence {
            persistence.clear();
        }
        tracing::info!(form = %self.core.id, fields = data.len(), "Form submitted");
        Ok(SubmitOutcome::Saved)
    }

    /// Back to the initial data on step 0 with fresh step states; clears the snapshot
    pub fn reset_form(&self) {
        self.debouncer.cancel();
        {
            let mut state = self.core.lock();
            state.form_data = self.core.original.clone();
            state.active_step = 0;
            state.revision += 1;
            state.submitted = false;
            let floor = state.revision;
            state.tracker.reset(floor);
        }
        if let Some(persistence) = &self.core.persistence {
            persistence.clear();
        }
        tracing::debug!(form = %self.core.id, "Form reset");
    }

    // ─── Persistence ────────────────────────────────────────────────────────────

    /// Write a snapshot now. False when persistence is off or the write failed.
    pub fn persist(&self) -> bool {
        self.core.persist()
    }

    /// Replace data, active step and step states with the stored snapshot.
    ///
    /// Returns false (and leaves the session alone) when there is no usable
    /// snapshot.
    pub fn restore(&self) -> bool {
        let Some(persistence) = &self.core.persistence else {
            return false;
        };
        let Some(snapshot) = persistence.load() else {
            return false;
        };
        if !snapshot.fits(self.core.steps.len()) {
            tracing::warn!(
                form = %self.core.id,
                key = %persistence.key(),
                version = snapshot.version,
                active_step = snapshot.active_step,
                step_states = snapshot.step_states.len(),
                "Ignoring snapshot that doesn't match this form"
            );
            return false;
        }

        self.debouncer.cancel();
        let mut state = self.core.lock();
        state.form_data = snapshot.form_data;
        state.active_step = snapshot.active_step;
        state.revision += 1;
        state.submitted = false;
        let floor = state.revision;
        state.tracker.load(snapshot.step_states, floor);

        tracing::info!(
            form = %self.core.id,
            key = %persistence.key(),
            saved_at = %snapshot.timestamp,
            "Form session restored"
        );
        true
    }

    /// Remove the stored snapshot without touching the session
    pub fn clear_snapshot(&self) {
        if let Some(persistence) = &self.core.persistence {
            persistence.clear();
        }
    }
}

impl FormCore {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap()
    }

    fn has_unsaved_changes(&self) -> bool {
        self.lock().form_data != self.original
    }

    fn can_submit(&self) -> bool {
        self.lock()
            .tracker
            .can_submit(|i| self.steps[i].required)
    }

    async fn validate_step(&self, index: usize) -> bool {
        let Some(step) = self.steps.get(index) else {
            tracing::warn!(form = %self.id, index, "Validation requested for unknown step");
            return false;
        };

        let (data, revision) = {
            let state = self.lock();
            (state.form_data.clone(), state.revision)
        };

        let result = self.run_validator(step, &data).await;
        let has_changes = step.has_changes(&data, &self.original);

        let outcome = self
            .lock()
            .tracker
            .apply(index, revision, &result, has_changes);

        match outcome {
            ApplyOutcome::Applied => {
                tracing::debug!(
                    form = %self.id,
                    step = %step.id,
                    revision,
                    valid = result.is_valid,
                    errors = result.errors.len(),
                    warnings = result.warnings.len(),
                    "Step validated"
                );
                self.autosave();
            }
            ApplyOutcome::Stale => {
                tracing::debug!(form = %self.id, step = %step.id, revision, "Dropped stale validation result");
            }
            ApplyOutcome::OutOfRange => {}
        }

        result.is_valid
    }

    async fn validate_all_steps(&self) -> bool {
        let results = join_all((0..self.steps.len()).map(|i| self.validate_step(i))).await;
        results.into_iter().all(|valid| valid)
    }

    /// Run the step's validator, turning errors and panics into a failed result
    async fn run_validator(&self, step: &FormStep, data: &FormData) -> StepValidationResult {
        let Some(validator) = &step.validator else {
            return StepValidationResult::valid();
        };

        match AssertUnwindSafe(validator.validate(data)).catch_unwind().await {
            Ok(Ok(result)) => result.normalized(),
            Ok(Err(e)) => {
                tracing::warn!(form = %self.id, step = %step.id, error = %e, "Step validator failed");
                StepValidationResult::failed(format!("Validation could not complete: {e}"))
            }
            Err(_) => {
                tracing::error!(form = %self.id, step = %step.id, "Step validator panicked");
                StepValidationResult::failed("Validation could not complete")
            }
        }
    }

    /// Move the active step to `target(active)` if the policy allows it
    fn navigate(&self, target: impl FnOnce(usize) -> Option<usize>) -> bool {
        let moved = {
            let mut state = self.lock();
            let current = state.active_step;
            let decision = target(current).ok_or(()).and_then(|t| {
                let tracker = &state.tracker;
                self.navigation
                    .check(current, t, self.steps.len(), |i| {
                        self.steps[i].required && !tracker.state(i).is_some_and(|s| s.completed)
                    })
                    .map_err(|block| {
                        tracing::debug!(form = %self.id, from = current, to = t, ?block, "Navigation refused");
                    })
            });

            match decision {
                Ok(next) => {
                    state.active_step = next;
                    true
                }
                Err(()) => false,
            }
        };

        if moved {
            self.autosave();
        }
        moved
    }

    /// Persist when there is something worth resuming
    fn autosave(&self) {
        if self.persistence.is_none() {
            return;
        }
        let worth_saving = {
            let state = self.lock();
            !state.submitted && state.form_data != self.original
        };
        if worth_saving {
            self.persist();
        }
    }

    fn persist(&self) -> bool {
        let Some(persistence) = &self.persistence else {
            return false;
        };
        let snapshot = {
            let state = self.lock();
            Snapshot::new(
                state.form_data.clone(),
                state.active_step,
                state.tracker.states().to_vec(),
            )
        };
        persistence.save(&snapshot)
    }
}
