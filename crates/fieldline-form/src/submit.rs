//! Submission
//!
//! Submitting is refused while a submission is in flight or while the form
//! has synchronous validation errors. Pending async validations are awaited
//! first. The submit handler may answer right away, return a future, or keep
//! the [`SubmitCompletion`] and call it later.

use crate::form::{Form, Listeners, WeakForm};
use crate::record::FormRecord;
use crate::sentinel::{has_any_error, FORM_ERROR};
use fieldline_core::Value;
use futures::channel::oneshot;
use futures::future::{join_all, FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tracing::{debug, error, info};

/// Submit handler: `(values, form, completion) -> result`
pub type OnSubmit = Rc<dyn Fn(&Value, &Form, SubmitCompletion) -> SubmitResult>;

/// What a submit handler returns
pub enum SubmitResult {
    /// Finished; `Some` carries submit errors
    Done(Option<Value>),
    /// Finishes when the future resolves
    Pending(LocalBoxFuture<'static, Option<Value>>),
    /// The handler kept its [`SubmitCompletion`] and will call it
    Deferred,
}

impl SubmitResult {
    pub fn pending(future: impl Future<Output = Option<Value>> + 'static) -> Self {
        SubmitResult::Pending(future.boxed_local())
    }
}

impl fmt::Debug for SubmitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitResult::Done(errors) => f.debug_tuple("Done").field(errors).finish(),
            SubmitResult::Pending(_) => f.write_str("Pending(..)"),
            SubmitResult::Deferred => f.write_str("Deferred"),
        }
    }
}

/// Outcome of [`Form::submit`]
pub enum Submission {
    /// Nothing was submitted
    Rejected,
    /// The handler finished synchronously
    Completed(Option<Value>),
    /// Resolves with the submit errors once the submission finishes
    Pending(LocalBoxFuture<'static, Option<Value>>),
}

impl Submission {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Submission::Rejected)
    }

    /// Wait for the submit errors, if any
    pub async fn settled(self) -> Option<Value> {
        match self {
            Submission::Rejected => None,
            Submission::Completed(errors) => errors,
            Submission::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Submission::Rejected => f.write_str("Rejected"),
            Submission::Completed(errors) => f.debug_tuple("Completed").field(errors).finish(),
            Submission::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Finishes a submission
///
/// Only the first completion of a submission takes effect.
pub struct SubmitCompletion {
    form: WeakForm,
    completed: Rc<Cell<bool>>,
    sender: Option<oneshot::Sender<Option<Value>>>,
}

impl SubmitCompletion {
    /// Finish the submission; `Some` carries submit errors
    pub fn complete(mut self, errors: Option<Value>) {
        if let Some(form) = self.form.upgrade() {
            form.complete_submit(&self.completed, errors.clone());
        }
        if let Some(sender) = self.sender.take() {
            // the caller may have dropped the pending submission
            let _ = sender.send(errors);
        }
    }
}

impl fmt::Debug for SubmitCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitCompletion")
            .field("completed", &self.completed.get())
            .finish_non_exhaustive()
    }
}

fn has_sync_errors(form: &FormRecord) -> bool {
    form.error.is_some() || has_any_error(&form.errors)
}

fn receiver(rx: oneshot::Receiver<Option<Value>>) -> LocalBoxFuture<'static, Option<Value>> {
    rx.map(|errors| errors.unwrap_or(None)).boxed_local()
}

enum Gate {
    Failed,
    Wait(Vec<futures::future::Shared<LocalBoxFuture<'static, ()>>>),
    Proceed,
}

impl Form {
    /// Submit the form
    pub fn submit(&self) -> Submission {
        let gate = {
            let mut engine = self.engine_mut();
            let pending: Vec<_> = engine.async_validations.values().cloned().collect();
            let state = &mut engine.state;
            let form = &mut state.form_state;
            if form.submitting {
                return Submission::Rejected;
            }
            form.submit_failed = false;
            form.submit_succeeded = false;
            form.last_submitted_values = Some(form.values.clone());

            if has_sync_errors(form) {
                form.submit_failed = true;
                for field in state.fields.values_mut() {
                    field.touched = true;
                    field.modified_since_last_submit = false;
                }
                Gate::Failed
            } else if !pending.is_empty() {
                Gate::Wait(pending)
            } else {
                Gate::Proceed
            }
        };

        match gate {
            Gate::Failed => {
                debug!("submit refused: form has validation errors");
                self.notify(&Listeners::FormThenFields);
                Submission::Rejected
            }
            Gate::Wait(pending) => self.submit_after_validation(pending),
            Gate::Proceed => self.run_submit(),
        }
    }

    fn submit_after_validation(
        &self,
        pending: Vec<futures::future::Shared<LocalBoxFuture<'static, ()>>>,
    ) -> Submission {
        debug!(pending = pending.len(), "submit waiting on async validation");
        let (tx, rx) = oneshot::channel();
        let form = self.downgrade();
        let task = async move {
            join_all(pending).await;
            let submission = match form.upgrade() {
                Some(form) => form.submit(),
                None => {
                    error!("form dropped while waiting on async validation");
                    Submission::Rejected
                }
            };
            let _ = tx.send(submission.settled().await);
        };
        if let Err(err) = self.spawner().spawn_local(task) {
            error!(%err, "could not schedule submission");
            return Submission::Rejected;
        }
        Submission::Pending(receiver(rx))
    }

    fn run_submit(&self) -> Submission {
        let hooks: Vec<_> = self
            .engine()
            .state
            .fields
            .values()
            .filter_map(|field| field.before_submit.clone())
            .collect();
        if hooks.iter().any(|hook| !hook()) {
            debug!("submit blocked by a field hook");
            return Submission::Rejected;
        }

        let (values, on_submit) = {
            let mut engine = self.engine_mut();
            let on_submit = engine.options.on_submit.clone();
            let state = &mut engine.state;
            let form = &mut state.form_state;
            form.submitting = true;
            form.submit_failed = false;
            form.submit_succeeded = false;
            form.submit_errors = None;
            form.submit_error = None;
            form.last_submitted_values = Some(form.values.clone());
            for field in state.fields.values_mut() {
                field.modified_since_last_submit = false;
            }
            (state.form_state.values.clone(), on_submit)
        };
        info!("submitting form");

        let (tx, rx) = oneshot::channel();
        let completed = Rc::new(Cell::new(false));
        let completion = SubmitCompletion {
            form: self.downgrade(),
            completed: Rc::clone(&completed),
            sender: Some(tx),
        };

        match on_submit(&values, self, completion) {
            SubmitResult::Done(errors) => {
                self.complete_submit(&completed, errors.clone());
                Submission::Completed(errors)
            }
            SubmitResult::Pending(future) => {
                self.notify(&Listeners::FormThenFields);
                let (tx, rx) = oneshot::channel();
                let form = self.downgrade();
                let task = async move {
                    let errors = future.await;
                    if let Some(form) = form.upgrade() {
                        form.complete_submit(&completed, errors.clone());
                    }
                    let _ = tx.send(errors);
                };
                if let Err(err) = self.spawner().spawn_local(task) {
                    error!(%err, "could not schedule submit handler");
                }
                Submission::Pending(receiver(rx))
            }
            SubmitResult::Deferred => {
                self.notify(&Listeners::FormThenFields);
                Submission::Pending(receiver(rx))
            }
        }
    }

    pub(crate) fn complete_submit(&self, completed: &Cell<bool>, errors: Option<Value>) {
        if completed.replace(true) {
            return;
        }
        let after_submit = {
            let mut engine = self.engine_mut();
            let state = &mut engine.state;
            let form = &mut state.form_state;
            form.submitting = false;
            let reset_while_submitting = std::mem::take(&mut form.reset_while_submitting);

            match errors.filter(has_any_error) {
                Some(errors) => {
                    form.submit_failed = true;
                    form.submit_succeeded = false;
                    form.submit_error = errors
                        .as_map()
                        .and_then(|errors| errors.get(FORM_ERROR))
                        .filter(|error| !error.is_null())
                        .cloned();
                    form.submit_errors = Some(errors);
                    for field in state.fields.values_mut() {
                        field.touched = true;
                    }
                    Vec::new()
                }
                None => {
                    if !reset_while_submitting {
                        form.submit_failed = false;
                        form.submit_succeeded = true;
                    }
                    state
                        .fields
                        .values()
                        .filter_map(|field| field.after_submit.clone())
                        .collect()
                }
            }
        };
        for hook in after_submit {
            hook();
        }
        let state = self.get_state();
        info!(failed = state.submit_failed, "submission finished");
        self.notify(&Listeners::FormThenFields);
    }
}
