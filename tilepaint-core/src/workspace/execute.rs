//! # Execution
//!
//! Programmatic changes to the document. An [`Action`] runs synchronously on the calling thread. A
//! [`Function`] may additionally report progress and honor cancellation, in which case it is run on
//! a worker thread while the calling thread services a [`ProgressUi`].
//!
//! Either way the tool is suspended for the duration (unless [`ActionFlags::KEEP_TOOL_ACTIVE`]),
//! and only a successful run that produced a [`Memento`] touches history.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{Workspace, WorkspaceError};
use crate::history::Memento;
use crate::scratch::ScratchError;
use crate::surface::SurfaceError;

bitflags::bitflags! {
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
    pub struct ActionFlags : u8 {
        /// Run alongside the interactive tool instead of suspending it. The action must then leave
        /// the scratch buffer and the active layer's capture state alone.
        const KEEP_TOOL_ACTIVE = 0b0000_0001;
        /// Run on a worker with a progress UI. Without this, a function runs synchronously.
        const REPORTS_PROGRESS = 0b0000_0010;
        /// Offer the user a way to cancel. Only meaningful with `REPORTS_PROGRESS`.
        const CANCELLABLE      = 0b0000_0100;
    }
}

/// How a run ended, as far as the user is concerned.
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum FunctionResult {
    /// Changes were made and recorded in history.
    Success,
    /// Nothing to record.
    SuccessNoOp,
    /// Stopped early on request. Nothing is recorded.
    Cancelled,
    /// Failed, the user was told.
    NonFatalError,
    /// Failed to allocate, the user was told.
    OutOfMemory,
}

#[derive(thiserror::Error, Debug)]
pub enum ActionError {
    /// Recoverable failure. Shown to the user with `message`, or a generic message if absent.
    #[error("{}", .message.as_deref().unwrap_or("action failed"))]
    NonFatal {
        message: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    #[error("{}", .message.as_deref().unwrap_or("out of memory"))]
    OutOfMemory { message: Option<String> },
    /// Misuse of the workspace. Not shown to the user, but returned to the caller of the run.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}
impl ActionError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::NonFatal {
            message: Some(message.into()),
            source: None,
        }
    }
    /// Non-fatal error with the generic message, keeping `source` for the log.
    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::NonFatal {
            message: None,
            source: Some(Box::new(source)),
        }
    }
}
impl From<SurfaceError> for ActionError {
    fn from(_: SurfaceError) -> Self {
        Self::OutOfMemory { message: None }
    }
}

/// Sent from a running function to whoever is showing its progress.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ProgressMessage {
    /// Completion in `0.0..=100.0`.
    Percent(f64),
    /// Cancellation is no longer possible.
    CriticalRegion,
}

/// A function's handle for reporting progress and checking for cancellation.
#[derive(Default)]
pub struct Progress {
    /// None when nobody is listening.
    sender: Option<crossbeam::channel::Sender<ProgressMessage>>,
    cancel: Arc<AtomicBool>,
    critical: Arc<AtomicBool>,
}
impl Progress {
    /// Report completion in percent. Clamped to `0.0..=100.0`.
    pub fn report(&self, percent: f64) {
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        match &self.sender {
            Some(sender) => {
                // Closed means the coordinator is gone, nothing to tell.
                let _ = sender.send(ProgressMessage::Percent(percent));
            }
            None => log::debug!(
                "Dropped progress report {percent:.1}%, function doesn't report progress"
            ),
        }
    }
    /// Whether the user asked to stop. Functions should poll this and return `Ok(None)` promptly
    /// once set.
    #[must_use]
    pub fn should_cancel(&self) -> bool {
        !self.in_critical_region() && self.cancel.load(Ordering::Acquire)
    }
    /// Declare that the function is about to make changes that can't be stopped partway.
    /// From here on cancellation is ignored, and running out of memory is a hard failure.
    pub fn enter_critical_region(&self) {
        if !self.critical.swap(true, Ordering::AcqRel) {
            if let Some(sender) = &self.sender {
                let _ = sender.send(ProgressMessage::CriticalRegion);
            }
        }
    }
    #[must_use]
    pub fn in_critical_region(&self) -> bool {
        self.critical.load(Ordering::Acquire)
    }
}

/// A synchronous programmatic change to the workspace.
pub trait Action {
    /// Shown in history and error messages.
    fn name(&self) -> &str;
    fn flags(&self) -> ActionFlags {
        ActionFlags::empty()
    }
    /// Make the change, returning how to undo it. `None` if nothing changed.
    fn perform(&mut self, workspace: &mut Workspace) -> Result<Option<Memento>, ActionError>;
}

/// A programmatic change that may take long enough to need a progress UI.
pub trait Function: Send {
    fn name(&self) -> &str;
    fn flags(&self) -> ActionFlags {
        ActionFlags::empty()
    }
    fn execute(
        &mut self,
        workspace: &mut Workspace,
        progress: &Progress,
    ) -> Result<Option<Memento>, ActionError>;
}

/// Shows a function's progress. Called only from the thread that started the function.
pub trait ProgressUi {
    fn on_progress(&mut self, percent: f64);
    /// Polled while the function runs. Returning true asks the function to stop.
    fn cancel_requested(&mut self) -> bool;
    /// Hide the cancel affordance, it will no longer be honored.
    fn on_critical_region(&mut self) {}
    fn on_finished(&mut self) {}
}

pub trait ErrorReporter {
    /// Show a modal error message.
    fn error_box(&mut self, message: &str);
}

type Outcome = Result<Option<Memento>, ActionError>;

/// What's known once the action or function has returned, or panicked.
struct Ran {
    outcome: std::thread::Result<Outcome>,
    cancelled: bool,
    critical: bool,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

fn run_guarded(catch_panics: bool, run: impl FnOnce() -> Outcome) -> std::thread::Result<Outcome> {
    if catch_panics {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(run))
    } else {
        Ok(run())
    }
}

impl Workspace {
    /// Run `action`, suspending the tool around it unless it asks otherwise.
    ///
    /// Failures the user should know about are reported through `reporter` and classified in the
    /// returned result. Misuse of the workspace is returned as `Err`.
    pub fn perform_action(
        &mut self,
        action: &mut dyn Action,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<FunctionResult, WorkspaceError> {
        let flags = action.flags();
        let catch_panics = self.settings.execution.catch_panics;
        log::debug!("Performing {:?} ({flags:?})", action.name());
        let mut guard = self.scope(!flags.contains(ActionFlags::KEEP_TOOL_ACTIVE))?;
        let recording = std::mem::replace(&mut guard.records_properties, false);
        let outcome = run_guarded(catch_panics, || action.perform(&mut guard));
        let processed = guard.process_document_events();
        guard.records_properties = recording;
        guard.finish()?;
        processed?;
        self.conclude(
            action.name(),
            Ran {
                outcome,
                cancelled: false,
                critical: false,
            },
            reporter,
        )
    }
    /// Run `function`, on a worker thread with progress shown on `ui` if it reports progress,
    /// synchronously otherwise.
    pub fn execute_function(
        &mut self,
        function: &mut dyn Function,
        ui: &mut dyn ProgressUi,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<FunctionResult, WorkspaceError> {
        let flags = function.flags();
        let execution = self.settings.execution;
        log::debug!("Executing {:?} ({flags:?})", function.name());
        let mut guard = self.scope(!flags.contains(ActionFlags::KEEP_TOOL_ACTIVE))?;
        let recording = std::mem::replace(&mut guard.records_properties, false);

        let ran = if flags.contains(ActionFlags::REPORTS_PROGRESS) {
            let (sender, receiver) = crossbeam::channel::unbounded();
            let progress = Progress {
                sender: Some(sender),
                ..Default::default()
            };
            let cancel = Arc::clone(&progress.cancel);
            let critical = Arc::clone(&progress.critical);
            let workspace: &mut Workspace = &mut guard;
            let name = function.name().to_owned();
            let worker_function = &mut *function;

            let joined = std::thread::scope(|scope| {
                // Progress moves into the worker, disconnecting the channel once it returns.
                let worker = std::thread::Builder::new()
                    .name(format!("{name} worker"))
                    .spawn_scoped(scope, move || worker_function.execute(workspace, &progress));
                let worker = match worker {
                    Ok(worker) => worker,
                    Err(err) => {
                        log::error!("Failed to spawn worker for {name:?}: {err}");
                        return Err(err);
                    }
                };
                let mut cancel_live = flags.contains(ActionFlags::CANCELLABLE);
                loop {
                    match receiver.recv_timeout(execution.progress_poll()) {
                        Ok(ProgressMessage::Percent(percent)) => ui.on_progress(percent),
                        Ok(ProgressMessage::CriticalRegion) => {
                            cancel_live = false;
                            ui.on_critical_region();
                        }
                        Err(crossbeam::channel::RecvTimeoutError::Timeout) => (),
                        Err(crossbeam::channel::RecvTimeoutError::Disconnected) => break,
                    }
                    // Inert once requested, the function acknowledges by returning.
                    if cancel_live && ui.cancel_requested() {
                        log::debug!("Cancel requested for {name:?}");
                        cancel.store(true, Ordering::Release);
                        cancel_live = false;
                    }
                }
                Ok(worker.join())
            });
            ui.on_finished();

            let outcome = match joined {
                Ok(Ok(outcome)) => Ok(outcome),
                Ok(Err(payload)) if execution.catch_panics => Err(payload),
                // Guard resumes the tool as this unwinds.
                Ok(Err(payload)) => {
                    guard.records_properties = recording;
                    std::panic::resume_unwind(payload)
                }
                Err(spawn) => Ok(Err(ActionError::from_source(spawn))),
            };
            Ran {
                outcome,
                cancelled: cancel.load(Ordering::Acquire),
                critical: critical.load(Ordering::Acquire),
            }
        } else {
            let progress = Progress::default();
            let outcome = run_guarded(execution.catch_panics, || {
                function.execute(&mut guard, &progress)
            });
            Ran {
                outcome,
                cancelled: false,
                critical: progress.in_critical_region(),
            }
        };

        let processed = guard.process_document_events();
        guard.records_properties = recording;
        guard.finish()?;
        processed?;
        self.conclude(function.name(), ran, reporter)
    }
    /// Classify a finished run, recording its memento or telling the user what went wrong.
    fn conclude(
        &mut self,
        name: &str,
        ran: Ran,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<FunctionResult, WorkspaceError> {
        let outcome = match ran.outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                log::error!("{name:?} panicked: {}", panic_message(&*payload));
                reporter.error_box(&self.settings.messages.generic_error(name));
                return Ok(FunctionResult::NonFatalError);
            }
        };
        let error = match outcome {
            Ok(Some(memento)) => {
                self.history.push(memento);
                if let Some(document) = self.document.as_mut() {
                    document.dirty = true;
                }
                return Ok(FunctionResult::Success);
            }
            Ok(None) if ran.cancelled => return Ok(FunctionResult::Cancelled),
            Ok(None) => return Ok(FunctionResult::SuccessNoOp),
            Err(ActionError::Workspace(
                WorkspaceError::Surface(_) | WorkspaceError::Scratch(ScratchError::Allocation(_)),
            )) => ActionError::OutOfMemory { message: None },
            Err(ActionError::Workspace(err)) => return Err(err),
            Err(err) => err,
        };
        match error {
            ActionError::OutOfMemory { .. } if ran.critical => {
                log::error!("{name:?} ran out of memory inside its critical region");
                Err(WorkspaceError::CriticalRegionFailure)
            }
            ActionError::OutOfMemory { message } => {
                log::warn!("{name:?} ran out of memory");
                let message = message.unwrap_or_else(|| self.settings.messages.out_of_memory(name));
                reporter.error_box(&message);
                Ok(FunctionResult::OutOfMemory)
            }
            ActionError::NonFatal { message, source } => {
                match &source {
                    Some(source) => log::warn!("{name:?} failed: {source}"),
                    None => log::warn!(
                        "{name:?} failed: {}",
                        message.as_deref().unwrap_or("no reason given")
                    ),
                }
                let message = message.unwrap_or_else(|| self.settings.messages.generic_error(name));
                reporter.error_box(&message);
                Ok(FunctionResult::NonFatalError)
            }
            ActionError::Workspace(err) => Err(err),
        }
    }
}
