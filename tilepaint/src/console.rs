//! Terminal stand-ins for the progress dialog and message boxes.

use tilepaint_core::workspace::{ErrorReporter, ProgressUi};

/// Logs progress in steps of ten percent. Requests cancellation once `deadline` passes, if set.
pub struct ConsoleProgress {
    name: String,
    started: std::time::Instant,
    deadline: Option<std::time::Duration>,
    last_step: Option<u32>,
}
impl ConsoleProgress {
    #[must_use]
    pub fn new(name: impl Into<String>, deadline: Option<std::time::Duration>) -> Self {
        Self {
            name: name.into(),
            started: std::time::Instant::now(),
            deadline,
            last_step: None,
        }
    }
}
impl ProgressUi for ConsoleProgress {
    fn on_progress(&mut self, percent: f64) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let step = (percent / 10.0) as u32;
        if self.last_step != Some(step) {
            self.last_step = Some(step);
            log::info!("{}: {}%", self.name, step * 10);
        }
    }
    fn cancel_requested(&mut self) -> bool {
        self.deadline
            .is_some_and(|deadline| self.started.elapsed() > deadline)
    }
    fn on_critical_region(&mut self) {
        log::debug!("{}: can no longer be cancelled", self.name);
    }
    fn on_finished(&mut self) {
        log::info!("{} finished after {:?}", self.name, self.started.elapsed());
    }
}

/// Prints errors to stderr, as there's no window to put them in.
#[derive(Default)]
pub struct ConsoleReporter {
    shown: usize,
}
impl ConsoleReporter {
    #[must_use]
    pub fn shown(&self) -> usize {
        self.shown
    }
}
impl ErrorReporter for ConsoleReporter {
    fn error_box(&mut self, message: &str) {
        self.shown += 1;
        log::error!("{message}");
        eprintln!("Error: {message}");
    }
}
