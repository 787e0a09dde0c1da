//! Progress reporting for long-running generators
//!
//! Generators with a `*_with_progress` form accept any [`Progress`] sink.
//! Events are throttled to roughly a hundred per run, plus one final event, so
//! a sink may do real work (redraw a bar, log) on every call.

/// One progress notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Short name of the running loop, e.g. `"rsa"`
    pub stage: &'static str,
    /// Units of work completed so far
    pub current: u64,
    /// Upper bound on the units of work (an iteration ceiling, not a promise)
    pub total: u64,
    /// Generator-specific measurement, such as the running volume fraction
    pub value: Option<f64>,
}

/// Receiver of progress events.
pub trait Progress {
    fn report(&mut self, event: &ProgressEvent);
}

impl<F: FnMut(&ProgressEvent)> Progress for F {
    fn report(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// A sink that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Progress for Silent {
    fn report(&mut self, _event: &ProgressEvent) {}
}

/// Throttles events for one loop before handing them to a sink.
pub(crate) struct Reporter<'a> {
    sink: &'a mut dyn Progress,
    stage: &'static str,
    total: u64,
    step: u64,
    next: u64,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn Progress, stage: &'static str, total: u64) -> Self {
        let step = (total / 100).max(1);
        Self {
            sink,
            stage,
            total,
            step,
            next: step,
        }
    }

    /// Report `current` if enough work has passed since the last event.
    pub(crate) fn update(&mut self, current: u64, value: Option<f64>) {
        if current >= self.next {
            self.emit(current, value);
            self.next = current + self.step;
        }
    }

    /// Always report; used once the loop has ended.
    pub(crate) fn finish(&mut self, current: u64, value: Option<f64>) {
        self.emit(current, value);
    }

    fn emit(&mut self, current: u64, value: Option<f64>) {
        self.sink.report(&ProgressEvent {
            stage: self.stage,
            current,
            total: self.total,
            value,
        });
    }
}
