use std::time::Instant;

/// Measures a step's wall time for trace events.
#[derive(Debug, Clone, Copy)]
pub struct StepTimer {
    start: Instant,
}

impl StepTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}
