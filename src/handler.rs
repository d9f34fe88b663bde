//! Cancellation handlers polled by the compilation driver.
//!
//! The driver reports two events: [`started`](ComputationHandler::started) once
//! per compilation and [`new_ref_added`](ComputationHandler::new_ref_added)
//! every time an intermediate result is about to be referenced. Returning
//! `false` from the latter cancels the compilation.

use std::time::{Duration, Instant};

use log::debug;

pub trait ComputationHandler {
    /// A new compilation starts.
    fn started(&mut self) {}

    /// A new intermediate result is about to be referenced.
    /// Returns `false` to cancel the computation.
    fn new_ref_added(&mut self) -> bool;

    /// Whether this handler cancelled the last computation.
    fn aborted(&self) -> bool;
}

/// Handler that never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopHandler;

impl ComputationHandler for NopHandler {
    fn new_ref_added(&mut self) -> bool {
        true
    }

    fn aborted(&self) -> bool {
        false
    }
}

/// Cancels once the number of referenced intermediate results reaches a bound.
#[derive(Debug, Clone)]
pub struct NumberOfNodesHandler {
    bound: usize,
    count: usize,
    aborted: bool,
}

impl NumberOfNodesHandler {
    pub fn new(bound: usize) -> Self {
        Self {
            bound,
            count: 0,
            aborted: false,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl ComputationHandler for NumberOfNodesHandler {
    fn started(&mut self) {
        self.count = 0;
        self.aborted = false;
    }

    fn new_ref_added(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.bound {
            debug!("node bound {} reached, aborting", self.bound);
            self.aborted = true;
        }
        !self.aborted
    }

    fn aborted(&self) -> bool {
        self.aborted
    }
}

#[derive(Debug, Clone, Copy)]
enum Deadline {
    /// Relative to the start of each computation.
    After(Duration),
    At(Instant),
}

/// Cancels once a deadline has passed.
#[derive(Debug, Clone)]
pub struct TimeoutHandler {
    deadline: Deadline,
    expires: Option<Instant>,
    aborted: bool,
}

impl TimeoutHandler {
    /// Deadline measured from the start of every computation.
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Deadline::After(timeout),
            expires: None,
            aborted: false,
        }
    }

    /// Fixed absolute deadline.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Deadline::At(deadline),
            expires: Some(deadline),
            aborted: false,
        }
    }
}

impl ComputationHandler for TimeoutHandler {
    fn started(&mut self) {
        self.aborted = false;
        self.expires = Some(match self.deadline {
            Deadline::After(timeout) => Instant::now() + timeout,
            Deadline::At(deadline) => deadline,
        });
    }

    fn new_ref_added(&mut self) -> bool {
        if let Some(expires) = self.expires {
            if Instant::now() >= expires {
                debug!("timeout reached, aborting");
                self.aborted = true;
            }
        }
        !self.aborted
    }

    fn aborted(&self) -> bool {
        self.aborted
    }
}
