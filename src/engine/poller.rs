//! Completion polling
//!
//! After a create/update is accepted, the push blocks here until every
//! tracked stack leaves its in-progress states. The poll deliberately
//! serializes the calling thread; a pipeline step has exactly one outcome
//! to report and gains nothing from overlapping polls.

use anyhow::{bail, Result};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::provider::{StackApi, StackObservation};
use crate::ui;

pub const INTERRUPTED_WHILE_POLLING: &str = "Interrupted while polling";

const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// How long to suspend between status checks. Fixed interval today, kept
/// as a value so the strategy is a parameter rather than a constant buried
/// in the loop.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self { interval }
    }
}

/// The cancellable timer driving the poll loop.
///
/// `Err` means the wait was interrupted; the poller turns that into a fatal
/// push failure with a fixed diagnostic, never a silent continue.
pub trait Suspend {
    fn suspend(&self, interval: Duration) -> Result<(), Interrupted>;
}

#[derive(Debug)]
pub struct Interrupted;

/// Timer backed by an mpsc cancel channel; any message (or a dropped
/// sender) interrupts the wait. The CLI's timeout watchdog sends here.
pub struct CancelableSleep {
    cancel: Receiver<()>,
}

impl CancelableSleep {
    pub fn new(cancel: Receiver<()>) -> Self {
        Self { cancel }
    }
}

impl Suspend for CancelableSleep {
    fn suspend(&self, interval: Duration) -> Result<(), Interrupted> {
        match self.cancel.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => Ok(()),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Err(Interrupted),
        }
    }
}

/// Where one status-check cycle left the tracked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    InProgress,
    Settled,
}

pub struct CompletionPoller<'a, S: Suspend> {
    api: &'a dyn StackApi,
    policy: PollPolicy,
    timer: S,
}

impl<'a, S: Suspend> CompletionPoller<'a, S> {
    pub fn new(api: &'a dyn StackApi, policy: PollPolicy, timer: S) -> Self {
        Self { api, policy, timer }
    }

    /// Block until every tracked stack is simultaneously settled.
    ///
    /// A single stack reaching a failure/rollback status aborts the whole
    /// wait immediately; remaining stacks are not observed further.
    pub fn wait(&self, stack_names: &[&str]) -> Result<()> {
        ui::info("Waiting...");

        // Suspend before the first check as well: querying immediately can
        // race the provider's transition out of its pre-update idle state
        self.pause()?;
        loop {
            if self.check_all(stack_names)? == Cycle::Settled {
                break;
            }
            self.pause()?;
        }

        ui::info("done");
        Ok(())
    }

    fn check_all(&self, stack_names: &[&str]) -> Result<Cycle> {
        for name in stack_names {
            let stacks = self.api.describe_stacks(name)?;
            if report_and_classify(&stacks)? == Cycle::InProgress {
                return Ok(Cycle::InProgress);
            }
        }
        Ok(Cycle::Settled)
    }

    fn pause(&self) -> Result<()> {
        if self.timer.suspend(self.policy.interval).is_err() {
            ui::error(INTERRUPTED_WHILE_POLLING);
            bail!(INTERRUPTED_WHILE_POLLING);
        }
        Ok(())
    }
}

/// Log every stack's status and classify the cycle.
///
/// Written over a slice even though a push tracks one top-level stack; the
/// describe call may return several.
fn report_and_classify(stacks: &[StackObservation]) -> Result<Cycle> {
    for stack in stacks {
        report_status(stack);

        if stack.stack_status.contains("IN_PROGRESS") {
            return Ok(Cycle::InProgress);
        }
        if stack.stack_status.contains("FAILED") || stack.stack_status.contains("ROLLBACK") {
            bail!("Stack push failed - {}", stack.stack_status);
        }
    }
    Ok(Cycle::Settled)
}

fn report_status(stack: &StackObservation) {
    match &stack.stack_status_reason {
        Some(reason) => ui::info(&format!("{} : {}", stack.stack_status, reason)),
        None => ui::info(&stack.stack_status),
    }
}
