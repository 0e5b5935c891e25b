// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time budgets consulted by the scheduler between units of work.
//!
//! The engine never reads a clock itself. Whoever drives it (an idle callback, a frame loop, a
//! test) passes a [`Deadline`] describing how much time is left in the current slot.

use core::cell::Cell;
use core::time::Duration;

/// Source of the remaining time in the current idle slot.
pub trait Deadline {
    /// Time left before the scheduler should yield.
    fn time_remaining(&self) -> Duration;
}

impl<F> Deadline for F
where
    F: Fn() -> Duration,
{
    fn time_remaining(&self) -> Duration {
        self()
    }
}

/// A deadline that never expires; runs a render to completion in one call.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// A deterministic budget measured in units of work.
///
/// The scheduler queries the deadline once after each unit, so `StepBudget::new(n)` lets a
/// call perform `n` units (at least one) before yielding.
#[derive(Debug)]
pub struct StepBudget {
    remaining: Cell<usize>,
}

impl StepBudget {
    /// Allow `steps` units of work.
    pub fn new(steps: usize) -> Self {
        Self {
            remaining: Cell::new(steps),
        }
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.remaining.get()
    }
}

impl Deadline for StepBudget {
    fn time_remaining(&self) -> Duration {
        let left = self.remaining.get().saturating_sub(1);
        self.remaining.set(left);
        if left == 0 {
            Duration::ZERO
        } else {
            Duration::MAX
        }
    }
}

/// A wall-clock deadline ending `budget` after construction.
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct InstantDeadline {
    end: std::time::Instant,
}

#[cfg(feature = "std")]
impl InstantDeadline {
    /// A deadline `budget` from now.
    pub fn new(budget: Duration) -> Self {
        let now = std::time::Instant::now();
        Self {
            end: now.checked_add(budget).unwrap_or(now),
        }
    }
}

#[cfg(feature = "std")]
impl Deadline for InstantDeadline {
    fn time_remaining(&self) -> Duration {
        self.end
            .saturating_duration_since(std::time::Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_budget_counts_down() {
        let b = StepBudget::new(3);
        assert_eq!(b.time_remaining(), Duration::MAX);
        assert_eq!(b.time_remaining(), Duration::MAX);
        assert_eq!(b.time_remaining(), Duration::ZERO);
        assert_eq!(b.remaining(), 0);
        assert_eq!(b.time_remaining(), Duration::ZERO, "stays exhausted");
    }

    #[test]
    fn zero_step_budget_is_exhausted() {
        assert_eq!(StepBudget::new(0).time_remaining(), Duration::ZERO);
    }

    #[test]
    fn closures_are_deadlines() {
        let d = || Duration::from_millis(5);
        assert_eq!(d.time_remaining(), Duration::from_millis(5));
    }

    #[cfg(feature = "std")]
    #[test]
    fn instant_deadline_expires() {
        let d = InstantDeadline::new(Duration::ZERO);
        assert_eq!(d.time_remaining(), Duration::ZERO);
    }
}
